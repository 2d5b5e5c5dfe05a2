//! Vehicle lookups backed by the Wheel-Size API, with fitment results cached
//! in the database.
use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::{
    clients::wheelsize::{Generation, Modification, WheelSizeClient},
    constants::api::CATALOG_LIMIT,
    db::{
        self,
        models::{fitment_cache::FitmentCache, tyre::Tyre},
    },
    services::{cars::distinct_size_keys, sizes},
};

/// Offered when Wheel-Size knows the model but has no generation years.
const FALLBACK_YEARS: core::ops::RangeInclusive<i32> = 2015..=2024;
/// Generations spanning more years than this are treated as bad data.
const MAX_GENERATION_SPAN: i32 = 60;

/// Wheel-Size lists Maruti vehicles under Suzuki.
pub fn normalize_make(make: &str) -> String {
    let make = make.trim();
    if make
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("maruti"))
    {
        String::from("Suzuki")
    } else {
        make.to_owned()
    }
}

/// Model slugs use dashes where the display name has spaces.
pub fn normalize_model(model: &str) -> String {
    model.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Expand generation ranges into sorted distinct years.
fn years_from_generations(generations: &[Generation]) -> Vec<i32> {
    let mut years = BTreeSet::new();
    for generation in generations {
        match (generation.start, generation.end) {
            (Some(start), Some(end)) if end >= start && end - start <= MAX_GENERATION_SPAN => {
                years.extend(start..=end);
            }
            (Some(start), _) => {
                years.insert(start);
            }
            _ => {}
        }
    }
    years.into_iter().collect()
}

/// Model years for a make and model.
pub async fn years(
    client: &WheelSizeClient,
    make: &str,
    model: &str,
) -> Result<Vec<i32>, errors::WheelsError> {
    let (make, model) = (normalize_make(make), normalize_model(model));
    let generations = client.generations(&make, &model).await?;
    let years = years_from_generations(&generations);
    if years.is_empty() {
        tracing::warn!(%make, %model, "No generation years upstream, using fallback range");
        return Ok(FALLBACK_YEARS.collect());
    }
    Ok(years)
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub slug: Option<String>,
    pub fuel: String,
    /// Horsepower, when known.
    pub power: Option<serde_json::Number>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

impl From<Modification> for Variant {
    fn from(modification: Modification) -> Self {
        let engine = modification.engine.unwrap_or_default();
        Self {
            name: modification
                .name
                .filter(|name| !name.trim().is_empty())
                .or(modification.trim)
                .unwrap_or_else(|| String::from("Unknown Variant")),
            slug: modification.slug,
            fuel: engine.fuel.unwrap_or_else(|| String::from("N/A")),
            power: engine.power.and_then(|power| power.hp),
            start_year: modification.start_year,
            end_year: modification.end_year,
        }
    }
}

/// Engine and trim variants for a vehicle in a model year.
pub async fn variants(
    client: &WheelSizeClient,
    make: &str,
    model: &str,
    year: i32,
) -> Result<Vec<Variant>, errors::WheelsError> {
    let (make, model) = (normalize_make(make), normalize_model(model));
    let variants: Vec<Variant> = client
        .modifications(&make, &model, year)
        .await?
        .into_iter()
        .map(Variant::from)
        .collect();
    if variants.is_empty() {
        return Err(errors::WheelsError::NotFound);
    }
    Ok(variants)
}

/// Front and rear tyre sizes across search results, without load and speed
/// suffixes, in first-seen order.
fn sizes_from_search(results: &[Modification]) -> Vec<String> {
    let mut seen = HashSet::new();
    results
        .iter()
        .flat_map(Modification::tyre_texts)
        .filter_map(|text| {
            sizes::TyreSize::parse(text).map_or_else(
                || text.split_whitespace().next().map(str::to_uppercase),
                |size| Some(size.to_string()),
            )
        })
        .filter(|size| seen.insert(size.clone()))
        .collect()
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FitmentSource {
    Cache,
    WheelSize,
}

#[derive(Serialize, Debug)]
pub struct FitmentLookup {
    pub source: FitmentSource,
    pub sizes: Vec<String>,
    pub tyres: Vec<Tyre>,
}

/// Tyre sizes for a vehicle modification and the local tyres matching them.
pub async fn fitments(
    client: &WheelSizeClient,
    make: &str,
    model: &str,
    year: i32,
    modification: &str,
    db_conn: &db::ConnectionPool,
) -> Result<FitmentLookup, errors::WheelsError> {
    let (make, model) = (normalize_make(make), normalize_model(model));
    let cached = FitmentCache::select_sizes(&make, &model, year, modification, db_conn).await?;
    let (source, found_sizes) = if let Some(found_sizes) = cached {
        tracing::debug!(%make, %model, year, modification, "Fitment cache hit");
        (FitmentSource::Cache, found_sizes)
    } else {
        let results = client
            .search_by_model(&make, &model, year, modification)
            .await?;
        let found_sizes = sizes_from_search(&results);
        if found_sizes.is_empty() {
            return Err(errors::WheelsError::NotFound);
        }
        FitmentCache::upsert(&make, &model, year, modification, &found_sizes, db_conn).await?;
        (FitmentSource::WheelSize, found_sizes)
    };
    let keys = distinct_size_keys(found_sizes.iter().map(String::as_str));
    let tyres = Tyre::select_priced_by_size_keys(&keys, CATALOG_LIMIT, db_conn).await?;
    Ok(FitmentLookup {
        source,
        sizes: found_sizes,
        tyres,
    })
}

pub mod errors {
    use thiserror::Error;

    use crate::{clients::wheelsize::errors::WheelSizeError, db::errors::DatabaseError};

    #[derive(Error, Debug)]
    pub enum WheelsError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        Upstream(#[from] WheelSizeError),
        #[error("Nothing found for this vehicle")]
        NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(start: Option<i32>, end: Option<i32>) -> Generation {
        Generation { start, end }
    }

    #[test]
    fn maruti_maps_to_suzuki() {
        assert_eq!(normalize_make("Maruti Suzuki"), "Suzuki");
        assert_eq!(normalize_make("maruti"), "Suzuki");
        assert_eq!(normalize_make(" Hyundai "), "Hyundai");
        assert_eq!(normalize_make("Kia"), "Kia");
    }

    #[test]
    fn model_spaces_become_dashes() {
        assert_eq!(normalize_model(" Alto  800 "), "Alto-800");
        assert_eq!(normalize_model("Swift"), "Swift");
    }

    #[test]
    fn generations_expand_to_sorted_years() {
        let years = years_from_generations(&[
            generation(Some(2018), Some(2020)),
            generation(Some(2014), Some(2017)),
            generation(Some(2021), None),
            generation(None, Some(2010)),
            generation(Some(2019), Some(2019)),
        ]);
        assert_eq!(years, (2014..=2021).collect::<Vec<_>>());
    }

    #[test]
    fn inverted_generation_keeps_its_start() {
        assert_eq!(years_from_generations(&[generation(Some(2020), Some(2012))]), vec![2020]);
    }

    #[test]
    fn variant_defaults_missing_fields() {
        let modification: Modification =
            serde_json::from_str(r#"{"trim": "LXi", "slug": "lxi"}"#).expect("parses");
        let variant = Variant::from(modification);
        assert_eq!(variant.name, "LXi");
        assert_eq!(variant.fuel, "N/A");
        assert_eq!(variant.power, None);
    }

    #[test]
    fn search_sizes_drop_suffixes_and_duplicates() {
        let results: Vec<Modification> = serde_json::from_str(
            r#"[
                {"front": {"tire_full": "185/65R15 88H"}, "rear": {"tire": "185/65R15"}},
                {"wheels": [{"front": {"tire": "195/55 R16 87V"}, "rear": {"tire": "LT245/75R16"}}]}
            ]"#,
        )
        .expect("parses");
        assert_eq!(
            sizes_from_search(&results),
            vec!["185/65R15", "195/55R16", "245/75R16"]
        );
    }

    #[test]
    fn fitment_source_wire_names() {
        assert_eq!(
            serde_json::to_value(FitmentSource::WheelSize).expect("serializes"),
            "wheel-size"
        );
        assert_eq!(
            serde_json::to_value(FitmentSource::Cache).expect("serializes"),
            "cache"
        );
    }
}
