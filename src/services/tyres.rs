//! The tyre catalog: public search and facets, plus inventory management for
//! administrators.
use std::{collections::HashSet, sync::Arc};

use object_store::ObjectStore;
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    constants::api::CATALOG_LIMIT,
    db::{
        self,
        models::tyre::{Tyre, TyreInsert},
    },
    services::{media, sizes},
};

const SKU_PREFIX: &str = "TYR-";
const SKU_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_FEATURES: usize = 3;
const DEFAULT_WARRANTY_MONTHS: i32 = 36;
const DEFAULT_TYRE_TYPE: &str = "Tubeless";

/// A fresh SKU: `TYR-` followed by nine uppercase alphanumerics.
pub fn generate_sku() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| char::from(SKU_CHARSET[rng.random_range(0..SKU_CHARSET.len())]))
        .collect();
    format!("{SKU_PREFIX}{suffix}")
}

/// Escape `LIKE` metacharacters so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Keep the first tyre seen for each SKU.
fn dedupe_by_sku(tyres: Vec<Tyre>) -> Vec<Tyre> {
    let mut seen = HashSet::new();
    tyres
        .into_iter()
        .filter(|tyre| seen.insert(tyre.sku.to_lowercase()))
        .collect()
}

/// Search by size and/or brand. Returns nothing when neither is given.
pub async fn search(
    size: Option<&str>,
    brand: Option<&str>,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Tyre>, db::errors::DatabaseError> {
    let size_pattern = size
        .map(str::trim)
        .filter(|size| !size.is_empty())
        .and_then(sizes::size_search_pattern);
    let brand_pattern = brand
        .map(str::trim)
        .filter(|brand| !brand.is_empty())
        .map(|brand| format!("%{}%", escape_like(brand)));
    if size_pattern.is_none() && brand_pattern.is_none() {
        return Ok(Vec::new());
    }
    let tyres = Tyre::search(
        size_pattern.as_deref(),
        brand_pattern.as_deref(),
        CATALOG_LIMIT,
        db_conn,
    )
    .await?;
    Ok(dedupe_by_sku(tyres))
}

pub async fn retrieve(
    id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<Option<Tyre>, db::errors::DatabaseError> {
    Tyre::select_one(id, db_conn).await
}

pub async fn widths(db_conn: &db::ConnectionPool) -> Result<Vec<u16>, db::errors::DatabaseError> {
    Ok(sizes::distinct_widths(
        &Tyre::select_distinct_sizes(db_conn).await?,
    ))
}

pub async fn aspects(
    width: u16,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<u16>, db::errors::DatabaseError> {
    Ok(sizes::distinct_aspects(
        &Tyre::select_distinct_sizes(db_conn).await?,
        width,
    ))
}

pub async fn rims(
    width: u16,
    aspect: u16,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<u16>, db::errors::DatabaseError> {
    Ok(sizes::distinct_rims(
        &Tyre::select_distinct_sizes(db_conn).await?,
        width,
        aspect,
    ))
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockLevel {
    pub id: Uuid,
    pub stock: i32,
}

/// Current stock for the given IDs. Unknown IDs are left out.
pub async fn stock_levels(
    ids: &[Uuid],
    db_conn: &db::ConnectionPool,
) -> Result<Vec<StockLevel>, db::errors::DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(Tyre::select_stock(ids, db_conn)
        .await?
        .into_iter()
        .map(|(id, stock)| StockLevel { id, stock })
        .collect())
}

/// Everything an administrator supplies when creating a tyre.
#[derive(Deserialize, Debug, Clone)]
pub struct NewTyre {
    pub sku: Option<String>,
    pub brand: String,
    pub title: Option<String>,
    pub size: String,
    pub price: i64,
    pub warranty_months: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(rename = "type")]
    pub tyre_type: Option<String>,
    #[serde(alias = "loadIndex")]
    pub load_index: Option<String>,
    pub rating: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// A partial update. Absent fields are left unchanged.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct TyreUpdate {
    pub brand: Option<String>,
    pub title: Option<String>,
    pub size: Option<String>,
    pub price: Option<i64>,
    pub warranty_months: Option<i32>,
    pub images: Option<Vec<String>>,
    pub stock: Option<i32>,
    #[serde(rename = "type")]
    pub tyre_type: Option<String>,
    #[serde(alias = "loadIndex")]
    pub load_index: Option<String>,
    pub rating: Option<String>,
    pub features: Option<Vec<String>>,
}

/// The display size and lookup key for admin-entered size text.
fn size_fields(size: &str) -> (String, String) {
    let display = sizes::TyreSize::parse(size)
        .map_or_else(|| size.trim().to_owned(), |parsed| parsed.to_string());
    let key = sizes::size_key(size);
    (display, key)
}

fn default_title(brand: &str, size: &str) -> String {
    format!("{brand} {size}").trim().to_owned()
}

fn validate(
    brand: &str,
    size: &str,
    price: i64,
    stock: i32,
    features: &[String],
) -> Result<(), errors::TyreValidationError> {
    if brand.trim().is_empty() {
        return Err(errors::TyreValidationError::MissingBrand);
    }
    if size.trim().is_empty() {
        return Err(errors::TyreValidationError::MissingSize);
    }
    if price < 0 {
        return Err(errors::TyreValidationError::NegativePrice);
    }
    if stock < 0 {
        return Err(errors::TyreValidationError::NegativeStock);
    }
    if features.len() > MAX_FEATURES {
        return Err(errors::TyreValidationError::TooManyFeatures);
    }
    Ok(())
}

impl NewTyre {
    fn into_insert(self) -> Result<TyreInsert, errors::TyreValidationError> {
        validate(&self.brand, &self.size, self.price, self.stock, &self.features)?;
        let brand = self.brand.trim().to_owned();
        let (size, size_key) = size_fields(&self.size);
        let title = self
            .title
            .map(|title| title.trim().to_owned())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| default_title(&brand, &size));
        Ok(TyreInsert {
            sku: self
                .sku
                .map(|sku| sku.trim().to_uppercase())
                .filter(|sku| !sku.is_empty())
                .unwrap_or_else(generate_sku),
            brand,
            title,
            size,
            size_key,
            price: self.price,
            warranty_months: self.warranty_months.unwrap_or(DEFAULT_WARRANTY_MONTHS),
            images: self.images,
            stock: self.stock,
            tyre_type: self
                .tyre_type
                .filter(|tyre_type| !tyre_type.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TYRE_TYPE.to_owned()),
            load_index: self.load_index,
            rating: self.rating,
            features: self.features,
        })
    }
}

impl TyreUpdate {
    fn apply(self, tyre: &mut Tyre) -> Result<(), errors::TyreValidationError> {
        if let Some(brand) = self.brand {
            tyre.brand = brand.trim().to_owned();
        }
        if let Some(size) = self.size {
            let (size, size_key) = size_fields(&size);
            tyre.set_size(size, size_key);
        }
        if let Some(title) = self.title {
            tyre.title = title.trim().to_owned();
        }
        if tyre.title.is_empty() {
            tyre.title = default_title(&tyre.brand, tyre.size());
        }
        if let Some(price) = self.price {
            tyre.set_price(price);
        }
        if let Some(warranty_months) = self.warranty_months {
            tyre.warranty_months = warranty_months;
        }
        if let Some(images) = self.images {
            tyre.images = images;
        }
        if let Some(stock) = self.stock {
            tyre.set_stock(stock);
        }
        if let Some(tyre_type) = self.tyre_type {
            tyre.tyre_type = tyre_type;
        }
        if self.load_index.is_some() {
            tyre.load_index = self.load_index;
        }
        if self.rating.is_some() {
            tyre.rating = self.rating;
        }
        if let Some(features) = self.features {
            tyre.features = features;
        }
        validate(
            &tyre.brand,
            tyre.size(),
            tyre.price(),
            tyre.stock(),
            &tyre.features,
        )
    }
}

pub async fn list_all(db_conn: &db::ConnectionPool) -> Result<Vec<Tyre>, db::errors::DatabaseError> {
    Tyre::select_all(db_conn).await
}

pub async fn create(
    new_tyre: NewTyre,
    db_conn: &db::ConnectionPool,
) -> Result<Tyre, errors::TyreCreateError> {
    let insert = new_tyre.into_insert()?;
    let tyre = insert.store(db_conn).await.map_err(|err| {
        if err.is_unique_violation() {
            errors::TyreCreateError::DuplicateSku
        } else {
            errors::TyreCreateError::DatabaseError(err)
        }
    })?;
    tracing::info!(tyre_id = %tyre.id(), sku = %tyre.sku, "Created tyre");
    Ok(tyre)
}

pub async fn update(
    id: Uuid,
    changes: TyreUpdate,
    db_conn: &db::ConnectionPool,
) -> Result<Tyre, errors::TyreUpdateError> {
    let mut tyre = Tyre::select_one(id, db_conn)
        .await?
        .ok_or(errors::TyreUpdateError::NonExistent)?;
    changes.apply(&mut tyre)?;
    tyre.update(db_conn).await?;
    Ok(tyre)
}

pub async fn set_stock(
    id: Uuid,
    stock: i32,
    db_conn: &db::ConnectionPool,
) -> Result<Tyre, errors::TyreUpdateError> {
    update(
        id,
        TyreUpdate {
            stock: Some(stock),
            ..TyreUpdate::default()
        },
        db_conn,
    )
    .await
}

pub async fn delete(id: Uuid, db_conn: &db::ConnectionPool) -> Result<(), errors::TyreDeleteError> {
    let tyre = Tyre::select_one(id, db_conn)
        .await?
        .ok_or(errors::TyreDeleteError::NonExistent)?;
    tyre.delete(db_conn).await?;
    tracing::info!(tyre_id = %id, "Deleted tyre");
    Ok(())
}

/// Upload an image and append its URL to the tyre's gallery.
pub async fn add_image(
    id: Uuid,
    image: Vec<u8>,
    store: Arc<dyn ObjectStore>,
    external_uri: &str,
    db_conn: &db::ConnectionPool,
) -> Result<Tyre, errors::TyreImageError> {
    let mut tyre = Tyre::select_one(id, db_conn)
        .await?
        .ok_or(errors::TyreImageError::NonExistent)?;
    let url = media::store_image(store, external_uri, image).await?;
    if !tyre.images.contains(&url) {
        tyre.images.push(url);
        tyre.update(db_conn).await?;
    }
    Ok(tyre)
}

pub mod errors {
    use thiserror::Error;

    use crate::{db::errors::DatabaseError, services::media::errors::StoreImageError};

    #[derive(Error, Debug, PartialEq, Eq)]
    pub enum TyreValidationError {
        #[error("Brand is required")]
        MissingBrand,
        #[error("Size is required")]
        MissingSize,
        #[error("Price cannot be negative")]
        NegativePrice,
        #[error("Stock cannot be negative")]
        NegativeStock,
        #[error("Maximum 3 features allowed")]
        TooManyFeatures,
    }

    #[derive(Error, Debug)]
    pub enum TyreCreateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        Invalid(#[from] TyreValidationError),
        #[error("A tyre with this SKU already exists")]
        DuplicateSku,
    }

    #[derive(Error, Debug)]
    pub enum TyreUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        Invalid(#[from] TyreValidationError),
        #[error("The tyre being updated does not exist")]
        NonExistent,
    }

    #[derive(Error, Debug)]
    pub enum TyreDeleteError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The tyre being deleted does not exist")]
        NonExistent,
    }

    #[derive(Error, Debug)]
    pub enum TyreImageError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        Media(#[from] StoreImageError),
        #[error("The tyre does not exist")]
        NonExistent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tyre() -> NewTyre {
        serde_json::from_value(serde_json::json!({
            "brand": " MRF ",
            "size": "185/65 r 15",
            "price": 450_000,
            "stock": 4,
            "features": ["Quiet", "Long life"]
        }))
        .expect("valid body")
    }

    #[test]
    fn sku_has_prefix_and_uppercase_suffix() {
        let sku = generate_sku();
        assert_eq!(sku.len(), 13);
        let suffix = sku.strip_prefix("TYR-").expect("prefixed");
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Apollo"), "Apollo");
    }

    #[test]
    fn insert_fills_defaults() {
        let insert = new_tyre().into_insert().expect("valid");
        assert_eq!(insert.brand, "MRF");
        assert_eq!(insert.size, "185/65R15");
        assert_eq!(insert.size_key, "185/65R15");
        assert_eq!(insert.title, "MRF 185/65R15");
        assert_eq!(insert.warranty_months, 36);
        assert_eq!(insert.tyre_type, "Tubeless");
        assert!(insert.sku.starts_with("TYR-"));
    }

    #[test]
    fn unparseable_size_is_kept_with_loose_key() {
        let mut tyre = new_tyre();
        tyre.size = String::from("7.50-16 lt");
        let insert = tyre.into_insert().expect("valid");
        assert_eq!(insert.size, "7.50-16 lt");
        assert_eq!(insert.size_key, "75016LT");
    }

    #[test]
    fn validation_rejects_bad_input() {
        let mut tyre = new_tyre();
        tyre.features = vec![String::new(); 4];
        assert_eq!(
            tyre.into_insert().err(),
            Some(errors::TyreValidationError::TooManyFeatures)
        );
        let mut tyre = new_tyre();
        tyre.stock = -1;
        assert_eq!(
            tyre.into_insert().err(),
            Some(errors::TyreValidationError::NegativeStock)
        );
        let mut tyre = new_tyre();
        tyre.brand = String::from("  ");
        assert_eq!(
            tyre.into_insert().err(),
            Some(errors::TyreValidationError::MissingBrand)
        );
        assert_eq!(
            validate("MRF", "", 0, 0, &[]),
            Err(errors::TyreValidationError::MissingSize)
        );
        assert_eq!(
            validate("MRF", "185/65R15", -5, 0, &[]),
            Err(errors::TyreValidationError::NegativePrice)
        );
    }
}
