//! Free-text tyre size inference through an LLM, cross-checked against local
//! fitments and Wheel-Size.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    clients::{
        openrouter::{CompletionOptions, OpenRouterClient},
        wheelsize::WheelSizeClient,
    },
    db::{
        self,
        models::{ai_fitment_cache::AiFitmentCache, fitment::Fitment},
    },
    services::{
        sizes::{self, TyreSize},
        wheels::{normalize_make, normalize_model},
    },
};

/// Reply the model gives when it cannot pin down make, model and year.
const MISSING_VEHICLE_SENTINEL: &str = "ERROR_MISSING_MMY";

const SEARCH_SYSTEM_PROMPT: &str = r#"You are TyreFusion-AI. Extract the car make, model and year from the user's text, inferring them where reasonable ("creta 2019", "tyres for honda city 2018").
If you cannot identify all three with at least 80% confidence, reply with exactly ERROR_MISSING_MMY and nothing else.
Otherwise reply with JSON only, in this shape:
{"sizes": [{"size": "205/65R16", "type": "Factory Fitment"}, {"size": "225/55R17", "type": "Aftermarket Upgrade"}]}
Use "Factory Fitment" for OEM sizes, "Aftermarket Upgrade" for compatible upgrades and "Unknown" when unsure.
No prose, no disclaimers, no Markdown."#;

const FITMENT_SYSTEM_PROMPT: &str = "You are a tyre fitment expert. Be concise and factual.";

const SOURCE_AI: &str = "ai+validation";
const SOURCE_CACHE: &str = "cache";

/// Remove Markdown code fences the model sometimes wraps JSON in.
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_owned()
}

#[derive(Deserialize)]
struct SearchReply {
    sizes: Vec<SuggestedSize>,
}

#[derive(Deserialize)]
struct SuggestedSize {
    size: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Turn the model's reply into display strings like `205/65R16 (Factory Fitment)`.
fn parse_search_reply(raw: &str) -> Result<Vec<String>, errors::AiSearchError> {
    if raw.contains(MISSING_VEHICLE_SENTINEL) {
        return Err(errors::AiSearchError::MissingVehicle);
    }
    let reply: SearchReply = serde_json::from_str(&strip_code_fences(raw))
        .map_err(|_| errors::AiSearchError::InvalidOutput)?;
    Ok(reply
        .sizes
        .into_iter()
        .filter(|suggested| !suggested.size.trim().is_empty())
        .map(|suggested| {
            let size = TyreSize::parse(&suggested.size)
                .map_or_else(|| suggested.size.trim().to_owned(), |size| size.to_string());
            let kind = suggested
                .kind
                .filter(|kind| !kind.trim().is_empty())
                .unwrap_or_else(|| String::from("Unknown"));
            format!("{size} ({kind})")
        })
        .collect())
}

/// Ask the model which sizes fit the vehicle described in `query`.
pub async fn search(
    client: &OpenRouterClient,
    query: &str,
) -> Result<Vec<String>, errors::AiSearchError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(errors::AiSearchError::EmptyQuery);
    }
    let reply = client
        .complete(SEARCH_SYSTEM_PROMPT, query, CompletionOptions::default())
        .await?;
    parse_search_reply(&reply).inspect_err(|err| {
        tracing::warn!(error = %err, reply = %reply, "Unusable AI search reply");
    })
}

fn fitment_prompt(make: &str, model: &str, year: i32) -> String {
    format!(
        "You are an Indian automotive tyre fitment expert.\n\
        Car: {make} {model} ({year}).\n\
        List the common OEM tyre sizes for this car in India, plus popular +1 or +2 inch upgrade \
        sizes that fit without major modification.\n\
        Respond ONLY with a JSON array of sizes, for example [\"195/65R15\", \"205/60R16\"]. \
        No explanations or formatting."
    )
}

/// Sizes from a fitment reply: a JSON array when the model complied, any
/// sizes mentioned in the text otherwise. Deduplicated, first-seen order.
fn parse_fitment_reply(raw: &str) -> Vec<TyreSize> {
    let parsed = serde_json::from_str::<Vec<serde_json::Value>>(&strip_code_fences(raw))
        .map(|values| {
            values
                .iter()
                .filter_map(|value| value.as_str().and_then(TyreSize::parse))
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|_| sizes::extract_sizes(raw));
    let mut seen = HashSet::new();
    parsed.into_iter().filter(|size| seen.insert(*size)).collect()
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifiedBy {
    #[serde(rename = "local_fitment")]
    LocalFitment,
    #[serde(rename = "wheel-size-api")]
    WheelSizeApi,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SizeVerdict {
    pub size: String,
    pub verified: bool,
    pub verified_by: Option<VerifiedBy>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AiFitment {
    pub sizes: Vec<SizeVerdict>,
    pub source: String,
    pub model_used: String,
}

/// Cache key for a vehicle: lowercase `make|model|year`.
pub fn cache_key(make: &str, model: &str, year: i32) -> String {
    format!(
        "{}|{}|{year}",
        make.trim().to_lowercase(),
        model.trim().to_lowercase()
    )
}

/// Check each candidate against the locally known and Wheel-Size sizes.
fn verify(
    candidates: &[TyreSize],
    local: &HashSet<TyreSize>,
    remote: &HashSet<TyreSize>,
) -> Vec<SizeVerdict> {
    candidates
        .iter()
        .map(|size| {
            let verified_by = if local.contains(size) {
                Some(VerifiedBy::LocalFitment)
            } else if remote.contains(size) {
                Some(VerifiedBy::WheelSizeApi)
            } else {
                None
            };
            SizeVerdict {
                size: size.to_string(),
                verified: verified_by.is_some(),
                verified_by,
            }
        })
        .collect()
}

/// Verified sizes first, then larger rims first.
fn sort_verdicts(verdicts: &mut [SizeVerdict]) {
    let rim = |verdict: &SizeVerdict| TyreSize::parse(&verdict.size).map_or(0, |size| size.rim);
    verdicts.sort_by(|a, b| {
        b.verified
            .cmp(&a.verified)
            .then_with(|| rim(b).cmp(&rim(a)))
    });
}

async fn local_sizes(
    make: &str,
    model: &str,
    year: i32,
    db_conn: &db::ConnectionPool,
) -> Result<HashSet<TyreSize>, db::errors::DatabaseError> {
    Ok(Fitment::select_matching(make, model, Some(year), db_conn)
        .await?
        .iter()
        .filter_map(|fitment| TyreSize::parse(&fitment.tyre_size))
        .collect())
}

/// Sizes Wheel-Size lists for the vehicle. Upstream failures leave the set
/// empty, which only means nothing gets verified by it.
async fn wheel_size_sizes(
    client: &WheelSizeClient,
    make: &str,
    model: &str,
    year: i32,
) -> HashSet<TyreSize> {
    match client
        .modifications(&normalize_make(make), &normalize_model(model), year)
        .await
    {
        Ok(modifications) => modifications
            .iter()
            .flat_map(|modification| modification.tyre_texts())
            .filter_map(TyreSize::parse)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, make, model, year, "Wheel-Size verification unavailable");
            HashSet::new()
        }
    }
}

/// Infer, verify and rank tyre sizes for a vehicle. Results are cached per
/// vehicle.
pub async fn fitment(
    openrouter: &OpenRouterClient,
    wheel_size: &WheelSizeClient,
    make: &str,
    model: &str,
    year: i32,
    db_conn: &db::ConnectionPool,
) -> Result<AiFitment, errors::AiFitmentError> {
    let (make, model) = (make.trim(), model.trim());
    if make.is_empty() || model.is_empty() {
        return Err(errors::AiFitmentError::MissingVehicle);
    }
    let key = cache_key(make, model, year);
    match AiFitmentCache::select::<AiFitment>(&key, db_conn).await {
        Ok(Some(cached)) => {
            return Ok(AiFitment {
                source: SOURCE_CACHE.to_owned(),
                ..cached
            })
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, %key, "AI fitment cache lookup failed"),
    }

    let reply = openrouter
        .complete(
            FITMENT_SYSTEM_PROMPT,
            &fitment_prompt(make, model, year),
            CompletionOptions {
                temperature: Some(0.0),
                max_tokens: Some(300),
            },
        )
        .await?;
    let candidates = parse_fitment_reply(&reply);
    let local = local_sizes(make, model, year, db_conn).await?;

    let mut verdicts = if candidates.is_empty() {
        tracing::info!(make, model, year, "AI returned no sizes, falling back to local fitments");
        let mut fallback: Vec<TyreSize> = local.iter().copied().collect();
        fallback.sort_unstable();
        verify(&fallback, &local, &HashSet::new())
    } else {
        let remote = wheel_size_sizes(wheel_size, make, model, year).await;
        verify(&candidates, &local, &remote)
    };
    sort_verdicts(&mut verdicts);

    let result = AiFitment {
        sizes: verdicts,
        source: SOURCE_AI.to_owned(),
        model_used: openrouter.model().to_owned(),
    };
    if let Err(e) = AiFitmentCache::upsert(&key, &result, db_conn).await {
        tracing::warn!(error = %e, %key, "Failed to cache AI fitment");
    }
    Ok(result)
}

pub mod errors {
    use thiserror::Error;

    use crate::{clients::openrouter::errors::OpenRouterError, db::errors::DatabaseError};

    #[derive(Error, Debug)]
    pub enum AiSearchError {
        #[error(transparent)]
        Upstream(#[from] OpenRouterError),
        #[error("Query is required")]
        EmptyQuery,
        #[error("Missing make, model, or year")]
        MissingVehicle,
        #[error("Invalid AI output")]
        InvalidOutput,
    }

    #[derive(Error, Debug)]
    pub enum AiFitmentError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        Upstream(#[from] OpenRouterError),
        #[error("Missing make/model/year")]
        MissingVehicle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(text: &str) -> TyreSize {
        TyreSize::parse(text).expect("valid size")
    }

    #[test]
    fn search_reply_is_formatted_for_display() {
        let raw = "```json\n{\"sizes\":[{\"size\":\"205/65 R16\",\"type\":\"Factory Fitment\"},{\"size\":\"225/55R17\"}]}\n```";
        assert_eq!(
            parse_search_reply(raw).expect("parses"),
            vec!["205/65R16 (Factory Fitment)", "225/55R17 (Unknown)"]
        );
    }

    #[test]
    fn search_sentinel_and_garbage_are_errors() {
        assert!(matches!(
            parse_search_reply("ERROR_MISSING_MMY"),
            Err(errors::AiSearchError::MissingVehicle)
        ));
        assert!(matches!(
            parse_search_reply("I think a Creta takes 215/60R17"),
            Err(errors::AiSearchError::InvalidOutput)
        ));
        assert!(matches!(
            parse_search_reply("{\"tyres\": []}"),
            Err(errors::AiSearchError::InvalidOutput)
        ));
    }

    #[test]
    fn fitment_reply_accepts_json_array() {
        assert_eq!(
            parse_fitment_reply("```json\n[\"195/65R15\", \"205/60 r16\", \"195/65R15\", 7]\n```"),
            vec![size("195/65R15"), size("205/60R16")]
        );
    }

    #[test]
    fn fitment_reply_falls_back_to_text_extraction() {
        assert_eq!(
            parse_fitment_reply("Common sizes are 185/65R15 and 195/55R16."),
            vec![size("185/65R15"), size("195/55R16")]
        );
        assert!(parse_fitment_reply("no idea").is_empty());
    }

    #[test]
    fn cache_keys_are_lowercase() {
        assert_eq!(cache_key(" Hyundai", "Creta ", 2021), "hyundai|creta|2021");
    }

    #[test]
    fn verification_prefers_local_then_remote() {
        let local = HashSet::from([size("215/60R17")]);
        let remote = HashSet::from([size("215/60R17"), size("205/65R16")]);
        let verdicts = verify(
            &[size("215/60R17"), size("205/65R16"), size("225/45R18")],
            &local,
            &remote,
        );
        assert_eq!(verdicts[0].verified_by, Some(VerifiedBy::LocalFitment));
        assert_eq!(verdicts[1].verified_by, Some(VerifiedBy::WheelSizeApi));
        assert!(!verdicts[2].verified);
        assert_eq!(verdicts[2].verified_by, None);
    }

    #[test]
    fn verdicts_sort_verified_first_then_larger_rims() {
        let verdict = |size: &str, verified: bool| SizeVerdict {
            size: size.to_owned(),
            verified,
            verified_by: verified.then_some(VerifiedBy::LocalFitment),
        };
        let mut verdicts = vec![
            verdict("225/45R18", false),
            verdict("205/65R16", true),
            verdict("215/60R17", true),
            verdict("195/65R15", false),
        ];
        sort_verdicts(&mut verdicts);
        let order: Vec<&str> = verdicts.iter().map(|v| v.size.as_str()).collect();
        assert_eq!(order, vec!["215/60R17", "205/65R16", "225/45R18", "195/65R15"]);
    }

    #[test]
    fn verified_by_wire_names() {
        assert_eq!(
            serde_json::to_value(VerifiedBy::WheelSizeApi).expect("serializes"),
            "wheel-size-api"
        );
    }
}
