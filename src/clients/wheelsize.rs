//! Client for the Wheel-Size vehicle fitment API (v2).
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize};
use tracing::instrument;
use url::Url;

#[derive(Clone)]
pub struct WheelSizeClient {
    inner: Arc<WheelSizeClientInner>,
}

struct WheelSizeClientInner {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Wheel-Size answers either `{"data": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

/// A model generation with its production years.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Generation {
    #[serde(default)]
    pub start: Option<i32>,
    #[serde(default)]
    pub end: Option<i32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TireSpec {
    #[serde(default)]
    pub tire_full: Option<String>,
    #[serde(default)]
    pub tire: Option<String>,
}

impl TireSpec {
    /// The most complete tyre description available.
    pub fn text(&self) -> Option<&str> {
        self.tire_full
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .or_else(|| self.tire.as_deref().filter(|text| !text.trim().is_empty()))
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct WheelSetup {
    #[serde(default)]
    pub front: Option<TireSpec>,
    #[serde(default)]
    pub rear: Option<TireSpec>,
}

impl WheelSetup {
    fn tyre_texts(&self) -> impl Iterator<Item = &str> {
        [self.front.as_ref(), self.rear.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(TireSpec::text)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Power {
    #[serde(default)]
    pub hp: Option<serde_json::Number>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Engine {
    #[serde(default)]
    pub fuel: Option<String>,
    #[serde(default)]
    pub power: Option<Power>,
}

/// A vehicle modification (trim/engine variant). `search/by_model` returns
/// the same shape with the wheel data filled in.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Modification {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trim: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub engine: Option<Engine>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(flatten)]
    pub axles: WheelSetup,
    #[serde(default)]
    pub wheels: Vec<WheelSetup>,
}

impl Modification {
    /// Every tyre description attached to this record, top-level axles first.
    pub fn tyre_texts(&self) -> Vec<&str> {
        self.axles
            .tyre_texts()
            .chain(self.wheels.iter().flat_map(WheelSetup::tyre_texts))
            .collect()
    }
}

impl WheelSizeClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            inner: Arc::new(WheelSizeClientInner {
                http,
                base_url: base_url.trim_end_matches('/').to_owned(),
                api_key,
            }),
        }
    }

    fn endpoint_url(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Url, errors::WheelSizeError> {
        let api_key = self
            .inner
            .api_key
            .as_deref()
            .ok_or(errors::WheelSizeError::NotConfigured)?;
        let mut url = Url::parse(&format!("{}/{endpoint}/", self.inner.base_url))?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("user_key", api_key);
        Ok(url)
    }

    #[instrument(skip(self), err)]
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, errors::WheelSizeError> {
        let url = self.endpoint_url(endpoint, params)?;
        Ok(self
            .inner
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?)
    }

    /// Raw `makes` listing, passed through to clients.
    pub async fn makes(&self) -> Result<serde_json::Value, errors::WheelSizeError> {
        self.get("makes", &[]).await
    }

    /// Raw `models` listing for a make.
    pub async fn models(&self, make: &str) -> Result<serde_json::Value, errors::WheelSizeError> {
        self.get("models", &[("make", make)]).await
    }

    /// Raw `generations` listing for a make and model.
    pub async fn generations_raw(
        &self,
        make: &str,
        model: &str,
    ) -> Result<serde_json::Value, errors::WheelSizeError> {
        self.get("generations", &[("make", make), ("model", model)])
            .await
    }

    pub async fn generations(
        &self,
        make: &str,
        model: &str,
    ) -> Result<Vec<Generation>, errors::WheelSizeError> {
        let listing: Listing<Generation> = self
            .get("generations", &[("make", make), ("model", model)])
            .await?;
        Ok(listing.into_vec())
    }

    pub async fn modifications(
        &self,
        make: &str,
        model: &str,
        year: i32,
    ) -> Result<Vec<Modification>, errors::WheelSizeError> {
        let year = year.to_string();
        let listing: Listing<Modification> = self
            .get(
                "modifications",
                &[("make", make), ("model", model), ("year", &year)],
            )
            .await?;
        Ok(listing.into_vec())
    }

    pub async fn search_by_model(
        &self,
        make: &str,
        model: &str,
        year: i32,
        modification: &str,
    ) -> Result<Vec<Modification>, errors::WheelSizeError> {
        let year = year.to_string();
        let listing: Listing<Modification> = self
            .get(
                "search/by_model",
                &[
                    ("make", make),
                    ("model", model),
                    ("year", &year),
                    ("modification", modification),
                ],
            )
            .await?;
        Ok(listing.into_vec())
    }
}

pub mod errors {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum WheelSizeError {
        #[error("WHEELSIZE_API_KEY is not configured")]
        NotConfigured,
        #[error(transparent)]
        InvalidUrl(#[from] url::ParseError),
        #[error(transparent)]
        Http(#[from] reqwest::Error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_accepts_wrapped_and_bare_arrays() {
        let wrapped: Listing<Generation> =
            serde_json::from_str(r#"{"data":[{"start":2014,"end":2017}]}"#).expect("parses");
        let bare: Listing<Generation> =
            serde_json::from_str(r#"[{"start":2018,"end":null}]"#).expect("parses");
        assert_eq!(wrapped.into_vec()[0].end, Some(2017));
        assert_eq!(bare.into_vec()[0].end, None);
    }

    #[test]
    fn modification_collects_tyre_texts() {
        let raw = r#"{
            "name": "1.2 VVT",
            "slug": "12-vvt",
            "engine": {"fuel": "Petrol", "power": {"hp": 82}},
            "front": {"tire_full": "185/65R15 88H", "tire": "185/65R15"},
            "rear": {"tire_full": "", "tire": "185/65R15"},
            "wheels": [{"front": {"tire": "195/55R16"}, "rear": null}]
        }"#;
        let modification: Modification = serde_json::from_str(raw).expect("parses");
        assert_eq!(
            modification.tyre_texts(),
            vec!["185/65R15 88H", "185/65R15", "195/55R16"]
        );
        let hp = modification
            .engine
            .and_then(|engine| engine.power)
            .and_then(|power| power.hp);
        assert_eq!(hp.map(|hp| hp.to_string()).as_deref(), Some("82"));
    }

    #[test]
    fn endpoint_urls_carry_the_key_and_encode_params() {
        let client = WheelSizeClient::new(
            reqwest::Client::new(),
            "https://api.wheel-size.com/v2/",
            Some(String::from("k3y")),
        );
        let url = client
            .endpoint_url("modifications", &[("make", "suzuki"), ("model", "alto 800")])
            .expect("valid url");
        assert_eq!(
            url.as_str(),
            "https://api.wheel-size.com/v2/modifications/?make=suzuki&model=alto+800&user_key=k3y"
        );
    }

    #[test]
    fn missing_key_is_reported() {
        let client = WheelSizeClient::new(reqwest::Client::new(), "https://example.com", None);
        assert!(matches!(
            client.endpoint_url("makes", &[]),
            Err(errors::WheelSizeError::NotConfigured)
        ));
    }
}
