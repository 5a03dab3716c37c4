//! Kakao Local REST keyword search.
//!
//! Implements [`PlacesProvider`] over
//! `GET /v2/local/search/keyword.json`. The REST API needs no client-side
//! initialisation, so the provider is always ready once constructed.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{KeywordSearch, PlacesProvider, ProviderError, ProviderStatus, RawPlace, Result};

pub const API_KEY_ENV: &str = "KAKAO_REST_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://dapi.kakao.com";
const KEYWORD_PATH: &str = "/v2/local/search/keyword.json";

/// Provider limits for the keyword endpoint.
pub const MAX_RADIUS_METERS: u32 = 20_000;
pub const MAX_PAGE: u32 = 45;
pub const MAX_SIZE: u32 = 15;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct KeywordResponse {
    documents: Vec<RawPlace>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    total_count: u64,
    is_end: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    message: Option<String>,
}

/// Kakao Local places provider.
#[derive(Debug, Clone)]
pub struct KakaoPlaces {
    client: Client,
    api_key: String,
    base_url: String,
}

impl KakaoPlaces {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey(API_KEY_ENV));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Reads the REST API key from `KAKAO_REST_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| ProviderError::MissingApiKey(API_KEY_ENV))?;
        Self::new(key)
    }

    /// Point the client at a different host, e.g. a local mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[instrument(name = "Kakao keyword search", level = "debug", skip_all, fields(keyword = %request.keyword))]
    async fn search(&self, request: KeywordSearch) -> ProviderStatus {
        let keyword = request.keyword.trim();
        if keyword.is_empty() {
            return ProviderStatus::InvalidParams("empty keyword".to_string());
        }

        let url = format!("{}{KEYWORD_PATH}", self.base_url);
        let response = match self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("KakaoAK {}", self.api_key))
            .query(&query_params(&request))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Kakao request failed before a response arrived");
                return ProviderStatus::Unknown(err.to_string());
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify_response(status, &body),
            Err(err) => ProviderStatus::Unknown(format!("failed to read response body: {err}")),
        }
    }
}

impl PlacesProvider for KakaoPlaces {
    fn keyword_search(&self, request: KeywordSearch) -> BoxFuture<'_, ProviderStatus> {
        Box::pin(self.search(request))
    }
}

fn query_params(request: &KeywordSearch) -> Vec<(&'static str, String)> {
    let radius = request.radius_meters.min(MAX_RADIUS_METERS);
    if radius < request.radius_meters {
        debug!(
            requested = request.radius_meters,
            radius, "Clamping radius to provider maximum"
        );
    }

    let mut params = vec![
        ("query", request.keyword.trim().to_string()),
        ("x", request.origin.longitude.to_string()),
        ("y", request.origin.latitude.to_string()),
        ("radius", radius.to_string()),
        ("page", request.page.clamp(1, MAX_PAGE).to_string()),
        ("size", request.size.clamp(1, MAX_SIZE).to_string()),
        ("sort", request.sort_by.as_str().to_string()),
    ];
    if let Some(code) = &request.category_group_code {
        params.push(("category_group_code", code.clone()));
    }
    params
}

fn classify_response(status: StatusCode, body: &str) -> ProviderStatus {
    if status.is_success() {
        return match serde_json::from_str::<KeywordResponse>(body) {
            Ok(parsed) if parsed.documents.is_empty() => ProviderStatus::ZeroResult,
            Ok(parsed) => {
                if let Some(meta) = &parsed.meta {
                    debug!(
                        total = meta.total_count,
                        is_end = meta.is_end,
                        returned = parsed.documents.len(),
                        "Kakao keyword search page"
                    );
                }
                ProviderStatus::Ok(parsed.documents)
            }
            Err(err) => ProviderStatus::Unknown(format!("undecodable response: {err}")),
        };
    }

    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| match (e.error_type, e.message) {
            (Some(kind), Some(message)) => Some(format!("{kind}: {message}")),
            (kind, message) => kind.or(message),
        })
        .unwrap_or_else(|| status.to_string());

    if status == StatusCode::BAD_REQUEST {
        ProviderStatus::InvalidParams(detail)
    } else {
        ProviderStatus::ErrorResponse(format!("{status}: {detail}"))
    }
}
