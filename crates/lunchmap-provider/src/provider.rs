//! The places-provider contract consumed by the search core.

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;

use crate::{Coordinate, RawPlace};

/// Largest page the Kakao keyword search serves.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Kakao category group code for restaurants.
pub const RESTAURANT_CATEGORY: &str = "FD6";

/// Result ordering requested from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortBy {
    #[default]
    Distance,
    Accuracy,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Accuracy => "accuracy",
        }
    }
}

/// One keyword query against the provider, centred on an origin.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSearch {
    pub keyword: String,
    pub origin: Coordinate,
    pub radius_meters: u32,
    pub page: u32,
    pub size: u32,
    pub sort_by: SortBy,
    pub category_group_code: Option<String>,
}

impl KeywordSearch {
    pub fn new(keyword: impl Into<String>, origin: Coordinate, radius_meters: u32) -> Self {
        Self {
            keyword: keyword.into(),
            origin,
            radius_meters,
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            sort_by: SortBy::default(),
            category_group_code: None,
        }
    }

    #[must_use]
    pub const fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub const fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    #[must_use]
    pub fn category(mut self, code: Option<impl Into<String>>) -> Self {
        self.category_group_code = code.map(Into::into);
        self
    }
}

/// Outcome of a single keyword query.
///
/// `Ok` and `ZeroResult` are successes; every other variant is a failed
/// query.
#[derive(Debug, Clone)]
pub enum ProviderStatus {
    Ok(Vec<RawPlace>),
    ZeroResult,
    ErrorResponse(String),
    InvalidParams(String),
    Unknown(String),
}

impl ProviderStatus {
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::Ok(_) | Self::ZeroResult)
    }

    /// The provider's status code name.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Ok(_) => "OK",
            Self::ZeroResult => "ZERO_RESULT",
            Self::ErrorResponse(_) => "ERROR_RESPONSE",
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(places) => write!(f, "OK ({} places)", places.len()),
            Self::ZeroResult => write!(f, "ZERO_RESULT"),
            Self::ErrorResponse(detail) | Self::InvalidParams(detail) | Self::Unknown(detail) => {
                write!(f, "{}: {detail}", self.code())
            }
        }
    }
}

/// An asynchronous places search service.
///
/// Implementations must be safe to call concurrently; the core issues one
/// call per keyword and joins them. No ordering is assumed between the
/// completions of concurrent calls.
pub trait PlacesProvider: Send + Sync + 'static {
    /// Run one keyword query.
    fn keyword_search(&self, request: KeywordSearch) -> BoxFuture<'_, ProviderStatus>;

    /// Whether the provider finished its own initialisation.
    ///
    /// Polled by [`crate::ReadinessGate`]; providers without an
    /// initialisation phase keep the default.
    fn is_ready(&self) -> bool {
        true
    }
}

impl<P: PlacesProvider + ?Sized> PlacesProvider for Arc<P> {
    fn keyword_search(&self, request: KeywordSearch) -> BoxFuture<'_, ProviderStatus> {
        (**self).keyword_search(request)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}
