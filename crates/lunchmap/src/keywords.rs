//! Deriving the provider keyword set from a menu name.
//!
//! A single keyword search does not surface every relevant place, so one
//! logical search fans out over the base menu name plus a few restaurant
//! synonyms. Which synonyms is policy, not contract.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing qualifier such as `(돼지)` or `[매운맛]`.
static TRAILING_QUALIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[(\[（][^)\]）]*[)\]）]\s*$").expect("valid qualifier pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Reduce a menu label to the name worth searching for.
///
/// ```rust
/// use lunchmap::keywords::base_menu;
///
/// assert_eq!(base_menu("  김치찌개 (돼지) "), "김치찌개");
/// assert_eq!(base_menu("순두부   찌개"), "순두부 찌개");
/// ```
pub fn base_menu(menu: &str) -> String {
    let collapsed = WHITESPACE.replace_all(menu.trim(), " ").into_owned();
    let stripped = TRAILING_QUALIFIER.replace(&collapsed, "").trim().to_string();
    if stripped.is_empty() { collapsed } else { stripped }
}

/// How a menu name expands into provider keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPolicy {
    /// Appended to the base menu name, e.g. `"김치찌개 맛집"`
    pub suffixes: Vec<String>,
    /// Issued verbatim regardless of the menu
    pub fallback_terms: Vec<String>,
}

impl Default for KeywordPolicy {
    fn default() -> Self {
        Self {
            suffixes: vec!["맛집".to_string(), "음식점".to_string()],
            fallback_terms: Vec::new(),
        }
    }
}

impl KeywordPolicy {
    /// Search for the menu name alone.
    pub fn menu_only() -> Self {
        Self {
            suffixes: Vec::new(),
            fallback_terms: Vec::new(),
        }
    }

    /// Menu name plus a "nearby" variant.
    pub fn nearby() -> Self {
        Self {
            suffixes: vec!["근처".to_string()],
            fallback_terms: Vec::new(),
        }
    }

    /// Default synonyms plus a generic restaurant query, for sparse areas.
    pub fn broad() -> Self {
        Self {
            fallback_terms: vec!["음식점".to_string()],
            ..Self::default()
        }
    }

    /// Keywords to issue for `menu`, in issue order, without duplicates.
    ///
    /// Empty when the menu has no searchable name.
    pub fn keywords_for(&self, menu: &str) -> Vec<String> {
        let base = base_menu(menu);
        if base.is_empty() {
            return Vec::new();
        }

        std::iter::once(base.clone())
            .chain(
                self.suffixes
                    .iter()
                    .map(|suffix| suffix.trim())
                    .filter(|suffix| !suffix.is_empty())
                    .map(|suffix| format!("{base} {suffix}")),
            )
            .chain(
                self.fallback_terms
                    .iter()
                    .map(|term| term.trim().to_string())
                    .filter(|term| !term.is_empty()),
            )
            .unique()
            .collect()
    }
}
