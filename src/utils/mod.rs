//! Project-specific utilities live here.

pub mod timestamp;
pub mod validation;

use std::collections::HashSet;
use std::hash::Hash;

use anyhow::anyhow;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};

/// Case-insensitive comparison key for titles and genre names.
pub fn normalize_key(value: &str) -> String {
    fold_case(value.trim())
}

/// Unicode lowercase, used for every stored search column.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// `LIKE` pattern matching `needle` anywhere in a column.
///
/// `%`, `_` and `\` are escaped; pair the pattern with `ESCAPE '\'`.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Fresh identity for a new row (time-ordered).
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// Parse a client-supplied identifier.
pub fn parse_id(raw: &str) -> CatalogResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| CatalogError::InvalidId(raw.to_string()))
}

/// Parse an identifier read back from the store.
pub(crate) fn decode_id(raw: &str) -> CatalogResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| CatalogError::Internal(anyhow!("stored id '{}' is not a uuid: {}", raw, e)))
}

/// Drop repeated items, keeping the first occurrence order.
pub fn dedupe<T: Clone + Eq + Hash>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| seen.insert((*item).clone()))
        .cloned()
        .collect()
}

/// Keeps "field absent" (`None`) apart from "field is null" (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
