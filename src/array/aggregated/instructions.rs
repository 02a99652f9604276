//! Aggregation instructions.
//!
//! An aggregation instruction table lists the fragments of an aggregated array:
//! ```json
//! {
//!   "shape": [[2, 2], [3]],
//!   "fragments": [
//!     { "uris": ["${base}a.json", "https://mirror.example.com/a.json"], "identifier": "tas" },
//!     { "value": 273.15 }
//!   ],
//!   "substitutions": { "base": "file:///data/" }
//! }
//! ```
//! `shape` holds the fragment sizes along each dimension and `fragments` the fragments of the fragment grid in C order.
//! A fragment is either a file fragment, an ordered list of alternative locations and the identifier of the variable within them, or a constant `value` (`null` for missing values).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::array::MalformedCompressionError;

/// A fragment instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FragmentInstruction {
    /// A fragment stored in a file.
    File {
        /// Alternative locations of the file, in order of preference.
        uris: Vec<String>,
        /// The variable within the file.
        identifier: String,
    },
    /// A fragment with a constant value, [`None`] for missing values.
    Value {
        /// The value.
        value: Option<f64>,
    },
}

/// An aggregation instruction table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregationInstructions {
    /// The fragment sizes along each dimension.
    pub shape: Vec<Vec<u64>>,
    /// The fragments, in C order over the fragment grid.
    pub fragments: Vec<FragmentInstruction>,
    /// Substitutions applied to fragment locations, keyed by name.
    #[serde(default)]
    pub substitutions: BTreeMap<String, String>,
}

impl AggregationInstructions {
    /// Parse JSON aggregation instructions.
    ///
    /// # Errors
    /// Returns [`MalformedCompressionError::InvalidAggregation`] if `json` is not a valid instruction table.
    pub fn from_json(json: &str) -> Result<Self, MalformedCompressionError> {
        serde_json::from_str(json)
            .map_err(|err| MalformedCompressionError::InvalidAggregation(err.to_string()))
    }

    /// Substitute every `${name}` of `uri`.
    #[must_use]
    pub fn substitute(&self, uri: &str) -> String {
        self.substitutions
            .iter()
            .fold(uri.to_string(), |uri, (name, value)| {
                uri.replace(&format!("${{{}}}", bare_name(name)), value)
            })
    }
}

fn bare_name(name: &str) -> &str {
    name.strip_prefix("${")
        .and_then(|name| name.strip_suffix('}'))
        .unwrap_or(name)
}

/// Parse substitutions from their attribute form, `"${name}: value ${other}: value"`.
///
/// # Errors
/// Returns [`MalformedCompressionError::InvalidAggregation`] if the attribute is not a sequence of `${name}: value` pairs.
pub fn parse_substitutions(
    attribute: &str,
) -> Result<BTreeMap<String, String>, MalformedCompressionError> {
    let invalid = || {
        MalformedCompressionError::InvalidAggregation(format!(
            "invalid substitutions attribute {attribute:?}"
        ))
    };
    let mut pairs = attribute.split("${");
    if !pairs.next().is_some_and(|prefix| prefix.trim().is_empty()) {
        return Err(invalid());
    }
    pairs
        .map(|pair| -> Result<_, MalformedCompressionError> {
            let (name, value) = pair.split_once("}:").ok_or_else(invalid)?;
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return Err(invalid());
            }
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}
