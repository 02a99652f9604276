use std::sync::Arc;

use itertools::Itertools;
use url::Url;

use crate::{
    array::{ArrayIndices, Block, MalformedCompressionError},
    array_subset::ArraySubset,
};

use super::instructions::{AggregationInstructions, FragmentInstruction};

/// The source of the values of a fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum FragmentSource {
    /// A constant value, [`None`] for missing values.
    Value(Option<f64>),
    /// A variable stored in a file.
    File {
        /// Alternative locations of the file, in order of preference.
        locations: Vec<Url>,
        /// The variable within the file.
        identifier: String,
    },
    /// Fragment values held in memory.
    Memory(Arc<Block>),
}

impl std::fmt::Display for FragmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(Some(value)) => write!(f, "value {value}"),
            Self::Value(None) => write!(f, "missing value"),
            Self::File {
                locations,
                identifier,
            } => write!(f, "{identifier} in {}", locations.iter().join(" or ")),
            Self::Memory(_) => write!(f, "memory"),
        }
    }
}

impl FragmentSource {
    /// Resolve the source of a fragment instruction.
    ///
    /// Substitutions are applied to each location, and relative locations are resolved against `base`.
    ///
    /// # Errors
    /// Returns [`MalformedCompressionError::InvalidAggregation`] if a location is not a valid URL, or is relative without a `base`.
    pub(super) fn new(
        instruction: &FragmentInstruction,
        instructions: &AggregationInstructions,
        base: Option<&Url>,
    ) -> Result<Self, MalformedCompressionError> {
        match instruction {
            FragmentInstruction::Value { value } => Ok(Self::Value(*value)),
            FragmentInstruction::File { uris, identifier } => {
                if uris.is_empty() {
                    return Err(MalformedCompressionError::InvalidAggregation(format!(
                        "fragment {identifier} has no locations"
                    )));
                }
                let locations = uris
                    .iter()
                    .map(|uri| resolve_location(&instructions.substitute(uri), base))
                    .collect::<Result<_, _>>()?;
                Ok(Self::File {
                    locations,
                    identifier: identifier.clone(),
                })
            }
        }
    }
}

/// Resolve a fragment location, relative to `base` if it is a relative reference.
fn resolve_location(uri: &str, base: Option<&Url>) -> Result<Url, MalformedCompressionError> {
    let invalid = |err: url::ParseError| {
        MalformedCompressionError::InvalidAggregation(format!("fragment location {uri}: {err}"))
    };
    match (Url::parse(uri), base) {
        (Ok(url), _) => Ok(url),
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => {
            base.join(uri).map_err(invalid)
        }
        (Err(err), _) => Err(invalid(err)),
    }
}

/// A fragment of an aggregated array.
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentDescriptor {
    index: ArrayIndices,
    region: ArraySubset,
    source: FragmentSource,
}

impl FragmentDescriptor {
    pub(super) fn new(index: ArrayIndices, region: ArraySubset, source: FragmentSource) -> Self {
        Self {
            index,
            region,
            source,
        }
    }

    /// The position of the fragment in the fragment grid.
    #[must_use]
    pub fn index(&self) -> &[u64] {
        &self.index
    }

    /// The region of the aggregated array covered by the fragment.
    #[must_use]
    pub fn region(&self) -> &ArraySubset {
        &self.region
    }

    /// The source of the fragment values.
    #[must_use]
    pub fn source(&self) -> &FragmentSource {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn resolve_locations() {
        let base = Url::parse("file:///data/aggregation.json").unwrap();
        assert_eq!(
            resolve_location("fragments/a.json", Some(&base))
                .unwrap()
                .as_str(),
            "file:///data/fragments/a.json"
        );
        assert_eq!(
            resolve_location("https://example.com/a.json", Some(&base))
                .unwrap()
                .as_str(),
            "https://example.com/a.json"
        );
        assert!(matches!(
            resolve_location("a.json", None),
            Err(MalformedCompressionError::InvalidAggregation(_))
        ));
    }

    #[test]
    fn fragment_source() {
        let instructions = AggregationInstructions {
            shape: vec![vec![1]],
            fragments: vec![],
            substitutions: BTreeMap::from([("base".to_string(), "file:///data/".to_string())]),
        };
        let source = FragmentSource::new(
            &FragmentInstruction::File {
                uris: vec!["${base}a.json".to_string(), "b.json".to_string()],
                identifier: "tas".to_string(),
            },
            &instructions,
            Some(&Url::parse("file:///mirror/aggregation.json").unwrap()),
        )
        .unwrap();
        assert_eq!(
            source.to_string(),
            "tas in file:///data/a.json or file:///mirror/b.json"
        );
        assert_eq!(
            FragmentSource::new(
                &FragmentInstruction::Value { value: None },
                &instructions,
                None
            )
            .unwrap(),
            FragmentSource::Value(None)
        );
    }
}
