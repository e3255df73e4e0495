//! Dimension contexts.
//!
//! A context maps each dimension name to the preset values selected for it.
//! The first preset is the primary value, the rest are fallbacks
//! (e.g. `language:de_CH,de`).
//!
//! The canonical string form sorts dimensions by name and keeps preset order:
//! `country:ch|language:de_CH,de`. It is used for logging and for the stable
//! ordering of replication targets, so dimension names and presets may not
//! contain the separator characters.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const DIMENSION_SEPARATOR: char = '|';
const NAME_SEPARATOR: char = ':';
const PRESET_SEPARATOR: char = ',';

/// An immutable coordinate in dimension space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct DimensionContext {
    dimensions: BTreeMap<String, Vec<String>>,
}

impl DimensionContext {
    /// The context with no dimensions at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a context from `(dimension, presets)` pairs.
    ///
    /// Fails if a name or preset is empty or contains a separator, if a
    /// dimension has no presets, or if a dimension appears twice.
    pub fn new<I, N, P, V>(dimensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, presets) in dimensions {
            let name = name.into();
            let presets: Vec<String> = presets.into_iter().map(Into::into).collect();
            if map.contains_key(&name) {
                return Err(Error::InvalidContext(format!("duplicate dimension '{name}'")));
            }
            map.insert(name, presets);
        }
        Self::try_from(map)
    }

    /// Shorthand for a context with one dimension and one preset.
    pub fn single(dimension: impl Into<String>, preset: impl Into<String>) -> Result<Self> {
        Self::new([(dimension.into(), [preset.into()])])
    }

    /// Parses the canonical string form (`name:p1,p2|name2:p1`).
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::empty());
        }

        let mut pairs = Vec::new();
        for segment in s.split(DIMENSION_SEPARATOR) {
            let (name, presets) = segment.split_once(NAME_SEPARATOR).ok_or_else(|| {
                Error::InvalidContext(format!("segment '{segment}' lacks a ':' separator"))
            })?;
            let presets: Vec<&str> = presets.split(PRESET_SEPARATOR).collect();
            pairs.push((name, presets));
        }
        Self::new(pairs)
    }

    /// Returns the presets for a dimension.
    pub fn presets(&self, dimension: &str) -> Option<&[String]> {
        self.dimensions.get(dimension).map(Vec::as_slice)
    }

    /// Returns the primary (first) preset for a dimension.
    pub fn primary(&self, dimension: &str) -> Option<&str> {
        self.presets(dimension)
            .and_then(|p| p.first())
            .map(String::as_str)
    }

    /// Iterates dimensions in name order.
    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.dimensions
            .iter()
            .map(|(name, presets)| (name.as_str(), presets.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Renders the canonical string form.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// The bytes of the canonical form, produced lazily.
    fn canonical_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.dimensions
            .iter()
            .enumerate()
            .flat_map(|(i, (name, presets))| {
                let separator = (i > 0).then_some(DIMENSION_SEPARATOR as u8);
                let presets = presets.iter().enumerate().flat_map(|(j, preset)| {
                    let separator = (j > 0).then_some(PRESET_SEPARATOR as u8);
                    separator.into_iter().chain(preset.bytes())
                });
                separator
                    .into_iter()
                    .chain(name.bytes())
                    .chain(std::iter::once(NAME_SEPARATOR as u8))
                    .chain(presets)
            })
    }
}

fn validate_token(kind: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::InvalidContext(format!("empty {kind}")));
    }
    if token.contains([DIMENSION_SEPARATOR, NAME_SEPARATOR, PRESET_SEPARATOR]) {
        return Err(Error::InvalidContext(format!(
            "{kind} '{token}' contains a reserved separator"
        )));
    }
    Ok(())
}

impl TryFrom<BTreeMap<String, Vec<String>>> for DimensionContext {
    type Error = Error;

    fn try_from(dimensions: BTreeMap<String, Vec<String>>) -> Result<Self> {
        for (name, presets) in &dimensions {
            validate_token("dimension name", name)?;
            if presets.is_empty() {
                return Err(Error::InvalidContext(format!(
                    "dimension '{name}' has no presets"
                )));
            }
            for preset in presets {
                validate_token("preset", preset)?;
            }
        }
        Ok(Self { dimensions })
    }
}

impl From<DimensionContext> for BTreeMap<String, Vec<String>> {
    fn from(context: DimensionContext) -> Self {
        context.dimensions
    }
}

impl fmt::Display for DimensionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, presets)) in self.dimensions.iter().enumerate() {
            if i > 0 {
                write!(f, "{DIMENSION_SEPARATOR}")?;
            }
            write!(f, "{name}{NAME_SEPARATOR}{}", presets.join(","))?;
        }
        Ok(())
    }
}

impl FromStr for DimensionContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// Ordered by canonical form, compared byte by byte without rendering it.
// Separators are rejected on construction, so the canonical form is
// injective and this agrees with `Eq`.
impl Ord for DimensionContext {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_bytes().cmp(other.canonical_bytes())
    }
}

impl PartialOrd for DimensionContext {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
