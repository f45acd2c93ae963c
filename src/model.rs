//! Plain-data dimension model.
//!
//! The metadata parser that produces these values from PX keyword entries
//! is not part of this crate. The types here carry only what the indexer and
//! the transforms need: dimension codes, ordered value codes, and enough
//! descriptive data to rebuild metadata for a transformed matrix.

use crate::error::{PxError, Result};
use rustc_hash::FxHashSet;

/// Role of a dimension in the table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DimensionKind {
    /// The content (measure) dimension; each value may carry its own unit.
    Content { units: Vec<String> },
    /// A time dimension with its interval code (`A` annual, `M` monthly, ...).
    Time { interval: String },
    Nominal,
    Ordinal,
    #[default]
    Other,
}

/// One value of a dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionValue {
    pub code: String,
    pub name: String,
}

impl DimensionValue {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A full dimension descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub code: String,
    pub name: String,
    pub kind: DimensionKind,
    pub values: Vec<DimensionValue>,
}

impl Dimension {
    /// Build a dimension whose value names equal their codes.
    pub fn new<I, S>(code: impl Into<String>, value_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let code = code.into();
        Self {
            name: code.clone(),
            code,
            kind: DimensionKind::Other,
            values: value_codes
                .into_iter()
                .map(|c| {
                    let c = c.into();
                    DimensionValue::new(c.clone(), c)
                })
                .collect(),
        }
    }

    pub fn with_kind(mut self, kind: DimensionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Position of a value code in this dimension.
    pub fn value_index(&self, code: &str) -> Option<usize> {
        self.values.iter().position(|v| v.code == code)
    }

    /// Project onto the selection shape.
    pub fn to_map(&self) -> DimensionMap {
        DimensionMap {
            code: self.code.clone(),
            value_codes: self.values.iter().map(|v| v.code.clone()).collect(),
        }
    }
}

/// Selection of one dimension: its code and an ordered list of value codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionMap {
    pub code: String,
    pub value_codes: Vec<String>,
}

impl DimensionMap {
    pub fn new<I, S>(code: impl Into<String>, value_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code: code.into(),
            value_codes: value_codes.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.value_codes.len()
    }
}

/// An ordered selection over every dimension of a matrix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatrixMap {
    pub dimensions: Vec<DimensionMap>,
}

impl MatrixMap {
    pub fn new(dimensions: Vec<DimensionMap>) -> Self {
        Self { dimensions }
    }

    pub fn dimension(&self, code: &str) -> Option<&DimensionMap> {
        self.dimensions.iter().find(|d| d.code == code)
    }

    pub fn dimension_codes(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.code.as_str())
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.dimensions.iter().map(DimensionMap::size).collect()
    }

    /// Number of cells addressed by this selection.
    pub fn data_length(&self) -> usize {
        self.dimensions.iter().map(DimensionMap::size).product()
    }
}

/// Full metadata of a matrix: every dimension, in storage order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatrixMetadata {
    pub dimensions: Vec<Dimension>,
}

impl MatrixMetadata {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self { dimensions }
    }

    pub fn dimension(&self, code: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.code == code)
    }

    pub fn dimension_index(&self, code: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.code == code)
    }

    pub fn dimension_codes(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.code.as_str())
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::size).collect()
    }

    pub fn data_length(&self) -> usize {
        self.dimensions.iter().map(Dimension::size).product()
    }

    pub fn to_map(&self) -> MatrixMap {
        MatrixMap {
            dimensions: self.dimensions.iter().map(Dimension::to_map).collect(),
        }
    }

    /// Metadata of a matrix selected from this one.
    ///
    /// Dimensions and values follow the selection's order; names and kinds
    /// are carried over from the source.
    pub fn select(&self, map: &MatrixMap) -> Result<MatrixMetadata> {
        let mut seen = FxHashSet::default();
        let mut dimensions = Vec::with_capacity(map.dimensions.len());
        for dim_map in &map.dimensions {
            if !seen.insert(dim_map.code.as_str()) {
                return Err(PxError::DuplicateDimension(dim_map.code.clone()));
            }
            let source = self
                .dimension(&dim_map.code)
                .ok_or_else(|| PxError::UnknownDimension(dim_map.code.clone()))?;
            let mut picked = FxHashSet::default();
            let values = dim_map
                .value_codes
                .iter()
                .map(|code| {
                    if !picked.insert(code.as_str()) {
                        return Err(PxError::DuplicateValue {
                            dimension: source.code.clone(),
                            value: code.clone(),
                        });
                    }
                    source
                        .values
                        .iter()
                        .find(|v| &v.code == code)
                        .cloned()
                        .ok_or_else(|| PxError::UnknownValue {
                            dimension: source.code.clone(),
                            value: code.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            dimensions.push(Dimension {
                code: source.code.clone(),
                name: source.name.clone(),
                kind: source.kind.clone(),
                values,
            });
        }
        if let Some(missing) = self.dimensions.iter().find(|d| !seen.contains(d.code.as_str())) {
            return Err(PxError::MissingDimension(missing.code.clone()));
        }
        Ok(MatrixMetadata { dimensions })
    }
}

impl From<&MatrixMetadata> for MatrixMap {
    fn from(meta: &MatrixMetadata) -> Self {
        meta.to_map()
    }
}
