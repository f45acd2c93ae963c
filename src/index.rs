//! Coordinate-to-offset indexing for N-dimensional matrices.
//!
//! A [`DataIndexer`] walks a selection (an ordered subset of values per
//! dimension, with dimensions in any order) and yields, for each visited
//! cell, its linear offset in the row-major layout of the *source* matrix.
//!
//! # Algorithm
//!
//! 1. Resolve every selected value code to its position in the source
//!    dimension (once, at construction).
//! 2. Precompute the source stride table: the stride of dimension `d` is the
//!    product of the sizes of all dimensions after `d`.
//! 3. Advance like an odometer: increment the last selection dimension, on
//!    overflow reset it and carry into the previous one. The walk ends when
//!    the first selection dimension overflows.
//! 4. The offset of a cell is the sum of `position * stride` over the
//!    selection dimensions.
//!
//! Two indexers over different layouts but with the same selection shape
//! visit the same number of cells in the same order, so they can be advanced
//! in lockstep to copy between layouts.

use crate::error::{PxError, Result};
use crate::model::MatrixMap;
use rustc_hash::FxHashMap;

/// Stateful cursor over the linear offsets of a selection.
#[derive(Debug, Clone)]
pub struct DataIndexer {
    /// Per selection dimension: positions within the source dimension.
    indices: Vec<Vec<usize>>,
    /// Selection dimension -> source dimension.
    order: Vec<usize>,
    /// Row-major stride per source dimension.
    source_strides: Vec<usize>,
    coords: Vec<usize>,
    last: Vec<usize>,
    current: usize,
    data_length: usize,
    exhausted: bool,
}

impl DataIndexer {
    /// Build an indexer that visits `target` within the layout of `source`.
    ///
    /// Every source dimension must appear exactly once in `target`, and every
    /// selected value must exist in its source dimension.
    pub fn new(source: &MatrixMap, target: &MatrixMap) -> Result<Self> {
        let dim_positions: FxHashMap<&str, usize> = source
            .dimensions
            .iter()
            .enumerate()
            .map(|(i, d)| (d.code.as_str(), i))
            .collect();

        let mut covered = vec![false; source.dimensions.len()];
        let mut indices = Vec::with_capacity(target.dimensions.len());
        let mut order = Vec::with_capacity(target.dimensions.len());

        for dim in &target.dimensions {
            let src_idx = *dim_positions
                .get(dim.code.as_str())
                .ok_or_else(|| PxError::UnknownDimension(dim.code.clone()))?;
            if covered[src_idx] {
                return Err(PxError::DuplicateDimension(dim.code.clone()));
            }
            covered[src_idx] = true;

            let src_dim = &source.dimensions[src_idx];
            let mut value_positions: FxHashMap<&str, usize> = FxHashMap::default();
            for (i, code) in src_dim.value_codes.iter().enumerate() {
                value_positions.entry(code.as_str()).or_insert(i);
            }
            let mut seen = vec![false; src_dim.value_codes.len()];
            let positions = dim
                .value_codes
                .iter()
                .map(|code| {
                    let pos = value_positions.get(code.as_str()).copied().ok_or_else(|| {
                        PxError::UnknownValue {
                            dimension: dim.code.clone(),
                            value: code.clone(),
                        }
                    })?;
                    if std::mem::replace(&mut seen[pos], true) {
                        return Err(PxError::DuplicateValue {
                            dimension: dim.code.clone(),
                            value: code.clone(),
                        });
                    }
                    Ok(pos)
                })
                .collect::<Result<Vec<_>>>()?;

            indices.push(positions);
            order.push(src_idx);
        }

        if let Some(i) = covered.iter().position(|c| !c) {
            return Err(PxError::MissingDimension(source.dimensions[i].code.clone()));
        }

        Self::build(indices, &source.sizes(), order)
    }

    /// Build from raw per-dimension positions listed in source dimension order.
    ///
    /// `indices` may cover fewer dimensions than `sizes`; the uncovered
    /// trailing dimensions stay fixed at position zero.
    pub fn from_indices(indices: Vec<Vec<usize>>, sizes: &[usize]) -> Result<Self> {
        let order = (0..indices.len()).collect();
        Self::from_indices_with_order(indices, sizes, order)
    }

    /// Build from raw positions with an explicit selection -> source
    /// dimension permutation. `order[i]` is the source dimension that
    /// selection dimension `i` walks.
    pub fn from_indices_with_order(
        indices: Vec<Vec<usize>>,
        sizes: &[usize],
        order: Vec<usize>,
    ) -> Result<Self> {
        if order.len() != indices.len() {
            return Err(PxError::Shape(format!(
                "order has {} entries but {} dimensions are selected",
                order.len(),
                indices.len()
            )));
        }
        let mut covered = vec![false; sizes.len()];
        for (sel, &src) in order.iter().enumerate() {
            if src >= sizes.len() {
                return Err(PxError::Shape(format!(
                    "order entry {} refers to dimension {} of {}",
                    sel,
                    src,
                    sizes.len()
                )));
            }
            if covered[src] {
                return Err(PxError::Shape(format!(
                    "source dimension {} selected twice",
                    src
                )));
            }
            covered[src] = true;
            if let Some(&bad) = indices[sel].iter().find(|&&i| i >= sizes[src]) {
                return Err(PxError::Shape(format!(
                    "index {} out of bounds for dimension {} of size {}",
                    bad, src, sizes[src]
                )));
            }
        }
        Self::build(indices, sizes, order)
    }

    fn build(indices: Vec<Vec<usize>>, sizes: &[usize], order: Vec<usize>) -> Result<Self> {
        let overflow = || PxError::Shape(format!("layout {:?} has more cells than usize", sizes));

        let mut source_strides = vec![1usize; sizes.len()];
        for d in (0..sizes.len().saturating_sub(1)).rev() {
            source_strides[d] = source_strides[d + 1]
                .checked_mul(sizes[d + 1])
                .ok_or_else(overflow)?;
        }
        if let (Some(&stride), Some(&size)) = (source_strides.first(), sizes.first()) {
            stride.checked_mul(size).ok_or_else(overflow)?;
        }

        let last: Vec<usize> = indices.iter().map(|v| v.len().saturating_sub(1)).collect();
        let data_length: usize = indices
            .iter()
            .try_fold(1usize, |acc, v| acc.checked_mul(v.len()))
            .ok_or_else(overflow)?;

        tracing::trace!(
            dimensions = indices.len(),
            cells = data_length,
            "built data indexer"
        );

        let mut indexer = Self {
            coords: vec![0; indices.len()],
            indices,
            order,
            source_strides,
            last,
            current: 0,
            data_length,
            exhausted: data_length == 0,
        };
        if !indexer.exhausted {
            indexer.current = indexer.compute_offset();
        }
        Ok(indexer)
    }

    #[inline]
    fn compute_offset(&self) -> usize {
        self.coords
            .iter()
            .enumerate()
            .map(|(i, &c)| self.indices[i][c] * self.source_strides[self.order[i]])
            .sum()
    }

    /// Linear offset of the cell under the cursor.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of cells the selection visits.
    #[inline]
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// Row-major strides of the source dimensions.
    pub fn source_strides(&self) -> &[usize] {
        &self.source_strides
    }

    /// Move to the next cell. Returns false once every cell has been visited;
    /// after that the cursor stays on the last cell.
    #[inline]
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        for i in (0..self.coords.len()).rev() {
            if self.coords[i] < self.last[i] {
                self.coords[i] += 1;
                self.current = self.compute_offset();
                return true;
            }
            self.coords[i] = 0;
        }
        // Restore the final position so current_index stays meaningful.
        self.coords.clone_from(&self.last);
        self.exhausted = true;
        false
    }

    /// Consume the indexer, yielding every offset from the current cell on.
    pub fn offsets(self) -> Offsets {
        Offsets {
            pending: !self.exhausted,
            indexer: self,
        }
    }
}

/// Iterator returned by [`DataIndexer::offsets`].
#[derive(Debug, Clone)]
pub struct Offsets {
    indexer: DataIndexer,
    pending: bool,
}

impl Iterator for Offsets {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.pending {
            self.pending = false;
            return Some(self.indexer.current);
        }
        if self.indexer.advance() {
            Some(self.indexer.current)
        } else {
            None
        }
    }
}
