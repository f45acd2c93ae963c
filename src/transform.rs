//! Matrix transforms built on lockstep indexer pairs.
//!
//! # Subset and reorder
//!
//! One indexer walks the selection inside the source layout, a second one
//! walks the selection inside its own (new) layout. Both visit the same cells
//! in the same order, so copying `source[a] -> dest[b]` while stepping them
//! together performs any combination of subsetting and reordering in a
//! single pass.
//!
//! # Aggregation
//!
//! Summing (or multiplying) a set of values of one dimension into a new
//! value grows that dimension by one. Every pre-existing cell is copied to
//! its position in the enlarged layout, and the new slice is filled by
//! folding the aggregated values cell by cell, starting from the identity.

use crate::error::{PxError, Result};
use crate::index::DataIndexer;
use crate::matrix::Matrix;
use crate::model::{DimensionMap, DimensionValue, MatrixMap};
use crate::value::Numeric;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Slices with at least this many cells are aggregated in parallel.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Build a new matrix containing `selection` of `matrix`, laid out in the
/// selection's dimension and value order.
pub fn transform<T: Clone>(matrix: &Matrix<T>, selection: &MatrixMap) -> Result<Matrix<T>> {
    let metadata = matrix.metadata().select(selection)?;
    let source = DataIndexer::new(&matrix.metadata().to_map(), selection)?;
    let target_map = metadata.to_map();
    let target = DataIndexer::new(&target_map, &target_map)?;

    let src = matrix.data();
    let data: Vec<T> = source
        .offsets()
        .zip(target.offsets())
        .enumerate()
        .map(|(i, (s, d))| {
            // A layout walked in its own order is sequential.
            debug_assert_eq!(i, d);
            src[s].clone()
        })
        .collect();

    debug!(
        source_cells = src.len(),
        cells = data.len(),
        "transformed matrix"
    );
    Matrix::new(metadata, data)
}

/// Fold the values of `selection` into a new value of the same dimension.
///
/// `new_value` is inserted at `insert_index` (appended when `None`). Each
/// cell of the new slice starts at `identity` and is combined with the
/// matching cell of every aggregated value through `f`.
pub fn aggregate_to_new_value<T, F>(
    matrix: &Matrix<T>,
    new_value: DimensionValue,
    selection: &DimensionMap,
    insert_index: Option<usize>,
    identity: T,
    f: F,
) -> Result<Matrix<T>>
where
    T: Clone + Send + Sync,
    F: Fn(T, &T) -> T + Sync,
{
    let meta = matrix.metadata();
    let dim_idx = meta
        .dimension_index(&selection.code)
        .ok_or_else(|| PxError::UnknownDimension(selection.code.clone()))?;
    let dim = &meta.dimensions[dim_idx];

    if dim.value_index(&new_value.code).is_some() {
        return Err(PxError::DuplicateValue {
            dimension: dim.code.clone(),
            value: new_value.code,
        });
    }
    let mut picked = FxHashSet::default();
    if let Some(code) = selection.value_codes.iter().find(|code| !picked.insert(*code)) {
        return Err(PxError::DuplicateValue {
            dimension: dim.code.clone(),
            value: code.clone(),
        });
    }
    let insert_at = insert_index.unwrap_or(dim.size());
    if insert_at > dim.size() {
        return Err(PxError::Shape(format!(
            "insert index {} past the {} values of dimension '{}'",
            insert_at,
            dim.size(),
            dim.code
        )));
    }

    let mut new_meta = meta.clone();
    new_meta.dimensions[dim_idx]
        .values
        .insert(insert_at, new_value.clone());

    let source_map = meta.to_map();
    let dest_map = new_meta.to_map();

    // Source offsets of each aggregated value, all in the same visit order.
    let value_offsets = selection
        .value_codes
        .iter()
        .map(|code| {
            let mut fixed = source_map.clone();
            fixed.dimensions[dim_idx].value_codes = vec![code.clone()];
            Ok(DataIndexer::new(&source_map, &fixed)?.offsets().collect())
        })
        .collect::<Result<Vec<Vec<usize>>>>()?;

    let mut slice_map = dest_map.clone();
    slice_map.dimensions[dim_idx].value_codes = vec![new_value.code.clone()];
    let slice_offsets: Vec<usize> = DataIndexer::new(&dest_map, &slice_map)?
        .offsets()
        .collect();

    let src = matrix.data();
    let fold_cell = |i: usize| {
        value_offsets
            .iter()
            .fold(identity.clone(), |acc, offsets| f(acc, &src[offsets[i]]))
    };
    let slice: Vec<T> = if slice_offsets.len() >= PARALLEL_THRESHOLD {
        (0..slice_offsets.len())
            .into_par_iter()
            .map(fold_cell)
            .collect()
    } else {
        (0..slice_offsets.len()).map(fold_cell).collect()
    };

    let mut data = vec![identity.clone(); new_meta.data_length()];
    for (offset, value) in slice_offsets.into_iter().zip(slice) {
        data[offset] = value;
    }

    // Existing cells keep their values; only their positions may shift.
    let old_in_source = DataIndexer::new(&source_map, &source_map)?;
    let old_in_dest = DataIndexer::new(&dest_map, &source_map)?;
    for (s, d) in old_in_source.offsets().zip(old_in_dest.offsets()) {
        data[d] = src[s].clone();
    }

    debug!(
        dimension = %selection.code,
        value = %new_value.code,
        aggregated = selection.value_codes.len(),
        cells = data.len(),
        "aggregated to new value"
    );
    Matrix::new(new_meta, data)
}

/// Sum the values of `selection` into `new_value`.
pub fn sum_to_new_value<T>(
    matrix: &Matrix<T>,
    new_value: DimensionValue,
    selection: &DimensionMap,
    insert_index: Option<usize>,
) -> Result<Matrix<T>>
where
    T: Numeric + Send + Sync,
{
    aggregate_to_new_value(
        matrix,
        new_value,
        selection,
        insert_index,
        T::zero(),
        |acc, v| acc + v.clone(),
    )
}

/// Multiply the values of `selection` into `new_value`.
pub fn multiply_to_new_value<T>(
    matrix: &Matrix<T>,
    new_value: DimensionValue,
    selection: &DimensionMap,
    insert_index: Option<usize>,
) -> Result<Matrix<T>>
where
    T: Numeric + Send + Sync,
{
    aggregate_to_new_value(
        matrix,
        new_value,
        selection,
        insert_index,
        T::one(),
        |acc, v| acc * v.clone(),
    )
}

#[cfg(feature = "async")]
mod asynchronous {
    use super::*;
    use std::sync::Arc;

    async fn offload<T, F>(work: F) -> Result<Matrix<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<Matrix<T>> + Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| PxError::Join(e.to_string()))?
    }

    /// [`transform`] on the blocking thread pool.
    pub async fn transform_async<T>(
        matrix: Arc<Matrix<T>>,
        selection: MatrixMap,
    ) -> Result<Matrix<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        offload(move || transform(&matrix, &selection)).await
    }

    /// [`sum_to_new_value`] on the blocking thread pool.
    pub async fn sum_to_new_value_async<T>(
        matrix: Arc<Matrix<T>>,
        new_value: DimensionValue,
        selection: DimensionMap,
        insert_index: Option<usize>,
    ) -> Result<Matrix<T>>
    where
        T: Numeric + Send + Sync + 'static,
    {
        offload(move || sum_to_new_value(&matrix, new_value, &selection, insert_index)).await
    }

    /// [`multiply_to_new_value`] on the blocking thread pool.
    pub async fn multiply_to_new_value_async<T>(
        matrix: Arc<Matrix<T>>,
        new_value: DimensionValue,
        selection: DimensionMap,
        insert_index: Option<usize>,
    ) -> Result<Matrix<T>>
    where
        T: Numeric + Send + Sync + 'static,
    {
        offload(move || multiply_to_new_value(&matrix, new_value, &selection, insert_index))
            .await
    }
}

#[cfg(feature = "async")]
pub use asynchronous::{multiply_to_new_value_async, sum_to_new_value_async, transform_async};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dimension, MatrixMetadata};
    use crate::value::{DataValueType, DoubleDataValue};

    fn sequential_3x3x2() -> Matrix<f64> {
        let meta = MatrixMetadata::new(vec![
            Dimension::new("var0", ["val0", "val1", "val2"]),
            Dimension::new("var1", ["val0", "val1", "val2"]),
            Dimension::new("var2", ["val0", "val1"]),
        ]);
        Matrix::new(meta, (0..18).map(|v| v as f64).collect()).unwrap()
    }

    #[test]
    fn test_identity_transform() {
        let m = sequential_3x3x2();
        let out = transform(&m, &m.metadata().to_map()).unwrap();
        assert_eq!(out.data(), m.data());
        assert_eq!(out.metadata(), m.metadata());
    }

    #[test]
    fn test_subset() {
        let m = sequential_3x3x2();
        let selection = MatrixMap::new(vec![
            DimensionMap::new("var0", ["val1", "val2"]),
            DimensionMap::new("var1", ["val0", "val1"]),
            DimensionMap::new("var2", ["val0", "val1"]),
        ]);
        let out = transform(&m, &selection).unwrap();
        assert_eq!(out.data(), &[6.0, 7.0, 8.0, 9.0, 12.0, 13.0, 14.0, 15.0]);
        assert_eq!(out.metadata().sizes(), vec![2, 2, 2]);
    }

    #[test]
    fn test_reorder() {
        let m = sequential_3x3x2();
        let selection = MatrixMap::new(vec![
            DimensionMap::new("var2", ["val0", "val1"]),
            DimensionMap::new("var0", ["val0", "val1", "val2"]),
            DimensionMap::new("var1", ["val0", "val1", "val2"]),
        ]);
        let out = transform(&m, &selection).unwrap();
        assert_eq!(
            out.metadata().dimension_codes().collect::<Vec<_>>(),
            vec!["var2", "var0", "var1"]
        );
        let mut sorted = out.data().to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sorted, m.data());
        assert_eq!(&out.data()[..4], &[0.0, 2.0, 4.0, 6.0]);
        assert_eq!(&out.data()[9..13], &[1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_transform_unknown_value() {
        let m = sequential_3x3x2();
        let selection = MatrixMap::new(vec![
            DimensionMap::new("var0", ["val9"]),
            DimensionMap::new("var1", ["val0"]),
            DimensionMap::new("var2", ["val0"]),
        ]);
        assert!(matches!(
            transform(&m, &selection),
            Err(PxError::UnknownValue { .. })
        ));
    }

    #[test]
    fn test_transform_repeated_value() {
        let m = sequential_3x3x2();
        let selection = MatrixMap::new(vec![
            DimensionMap::new("var0", ["val0"]),
            DimensionMap::new("var1", ["val2", "val2"]),
            DimensionMap::new("var2", ["val0", "val1"]),
        ]);
        match transform(&m, &selection).unwrap_err() {
            PxError::DuplicateValue { dimension, value } => {
                assert_eq!(dimension, "var1");
                assert_eq!(value, "val2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_sum_appends_slice() {
        let m = sequential_3x3x2();
        let selection = DimensionMap::new("var2", ["val0", "val1"]);
        let out = sum_to_new_value(&m, DimensionValue::new("total", "Total"), &selection, None)
            .unwrap();
        assert_eq!(out.len(), 18 + 9);
        assert_eq!(out.metadata().sizes(), vec![3, 3, 3]);
        // Each (var0, var1) row now reads [a, b, a + b].
        for cell in 0..9 {
            let a = (cell * 2) as f64;
            assert_eq!(&out.data()[cell * 3..cell * 3 + 3], &[a, a + 1.0, 2.0 * a + 1.0]);
        }
    }

    #[test]
    fn test_sum_inserted_first() {
        let m = sequential_3x3x2();
        let selection = DimensionMap::new("var0", ["val0", "val2"]);
        let out = sum_to_new_value(&m, DimensionValue::new("sum", "Sum"), &selection, Some(0))
            .unwrap();
        assert_eq!(out.len(), 18 + 6);
        assert_eq!(out.metadata().dimensions[0].values[0].code, "sum");
        let expected_slice: Vec<f64> = (0..6).map(|i| (i + (12 + i)) as f64).collect();
        assert_eq!(&out.data()[..6], expected_slice.as_slice());
        assert_eq!(&out.data()[6..], m.data());
    }

    #[test]
    fn test_multiply_middle_insert() {
        let meta = MatrixMetadata::new(vec![
            Dimension::new("a", ["x", "y"]),
            Dimension::new("b", ["p", "q"]),
        ]);
        let m = Matrix::new(meta, vec![2.0, 3.0, 4.0, 5.0]).unwrap();
        let out = multiply_to_new_value(
            &m,
            DimensionValue::new("pq", "p*q"),
            &DimensionMap::new("b", ["p", "q"]),
            Some(1),
        )
        .unwrap();
        assert_eq!(out.data(), &[2.0, 6.0, 3.0, 4.0, 20.0, 5.0]);
    }

    #[test]
    fn test_sum_tagged_values_propagates_missing() {
        let meta = MatrixMetadata::new(vec![Dimension::new("a", ["x", "y"])]);
        let m = Matrix::new(
            meta,
            vec![
                DoubleDataValue::new(1.0),
                DoubleDataValue::missing(DataValueType::Confidential),
            ],
        )
        .unwrap();
        let out = sum_to_new_value(
            &m,
            DimensionValue::new("t", "t"),
            &DimensionMap::new("a", ["x", "y"]),
            None,
        )
        .unwrap();
        assert_eq!(out.data()[2].kind, DataValueType::Confidential);
        assert_eq!(out.data()[0], DoubleDataValue::new(1.0));
    }

    #[test]
    fn test_aggregate_errors() {
        let m = sequential_3x3x2();
        assert!(matches!(
            sum_to_new_value(
                &m,
                DimensionValue::new("val0", "dup"),
                &DimensionMap::new("var2", ["val0"]),
                None
            ),
            Err(PxError::DuplicateValue { .. })
        ));
        assert!(matches!(
            sum_to_new_value(
                &m,
                DimensionValue::new("t", "t"),
                &DimensionMap::new("var2", ["val7"]),
                None
            ),
            Err(PxError::UnknownValue { .. })
        ));
        assert!(matches!(
            sum_to_new_value(
                &m,
                DimensionValue::new("t", "t"),
                &DimensionMap::new("nope", ["val0"]),
                None
            ),
            Err(PxError::UnknownDimension(_))
        ));
        assert!(matches!(
            sum_to_new_value(
                &m,
                DimensionValue::new("t", "t"),
                &DimensionMap::new("var2", ["val0"]),
                Some(3)
            ),
            Err(PxError::Shape(_))
        ));
        assert!(matches!(
            sum_to_new_value(
                &m,
                DimensionValue::new("t", "t"),
                &DimensionMap::new("var2", ["val1", "val1"]),
                None
            ),
            Err(PxError::DuplicateValue { .. })
        ));
    }

    #[test]
    fn test_parallel_path_matches_sequential() {
        let n = PARALLEL_THRESHOLD + 7;
        let rows: Vec<String> = (0..n).map(|i| format!("r{}", i)).collect();
        let meta = MatrixMetadata::new(vec![
            Dimension::new("row", rows),
            Dimension::new("col", ["a", "b"]),
        ]);
        let m = Matrix::new(meta, (0..2 * n).map(|v| v as f64).collect()).unwrap();
        let out = sum_to_new_value(
            &m,
            DimensionValue::new("ab", "a+b"),
            &DimensionMap::new("col", ["a", "b"]),
            None,
        )
        .unwrap();
        assert_eq!(out.len(), 3 * n);
        for i in [0, 1, n / 2, n - 1] {
            let a = (2 * i) as f64;
            assert_eq!(out.data()[3 * i + 2], 2.0 * a + 1.0);
        }
    }
}
