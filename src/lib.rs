// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! pxstream: streaming PX data section decoder
//!
//! This library reads the `DATA=` section of PX statistical files without
//! loading them, and reshapes in-memory matrices along their dimensions.
//!
//! # Features
//!
//! - **Streaming I/O**: one chunk buffer and one token buffer per reader
//! - **Selective decoding**: only the requested rows and columns are parsed
//! - **Resumable reads**: consecutive calls continue where the last one stopped
//! - **Indexing**: subset, reorder and aggregate N-dimensional matrices
//!
//! # Example
//!
//! ```rust,no_run
//! use pxstream::{DataReader, DoubleDataValue};
//! use std::fs::File;
//!
//! let file = File::open("table.px").unwrap();
//! let mut reader = DataReader::new(file);
//! let mut values = vec![DoubleDataValue::default(); 4];
//! reader
//!     .read_double_values(&mut values, 0, &[0, 1], &[2, 3])
//!     .unwrap();
//! ```

pub mod cancel;
pub mod commands;
pub mod config;
pub mod error;
pub mod index;
pub mod matrix;
pub mod model;
pub mod streaming;
pub mod transform;
pub mod value;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::{ReaderConfig, SyntaxConfig};
pub use error::{PxError, Result};
pub use index::DataIndexer;
pub use matrix::Matrix;
pub use model::{Dimension, DimensionKind, DimensionMap, DimensionValue, MatrixMap, MatrixMetadata};
pub use streaming::{find_keyword_position, DataReader};
pub use value::{
    DataValueType, DecimalDataValue, DoubleDataValue, MissingValueEncodings, Numeric,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::error::{PxError, Result};
    pub use crate::index::DataIndexer;
    pub use crate::matrix::Matrix;
    pub use crate::model::{
        Dimension, DimensionKind, DimensionMap, DimensionValue, MatrixMap, MatrixMetadata,
    };
    pub use crate::streaming::{find_keyword_position, DataReader};
    pub use crate::transform::{multiply_to_new_value, sum_to_new_value, transform};
    pub use crate::value::{DataValueType, DecimalDataValue, DoubleDataValue};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use std::io::Cursor;

    #[test]
    fn test_read_then_transform_workflow() {
        let px = "MATRIX=\"T1\";\nDATA=\n1 2 3\n4 \"..\" 6;\n";
        let mut reader = DataReader::new(Cursor::new(px.as_bytes()));
        let mut values = vec![DoubleDataValue::default(); 6];
        let cells = reader
            .read_double_values(&mut values, 0, &[0, 1], &[0, 1, 2])
            .unwrap();
        assert_eq!(cells, 6);
        assert_eq!(values[4].kind, DataValueType::CanNotRepresent);

        let meta = MatrixMetadata::new(vec![
            Dimension::new("region", ["a", "b"]),
            Dimension::new("year", ["2020", "2021", "2022"]),
        ]);
        let matrix = Matrix::new(meta, values).unwrap();
        let total = sum_to_new_value(
            &matrix,
            DimensionValue::new("ab", "a+b"),
            &DimensionMap::new("region", ["a", "b"]),
            None,
        )
        .unwrap();
        assert_eq!(total.data()[6], DoubleDataValue::new(5.0));
        assert!(!total.data()[7].is_present());
        assert_eq!(total.data()[8], DoubleDataValue::new(9.0));
    }

    #[test]
    fn test_subset_workflow() {
        let meta = MatrixMetadata::new(vec![
            Dimension::new("a", ["x", "y"]),
            Dimension::new("b", ["p", "q", "r"]),
        ]);
        let matrix = Matrix::new(meta, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let picked = transform(
            &matrix,
            &MatrixMap::new(vec![
                DimensionMap::new("b", ["r", "p"]),
                DimensionMap::new("a", ["y"]),
            ]),
        )
        .unwrap();
        assert_eq!(picked.data(), &[6, 4]);
    }
}
