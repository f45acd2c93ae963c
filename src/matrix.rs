//! In-memory matrices.

use crate::error::{PxError, Result};
use crate::model::MatrixMetadata;

/// Metadata paired with a dense row-major data buffer.
///
/// The buffer length always equals the product of the dimension sizes.
/// Transforms never mutate a matrix; they build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    metadata: MatrixMetadata,
    data: Vec<T>,
}

impl<T> Matrix<T> {
    pub fn new(metadata: MatrixMetadata, data: Vec<T>) -> Result<Self> {
        let expected = metadata.data_length();
        if data.len() != expected {
            return Err(PxError::Shape(format!(
                "metadata describes {} cells but {} values were supplied",
                expected,
                data.len()
            )));
        }
        Ok(Self { metadata, data })
    }

    pub fn metadata(&self) -> &MatrixMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_parts(self) -> (MatrixMetadata, Vec<T>) {
        (self.metadata, self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dimension;

    #[test]
    fn test_length_checked() {
        let meta = MatrixMetadata::new(vec![
            Dimension::new("a", ["x", "y"]),
            Dimension::new("b", ["p", "q", "r"]),
        ]);
        assert!(Matrix::new(meta.clone(), vec![0.0; 6]).is_ok());
        assert!(matches!(
            Matrix::new(meta, vec![0.0; 5]),
            Err(PxError::Shape(_))
        ));
    }
}
