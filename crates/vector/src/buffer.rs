use crate::error::{Result, VectorError};
use std::path::Path;

/// Row-major buffer of fixed-dimension f32 vectors, row-aligned with the
/// sorted chunk list (`ChunkRecord.vector_row`). Persisted as raw
/// little-endian floats.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorBuffer {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorBuffer {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn with_data(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(VectorError::MisalignedBuffer {
                bytes: data.len() * 4,
                dimension,
            });
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        let end = start + self.dimension;
        self.data.get(start..end)
    }

    /// Write via temp-then-rename so a concurrent reader never sees a
    /// half-written buffer.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.data.len() * 4);
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let tmp = path.with_extension("f32.tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        log::debug!(
            "wrote {} vector rows ({} bytes) to {}",
            self.row_count(),
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read_from(path: &Path, dimension: usize) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.len() % 4 != 0 {
            return Err(VectorError::MisalignedBuffer {
                bytes: bytes.len(),
                dimension,
            });
        }
        let mut data = Vec::with_capacity(bytes.len() / 4);
        for quad in bytes.chunks_exact(4) {
            data.push(f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]));
        }
        Self::with_data(dimension, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_and_read_rows() {
        let mut buffer = VectorBuffer::new(3);
        buffer.push_row(&[1.0, 2.0, 3.0]).expect("row 0");
        buffer.push_row(&[4.0, 5.0, 6.0]).expect("row 1");
        assert_eq!(buffer.row_count(), 2);
        assert_eq!(buffer.row(1), Some(&[4.0f32, 5.0, 6.0][..]));
        assert_eq!(buffer.row(2), None);
    }

    #[test]
    fn rejects_wrong_row_width() {
        let mut buffer = VectorBuffer::new(4);
        let err = buffer.push_row(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            VectorError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn file_round_trip_is_lossless() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vectors.f32");

        let mut buffer = VectorBuffer::new(2);
        buffer.push_row(&[0.5, -0.25]).expect("row");
        buffer.push_row(&[1.5e-7, 42.0]).expect("row");
        buffer.write_to(&path).expect("write");

        let loaded = VectorBuffer::read_from(&path, 2).expect("read");
        assert_eq!(loaded, buffer);
    }

    #[test]
    fn rejects_misaligned_buffer() {
        let err = VectorBuffer::with_data(3, vec![0.0; 4]).unwrap_err();
        assert!(matches!(err, VectorError::MisalignedBuffer { .. }));
    }
}
