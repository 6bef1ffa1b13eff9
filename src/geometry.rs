//! Image dimensions and NITF block arithmetic.
//!
//! NITF always writes whole blocks, so a blocked image occupies more bytes
//! than its pixel count suggests: partial blocks on the right edge pad every
//! row, and partial blocks on the bottom edge of a segment add pad rows.
//! Block dimensions larger than the image are clamped to the image, so a
//! small image never pays for padding it cannot use.

use crate::error::LayoutError;

/// Dimensions of the logical (unsegmented) image.
///
/// `rows_per_block` and `cols_per_block` of 0 mean unblocked in that
/// dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageGeometry {
    pub num_rows: usize,
    pub num_cols: usize,
    pub bytes_per_pixel: usize,
    pub rows_per_block: usize,
    pub cols_per_block: usize,
}

impl ImageGeometry {
    /// Unblocked geometry.
    pub fn new(num_rows: usize, num_cols: usize, bytes_per_pixel: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            bytes_per_pixel,
            rows_per_block: 0,
            cols_per_block: 0,
        }
    }

    /// Same geometry with the given block shape.
    pub fn with_blocking(mut self, rows_per_block: usize, cols_per_block: usize) -> Self {
        self.rows_per_block = rows_per_block;
        self.cols_per_block = cols_per_block;
        self
    }

    /// Whether either dimension is blocked.
    pub fn is_blocked(&self) -> bool {
        self.rows_per_block != 0 || self.cols_per_block != 0
    }

    /// Reject geometry no segment can hold.
    pub(crate) fn check(&self) -> Result<(), LayoutError> {
        if self.num_rows == 0 || self.num_cols == 0 {
            return Err(LayoutError::Configuration(alloc::format!(
                "image must have at least one row and column, got {}x{}",
                self.num_rows,
                self.num_cols
            )));
        }
        if self.bytes_per_pixel == 0 {
            return Err(LayoutError::Configuration(
                "bytes_per_pixel must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Columns per block after clamping to the image width.
    pub fn effective_cols_per_block(&self) -> usize {
        if self.cols_per_block == 0 {
            self.num_cols
        } else {
            self.cols_per_block.min(self.num_cols)
        }
    }

    /// Rows per block for a segment of `segment_rows` rows.
    ///
    /// Unblocked segments are a single block-row the height of the segment.
    pub fn segment_rows_per_block(&self, segment_rows: usize) -> usize {
        if self.rows_per_block == 0 {
            segment_rows
        } else {
            self.rows_per_block.min(segment_rows)
        }
    }

    /// Column count including right-edge pad pixels.
    pub fn padded_cols(&self) -> usize {
        padded_dim(self.num_cols, self.effective_cols_per_block())
    }

    /// Bytes in one row of the segment payload, pad pixels included.
    pub fn bytes_per_row(&self) -> Result<u64, LayoutError> {
        (self.padded_cols() as u64)
            .checked_mul(self.bytes_per_pixel as u64)
            .ok_or_else(|| overflow("bytes per row"))
    }

    /// Blocks across one block-row.
    pub fn blocks_per_row(&self) -> Result<usize, LayoutError> {
        ceiling_divide(self.num_cols, self.effective_cols_per_block())
    }

    /// Pad rows needed to complete the last block-row of a segment.
    pub fn segment_pad_rows(&self, segment_rows: usize) -> usize {
        let per_block = self.segment_rows_per_block(segment_rows);
        if per_block == 0 {
            return 0;
        }
        match segment_rows % per_block {
            0 => 0,
            leftover => per_block - leftover,
        }
    }

    /// Uncompressed payload bytes of a segment with `segment_rows` rows.
    pub fn segment_payload_bytes(&self, segment_rows: usize) -> Result<u64, LayoutError> {
        let rows = segment_rows.saturating_add(self.segment_pad_rows(segment_rows)) as u64;
        rows.checked_mul(self.bytes_per_row()?)
            .ok_or_else(|| overflow("segment payload size"))
    }

    /// Compressed block count of a segment with `segment_rows` rows.
    pub fn segment_block_count(&self, segment_rows: usize) -> Result<usize, LayoutError> {
        let block_rows = ceiling_divide(segment_rows, self.segment_rows_per_block(segment_rows))?;
        block_rows
            .checked_mul(self.blocks_per_row()?)
            .ok_or_else(|| overflow("block count"))
    }
}

/// `dim` rounded up to a multiple of `per_block` (0 means unblocked).
pub(crate) fn padded_dim(dim: usize, per_block: usize) -> usize {
    if per_block == 0 {
        dim
    } else {
        dim.div_ceil(per_block).saturating_mul(per_block)
    }
}

pub(crate) fn ceiling_divide(numerator: usize, denominator: usize) -> Result<usize, LayoutError> {
    if denominator == 0 {
        return Err(LayoutError::Arithmetic("attempted division by a zero block dimension"));
    }
    Ok(numerator.div_ceil(denominator))
}

pub(crate) fn overflow(what: &str) -> LayoutError {
    LayoutError::Configuration(alloc::format!("{what} overflows a 64-bit file offset"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unblocked_has_no_padding() {
        let g = ImageGeometry::new(10, 7, 2);
        assert_eq!(g.padded_cols(), 7);
        assert_eq!(g.bytes_per_row().unwrap(), 14);
        assert_eq!(g.segment_pad_rows(10), 0);
        assert_eq!(g.segment_payload_bytes(10).unwrap(), 140);
        assert_eq!(g.blocks_per_row().unwrap(), 1);
        assert_eq!(g.segment_block_count(10).unwrap(), 1);
    }

    #[test]
    fn blocked_pads_right_and_bottom() {
        let g = ImageGeometry::new(100, 100, 1).with_blocking(64, 64);
        assert_eq!(g.padded_cols(), 128);
        assert_eq!(g.segment_rows_per_block(100), 64);
        assert_eq!(g.segment_pad_rows(100), 28);
        assert_eq!(g.segment_payload_bytes(100).unwrap(), 128 * 128);
        assert_eq!(g.blocks_per_row().unwrap(), 2);
        assert_eq!(g.segment_block_count(100).unwrap(), 4);
    }

    #[test]
    fn blocks_clamp_to_small_images() {
        let g = ImageGeometry::new(10, 20, 1).with_blocking(64, 64);
        assert_eq!(g.effective_cols_per_block(), 20);
        assert_eq!(g.padded_cols(), 20);
        assert_eq!(g.segment_rows_per_block(10), 10);
        assert_eq!(g.segment_pad_rows(10), 0);
    }

    #[test]
    fn zero_denominator_is_arithmetic_error() {
        assert!(matches!(
            ceiling_divide(4, 0),
            Err(LayoutError::Arithmetic(_))
        ));
        assert_eq!(ceiling_divide(5, 2).unwrap(), 3);
        assert_eq!(ceiling_divide(4, 2).unwrap(), 2);
    }

    #[test]
    fn empty_geometry_rejected() {
        assert!(ImageGeometry::new(0, 5, 1).check().is_err());
        assert!(ImageGeometry::new(5, 5, 0).check().is_err());
        assert!(ImageGeometry::new(5, 5, 1).check().is_ok());
    }
}
