//! Byte accounting for segments with a fixed number of bytes per row.

use crate::error::LayoutError;
use crate::geometry::{ImageGeometry, overflow};
use crate::segment::{RowSpan, Segment};

/// Uniform raster: every row of every segment is `bytes_per_row` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UniformRaster {
    bytes_per_row: u64,
}

impl UniformRaster {
    pub(crate) fn new(geometry: &ImageGeometry) -> Result<Self, LayoutError> {
        Ok(Self {
            bytes_per_row: geometry.bytes_per_row()?,
        })
    }

    pub(crate) fn bytes_per_row(&self) -> u64 {
        self.bytes_per_row
    }

    /// Bytes written for `span`, including the segment's pad rows when the
    /// span reaches the segment's last row.
    pub(crate) fn span_len(
        &self,
        geometry: &ImageGeometry,
        segment: &Segment,
        span: RowSpan,
    ) -> Result<u64, LayoutError> {
        let mut rows = span.num_rows as u64;
        if span.end() == segment.end_row() {
            rows += geometry.segment_pad_rows(segment.num_rows) as u64;
        }
        rows.checked_mul(self.bytes_per_row)
            .ok_or_else(|| overflow("row range size"))
    }

    /// Offset of `span` within the segment payload.
    pub(crate) fn span_offset(&self, segment: &Segment, span: RowSpan) -> Result<u64, LayoutError> {
        ((span.start - segment.first_row) as u64)
            .checked_mul(self.bytes_per_row)
            .ok_or_else(|| overflow("row offset"))
    }
}
