use alloc::string::String;

/// Errors from segment planning and file-layout queries.
///
/// Every error is a deterministic function of the inputs. Nothing here is
/// transient, so there is nothing to retry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LayoutError {
    /// The image cannot be segmented or laid out with the given inputs.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The requested rows are empty, out of bounds, or cross a segment
    /// boundary where a single segment is required.
    #[error("invalid row range: {0}")]
    RowRange(String),

    /// A blocked image was addressed off a block boundary.
    #[error(
        "segment {segment}: rows starting at {row} (count {num_rows}) are not aligned to {rows_per_block}-row blocks"
    )]
    UnalignedRows {
        segment: usize,
        row: usize,
        num_rows: usize,
        rows_per_block: usize,
    },

    /// The block range for a request runs past the segment's block table.
    #[error("segment {segment}: blocks [{start}, {end}) requested but only {available} are present")]
    BlockRange {
        segment: usize,
        start: usize,
        end: usize,
        available: usize,
    },

    #[error("arithmetic error: {0}")]
    Arithmetic(&'static str),

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },
}
