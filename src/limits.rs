/// Largest row offset the 5-digit ILOC row field can express.
///
/// Only binds when an image is split into more than one segment, since the
/// first segment has no predecessor to be offset from.
pub const ILOC_MAX: usize = 99_999;

/// Largest image segment payload, in bytes, the 10-digit LI field allows.
pub const NUM_BYTES_MAX: u64 = 9_999_999_998;

/// Per-segment ceilings used when planning image segments.
///
/// Defaults to the format-mandated values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentLimits {
    /// Maximum rows in any segment of a multi-segment image.
    pub max_rows: usize,
    /// Maximum payload bytes in any segment.
    pub max_bytes: u64,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            max_rows: ILOC_MAX,
            max_bytes: NUM_BYTES_MAX,
        }
    }
}

impl SegmentLimits {
    /// Whether the row ceiling is the ILOC field limit itself (or looser).
    ///
    /// Only then may an unblocked image that fits in one segment by size
    /// keep more rows than `max_rows` in that single segment.
    pub(crate) fn row_ceiling_is_iloc(&self) -> bool {
        self.max_rows >= ILOC_MAX
    }

    /// Check the limits themselves before planning.
    pub(crate) fn check(&self) -> Result<(), crate::LayoutError> {
        if self.max_rows == 0 {
            return Err(crate::LayoutError::Configuration(
                "max_rows must be at least 1".into(),
            ));
        }
        if self.max_bytes == 0 {
            return Err(crate::LayoutError::Configuration(
                "max_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
