use alloc::string::String;

use crate::error::LayoutError;
use crate::limits::ILOC_MAX;

/// One image segment of a vertically stacked, multi-segment image.
///
/// Each segment is attached to its predecessor, so `row_offset` is the
/// predecessor's row count (0 for the first segment).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    /// First global image row in this segment.
    pub first_row: usize,
    /// Row offset encoded in ILOC, relative to the previous segment.
    pub row_offset: usize,
    pub num_rows: usize,
}

/// A run of global image rows, `[start, start + num_rows)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowSpan {
    pub start: usize,
    pub num_rows: usize,
}

impl RowSpan {
    /// End row (exclusive).
    pub fn end(&self) -> usize {
        self.start + self.num_rows
    }
}

impl Segment {
    /// End row (exclusive).
    pub fn end_row(&self) -> usize {
        self.first_row + self.num_rows
    }

    /// Whether global `row` falls in this segment.
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.first_row && row < self.end_row()
    }

    /// The ILOC field value: 5-digit row offset then a 5-digit column offset
    /// of zero.
    pub fn iloc(&self) -> Result<String, LayoutError> {
        if self.row_offset > ILOC_MAX {
            return Err(LayoutError::Configuration(alloc::format!(
                "row offset {} does not fit in ILOC (max {ILOC_MAX})",
                self.row_offset
            )));
        }
        Ok(alloc::format!("{:05}00000", self.row_offset))
    }

    /// The rows of `[range_start, range_start + range_rows)` that fall inside
    /// this segment, or `None` when the range misses it.
    pub fn overlap(&self, range_start: usize, range_rows: usize) -> Option<RowSpan> {
        let range_end = range_start.saturating_add(range_rows);
        let start = range_start.max(self.first_row);
        let end = range_end.min(self.end_row());
        (start < end).then(|| RowSpan {
            start,
            num_rows: end - start,
        })
    }
}
