//! Byte accounting for segments whose blocks compress to varying sizes.
//!
//! A compressed block can only be written whole, so a row range is widened
//! to every block of every block-row it touches, and its byte count is the
//! sum of those blocks' entries in the segment's block table.

use core::ops::Range;

use alloc::vec::Vec;

use crate::error::LayoutError;
use crate::geometry::{ceiling_divide, overflow};

/// Compressed size of every block in one image segment, in raster-scan
/// block order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockTable {
    segment: usize,
    block_bytes: Vec<usize>,
    /// `offsets[i]` is the payload offset of block `i`; one extra entry
    /// holds the segment total.
    offsets: Vec<u64>,
    rows_per_block: usize,
    blocks_per_row: usize,
}

impl BlockTable {
    pub fn new(
        block_bytes: Vec<usize>,
        rows_per_block: usize,
        blocks_per_row: usize,
    ) -> Result<Self, LayoutError> {
        let mut offsets = Vec::with_capacity(block_bytes.len() + 1);
        let mut offset = 0u64;
        offsets.push(offset);
        for &n in &block_bytes {
            offset = offset
                .checked_add(n as u64)
                .ok_or_else(|| overflow("compressed segment size"))?;
            offsets.push(offset);
        }
        Ok(Self {
            segment: 0,
            block_bytes,
            offsets,
            rows_per_block,
            blocks_per_row,
        })
    }

    /// Tag the table with its segment index for error reporting.
    pub(crate) fn for_segment(mut self, segment: usize) -> Self {
        self.segment = segment;
        self
    }

    pub fn block_bytes(&self) -> &[usize] {
        &self.block_bytes
    }

    pub fn rows_per_block(&self) -> usize {
        self.rows_per_block
    }

    pub fn blocks_per_row(&self) -> usize {
        self.blocks_per_row
    }

    /// Number of blocks in the table.
    pub fn len(&self) -> usize {
        self.block_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block_bytes.is_empty()
    }

    /// Compressed payload size of the whole segment.
    pub fn total_bytes(&self) -> u64 {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Blocks covering segment-relative rows `[start_row, start_row + num_rows)`.
    ///
    /// The end is rounded up to a whole block-row; the start is expected to
    /// sit on a block boundary already.
    pub fn find_blocks(&self, start_row: usize, num_rows: usize) -> Result<Range<usize>, LayoutError> {
        if self.blocks_per_row == 0 {
            return Err(LayoutError::Arithmetic("segment has zero blocks per row"));
        }
        let end_row = start_row
            .checked_add(num_rows)
            .ok_or_else(|| overflow("row range"))?;
        let first_block_row = start_row
            .checked_div(self.rows_per_block)
            .ok_or(LayoutError::Arithmetic("attempted division by a zero block dimension"))?;
        let end_block_row = ceiling_divide(end_row, self.rows_per_block)?;

        let start = first_block_row
            .checked_mul(self.blocks_per_row)
            .ok_or_else(|| overflow("block index"))?;
        let end = end_block_row
            .checked_mul(self.blocks_per_row)
            .ok_or_else(|| overflow("block index"))?;
        Ok(start..end)
    }

    /// Sum of the compressed sizes of `blocks`.
    pub fn count_bytes(&self, blocks: Range<usize>) -> Result<usize, LayoutError> {
        if blocks.start > blocks.end || blocks.end > self.block_bytes.len() {
            return Err(LayoutError::BlockRange {
                segment: self.segment,
                start: blocks.start,
                end: blocks.end,
                available: self.block_bytes.len(),
            });
        }
        let bytes = self.offsets[blocks.end] - self.offsets[blocks.start];
        usize::try_from(bytes).map_err(|_| overflow("compressed block range"))
    }

    /// Bytes of all blocks preceding `block`, i.e. its offset within the
    /// segment payload.
    pub fn bytes_before(&self, block: usize) -> Result<u64, LayoutError> {
        self.offsets
            .get(block)
            .copied()
            .ok_or(LayoutError::BlockRange {
                segment: self.segment,
                start: 0,
                end: block,
                available: self.block_bytes.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BlockTable {
        BlockTable::new(alloc::vec![100, 150, 90, 120], 2, 2).unwrap()
    }

    #[test]
    fn second_block_row() {
        let t = table();
        let blocks = t.find_blocks(2, 2).unwrap();
        assert_eq!(blocks, 2..4);
        assert_eq!(t.count_bytes(blocks).unwrap(), 210);
        assert_eq!(t.bytes_before(2).unwrap(), 250);
    }

    #[test]
    fn partial_block_row_rounds_up() {
        let t = table();
        assert_eq!(t.find_blocks(0, 3).unwrap(), 0..4);
        assert_eq!(t.find_blocks(0, 1).unwrap(), 0..2);
    }

    #[test]
    fn short_table_is_block_range_error() {
        let t = table().for_segment(3);
        let err = t.count_bytes(t.find_blocks(4, 2).unwrap()).unwrap_err();
        match err {
            LayoutError::BlockRange {
                segment,
                start,
                end,
                available,
            } => {
                assert_eq!((segment, start, end, available), (3, 4, 6, 4));
            }
            other => panic!("expected BlockRange, got {other:?}"),
        }
    }

    #[test]
    fn zero_rows_per_block_is_arithmetic_error() {
        let t = BlockTable::new(alloc::vec![1, 2], 0, 2).unwrap();
        assert!(matches!(
            t.find_blocks(0, 1),
            Err(LayoutError::Arithmetic(_))
        ));
    }

    #[test]
    fn total_is_sum() {
        assert_eq!(table().total_bytes(), 460);
    }

    #[test]
    fn offsets_are_prefix_sums() {
        let t = table();
        assert_eq!(t.bytes_before(0).unwrap(), 0);
        assert_eq!(t.bytes_before(3).unwrap(), 340);
        assert_eq!(t.bytes_before(4).unwrap(), 460);
        assert!(t.bytes_before(5).is_err());
        assert_eq!(t.count_bytes(1..3).unwrap(), 240);
        assert_eq!(t.count_bytes(2..2).unwrap(), 0);
        assert!(matches!(
            t.count_bytes(Range { start: 3, end: 2 }),
            Err(LayoutError::BlockRange { .. })
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_table_is_rejected() {
        let err = BlockTable::new(alloc::vec![usize::MAX, usize::MAX], 1, 1).unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));
    }
}
