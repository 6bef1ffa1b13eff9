//! File layout for writing a NITF one row range at a time.
//!
//! The file is laid out as
//!
//! ```text
//! file header
//! subheader[0]   raster[0]
//! subheader[1]   raster[1]
//! ...
//! subheader[n-1] raster[n-1]
//! DES subheaders and data
//! ```
//!
//! All absolute offsets are computed once at construction. A query for a
//! row range then returns the offset to seek to and the borrowed buffers to
//! write there. The file header and a segment's subheader belong to the
//! range that starts on the segment's first row, and the DES bytes belong to
//! the range that ends on the image's last row, so ranges that partition the
//! image emit every byte of the file exactly once, in any order.

mod compressed;
mod region;
mod uncompressed;

pub use compressed::BlockTable;
pub use region::{BufferList, WriteRegion};

use core::ops::Range;

use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::error::LayoutError;
use crate::geometry::{ImageGeometry, overflow};
use crate::limits::NUM_BYTES_MAX;
use crate::planner::SegmentPlan;
use crate::segment::{RowSpan, Segment};
use uncompressed::UniformRaster;

/// Serialized metadata for the whole file, borrowed for the provider's
/// lifetime.
#[derive(Clone, Debug, Default)]
pub struct MetadataBlobs<'a> {
    /// Serialized file header, with all lengths already filled in.
    pub file_header: &'a [u8],
    /// One serialized image subheader per planned segment, in order.
    pub image_subheaders: Vec<&'a [u8]>,
    /// Every DES subheader followed by its data, contiguous.
    pub des: &'a [u8],
}

/// Which raster accounting a provider uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterKind {
    /// Fixed bytes per row.
    Uncompressed,
    /// Per-block compressed sizes.
    Compressed,
}

#[derive(Clone, Debug)]
enum Raster {
    Uncompressed(UniformRaster),
    Compressed(Vec<BlockTable>),
}

/// Where the next contiguous region starts, tracked by the caller across
/// successive [`LayoutProvider::get_bytes_with_cursor`] calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteCursor {
    /// First row after the last region written.
    pub next_row: usize,
    /// File offset one past the last region written.
    pub file_offset: u64,
}

/// Answers "which bytes go where" for row ranges of one image.
///
/// Immutable once built; share it freely across threads.
#[derive(Clone, Debug)]
pub struct LayoutProvider<'a> {
    blobs: MetadataBlobs<'a>,
    geometry: ImageGeometry,
    segments: Vec<Segment>,
    raster: Raster,
    payload_lengths: Vec<u64>,
    subheader_offsets: Vec<u64>,
    des_offset: u64,
    file_len: u64,
}

impl<'a> LayoutProvider<'a> {
    /// Provider for uncompressed (or fixed-ratio) pixel data.
    pub fn new(blobs: MetadataBlobs<'a>, plan: &SegmentPlan) -> Result<Self, LayoutError> {
        let raster = UniformRaster::new(plan.geometry())?;
        let payload_lengths = plan
            .segments()
            .iter()
            .map(|s| plan.geometry().segment_payload_bytes(s.num_rows))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(blobs, plan, Raster::Uncompressed(raster), payload_lengths)
    }

    /// Provider for compressed pixel data.
    ///
    /// `block_bytes[i]` lists the compressed size of every block of segment
    /// `i` in raster-scan block order.
    pub fn compressed(
        blobs: MetadataBlobs<'a>,
        plan: &SegmentPlan,
        block_bytes: Vec<Vec<usize>>,
    ) -> Result<Self, LayoutError> {
        if block_bytes.len() != plan.segments().len() {
            return Err(LayoutError::Configuration(alloc::format!(
                "plan has {} segments but block sizes were given for {}",
                plan.segments().len(),
                block_bytes.len()
            )));
        }
        let geometry = plan.geometry();
        let blocks_per_row = geometry.blocks_per_row()?;

        let mut tables = Vec::with_capacity(block_bytes.len());
        let mut payload_lengths = Vec::with_capacity(block_bytes.len());
        for (index, (segment, bytes)) in plan.segments().iter().zip(block_bytes).enumerate() {
            let expected = geometry.segment_block_count(segment.num_rows)?;
            // Surplus blocks would be counted in the payload but never written.
            if bytes.len() > expected {
                return Err(LayoutError::BlockRange {
                    segment: index,
                    start: 0,
                    end: bytes.len(),
                    available: expected,
                });
            }
            if bytes.len() < expected {
                warn!(
                    "segment {index}: block table has {} entries, geometry implies {expected}",
                    bytes.len()
                );
            }
            let table = BlockTable::new(
                bytes,
                geometry.segment_rows_per_block(segment.num_rows),
                blocks_per_row,
            )?
            .for_segment(index);
            payload_lengths.push(table.total_bytes());
            tables.push(table);
        }
        Self::build(blobs, plan, Raster::Compressed(tables), payload_lengths)
    }

    fn build(
        blobs: MetadataBlobs<'a>,
        plan: &SegmentPlan,
        raster: Raster,
        payload_lengths: Vec<u64>,
    ) -> Result<Self, LayoutError> {
        let segments = plan.segments().to_vec();
        if blobs.image_subheaders.len() != segments.len() {
            return Err(LayoutError::Configuration(alloc::format!(
                "plan has {} segments but {} image subheaders were given",
                segments.len(),
                blobs.image_subheaders.len()
            )));
        }

        let mut offset = blobs.file_header.len() as u64;
        let mut subheader_offsets = Vec::with_capacity(segments.len());
        for (index, (subheader, &payload)) in blobs
            .image_subheaders
            .iter()
            .zip(&payload_lengths)
            .enumerate()
        {
            if payload > NUM_BYTES_MAX {
                warn!("segment {index}: {payload}-byte payload exceeds the LI field limit");
            }
            subheader_offsets.push(offset);
            offset = offset
                .checked_add(subheader.len() as u64)
                .and_then(|o| o.checked_add(payload))
                .ok_or_else(|| overflow("segment offset"))?;
        }
        let des_offset = offset;
        let file_len = des_offset
            .checked_add(blobs.des.len() as u64)
            .ok_or_else(|| overflow("file length"))?;

        debug!(
            "layout for {} segment(s): DES at {des_offset}, {file_len} bytes total",
            segments.len()
        );

        Ok(Self {
            blobs,
            geometry: *plan.geometry(),
            segments,
            raster,
            payload_lengths,
            subheader_offsets,
            des_offset,
            file_len,
        })
    }

    /// Bytes the file will hold for global rows `[start_row, start_row + num_rows)`.
    ///
    /// Counts each header and the DES bytes only for the range that owns
    /// them, so ranges partitioning the image sum to [`Self::file_len`].
    pub fn total_bytes(&self, start_row: usize, num_rows: usize) -> Result<u64, LayoutError> {
        self.check_bounds(start_row, num_rows)?;
        if num_rows == 0 {
            return Ok(0);
        }

        let first = self.segments.partition_point(|s| s.end_row() <= start_row);
        let mut total = 0u64;
        for (index, segment) in self.segments.iter().enumerate().skip(first) {
            let Some(span) = segment.overlap(start_row, num_rows) else {
                break;
            };
            self.check_alignment(index, segment, span)?;
            total = total
                .checked_add(self.header_bytes(index, segment, span))
                .and_then(|t| t.checked_add(self.des_bytes(index, segment, span)))
                .ok_or_else(|| overflow("byte count"))?;
            let raster = match &self.raster {
                Raster::Uncompressed(uniform) => uniform.span_len(&self.geometry, segment, span)?,
                Raster::Compressed(tables) => {
                    let table = &tables[index];
                    let blocks = table.find_blocks(span.start - segment.first_row, span.num_rows)?;
                    table.count_bytes(blocks)? as u64
                }
            };
            total = total
                .checked_add(raster)
                .ok_or_else(|| overflow("byte count"))?;
        }
        Ok(total)
    }

    /// File offset and buffers for global rows `[start_row, start_row + num_rows)`.
    ///
    /// The range must lie within one segment. `pixels` must already be
    /// big-endian and, for blocked images, laid out in blocks with pad
    /// pixels; for compressed providers it holds the compressed blocks
    /// covering the range. Its leading bytes are borrowed, not copied.
    pub fn get_bytes<'s>(
        &'s self,
        pixels: &'s [u8],
        start_row: usize,
        num_rows: usize,
    ) -> Result<WriteRegion<'s>, LayoutError> {
        let (index, segment, span) = self.locate(start_row, num_rows)?;
        let raster = self.raster_range(index, segment, span)?;
        let data = pixel_slice(pixels, raster.len)?;
        let file_offset = self.region_offset(index, segment, span, raster.start_in_payload)?;
        let region = self.assemble(index, segment, span, data, file_offset);
        trace!(
            "rows [{start_row}, {}) -> {} bytes in {} buffer(s) at {file_offset}",
            span.end(),
            region.len(),
            region.buffers.len()
        );
        Ok(region)
    }

    /// Like [`Self::get_bytes`], continuing from a caller-owned cursor.
    ///
    /// When `start_row` is the cursor's `next_row`, the region starts at
    /// the cursor's offset without recomputing it (for compressed segments
    /// that avoids summing every preceding block). Otherwise the offset is
    /// computed from scratch. Returns the region and the advanced cursor.
    pub fn get_bytes_with_cursor<'s>(
        &'s self,
        pixels: &'s [u8],
        start_row: usize,
        num_rows: usize,
        cursor: WriteCursor,
    ) -> Result<(WriteRegion<'s>, WriteCursor), LayoutError> {
        let region = if cursor.next_row == start_row {
            let (index, segment, span) = self.locate(start_row, num_rows)?;
            let data = pixel_slice(pixels, self.raster_len(index, segment, span)?)?;
            self.assemble(index, segment, span, data, cursor.file_offset)
        } else {
            self.get_bytes(pixels, start_row, num_rows)?
        };
        let next = WriteCursor {
            next_row: start_row + num_rows,
            file_offset: region.end_offset(),
        };
        Ok((region, next))
    }

    /// Blocks of segment `segment` covering segment-relative rows
    /// `[start_row, start_row + num_rows)`.
    pub fn find_blocks(
        &self,
        segment: usize,
        start_row: usize,
        num_rows: usize,
    ) -> Result<Range<usize>, LayoutError> {
        self.table(segment)?.find_blocks(start_row, num_rows)
    }

    /// Compressed bytes of `blocks` in segment `segment`.
    pub fn count_bytes(&self, segment: usize, blocks: Range<usize>) -> Result<usize, LayoutError> {
        self.table(segment)?.count_bytes(blocks)
    }

    /// Total file length.
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn file_header(&self) -> &'a [u8] {
        self.blobs.file_header
    }

    pub fn image_subheaders(&self) -> &[&'a [u8]] {
        &self.blobs.image_subheaders
    }

    pub fn des(&self) -> &'a [u8] {
        self.blobs.des
    }

    /// File offset of each image subheader.
    pub fn subheader_offsets(&self) -> &[u64] {
        &self.subheader_offsets
    }

    /// File offset of the first DES subheader.
    pub fn des_offset(&self) -> u64 {
        self.des_offset
    }

    /// Raster payload length of each segment.
    pub fn payload_lengths(&self) -> &[u64] {
        &self.payload_lengths
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn kind(&self) -> RasterKind {
        match self.raster {
            Raster::Uncompressed(_) => RasterKind::Uncompressed,
            Raster::Compressed(_) => RasterKind::Compressed,
        }
    }

    /// Bytes per payload row, for uncompressed providers.
    pub fn bytes_per_row(&self) -> Option<u64> {
        match &self.raster {
            Raster::Uncompressed(uniform) => Some(uniform.bytes_per_row()),
            Raster::Compressed(_) => None,
        }
    }

    /// Block table of segment `segment`, for compressed providers.
    pub fn block_table(&self, segment: usize) -> Option<&BlockTable> {
        match &self.raster {
            Raster::Compressed(tables) => tables.get(segment),
            Raster::Uncompressed(_) => None,
        }
    }

    fn table(&self, segment: usize) -> Result<&BlockTable, LayoutError> {
        match &self.raster {
            Raster::Compressed(tables) => tables.get(segment).ok_or_else(|| {
                LayoutError::RowRange(alloc::format!(
                    "segment {segment} does not exist ({} segments)",
                    tables.len()
                ))
            }),
            Raster::Uncompressed(_) => Err(LayoutError::Configuration(
                "block tables exist only for compressed layouts".into(),
            )),
        }
    }

    fn check_bounds(&self, start_row: usize, num_rows: usize) -> Result<(), LayoutError> {
        let image_rows = self.geometry.num_rows;
        match start_row.checked_add(num_rows) {
            Some(end) if end <= image_rows => Ok(()),
            _ => Err(LayoutError::RowRange(alloc::format!(
                "rows [{start_row}, {start_row} + {num_rows}) exceed the image's {image_rows} rows"
            ))),
        }
    }

    /// The single segment holding the whole range.
    fn locate(&self, start_row: usize, num_rows: usize) -> Result<(usize, &Segment, RowSpan), LayoutError> {
        if num_rows == 0 {
            return Err(LayoutError::RowRange(alloc::format!(
                "empty row range at row {start_row}"
            )));
        }
        self.check_bounds(start_row, num_rows)?;
        let index = self.segments.partition_point(|s| s.end_row() <= start_row);
        let segment = self.segments.get(index).ok_or_else(|| {
            LayoutError::RowRange(alloc::format!("row {start_row} is in no segment"))
        })?;
        let span = RowSpan {
            start: start_row,
            num_rows,
        };
        if span.end() > segment.end_row() {
            return Err(LayoutError::RowRange(alloc::format!(
                "rows [{start_row}, {}) cross the end of segment {index} at row {}; split the range per segment",
                span.end(),
                segment.end_row()
            )));
        }
        self.check_alignment(index, segment, span)?;
        Ok((index, segment, span))
    }

    /// Blocked data must start on a block boundary and end on one or at
    /// the segment end. Compressed unblocked segments are one block-row,
    /// so they can only be written whole.
    fn check_alignment(&self, index: usize, segment: &Segment, span: RowSpan) -> Result<(), LayoutError> {
        if matches!(self.raster, Raster::Uncompressed(_)) && self.geometry.rows_per_block == 0 {
            return Ok(());
        }
        let per_block = self.geometry.segment_rows_per_block(segment.num_rows);
        if per_block == 0 {
            return Err(LayoutError::Arithmetic("attempted division by a zero block dimension"));
        }
        let local_start = span.start - segment.first_row;
        let reaches_end = span.end() == segment.end_row();
        if local_start % per_block != 0 || (span.num_rows % per_block != 0 && !reaches_end) {
            return Err(LayoutError::UnalignedRows {
                segment: index,
                row: span.start,
                num_rows: span.num_rows,
                rows_per_block: per_block,
            });
        }
        Ok(())
    }

    fn raster_len(&self, index: usize, segment: &Segment, span: RowSpan) -> Result<usize, LayoutError> {
        match &self.raster {
            Raster::Uncompressed(uniform) => {
                to_usize(uniform.span_len(&self.geometry, segment, span)?)
            }
            Raster::Compressed(tables) => {
                let table = &tables[index];
                table.count_bytes(table.find_blocks(span.start - segment.first_row, span.num_rows)?)
            }
        }
    }

    /// Length of the span's raster bytes and their offset in the payload.
    fn raster_range(&self, index: usize, segment: &Segment, span: RowSpan) -> Result<RasterRange, LayoutError> {
        match &self.raster {
            Raster::Uncompressed(uniform) => Ok(RasterRange {
                start_in_payload: uniform.span_offset(segment, span)?,
                len: to_usize(uniform.span_len(&self.geometry, segment, span)?)?,
            }),
            Raster::Compressed(tables) => {
                let table = &tables[index];
                let blocks = table.find_blocks(span.start - segment.first_row, span.num_rows)?;
                Ok(RasterRange {
                    start_in_payload: table.bytes_before(blocks.start)?,
                    len: table.count_bytes(blocks)?,
                })
            }
        }
    }

    fn enters_segment(segment: &Segment, span: RowSpan) -> bool {
        span.start == segment.first_row
    }

    fn exits_image(&self, index: usize, segment: &Segment, span: RowSpan) -> bool {
        index + 1 == self.segments.len() && span.end() == segment.end_row()
    }

    fn header_bytes(&self, index: usize, segment: &Segment, span: RowSpan) -> u64 {
        if !Self::enters_segment(segment, span) {
            return 0;
        }
        let mut bytes = self.blobs.image_subheaders[index].len() as u64;
        if index == 0 {
            bytes += self.blobs.file_header.len() as u64;
        }
        bytes
    }

    fn des_bytes(&self, index: usize, segment: &Segment, span: RowSpan) -> u64 {
        if self.exits_image(index, segment, span) {
            self.blobs.des.len() as u64
        } else {
            0
        }
    }

    /// Offset of the first byte a region for `span` writes.
    fn region_offset(
        &self,
        index: usize,
        segment: &Segment,
        span: RowSpan,
        start_in_payload: u64,
    ) -> Result<u64, LayoutError> {
        if Self::enters_segment(segment, span) {
            return Ok(if index == 0 {
                0
            } else {
                self.subheader_offsets[index]
            });
        }
        self.subheader_offsets[index]
            .checked_add(self.blobs.image_subheaders[index].len() as u64)
            .and_then(|o| o.checked_add(start_in_payload))
            .ok_or_else(|| overflow("raster offset"))
    }

    /// Headers, raster, then DES, as the range owns them.
    fn assemble<'s>(
        &'s self,
        index: usize,
        segment: &Segment,
        span: RowSpan,
        raster: &'s [u8],
        file_offset: u64,
    ) -> WriteRegion<'s> {
        let mut buffers = BufferList::new();
        if Self::enters_segment(segment, span) {
            if index == 0 {
                buffers.push(self.blobs.file_header);
            }
            buffers.push(self.blobs.image_subheaders[index]);
        }
        buffers.push(raster);
        if self.exits_image(index, segment, span) {
            buffers.push(self.blobs.des);
        }
        WriteRegion {
            file_offset,
            buffers,
        }
    }
}

struct RasterRange {
    start_in_payload: u64,
    len: usize,
}

fn to_usize(n: u64) -> Result<usize, LayoutError> {
    usize::try_from(n).map_err(|_| {
        LayoutError::Configuration(alloc::format!("{n} bytes do not fit in memory on this target"))
    })
}

fn pixel_slice(pixels: &[u8], len: usize) -> Result<&[u8], LayoutError> {
    pixels.get(..len).ok_or(LayoutError::BufferTooSmall {
        needed: len,
        actual: pixels.len(),
    })
}
