//! Splitting one logical image into NITF image segments.
//!
//! Two fixed-width header fields bound a segment. ILOC carries the row
//! offset from the previous segment in five digits, and LI carries the
//! payload length in ten. The planner finds the largest row count per
//! segment that respects both and chains the segments top to bottom.

use alloc::vec::Vec;

use log::{debug, warn};

use crate::error::LayoutError;
use crate::geometry::{ImageGeometry, overflow};
use crate::limits::{NUM_BYTES_MAX, SegmentLimits};
use crate::pixel::PixelType;
use crate::segment::Segment;

/// NUMI is three digits wide.
const NUMI_MAX: usize = 999;

/// Segmentation request for one image.
///
/// ```
/// use nitf_layout::{SegmentLimits, SegmentPlanner};
///
/// let plan = SegmentPlanner::new(12_000, 6_000, 2)
///     .with_limits(SegmentLimits {
///         max_rows: 5_000,
///         ..Default::default()
///     })
///     .plan()?;
/// assert_eq!(plan.segments().len(), 3);
/// # Ok::<(), nitf_layout::LayoutError>(())
/// ```
#[derive(Clone, Debug)]
pub struct SegmentPlanner {
    geometry: ImageGeometry,
    limits: SegmentLimits,
}

impl SegmentPlanner {
    /// Unblocked image with the default format limits.
    pub fn new(num_rows: usize, num_cols: usize, bytes_per_pixel: usize) -> Self {
        Self {
            geometry: ImageGeometry::new(num_rows, num_cols, bytes_per_pixel),
            limits: SegmentLimits::default(),
        }
    }

    /// Image of a known product pixel type.
    pub fn for_pixel_type(num_rows: usize, num_cols: usize, pixel_type: PixelType) -> Self {
        Self::new(num_rows, num_cols, pixel_type.bytes_per_pixel())
    }

    /// Plan for an existing geometry (blocking included).
    pub fn for_geometry(geometry: ImageGeometry) -> Self {
        Self {
            geometry,
            limits: SegmentLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SegmentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.limits.max_rows = max_rows;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.limits.max_bytes = max_bytes;
        self
    }

    /// Block shape in pixels; 0 leaves that dimension unblocked.
    pub fn with_blocking(mut self, rows_per_block: usize, cols_per_block: usize) -> Self {
        self.geometry = self.geometry.with_blocking(rows_per_block, cols_per_block);
        self
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn limits(&self) -> &SegmentLimits {
        &self.limits
    }

    /// Compute the segment layout.
    pub fn plan(&self) -> Result<SegmentPlan, LayoutError> {
        self.limits.check()?;
        self.geometry.check()?;
        let g = &self.geometry;

        let row_limit = self.row_limit()?;

        // A lone segment has no ILOC offset to overflow.
        let exempt = !g.is_blocked() && self.limits.row_ceiling_is_iloc();
        let single = g.num_rows <= row_limit
            || (exempt && g.segment_payload_bytes(g.num_rows)? <= self.limits.max_bytes);

        let segments = if single {
            alloc::vec![Segment {
                first_row: 0,
                row_offset: 0,
                num_rows: g.num_rows,
            }]
        } else {
            chain_segments(g.num_rows, row_limit)
        };

        let plan = SegmentPlan::assemble(*g, segments, row_limit, self.limits.max_bytes)?;
        debug!(
            "planned {} segment(s) for {}x{} image: row limit {}, {} payload bytes",
            plan.segments.len(),
            g.num_rows,
            g.num_cols,
            row_limit,
            plan.total_bytes
        );
        if plan.segments.len() > NUMI_MAX {
            warn!(
                "{} image segments exceed the {NUMI_MAX} a file header can list",
                plan.segments.len()
            );
        }
        Ok(plan)
    }

    /// Most rows one segment may hold under both ceilings.
    fn row_limit(&self) -> Result<usize, LayoutError> {
        let g = &self.geometry;
        let bytes_per_row = g.bytes_per_row()?;

        // Integer division truncates; segment boundaries depend on it.
        let by_size = self.limits.max_bytes / bytes_per_row;
        if by_size == 0 {
            return Err(LayoutError::Configuration(alloc::format!(
                "a single {bytes_per_row}-byte row exceeds the {}-byte segment limit",
                self.limits.max_bytes
            )));
        }
        let mut limit = usize::try_from(by_size)
            .unwrap_or(usize::MAX)
            .min(self.limits.max_rows);

        if g.rows_per_block != 0 {
            let per_block = g.segment_rows_per_block(g.num_rows);
            limit = (limit / per_block) * per_block;
            if limit == 0 {
                return Err(LayoutError::Configuration(alloc::format!(
                    "not even one {per_block}-row block of {bytes_per_row}-byte rows fits the limits \
                     ({} rows, {} bytes)",
                    self.limits.max_rows,
                    self.limits.max_bytes
                )));
            }
        }
        Ok(limit)
    }
}

/// Consecutive chunks of `row_limit` rows, each offset by its predecessor.
fn chain_segments(num_rows: usize, row_limit: usize) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(num_rows.div_ceil(row_limit));
    let mut first_row = 0;
    let mut row_offset = 0;
    while first_row < num_rows {
        let rows = row_limit.min(num_rows - first_row);
        segments.push(Segment {
            first_row,
            row_offset,
            num_rows: rows,
        });
        row_offset = rows;
        first_row += rows;
    }
    segments
}

/// Ordered image segments covering an image, with their payload sizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentPlan {
    geometry: ImageGeometry,
    segments: Vec<Segment>,
    payload_bytes: Vec<u64>,
    total_bytes: u64,
    row_limit: usize,
    max_bytes: u64,
}

impl SegmentPlan {
    /// Plan from segment row counts already fixed elsewhere, e.g. read back
    /// from existing image subheaders.
    ///
    /// Segments are chained in the given order. No ceilings are enforced.
    pub fn from_row_counts(geometry: ImageGeometry, row_counts: &[usize]) -> Result<Self, LayoutError> {
        geometry.check()?;
        let mut segments = Vec::with_capacity(row_counts.len());
        let mut first_row = 0usize;
        let mut row_offset = 0;
        for (index, &rows) in row_counts.iter().enumerate() {
            if rows == 0 {
                return Err(LayoutError::Configuration(alloc::format!(
                    "segment {index} has no rows"
                )));
            }
            segments.push(Segment {
                first_row,
                row_offset,
                num_rows: rows,
            });
            row_offset = rows;
            first_row = first_row
                .checked_add(rows)
                .ok_or_else(|| overflow("row count"))?;
        }
        if first_row != geometry.num_rows {
            return Err(LayoutError::Configuration(alloc::format!(
                "segments cover {first_row} rows but the image has {}",
                geometry.num_rows
            )));
        }
        let row_limit = row_counts.iter().copied().max().unwrap_or(0);
        Self::assemble(geometry, segments, row_limit, NUM_BYTES_MAX)
    }

    fn assemble(
        geometry: ImageGeometry,
        segments: Vec<Segment>,
        row_limit: usize,
        max_bytes: u64,
    ) -> Result<Self, LayoutError> {
        let payload_bytes = segments
            .iter()
            .map(|s| geometry.segment_payload_bytes(s.num_rows))
            .collect::<Result<Vec<_>, _>>()?;
        let total_bytes = payload_bytes
            .iter()
            .try_fold(0u64, |acc, &n| acc.checked_add(n))
            .ok_or_else(|| overflow("image payload size"))?;
        Ok(Self {
            geometry,
            segments,
            payload_bytes,
            total_bytes,
            row_limit,
            max_bytes,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Rows in the whole image.
    pub fn num_rows(&self) -> usize {
        self.geometry.num_rows
    }

    /// Sum of all segment payload bytes, pad pixels included.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Effective maximum rows per segment.
    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    pub fn max_bytes_per_segment(&self) -> u64 {
        self.max_bytes
    }

    /// Uncompressed payload bytes of segment `index`.
    pub fn payload_bytes(&self, index: usize) -> Option<u64> {
        self.payload_bytes.get(index).copied()
    }

    /// Index and descriptor of the segment holding global `row`.
    pub fn segment_for_row(&self, row: usize) -> Option<(usize, &Segment)> {
        let index = self.segments.partition_point(|s| s.end_row() <= row);
        self.segments
            .get(index)
            .filter(|s| s.contains_row(row))
            .map(|s| (index, s))
    }
}
