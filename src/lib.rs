//! # nitf-layout
//!
//! Segment planning and streaming file layout for writing large NITF images.
//!
//! A NITF image segment can hold at most 99,999 rows and 9,999,999,998 bytes
//! of pixel data, so a large image is written as a chain of segments. This
//! crate decides how to split an image and, given the serialized headers,
//! tells a writer exactly which bytes belong at which file offset for any
//! row range. Ranges can be produced in any order, by any number of threads,
//! and the file never has to exist in memory.
//!
//! ## What it does not do
//!
//! - Serialize or parse NITF headers (the caller brings the bytes)
//! - Compress pixels (the caller brings the compressed block sizes)
//! - Byte-swap or block-interleave pixels
//! - Perform I/O, beyond the optional [`WriteRegion::write_to`] helper
//!
//! ## Usage
//!
//! ```
//! use nitf_layout::{LayoutProvider, MetadataBlobs, SegmentPlanner};
//!
//! let plan = SegmentPlanner::new(8, 4, 2).with_max_rows(4).plan()?;
//! assert_eq!(plan.segments().len(), 2);
//!
//! let blobs = MetadataBlobs {
//!     file_header: b"FHDR",
//!     image_subheaders: vec![&b"IS0"[..], &b"IS1"[..]],
//!     des: b"",
//! };
//! let provider = LayoutProvider::new(blobs, &plan)?;
//!
//! // Rows 4..8 are all of segment 1: its subheader, then 4 rows of 8 bytes.
//! let pixels = [0u8; 32];
//! let region = provider.get_bytes(&pixels, 4, 4)?;
//! assert_eq!(region.file_offset, 4 + 3 + 32);
//! assert_eq!(region.len(), 3 + 32);
//! # Ok::<(), nitf_layout::LayoutError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod error;
mod geometry;
mod layout;
mod limits;
mod pixel;
mod planner;
mod segment;

// Re-exports
pub use error::LayoutError;
pub use geometry::ImageGeometry;
pub use layout::{
    BlockTable, BufferList, LayoutProvider, MetadataBlobs, RasterKind, WriteCursor, WriteRegion,
};
pub use limits::{ILOC_MAX, NUM_BYTES_MAX, SegmentLimits};
pub use pixel::{PixelType, bytes_per_pixel_for};
pub use planner::{SegmentPlan, SegmentPlanner};
pub use segment::{RowSpan, Segment};
