//! Compressed layouts: block tables drive payload sizes and offsets.

use std::io::Cursor;

use nitf_layout::*;

struct Noise(u32);

impl Noise {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        self.next() as usize % n
    }
}

const HEADER: &[u8] = b"NITF02.10 header";
const DES: &[u8] = b"DESDATA";

fn subheaders(n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("IM{i:03}").into_bytes()).collect()
}

fn blobs(subs: &[Vec<u8>]) -> MetadataBlobs<'_> {
    MetadataBlobs {
        file_header: HEADER,
        image_subheaders: subs.iter().map(Vec::as_slice).collect(),
        des: DES,
    }
}

#[test]
fn second_block_row_of_four_blocks() {
    let plan = SegmentPlanner::new(4, 4, 1).with_blocking(2, 2).plan().unwrap();
    let subs = subheaders(1);
    let provider =
        LayoutProvider::compressed(blobs(&subs), &plan, vec![vec![100, 150, 90, 120]]).unwrap();

    let blocks = provider.find_blocks(0, 2, 2).unwrap();
    assert_eq!(blocks, 2..4);
    assert_eq!(provider.count_bytes(0, blocks).unwrap(), 210);

    let table = provider.block_table(0).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.rows_per_block(), 2);
    assert_eq!(table.blocks_per_row(), 2);
    assert_eq!(provider.bytes_per_row(), None);
}

#[test]
fn offsets_follow_preceding_segments() {
    // Two segments of 4 rows, 2x2 blocks over 4 columns: 4 blocks each.
    let plan = SegmentPlanner::new(8, 4, 1)
        .with_blocking(2, 2)
        .with_max_rows(4)
        .plan()
        .unwrap();
    let subs = subheaders(2);
    let tables = vec![vec![10, 20, 30, 40], vec![5, 6, 7, 8]];
    let provider = LayoutProvider::compressed(blobs(&subs), &plan, tables).unwrap();

    assert_eq!(provider.payload_lengths(), &[100, 26]);
    let sub1 = (HEADER.len() + 5 + 100) as u64;
    assert_eq!(provider.subheader_offsets(), &[HEADER.len() as u64, sub1]);
    assert_eq!(provider.des_offset(), sub1 + 5 + 26);

    // Second block-row of the second segment.
    let data = [0u8; 15];
    let region = provider.get_bytes(&data, 6, 2).unwrap();
    assert_eq!(region.file_offset, sub1 + 5 + 11);
    assert_eq!(region.len(), 15 + DES.len() as u64);
    assert_eq!(region.end_offset(), provider.file_len());
}

#[test]
fn short_block_table_fails_at_query() {
    let plan = SegmentPlanner::new(4, 4, 1).with_blocking(2, 2).plan().unwrap();
    let subs = subheaders(1);
    // Only the first block-row was supplied.
    let provider = LayoutProvider::compressed(blobs(&subs), &plan, vec![vec![100, 150]]).unwrap();

    assert_eq!(provider.total_bytes(0, 2).unwrap(), (HEADER.len() + 5 + 250) as u64);
    let err = provider.total_bytes(2, 2).unwrap_err();
    assert!(matches!(
        err,
        LayoutError::BlockRange {
            segment: 0,
            start: 2,
            end: 4,
            available: 2
        }
    ));
    assert!(matches!(
        provider.get_bytes(&[0u8; 1_000], 2, 2),
        Err(LayoutError::BlockRange { .. })
    ));
}

#[test]
fn surplus_block_table_is_rejected_before_layout() {
    let plan = SegmentPlanner::new(4, 4, 1).with_blocking(2, 2).plan().unwrap();
    let subs = subheaders(1);
    let result = LayoutProvider::compressed(blobs(&subs), &plan, vec![vec![10, 10, 10, 10, 99]]);
    assert!(matches!(
        result,
        Err(LayoutError::BlockRange {
            segment: 0,
            end: 5,
            available: 4,
            ..
        })
    ));

    // The exact table lays out a file whose ranges add up.
    let provider =
        LayoutProvider::compressed(blobs(&subs), &plan, vec![vec![10, 10, 10, 10]]).unwrap();
    let sum = provider.total_bytes(0, 2).unwrap() + provider.total_bytes(2, 2).unwrap();
    assert_eq!(sum, provider.file_len());
}

#[test]
fn cursor_walks_compressed_segments() {
    let plan = SegmentPlanner::new(8, 4, 1)
        .with_blocking(2, 2)
        .with_max_rows(4)
        .plan()
        .unwrap();
    let subs = subheaders(2);
    let tables = vec![vec![10, 20, 30, 40], vec![5, 6, 7, 8]];
    let provider = LayoutProvider::compressed(blobs(&subs), &plan, tables).unwrap();
    let data = [0xA5u8; 100];

    let mut cursor = WriteCursor::default();
    for start in (0..8).step_by(2) {
        let (region, next) = provider
            .get_bytes_with_cursor(&data, start, 2, cursor)
            .unwrap();
        assert_eq!(region.file_offset, cursor.file_offset);
        assert_eq!(region, provider.get_bytes(&data, start, 2).unwrap());
        assert_eq!(next.next_row, start + 2);
        cursor = next;
    }
    assert_eq!(cursor.file_offset, provider.file_len());
}

#[test]
fn unblocked_compressed_segment_is_written_whole() {
    let plan = SegmentPlanner::new(6, 6, 1).plan().unwrap();
    let subs = subheaders(1);
    let provider = LayoutProvider::compressed(blobs(&subs), &plan, vec![vec![17]]).unwrap();
    assert!(matches!(
        provider.get_bytes(&[0u8; 17], 0, 3),
        Err(LayoutError::UnalignedRows { .. })
    ));
    let region = provider.get_bytes(&[0u8; 17], 0, 6).unwrap();
    assert_eq!(region.len(), provider.file_len());
}

#[test]
fn table_count_must_match_segments() {
    let plan = SegmentPlanner::new(8, 4, 1)
        .with_blocking(2, 2)
        .with_max_rows(4)
        .plan()
        .unwrap();
    let subs = subheaders(2);
    let result = LayoutProvider::compressed(blobs(&subs), &plan, vec![vec![1; 4]]);
    assert!(matches!(result, Err(LayoutError::Configuration(_))));
}

#[test]
fn random_block_sizes_rebuild_the_file() {
    let mut noise = Noise(0xB10C_5123);
    for _ in 0..25 {
        let rpb = 1 + noise.below(8);
        let cpb = 1 + noise.below(8);
        let rows = 1 + noise.below(60);
        let cols = 1 + noise.below(40);
        let max_rows = rpb * (1 + noise.below(3));
        let plan = SegmentPlanner::new(rows, cols, 1)
            .with_blocking(rpb, cpb)
            .with_max_rows(max_rows)
            .plan()
            .unwrap();
        let g = *plan.geometry();
        let subs = subheaders(plan.segments().len());

        // One distinct fill byte per block so misplaced blocks show up.
        let mut tables = Vec::new();
        let mut payloads = Vec::new();
        for seg in plan.segments() {
            let count = g.segment_block_count(seg.num_rows).unwrap();
            let sizes: Vec<usize> = (0..count).map(|_| 1 + noise.below(50)).collect();
            let payload: Vec<u8> = sizes
                .iter()
                .enumerate()
                .flat_map(|(b, &n)| std::iter::repeat_n(b as u8, n))
                .collect();
            tables.push(sizes);
            payloads.push(payload);
        }
        let provider = LayoutProvider::compressed(blobs(&subs), &plan, tables).unwrap();

        // One range per block-row, written back to front.
        let mut ranges = Vec::new();
        for (i, seg) in plan.segments().iter().enumerate() {
            let per_block = g.segment_rows_per_block(seg.num_rows);
            let mut row = 0;
            while row < seg.num_rows {
                let n = per_block.min(seg.num_rows - row);
                ranges.push((i, seg.first_row + row, n));
                row += n;
            }
        }
        ranges.reverse();

        let mut file = Cursor::new(vec![0u8; provider.file_len() as usize]);
        let mut counted = 0;
        for (i, start, n) in ranges {
            let local = start - plan.segments()[i].first_row;
            let blocks = provider.find_blocks(i, local, n).unwrap();
            let skip: usize = provider.block_table(i).unwrap().block_bytes()[..blocks.start]
                .iter()
                .sum();
            let region = provider.get_bytes(&payloads[i][skip..], start, n).unwrap();
            counted += provider.total_bytes(start, n).unwrap();
            region.write_to(&mut file).unwrap();
        }
        let file = file.into_inner();
        assert_eq!(counted, provider.file_len());

        assert_eq!(&file[..HEADER.len()], HEADER);
        for (i, sub) in subs.iter().enumerate() {
            let at = provider.subheader_offsets()[i] as usize;
            assert_eq!(&file[at..at + sub.len()], &sub[..]);
            let raster = at + sub.len();
            assert_eq!(&file[raster..raster + payloads[i].len()], &payloads[i][..]);
        }
        assert_eq!(&file[provider.des_offset() as usize..], DES);
    }
}
