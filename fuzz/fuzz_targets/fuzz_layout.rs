#![no_main]
use libfuzzer_sys::fuzz_target;
use nitf_layout::*;

fuzz_target!(|data: &[u8]| {
    let [rows, cols, bpp, rpb, max_rows, start, count, header, ..] = *data else {
        return;
    };
    let rest = &data[8..];

    let Ok(plan) = SegmentPlanner::new(rows as usize, cols as usize, bpp as usize % 8)
        .with_blocking(rpb as usize % 16, 0)
        .with_max_rows(max_rows as usize)
        .plan()
    else {
        return;
    };

    let subheaders: Vec<&[u8]> = plan
        .segments()
        .iter()
        .enumerate()
        .map(|(i, _)| &rest[..i.min(rest.len())])
        .collect();
    let blobs = MetadataBlobs {
        file_header: &rest[..(header as usize).min(rest.len())],
        image_subheaders: subheaders,
        des: rest,
    };
    let Ok(provider) = LayoutProvider::new(blobs, &plan) else {
        return;
    };

    // Whole-segment ranges always succeed and partition the file.
    let pixels = vec![0u8; provider.payload_lengths().iter().copied().max().unwrap_or(0) as usize];
    let mut sum = 0;
    for seg in provider.segments() {
        let region = provider.get_bytes(&pixels, seg.first_row, seg.num_rows).unwrap();
        assert_eq!(region.len(), provider.total_bytes(seg.first_row, seg.num_rows).unwrap());
        sum += region.len();
    }
    assert_eq!(sum, provider.file_len());

    // Arbitrary ranges may fail but must never panic.
    let _ = provider.get_bytes(rest, start as usize, count as usize);
    let _ = provider.total_bytes(start as usize, count as usize);
});
