#![no_main]
use libfuzzer_sys::fuzz_target;
use nitf_layout::*;

fn take<const N: usize>(data: &mut &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = N.min(data.len());
    out[..n].copy_from_slice(&data[..n]);
    *data = &data[n..];
    out
}

fuzz_target!(|data: &[u8]| {
    let mut data = data;
    let rows = u32::from_le_bytes(take(&mut data)) as usize % 2_000_000;
    let cols = u16::from_le_bytes(take(&mut data)) as usize;
    let [bpp, rpb, cpb] = take(&mut data);
    let max_rows = u32::from_le_bytes(take(&mut data)) as usize;
    let max_bytes = u64::from_le_bytes(take(&mut data));

    // Must never panic, whatever the limits.
    let Ok(plan) = SegmentPlanner::new(rows, cols, bpp as usize)
        .with_blocking(rpb as usize * 16, cpb as usize * 16)
        .with_max_rows(max_rows)
        .with_max_bytes(max_bytes)
        .plan()
    else {
        return;
    };

    let mut next_row = 0;
    for (i, seg) in plan.segments().iter().enumerate() {
        assert_eq!(seg.first_row, next_row, "segments must be contiguous");
        assert!(seg.num_rows > 0);
        if plan.segments().len() > 1 {
            assert!(seg.num_rows <= plan.row_limit());
        }
        let payload = plan.payload_bytes(i).unwrap();
        assert!(payload <= plan.max_bytes_per_segment());
        next_row = seg.end_row();
    }
    assert_eq!(next_row, rows);
});
