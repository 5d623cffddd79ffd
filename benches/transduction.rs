//! Micro-benchmark for the backtracking transduction search.
//!
//! Builds a small identity-like FST (every symbol maps to itself via an
//! input-epsilon-free single-class alphabet) and measures `transduce` cost
//! as input length grows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use picocore::bytestream::encode_varint_zigzag;
use picocore::engine::transduce;
use picocore::error::NullSink;
use picocore::fst::FstImage;
use picocore::symbol::{Position, PosSym, ILLEG};

/// Builds a single-state, single-class identity FST over symbols
/// `1..=alphabet_size`, accepting in state 1.
fn build_identity_fst(alphabet_size: i16) -> Vec<u8> {
    // One hash slot per symbol, indexed by `sym.rem_euclid(alphabet_size)`
    // to match `FstImage::start_pair_search`'s hash function exactly.
    let hash_tab_size = alphabet_size as usize;
    let cells_rel = hash_tab_size * 4;
    let mut alpha_region = vec![0u8; cells_rel];
    let mut offset = cells_rel;
    for sym in 1..=alphabet_size {
        let h = (sym as i64).rem_euclid(alphabet_size as i64) as usize;
        let slot = h * 4;
        alpha_region[slot..slot + 4].copy_from_slice(&(offset as i32).to_be_bytes());
        let mut one_cell = Vec::new();
        encode_varint_zigzag(i32::from(sym), &mut one_cell);
        encode_varint_zigzag(0, &mut one_cell);
        encode_varint_zigzag(i32::from(sym), &mut one_cell);
        encode_varint_zigzag(1, &mut one_cell);
        encode_varint_zigzag(ILLEG as i32, &mut one_cell);
        offset += one_cell.len();
        alpha_region.extend_from_slice(&one_cell);
    }

    let trans_rel = alpha_region.len();
    let trans_region = vec![1u8]; // 1 state x 1 class, width 1: state 1

    let in_eps_rel = trans_rel + trans_region.len();
    let in_eps_region = vec![0u8; 4]; // no in-eps transitions

    let acc_rel = in_eps_rel + in_eps_region.len();
    let acc_region = vec![1u8]; // state 1 accepting

    let mut body = Vec::new();
    body.extend_from_slice(&alpha_region);
    body.extend_from_slice(&trans_region);
    body.extend_from_slice(&in_eps_region);
    body.extend_from_slice(&acc_region);

    let mut header = Vec::new();
    encode_varint_zigzag(0, &mut header); // mode
    encode_varint_zigzag(1, &mut header); // classes
    encode_varint_zigzag(1, &mut header); // states
    encode_varint_zigzag(1, &mut header); // term class
    encode_varint_zigzag(hash_tab_size as i32, &mut header);
    encode_varint_zigzag(0, &mut header); // alpha offset
    encode_varint_zigzag(1, &mut header); // trans entry width
    encode_varint_zigzag(trans_rel as i32, &mut header);
    encode_varint_zigzag(in_eps_rel as i32, &mut header);
    encode_varint_zigzag(acc_rel as i32, &mut header);

    let mut image = vec![0u8; 4];
    image.extend_from_slice(&header);
    image.extend_from_slice(&body);
    image
}

fn bench_transduce_identity(c: &mut Criterion) {
    let image = build_identity_fst(32);
    let fst = FstImage::load(&image).unwrap();
    let mut group = c.benchmark_group("transduce_identity");

    for len in [8usize, 64, 256, 1024] {
        let input: Vec<PosSym> =
            (0..len).map(|i| PosSym::new(Position::Real(i as u32), (i % 32 + 1) as i16)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &input, |b, input| {
            b.iter(|| {
                let mut out = Vec::new();
                let mut sink = NullSink;
                let outcome = transduce(&fst, true, black_box(input), &mut out, 4096, 512, None, &mut sink);
                black_box(outcome);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_transduce_identity);
criterion_main!(benches);
