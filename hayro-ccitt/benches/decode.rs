use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hayro_ccitt::encode::{EncodeSettings, encode};
use hayro_ccitt::{Compression, DecodeSettings, T4Options, Warnings};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::hint::black_box;

const COLUMNS: u32 = 1728;
const ROWS: u32 = 512;

struct Ignore;

impl Warnings for Ignore {
    fn warning(&mut self, _: &str) {}
}

/// Rows resembling scanned text: mostly white with short black runs that
/// repeat across neighboring rows.
fn document() -> Vec<u8> {
    let mut rng = XorShiftRng::seed_from_u64(0);
    let stride = COLUMNS.div_ceil(8) as usize;
    let mut data = vec![0; stride * ROWS as usize];
    let mut template = vec![0; stride];

    for y in 0..ROWS as usize {
        if y % 8 == 0 {
            template.fill(0);

            for _ in 0..40 {
                let start = rng.random_range(0..COLUMNS - 16);
                let len = rng.random_range(1..16);

                for x in start..start + len {
                    template[x as usize / 8] |= 0x80 >> (x % 8);
                }
            }
        }

        data[y * stride..(y + 1) * stride].copy_from_slice(&template);
    }

    data
}

fn decoding(c: &mut Criterion) {
    let image = document();
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(image.len() as u64));

    let schemes = [
        ("mh", Compression::ModifiedHuffman, T4Options::empty(), 0),
        ("t4-1d", Compression::Group3, T4Options::empty(), 0),
        ("t4-2d", Compression::Group3, T4Options::TWO_DIMENSIONAL, 4),
        ("t6", Compression::Group4, T4Options::empty(), 0),
    ];

    for (name, compression, t4_options, k) in schemes {
        let encoded = encode(
            &image,
            &EncodeSettings {
                columns: COLUMNS,
                compression,
                t4_options,
                k,
            },
        );

        let settings = DecodeSettings {
            columns: COLUMNS,
            rows: ROWS,
            compression,
            t4_options,
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(name), &encoded, |b, data| {
            b.iter(|| hayro_ccitt::decode(black_box(data), &settings, &mut Ignore));
        });
    }

    group.finish();
}

criterion_group!(benches, decoding);
criterion_main!(benches);
