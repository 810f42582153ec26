use criterion::{black_box, criterion_group, BenchmarkId, Criterion, Throughput};
use pprof::criterion::{Output, PProfProfiler};

use dune_wib_compress::codec::channel::encode_adcs;
use dune_wib_compress::codec::encoder::ArithmeticEncoder;
use dune_wib_compress::codec::reference::ReferenceEncoder;
use dune_wib_compress::{MODULE_NCHANNELS, PACKET_NSAMPLES};

use crate::benchmarks::{get_channels, pin_to_core, NBINS};

fn encode_benchmark(c: &mut Criterion) {
    pin_to_core();
    let channels = get_channels();

    let mut group = c.benchmark_group("encoder benchmark");
    group.throughput(Throughput::Elements((MODULE_NCHANNELS * PACKET_NSAMPLES) as u64));
    group.sample_size(20);
    group.bench_function("arithmetic", |b| {
        b.iter(|| {
            for adcs in &channels {
                black_box(encode_adcs::<ArithmeticEncoder>(adcs, NBINS).unwrap());
            }
        })
    });
    group.bench_function("reference", |b| {
        b.iter(|| {
            for adcs in &channels {
                black_box(encode_adcs::<ReferenceEncoder>(adcs, NBINS).unwrap());
            }
        })
    });
    for nbins in [64, 128] {
        group.bench_with_input(BenchmarkId::new("nbins", nbins), &nbins, |b, nbins| {
            b.iter(|| {
                for adcs in &channels {
                    black_box(encode_adcs::<ArithmeticEncoder>(adcs, *nbins).unwrap());
                }
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = encoder_benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = encode_benchmark
    }
