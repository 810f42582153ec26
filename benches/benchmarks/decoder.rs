use criterion::{black_box, criterion_group, BenchmarkId, Criterion, Throughput};
use pprof::criterion::{Output, PProfProfiler};

use dune_wib_compress::bitstream::{BitReader, StreamLayout};
use dune_wib_compress::codec::channel::{decode_channel, encode_adcs};
use dune_wib_compress::codec::encoder::ArithmeticEncoder;
use dune_wib_compress::codec::table::LookupStrategy;
use dune_wib_compress::{MODULE_NCHANNELS, PACKET_NSAMPLES};

use crate::benchmarks::{get_channels, pin_to_core, NBINS};

fn decode_benchmark(c: &mut Criterion) {
    pin_to_core();
    let layout = StreamLayout::Words64;
    let encoded = get_channels()
        .iter()
        .map(|adcs| {
            let (words, _) = encode_adcs::<ArithmeticEncoder>(adcs, NBINS).unwrap().bits.into_words();
            layout.to_bytes(&words)
        })
        .collect::<Vec<_>>();

    let mut group = c.benchmark_group("decoder benchmark");
    group.measurement_time(std::time::Duration::from_secs(10));
    group.throughput(Throughput::Elements((MODULE_NCHANNELS * PACKET_NSAMPLES) as u64));
    group.sample_size(20);
    for strategy in [LookupStrategy::Binary, LookupStrategy::Bottom, LookupStrategy::Top] {
        group.bench_with_input(
            BenchmarkId::new("lookup", format!("{:?}", strategy)),
            &strategy,
            |b, strategy| {
                b.iter(|| {
                    for bytes in &encoded {
                        let reader = BitReader::new(bytes, layout, 0);
                        black_box(decode_channel(reader, PACKET_NSAMPLES, *strategy).unwrap());
                    }
                })
            },
        );
    }
    group.finish();
}

criterion_group! {
    name = decoder_benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = decode_benchmark
    }
