use criterion::{black_box, criterion_group, BatchSize, Criterion, Throughput};
use pprof::criterion::{Output, PProfProfiler};

use dune_wib_compress::config::{Identity, Mode, ModuleConfig};
use dune_wib_compress::packet::PacketAssembler;
use dune_wib_compress::wib::{InputWord, WibFrameBuilder, WibId, FRAME_NWORDS};
use dune_wib_compress::{MODULE_NCHANNELS, PACKET_NSAMPLES};

use crate::benchmarks::{get_channels, pin_to_core};

fn frames() -> Vec<[InputWord; FRAME_NWORDS]> {
    let channels = get_channels();
    let wib = WibId::new(1, 2, 3);
    let mut builder = WibFrameBuilder::new(wib);
    (0..PACKET_NSAMPLES)
        .map(|isample| {
            let adcs = channels.iter().map(|channel| channel[isample]).collect::<Vec<_>>();
            builder.build(&adcs)
        })
        .collect()
}

fn assembly_benchmark(c: &mut Criterion) {
    pin_to_core();
    let frames = frames();

    let mut group = c.benchmark_group("packet benchmark");
    group.throughput(Throughput::Elements((MODULE_NCHANNELS * PACKET_NSAMPLES) as u64));
    group.sample_size(10);
    for mode in [Mode::Compress, Mode::Transpose, Mode::Copy] {
        let config = ModuleConfig::default()
            .with_mode(mode)
            .with_wib_id(Identity::Fixed(WibId::new(1, 2, 3)));
        group.bench_function(format!("{}", mode).trim(), |b| {
            b.iter_batched(
                || PacketAssembler::new(&config).unwrap(),
                |mut assembler| {
                    for frame in &frames {
                        if let Some(packet) = assembler.push_frame(frame).unwrap() {
                            black_box(packet);
                        }
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group! {
    name = packet_benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = assembly_benchmark
    }
