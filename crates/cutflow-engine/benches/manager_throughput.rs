use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cutflow_core::event::DataOrigin;
use cutflow_engine::builder::{PipelineBuilder, VaryMode};
use cutflow_engine::config::CutTable;
use cutflow_engine::shard::run_sharded;
use cutflow_engine::source::{SourceConfig, SyntheticSource};

const EVENTS: u64 = 2_000;

fn loose_table() -> CutTable {
    let mut table = CutTable::default();
    table.boson.pt_min = 0.0;
    table.leading_jet.pt_min = 40.0;
    table.taus.min = 0;
    table.taus.max = 3;
    table
}

fn bench_single_pass(c: &mut Criterion) {
    let table = loose_table();
    let mut group = c.benchmark_group("manager_throughput");
    for mode in [VaryMode::Met, VaryMode::Both] {
        group.bench_with_input(BenchmarkId::new("single", mode), &mode, |b, mode| {
            b.iter(|| {
                let mut manager = PipelineBuilder::new(&table, *mode).build().expect("build");
                let config = SourceConfig::new("bench", DataOrigin::Simulation);
                let mut source = SyntheticSource::new(config, 7, EVENTS);
                manager.run(&mut source).expect("run")
            });
        });
    }
    group.finish();
}

fn bench_sharded(c: &mut Criterion) {
    let table = loose_table();
    c.bench_function("manager_throughput/sharded_4", |b| {
        b.iter(|| {
            let sources = (0..4)
                .map(|shard| {
                    let config = SourceConfig::new("bench", DataOrigin::Simulation);
                    SyntheticSource::for_shard(config, 7, shard, EVENTS / 4)
                })
                .collect();
            run_sharded(sources, |_| PipelineBuilder::new(&table, VaryMode::Both).build())
                .expect("sharded run")
        });
    });
}

criterion_group!(benches, bench_single_pass, bench_sharded);
criterion_main!(benches);
