//! Benchmarks for correlation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sr_compare::context::RunContext;
use sr_compare::correlate::{substitute_suffix, CorrelationIndex};
use sr_compare::stages::StageSpec;
use sr_compare::store::ArtifactStore;
use sr_compare::testing::{sample_inputs, ScriptedTool};
use sr_compare::tools::{ExternalTool, OutputSpec};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn substitution_benchmark(c: &mut Criterion) {
    c.bench_function("substitute_suffix", |b| {
        b.iter(|| {
            black_box(substitute_suffix(
                black_box("deadbeef_oldphoto_SwinIR.png"),
                "SwinIR",
                "SwinIR_large",
            ))
        })
    });
}

/// Stages 64 inputs, fabricates two stages' outputs, and benchmarks
/// building the correlation index over them.
fn index_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build runtime");

    let dir = TempDir::new().expect("tempdir");
    let store = ArtifactStore::open(dir.path().join("input"), dir.path().join("results"))
        .expect("open store");

    let names: Vec<String> = (0..64).map(|i| format!("img{i:03}.png")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let sources = sample_inputs(dir.path(), &name_refs);
    let manifest = store.stage_inputs(&sources).expect("stage inputs");

    let mut ctx = RunContext::new(Uuid::new_v4(), store, manifest);
    let stages: Vec<StageSpec> = ["SwinIR", "BSRGAN"]
        .into_iter()
        .map(|name| {
            let tool = ScriptedTool::new(name, name);
            let out = ctx.store().stage_dir(name);
            runtime
                .block_on(tool.run(ctx.input_dir(), &OutputSpec::new(&out)))
                .expect("fabricate outputs");
            ctx.record_stage_dir(name, out);
            StageSpec::new(name, name, Arc::new(ScriptedTool::new(name, name)))
        })
        .collect();

    c.bench_function("correlation_index_64x2", |b| {
        b.iter(|| {
            black_box(CorrelationIndex::build(&ctx, "SwinIR", &stages)).expect("correlate")
        })
    });
}

criterion_group!(benches, substitution_benchmark, index_benchmark);
criterion_main!(benches);
