//! Benchmarks for export, import and the compressed envelope.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use graphclip::document::Document;
use graphclip::export::{ExportParameters, ExportSession};
use graphclip::handlers::{export_registry, import_registry};
use graphclip::import::{ImportParameters, ImportSession};
use graphclip::mem::{MemHost, sample};

const CHAIN: &str = "Chain";

fn chain_document(host: &MemHost) -> Document {
    let mut session = ExportSession::new(
        host,
        ExportParameters::tree(CHAIN),
        export_registry().unwrap(),
    )
    .unwrap();
    session.run().unwrap();
    session.document().unwrap()
}

fn bench_export(c: &mut Criterion) {
    let (host, _) = sample::math_chain(100).unwrap();

    c.bench_function("export_chain_100", |bench| {
        bench.iter(|| black_box(chain_document(&host)))
    });
}

fn bench_import(c: &mut Criterion) {
    let (host, _) = sample::math_chain(100).unwrap();
    let document = chain_document(&host);

    c.bench_function("import_chain_100", |bench| {
        bench.iter(|| {
            let mut target = MemHost::new();
            let mut session = ImportSession::new(
                &mut target,
                document.clone(),
                import_registry().unwrap(),
                ImportParameters::default(),
            )
            .unwrap();
            black_box(session.run().unwrap().imported_nodes)
        })
    });
}

fn bench_compress(c: &mut Criterion) {
    let (host, _) = sample::math_chain(100).unwrap();
    let document = chain_document(&host);

    c.bench_function("compress_chain_100", |bench| {
        bench.iter(|| black_box(document.to_compressed().unwrap()))
    });
}

fn bench_showcase_round_trip(c: &mut Criterion) {
    let (host, _) = sample::showcase().unwrap();

    c.bench_function("showcase_round_trip", |bench| {
        bench.iter(|| {
            let mut export = ExportSession::new(
                &host,
                ExportParameters::tree(sample::MAIN_TREE),
                export_registry().unwrap(),
            )
            .unwrap();
            export.run().unwrap();
            let text = export.export_to_string().unwrap();

            let mut target = MemHost::new();
            let mut import = ImportSession::from_text(
                &mut target,
                &text,
                import_registry().unwrap(),
                ImportParameters::default(),
            )
            .unwrap();
            black_box(import.run().unwrap().imported_links)
        })
    });
}

criterion_group!(
    benches,
    bench_export,
    bench_import,
    bench_compress,
    bench_showcase_round_trip
);
criterion_main!(benches);
