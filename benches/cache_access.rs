use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mzaccess::accessor::{AccessorConfig, SpectrumAccessor};
use mzaccess::source::memory::FieldTiers;
use mzaccess::source::{DetailTier, MemoryRecord, MemorySource};
use std::rc::Rc;

/// Create an in-memory run with known data
fn create_test_source(num_spectra: usize, peaks_per_spectrum: usize) -> MemorySource {
    let records = (0..num_spectra)
        .map(|i| {
            let mz = (0..peaks_per_spectrum).map(|j| 200.0 + j as f64 * 10.0).collect();
            let intensity = (0..peaks_per_spectrum).map(|j| 1000.0 + j as f64 * 100.0).collect();
            let record = MemoryRecord::new(format!("scan={}", i + 1))
                .start_time(i as f64 * 0.01)
                .peaks(mz, intensity);
            if i % 10 == 0 {
                record.level(1)
            } else {
                record.level(2)
            }
        })
        .collect();

    MemorySource::new(records).with_field_tiers(FieldTiers {
        start_time: DetailTier::Fast,
        ..Default::default()
    })
}

fn open(num_spectra: usize, cache: Option<usize>) -> SpectrumAccessor {
    let mut accessor =
        SpectrumAccessor::new(Rc::new(create_test_source(num_spectra, 100)), AccessorConfig::default()).unwrap();
    if let Some(capacity) = cache {
        accessor.enable_cache(Some(capacity));
    }
    accessor
}

/// Benchmark repeated array access with and without the decoded cache
fn bench_repeated_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("repeated_arrays");
    group.throughput(Throughput::Elements(100));

    for (label, cache) in [("uncached", None), ("cached", Some(100))] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &cache, |b, &cache| {
            let mut accessor = open(1000, cache);
            b.iter(|| {
                for index in 0..100 {
                    black_box(accessor.mz_array(black_box(index)).unwrap());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark field-by-field probing of one spectrum (hot index path)
fn bench_field_probing(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_probing");

    for num_spectra in [100, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}spectra", num_spectra)),
            &num_spectra,
            |b, &num_spectra| {
                let mut accessor = open(num_spectra, None);
                let target = num_spectra / 2;
                b.iter(|| {
                    black_box(accessor.level(target).unwrap());
                    black_box(accessor.start_time(target).unwrap());
                    black_box(accessor.precursors(target).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a full metadata walk
fn bench_metadata_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata_walk");

    for num_spectra in [100, 1000] {
        group.throughput(Throughput::Elements(num_spectra as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}spectra", num_spectra)),
            &num_spectra,
            |b, &num_spectra| {
                let mut accessor = open(num_spectra, None);
                b.iter(|| {
                    for index in 0..num_spectra {
                        black_box(accessor.start_time(index).unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_repeated_arrays, bench_field_probing, bench_metadata_walk);
criterion_main!(benches);
