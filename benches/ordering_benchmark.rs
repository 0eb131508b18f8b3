use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pedsim::data::{PedigreeGraph, Sex};
use pedsim::io::ped::PedRecord;
use pedsim::io::vcf::VcfRecord;
use pedsim::model::genotyping::draw_genotype;
use pedsim::model::ordering::FamilyOrderer;
use pedsim::model::seeds::{SeedDerivation, SimulationRole};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::hint::black_box;

/// A pedigree of `generations` families, each child marrying a new founder
fn lineage(generations: usize) -> PedigreeGraph {
    let mut records = vec![
        PedRecord::new("G0", None, None, Sex::Male),
        PedRecord::new("W0", None, None, Sex::Female),
    ];
    for g in 1..=generations {
        let father = format!("G{}", g - 1);
        let mother = format!("W{}", g - 1);
        records.push(PedRecord::new(format!("G{g}"), Some(father.as_str()), Some(mother.as_str()), Sex::Male));
        records.push(PedRecord::new(format!("S{g}"), Some(father.as_str()), Some(mother.as_str()), Sex::Female));
        records.push(PedRecord::new(format!("W{g}"), None, None, Sex::Female));
    }
    PedigreeGraph::from_records(records).expect("valid lineage")
}

/// Benchmark pedigree validation plus family ordering
fn bench_family_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("family_order");

    for generations in [10, 100, 500] {
        group.throughput(Throughput::Elements(generations as u64));
        group.bench_with_input(
            BenchmarkId::new("generations", generations),
            &generations,
            |b, &generations| {
                let pedigree = lineage(generations);
                let existing = HashSet::new();
                b.iter(|| black_box(FamilyOrderer::plan(black_box(&pedigree), &existing).unwrap()))
            },
        );
    }

    group.finish();
}

/// Benchmark per-job seed derivation
fn bench_seed_stream(c: &mut Criterion) {
    let seeds = SeedDerivation::new(42);
    c.bench_function("seed_stream_1000", |b| {
        b.iter(|| {
            let stream = seeds.stream(black_box(SimulationRole::Inheritance));
            black_box(stream.take(1000).fold(0u64, |acc, s| acc ^ s))
        })
    });
}

/// Benchmark allele-frequency genotype draws
fn bench_draw_genotype(c: &mut Criterion) {
    let record = VcfRecord::parse("1\t100\t.\tA\tC,G\t.\tPASS\tAF=0.2,0.1", 1).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    c.bench_function("draw_genotype_diploid", |b| {
        b.iter(|| black_box(draw_genotype(black_box(&record), 2, &mut rng).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_family_order,
    bench_seed_stream,
    bench_draw_genotype
);
criterion_main!(benches);
