use std::fs;

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dtc2vcf::{
    ConversionConfig, ConversionOptions, EmitterConfig, GenotypeRecord, ReferenceMode,
    VariantRecord, convert, convert_files, dtc,
    fasta::FastaReference,
    reference::{self, AlignedReference},
};
use tempfile::tempdir;

const CALLS: [&str; 6] = ["AA", "AG", "GG", "CT", "--", "DI"];

fn synthetic_inputs(records: usize) -> (String, String) {
    let mut genotypes = String::new();
    let mut references = String::new();
    for i in 1..=records {
        genotypes.push_str(&format!("rs{i}\t1\t{i}\t{}\n", CALLS[i % CALLS.len()]));
        references.push_str(&format!("1\t{i}\tA\n"));
    }
    (genotypes, references)
}

fn bench_emit(c: &mut Criterion) {
    let records: Vec<GenotypeRecord> = CALLS
        .iter()
        .map(|call| format!("rs1\t1\t100\t{call}").parse().unwrap())
        .collect();
    let config = EmitterConfig::default();

    c.bench_function("emit_records", |b| {
        b.iter(|| {
            for record in &records {
                let variant = VariantRecord::from_call(black_box(record), "A");
                black_box(variant.to_line(&config));
            }
        })
    });
}

fn bench_lockstep(c: &mut Criterion) {
    let mut group = c.benchmark_group("lockstep_conversion");
    for &records in &[1_000usize, 10_000] {
        let (genotypes, references) = synthetic_inputs(records);
        group.bench_with_input(BenchmarkId::from_parameter(records), &records, |b, _| {
            b.iter_batched(
                || Vec::with_capacity(records * 32),
                |mut out| {
                    let mut lookup =
                        AlignedReference::new(reference::Reader::new(references.as_bytes()));
                    let summary = convert(
                        dtc::Reader::new(genotypes.as_bytes()),
                        &mut lookup,
                        &mut out,
                        None,
                        &ConversionOptions::default(),
                    )
                    .unwrap();
                    black_box((summary, out))
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_fasta_lookup(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ref.fa");
    fs::write(&path, format!(">chr1\n{}\n", "ACGT".repeat(256))).unwrap();
    let positions: Vec<u64> = (1..=512).collect();

    c.bench_function("fasta_lookup_uncached", |b| {
        b.iter_batched(
            || FastaReference::open(&path, None).unwrap(),
            |mut reference| {
                for &pos in &positions {
                    black_box(reference.base("1", pos).unwrap());
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_files(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let (genotypes, references) = synthetic_inputs(10_000);
    let genotype_path = dir.path().join("genome.txt");
    let reference_path = dir.path().join("reference.txt");
    fs::write(&genotype_path, genotypes).unwrap();
    fs::write(&reference_path, references).unwrap();

    let mut group = c.benchmark_group("convert_files");
    for mode in [ReferenceMode::Aligned, ReferenceMode::Table] {
        let config = ConversionConfig {
            reference_mode: mode,
            ..ConversionConfig::new(
                genotype_path.clone(),
                reference_path.clone(),
                dir.path().join(format!("{mode:?}.vcf")),
            )
        };
        group.bench_function(format!("{mode:?}"), |b| {
            b.iter(|| black_box(convert_files(&config).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_emit, bench_lockstep, bench_fasta_lookup, bench_files);
criterion_main!(benches);
