use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    conversion::{ConversionConfig, ConversionSummary, ReferenceMode, convert_files},
    report::RunReport,
    text::DEFAULT_MAX_LINE_LENGTH,
    variant::EmitterConfig,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert DTC genotype text files to VCF", long_about = None)]
struct Cli {
    /// Raw genotype export (rsid, chromosome, position, genotype)
    #[arg(value_name = "GENOTYPES")]
    genotypes: PathBuf,

    /// Reference alleles (chromosome, position, allele) or FASTA with --reference-mode fasta
    #[arg(value_name = "REFERENCE")]
    reference: PathBuf,

    /// Output VCF path
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// How to read the reference input
    #[arg(long, value_enum, default_value_t = ReferenceMode::Aligned)]
    reference_mode: ReferenceMode,

    /// Optional explicit FASTA index (.fai) path
    #[arg(long, value_name = "FAI")]
    fai: Option<PathBuf>,

    /// Write a VCF meta-information header before the records
    #[arg(long)]
    header: bool,

    /// Sample identifier to embed in the VCF header
    #[arg(long, value_name = "SAMPLE")]
    sample: Option<String>,

    /// Assembly label to embed in the VCF header
    #[arg(long, default_value = "")]
    assembly: String,

    /// When set, omit homozygous reference sites from the output
    #[arg(long)]
    variants_only: bool,

    /// QUAL column value
    #[arg(long, default_value = ".")]
    qual: String,

    /// FILTER column value
    #[arg(long, default_value = ".")]
    filter: String,

    /// Reject input lines longer than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Write a JSON run report next to the output
    #[arg(long)]
    report: bool,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    if cli.fai.is_some() && cli.reference_mode != ReferenceMode::Fasta {
        anyhow::bail!("--fai requires --reference-mode fasta");
    }

    let config = build_config(&cli);
    let summary = convert_files(&config)?;
    print_summary(&summary);

    if cli.report {
        RunReport::new(&config, &summary)
            .write(&config.output)
            .context("failed to write run report")?;
    }

    Ok(())
}

fn build_config(cli: &Cli) -> ConversionConfig {
    let sample_id = cli
        .sample
        .clone()
        .or_else(|| derive_sample_name(&cli.genotypes))
        .unwrap_or_else(|| String::from("sample"));

    let mut config = ConversionConfig::new(
        cli.genotypes.clone(),
        cli.reference.clone(),
        cli.output.clone(),
    );
    config.reference_mode = cli.reference_mode;
    config.reference_fai = cli.fai.clone();
    config.sample_id = sample_id;
    config.assembly = cli.assembly.clone();
    config.write_header = cli.header;
    config.variants_only = cli.variants_only;
    config.max_line_length = cli.max_line_length;
    config.emitter = EmitterConfig {
        qual: cli.qual.clone(),
        filter: cli.filter.clone(),
        ..EmitterConfig::default()
    };
    config
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn derive_sample_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    Some(stem.replace('.', "_")).filter(|s| !s.is_empty())
}

fn print_summary(summary: &ConversionSummary) {
    println!(
        "Processed {total} records; emitted {emitted} ({variants} variants, {references} reference, {no_calls} no-calls).",
        total = summary.total_records,
        emitted = summary.emitted_records,
        variants = summary.variant_records,
        references = summary.reference_records,
        no_calls = summary.no_call_records,
    );

    if summary.skipped_reference_sites > 0 {
        println!(
            "Skipped {skipped} reference-only sites due to --variants-only.",
            skipped = summary.skipped_reference_sites
        );
    }

    if summary.symbolic_allele_records > 0 {
        println!(
            "Encoded {count} indel genotypes as symbolic <DEL>/<INS> alleles.",
            count = summary.symbolic_allele_records
        );
    }
}
