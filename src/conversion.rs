use std::{
    fs,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use noodles::vcf;
use thiserror::Error;

use crate::{
    dtc::{self, GenotypeRecord},
    fasta::FastaReference,
    header::build_header,
    reference::{self, AlignedReference, LookupError, ReferenceLookup, ReferenceTable},
    smart_reader::open_input,
    text::{DEFAULT_MAX_LINE_LENGTH, ParseError},
    variant::{EmitterConfig, VariantRecord},
};

/// How the reference input is interpreted.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum ReferenceMode {
    /// Tab-delimited reference lines, one per genotype line, in the same order.
    Aligned,
    /// Tab-delimited reference lines in any order, loaded into memory.
    Table,
    /// Indexed FASTA sequence.
    Fasta,
}

/// Configuration required to drive a file-to-file conversion.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub genotypes: PathBuf,
    pub reference: PathBuf,
    pub reference_mode: ReferenceMode,
    pub reference_fai: Option<PathBuf>,
    pub output: PathBuf,
    pub sample_id: String,
    pub assembly: String,
    pub write_header: bool,
    pub variants_only: bool,
    pub max_line_length: usize,
    pub emitter: EmitterConfig,
}

impl ConversionConfig {
    pub fn new(genotypes: PathBuf, reference: PathBuf, output: PathBuf) -> Self {
        Self {
            genotypes,
            reference,
            reference_mode: ReferenceMode::Aligned,
            reference_fai: None,
            output,
            sample_id: String::from("sample"),
            assembly: String::new(),
            write_header: false,
            variants_only: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            emitter: EmitterConfig::default(),
        }
    }
}

/// Per-record options of the conversion loop.
#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    pub emitter: EmitterConfig,
    /// Omit homozygous reference records.
    pub variants_only: bool,
}

/// Counts gathered over one conversion run.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ConversionSummary {
    pub total_records: usize,
    pub emitted_records: usize,
    pub variant_records: usize,
    pub reference_records: usize,
    pub no_call_records: usize,
    pub symbolic_allele_records: usize,
    pub skipped_reference_sites: usize,
}

impl ConversionSummary {
    fn record_emission(&mut self, record: &VariantRecord) {
        self.emitted_records += 1;
        if record.is_no_call() {
            self.no_call_records += 1;
        } else if record.is_variant() {
            self.variant_records += 1;
        } else {
            self.reference_records += 1;
        }
        if record.has_symbolic_allele() {
            self.symbolic_allele_records += 1;
        }
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("genotype input {0}")]
    Genotype(#[from] ParseError),
    #[error(
        "reference lookup failed for {marker_id} ({chromosome}:{position}), genotype record #{record_number} (comment lines not counted)"
    )]
    Reference {
        /// 1-based ordinal among genotype records, not a file line number.
        record_number: usize,
        marker_id: String,
        chromosome: String,
        position: u64,
        #[source]
        source: LookupError,
    },
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Converts genotype records into VCF data lines, one record at a time.
///
/// Each record's reference allele is requested from `lookup` by chromosome and
/// position. The loop ends when either the genotypes or the lookup run out,
/// and aborts on the first error without writing anything further.
pub fn convert<I, L, W>(
    genotypes: I,
    lookup: &mut L,
    writer: &mut W,
    header: Option<&vcf::Header>,
    options: &ConversionOptions,
) -> Result<ConversionSummary, ConversionError>
where
    I: IntoIterator<Item = Result<GenotypeRecord, ParseError>>,
    L: ReferenceLookup + ?Sized,
    W: Write,
{
    if let Some(header) = header {
        vcf::io::Writer::new(&mut *writer).write_header(header)?;
    }

    let mut summary = ConversionSummary::default();

    for result in genotypes {
        let genotype = result?;

        let reference_allele = match lookup.reference_allele(&genotype.chromosome, genotype.position) {
            Ok(Some(allele)) => allele,
            Ok(None) => {
                tracing::warn!(
                    marker_id = %genotype.marker_id,
                    records = summary.total_records,
                    "reference input ended before genotype input",
                );
                break;
            }
            Err(source) => {
                return Err(ConversionError::Reference {
                    record_number: summary.total_records + 1,
                    marker_id: genotype.marker_id,
                    chromosome: genotype.chromosome,
                    position: genotype.position,
                    source,
                });
            }
        };
        summary.total_records += 1;

        let record = VariantRecord::from_call(&genotype, &reference_allele);
        if options.variants_only && record.is_reference() {
            summary.skipped_reference_sites += 1;
            continue;
        }

        writer.write_all(record.to_line(&options.emitter).as_bytes())?;
        summary.record_emission(&record);
    }

    writer.flush()?;
    Ok(summary)
}

/// Converts the genotype file named in `config` and writes the output file.
pub fn convert_files(config: &ConversionConfig) -> Result<ConversionSummary> {
    tracing::info!(
        genotypes = %config.genotypes.display(),
        reference = %config.reference.display(),
        reference_mode = ?config.reference_mode,
        output = %config.output.display(),
        "starting conversion",
    );

    let genotype_input = open_input(&config.genotypes)
        .with_context(|| format!("failed to open genotype input {}", config.genotypes.display()))?;
    let genotypes = dtc::Reader::with_max_line_length(genotype_input, config.max_line_length);

    let mut contigs = Vec::new();
    let mut lookup: Box<dyn ReferenceLookup> = match config.reference_mode {
        ReferenceMode::Aligned => {
            let input = open_input(&config.reference).with_context(|| {
                format!("failed to open reference input {}", config.reference.display())
            })?;
            Box::new(AlignedReference::new(reference::Reader::with_max_line_length(
                input,
                config.max_line_length,
            )))
        }
        ReferenceMode::Table => {
            let input = open_input(&config.reference).with_context(|| {
                format!("failed to open reference input {}", config.reference.display())
            })?;
            let table = ReferenceTable::from_reader(reference::Reader::with_max_line_length(
                input,
                config.max_line_length,
            ))
            .with_context(|| format!("failed to load reference table {}", config.reference.display()))?;
            tracing::info!(sites = table.len(), "loaded reference table");
            Box::new(table)
        }
        ReferenceMode::Fasta => {
            let fasta = FastaReference::open(&config.reference, config.reference_fai.clone())
                .with_context(|| format!("failed to open reference FASTA {}", config.reference.display()))?;
            tracing::info!(
                path = %fasta.path().display(),
                contigs = fasta.contigs().len(),
                "opened reference FASTA",
            );
            contigs = fasta.contigs().to_vec();
            Box::new(fasta)
        }
    };

    let header = if config.write_header {
        Some(build_header(config, &contigs)?)
    } else {
        None
    };

    let output = fs::File::create(&config.output)
        .with_context(|| format!("failed to create output {}", config.output.display()))?;
    let mut writer = BufWriter::new(output);

    let options = ConversionOptions {
        emitter: config.emitter.clone(),
        variants_only: config.variants_only,
    };

    let summary = convert(genotypes, lookup.as_mut(), &mut writer, header.as_ref(), &options)
        .with_context(|| format!("failed to convert {}", config.genotypes.display()))?;

    tracing::info!(
        total = summary.total_records,
        emitted = summary.emitted_records,
        variants = summary.variant_records,
        "conversion finished",
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        genotypes: &str,
        references: &str,
        options: &ConversionOptions,
    ) -> Result<(ConversionSummary, String), ConversionError> {
        let mut lookup = AlignedReference::new(reference::Reader::new(references.as_bytes()));
        let mut out = Vec::new();
        let summary = convert(
            dtc::Reader::new(genotypes.as_bytes()),
            &mut lookup,
            &mut out,
            None,
            options,
        )?;
        Ok((summary, String::from_utf8(out).unwrap()))
    }

    #[test]
    fn converts_single_record() {
        let (summary, out) =
            run("rs123\t1\t100\tAG\n", "1\t100\tA\n", &ConversionOptions::default()).unwrap();
        assert_eq!(out, "1\t100\trs123\tA\tG\t.\t.\t.\tGT\t0/1\n");
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.variant_records, 1);
    }

    #[test]
    fn stops_cleanly_when_either_stream_ends() {
        let (summary, out) = run(
            "rs1\t1\t1\tAA\nrs2\t1\t2\tCC\nrs3\t1\t3\tGG\n",
            "1\t1\tA\n1\t2\tC\n",
            &ConversionOptions::default(),
        )
        .unwrap();
        assert_eq!(summary.total_records, 2);
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with('\n'));

        let (summary, out) = run(
            "rs1\t1\t1\tAA\n",
            "1\t1\tA\n1\t2\tC\n",
            &ConversionOptions::default(),
        )
        .unwrap();
        assert_eq!(summary.total_records, 1);
        assert_eq!(out, "1\t1\trs1\tA\t.\t.\t.\t.\tGT\t0/0\n");
    }

    #[test]
    fn misalignment_aborts_without_further_output() {
        let mut out = Vec::new();
        let mut lookup = AlignedReference::new(reference::Reader::new(&b"1\t1\tA\n1\t3\tG\n1\t2\tC\n"[..]));
        let err = convert(
            dtc::Reader::new(&b"rs1\t1\t1\tAA\nrs2\t1\t2\tCC\nrs3\t1\t3\tGG\n"[..]),
            &mut lookup,
            &mut out,
            None,
            &ConversionOptions::default(),
        )
        .unwrap_err();

        match err {
            ConversionError::Reference {
                record_number,
                marker_id,
                source: LookupError::Misalignment { line, .. },
                ..
            } => {
                assert_eq!(record_number, 2);
                assert_eq!(marker_id, "rs2");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn lookup_errors_count_records_not_lines() {
        let mut table =
            ReferenceTable::from_reader(reference::Reader::new(&b"1\t1\tA\n"[..])).unwrap();
        let err = convert(
            dtc::Reader::new(&b"# header\n# rsid\tchromosome\tposition\tgenotype\nrs1\t1\t1\tAA\nrs2\t1\t9\tCC\n"[..]),
            &mut table,
            &mut io::sink(),
            None,
            &ConversionOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConversionError::Reference {
                record_number: 2,
                source: LookupError::NotFound { position: 9, .. },
                ..
            }
        ));
        assert!(err.to_string().contains("genotype record #2"), "{err}");
    }

    #[test]
    fn parse_errors_abort() {
        let err = run(
            "rs1\t1\t1\tAA\nrs2\t1\t2\n",
            "1\t1\tA\n1\t2\tC\n",
            &ConversionOptions::default(),
        )
        .unwrap_err();
        match err {
            ConversionError::Genotype(e) => assert_eq!(e.line, 2),
            other => panic!("unexpected error: {other}"),
        }

        let err = run("rs1\t1\t1\tAX\n", "1\t1\tA\n", &ConversionOptions::default()).unwrap_err();
        assert!(err.to_string().contains("unrecognized genotype call 'AX'"));
    }

    #[test]
    fn variants_only_skips_reference_sites() {
        let options = ConversionOptions {
            variants_only: true,
            ..Default::default()
        };
        let (summary, out) = run(
            "rs1\t1\t1\tAA\nrs2\t1\t2\tCT\nrs3\t1\t3\t--\n",
            "1\t1\tA\n1\t2\tC\n1\t3\tG\n",
            &options,
        )
        .unwrap();
        assert_eq!(summary.skipped_reference_sites, 1);
        assert_eq!(summary.emitted_records, 2);
        assert_eq!(summary.no_call_records, 1);
        assert_eq!(
            out,
            "1\t2\trs2\tC\tT\t.\t.\t.\tGT\t0/1\n1\t3\trs3\tG\t.\t.\t.\t.\tGT\t./.\n"
        );
    }

    #[test]
    fn table_lookup_tolerates_reordered_reference() {
        let mut table = ReferenceTable::from_reader(reference::Reader::new(
            &b"1\t3\tG\n1\t1\tA\n1\t2\tC\n"[..],
        ))
        .unwrap();
        let mut out = Vec::new();
        let summary = convert(
            dtc::Reader::new(&b"rs1\t1\t1\tAG\nrs2\t1\t2\tD\nrs3\t1\t3\tGG\n"[..]),
            &mut table,
            &mut out,
            None,
            &ConversionOptions::default(),
        )
        .unwrap();
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.symbolic_allele_records, 1);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("1\t2\trs2\tC\t<DEL>\t.\t.\tIMPRECISE;SVTYPE=DEL\tGT\t1/1\n"));
    }
}
