//! Structured run report for downstream tool consumption.
//!
//! Written as JSON alongside the output: for `out.vcf`, `out_report.json`.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::conversion::{ConversionConfig, ConversionSummary, ReferenceMode};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub version: String,
    /// Timestamp of run (RFC 3339)
    pub timestamp: String,
    pub input: InputInfo,
    pub output: OutputInfo,
    pub sample: SampleInfo,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub genotypes: String,
    pub reference: String,
    pub reference_mode: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputInfo {
    pub path: String,
    pub header: bool,
    pub variants_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleInfo {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub assembly: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_records: usize,
    pub emitted_records: usize,
    pub variant_records: usize,
    pub reference_records: usize,
    pub no_call_records: usize,
    pub symbolic_allele_records: usize,
    pub skipped_reference_sites: usize,
}

impl From<&ConversionSummary> for Statistics {
    fn from(s: &ConversionSummary) -> Self {
        Statistics {
            total_records: s.total_records,
            emitted_records: s.emitted_records,
            variant_records: s.variant_records,
            reference_records: s.reference_records,
            no_call_records: s.no_call_records,
            symbolic_allele_records: s.symbolic_allele_records,
            skipped_reference_sites: s.skipped_reference_sites,
        }
    }
}

impl RunReport {
    pub fn new(config: &ConversionConfig, summary: &ConversionSummary) -> Self {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        RunReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            input: InputInfo {
                genotypes: config.genotypes.display().to_string(),
                reference: config.reference.display().to_string(),
                reference_mode: mode_name(config.reference_mode).to_string(),
            },
            output: OutputInfo {
                path: config.output.display().to_string(),
                header: config.write_header,
                variants_only: config.variants_only,
            },
            sample: SampleInfo {
                id: config.sample_id.clone(),
                assembly: config.assembly.clone(),
            },
            statistics: Statistics::from(summary),
        }
    }

    /// Path the report for `output_path` is written to.
    pub fn path_for(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        output_path.with_file_name(format!("{stem}_report.json"))
    }

    /// Writes the report as pretty JSON next to `output_path`.
    pub fn write(&self, output_path: &Path) -> std::io::Result<PathBuf> {
        let report_path = Self::path_for(output_path);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&report_path, json)?;
        tracing::info!("Wrote run report to {}", report_path.display());
        Ok(report_path)
    }
}

fn mode_name(mode: ReferenceMode) -> &'static str {
    match mode {
        ReferenceMode::Aligned => "aligned",
        ReferenceMode::Table => "table",
        ReferenceMode::Fasta => "fasta",
    }
}
