//! Variant records: allele reconciliation against the reference and the
//! tab-delimited VCF data line representation.
//!
//! Indel calls (`D`/`I`) carry no sequence in the export, so they are
//! encoded as the symbolic alleles `<DEL>` and `<INS>` rather than
//! guessed bases. Records with a symbolic allele get
//! `IMPRECISE;SVTYPE=...` in INFO.

use std::{fmt, num::ParseIntError};

use thiserror::Error;

use crate::dtc::{Allele, Call, GenotypeRecord};

/// Genotype token written for a no-call.
pub const NO_CALL: &str = "./.";
/// Placeholder for an absent field.
pub const MISSING_FIELD: &str = ".";

/// Allele index into `[REF, ALT_1, ALT_2, ...]`; `None` is a missing allele.
pub type GenotypeIndex = Option<usize>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SymbolicAllele {
    Deletion,
    Insertion,
}

impl SymbolicAllele {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Deletion => "DEL",
            Self::Insertion => "INS",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum AltAllele {
    Sequence(String),
    Symbolic(SymbolicAllele),
}

impl fmt::Display for AltAllele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(bases) => f.write_str(bases),
            Self::Symbolic(symbolic) => write!(f, "<{}>", symbolic.id()),
        }
    }
}

/// Fixed fields written for every record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmitterConfig {
    pub qual: String,
    pub filter: String,
    pub format: String,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            qual: String::from(MISSING_FIELD),
            filter: String::from(MISSING_FIELD),
            format: String::from("GT"),
        }
    }
}

/// A genotype record reconciled against its reference allele.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantRecord {
    pub chromosome: String,
    pub position: u64,
    pub id: String,
    pub reference: String,
    /// Distinct non-reference alleles in order of first appearance.
    pub alternates: Vec<AltAllele>,
    /// `None` for a no-call.
    pub genotype: Option<[GenotypeIndex; 2]>,
}

impl VariantRecord {
    /// Encodes the call of `record` against `reference_allele`.
    ///
    /// A base equal to the reference allele (ignoring case) is index 0; every
    /// other allele takes the next ALT index by first appearance. The index
    /// pair keeps call order, so `GA` against `A` is `1/0`.
    pub fn from_call(record: &GenotypeRecord, reference_allele: &str) -> Self {
        let mut alternates = Vec::new();
        let genotype = match record.call {
            Call::NoCall => None,
            Call::Observed([first, second]) => {
                let first = allele_index(first, reference_allele, &mut alternates);
                let second = allele_index(second, reference_allele, &mut alternates);
                Some([first, second])
            }
        };

        Self {
            chromosome: record.chromosome.clone(),
            position: record.position,
            id: record.marker_id.clone(),
            reference: reference_allele.to_string(),
            alternates,
            genotype,
        }
    }

    pub fn is_no_call(&self) -> bool {
        self.genotype.is_none()
    }

    /// Homozygous for the reference allele.
    pub fn is_reference(&self) -> bool {
        self.genotype == Some([Some(0), Some(0)])
    }

    pub fn is_variant(&self) -> bool {
        !self.alternates.is_empty()
    }

    pub fn has_symbolic_allele(&self) -> bool {
        self.alternates
            .iter()
            .any(|alt| matches!(alt, AltAllele::Symbolic(_)))
    }

    pub fn alternates_field(&self) -> String {
        if self.alternates.is_empty() {
            return String::from(MISSING_FIELD);
        }
        self.alternates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn info_field(&self) -> String {
        let has_del = self
            .alternates
            .contains(&AltAllele::Symbolic(SymbolicAllele::Deletion));
        let has_ins = self
            .alternates
            .contains(&AltAllele::Symbolic(SymbolicAllele::Insertion));

        let svtype = match (has_del, has_ins) {
            (false, false) => return String::from(MISSING_FIELD),
            (true, true) => "COMPLEX",
            (true, false) => "DEL",
            (false, true) => "INS",
        };
        format!("IMPRECISE;SVTYPE={svtype}")
    }

    pub fn genotype_field(&self) -> String {
        match self.genotype {
            None => String::from(NO_CALL),
            Some([first, second]) => format!("{}/{}", index_code(first), index_code(second)),
        }
    }

    /// Renders one newline-terminated VCF data line.
    pub fn to_line(&self, config: &EmitterConfig) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            self.chromosome,
            self.position,
            self.id,
            self.reference,
            self.alternates_field(),
            config.qual,
            config.filter,
            self.info_field(),
            config.format,
            self.genotype_field(),
        )
    }

    /// Parses a data line written by [`VariantRecord::to_line`].
    pub fn from_line(line: &str) -> Result<Self, VariantParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split('\t').collect();
        let [chromosome, position, id, reference, alternates, _, _, _, _, genotype] =
            fields.as_slice()
        else {
            return Err(VariantParseError::FieldCount(fields.len()));
        };

        let position = position
            .parse()
            .map_err(VariantParseError::InvalidPosition)?;

        let alternates: Vec<AltAllele> = if *alternates == MISSING_FIELD {
            Vec::new()
        } else {
            alternates.split(',').map(parse_alt_allele).collect()
        };

        let genotype = parse_genotype_field(genotype, alternates.len())?;

        Ok(Self {
            chromosome: chromosome.to_string(),
            position,
            id: id.to_string(),
            reference: reference.to_string(),
            alternates,
            genotype,
        })
    }
}

fn allele_index(allele: Allele, reference: &str, alternates: &mut Vec<AltAllele>) -> GenotypeIndex {
    let alt = match allele {
        Allele::Missing => return None,
        Allele::Base(base) => {
            let mut buf = [0; 4];
            let base = base.encode_utf8(&mut buf);
            if reference.eq_ignore_ascii_case(base) {
                return Some(0);
            }
            AltAllele::Sequence(base.to_string())
        }
        Allele::Deletion => AltAllele::Symbolic(SymbolicAllele::Deletion),
        Allele::Insertion => AltAllele::Symbolic(SymbolicAllele::Insertion),
    };

    let index = match alternates.iter().position(|existing| *existing == alt) {
        Some(index) => index,
        None => {
            alternates.push(alt);
            alternates.len() - 1
        }
    };
    Some(index + 1)
}

fn index_code(index: GenotypeIndex) -> String {
    index.map_or_else(|| String::from(MISSING_FIELD), |i| i.to_string())
}

fn parse_alt_allele(raw: &str) -> AltAllele {
    match raw {
        "<DEL>" => AltAllele::Symbolic(SymbolicAllele::Deletion),
        "<INS>" => AltAllele::Symbolic(SymbolicAllele::Insertion),
        bases => AltAllele::Sequence(bases.to_string()),
    }
}

fn parse_genotype_field(
    raw: &str,
    alternate_count: usize,
) -> Result<Option<[GenotypeIndex; 2]>, VariantParseError> {
    if raw == NO_CALL {
        return Ok(None);
    }

    let invalid = || VariantParseError::InvalidGenotype(raw.to_string());
    let (first, second) = raw.split_once('/').ok_or_else(invalid)?;
    let parse_index = |code: &str| -> Result<GenotypeIndex, VariantParseError> {
        if code == MISSING_FIELD {
            return Ok(None);
        }
        let index: usize = code.parse().map_err(|_| invalid())?;
        if index > alternate_count {
            return Err(invalid());
        }
        Ok(Some(index))
    };

    Ok(Some([parse_index(first)?, parse_index(second)?]))
}

#[derive(Debug, Error)]
pub enum VariantParseError {
    #[error("expected 10 tab-delimited fields, found {0}")]
    FieldCount(usize),
    #[error("invalid position: {0}")]
    InvalidPosition(ParseIntError),
    #[error("invalid genotype '{0}'")]
    InvalidGenotype(String),
}
