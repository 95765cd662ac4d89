//! Reference allele lookup.
//!
//! Every source answers the same question: what is the reference allele at
//! a given chromosome and position? [`AlignedReference`] answers it from a
//! reference file that is line-aligned with the genotype input,
//! [`ReferenceTable`] from a reference file in any order, and
//! [`FastaReference`](crate::fasta::FastaReference) from an indexed FASTA.

use std::{
    collections::{HashMap, hash_map::Entry},
    io::BufRead,
    str::FromStr,
};

use thiserror::Error;

use crate::{
    fasta::FastaError,
    text::{ParseError, ParseErrorKind, RecordReader, parse_position, split_fields},
};

/// One line of a reference annotation file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceRecord {
    pub chromosome: String,
    pub position: u64,
    pub reference_allele: String,
}

/// Iterator over reference records in a reference annotation file.
pub type Reader<R> = RecordReader<R, ReferenceRecord>;

impl FromStr for ReferenceRecord {
    type Err = ParseErrorKind;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\n', '\r']);
        let [chromosome, position, allele] = split_fields::<3>(line)?;

        let chromosome = chromosome.trim();
        if chromosome.is_empty() {
            return Err(ParseErrorKind::EmptyField("chromosome"));
        }
        let position = parse_position(position)?;

        let allele = allele.trim();
        if allele.is_empty()
            || !allele
                .bytes()
                .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'))
        {
            return Err(ParseErrorKind::InvalidAllele(allele.to_string()));
        }

        Ok(Self {
            chromosome: chromosome.to_string(),
            position,
            reference_allele: allele.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("reference input {0}")]
    Parse(#[from] ParseError),
    #[error(
        "reference line {line} is {found_chromosome}:{found_position}, expected {expected_chromosome}:{expected_position}; the genotype and reference inputs are not in matching order"
    )]
    Misalignment {
        line: u64,
        expected_chromosome: String,
        expected_position: u64,
        found_chromosome: String,
        found_position: u64,
    },
    #[error("no reference allele for {chromosome}:{position}")]
    NotFound { chromosome: String, position: u64 },
    #[error("conflicting reference alleles at {chromosome}:{position}: {first} and {second}")]
    ConflictingReference {
        chromosome: String,
        position: u64,
        first: String,
        second: String,
    },
    #[error(transparent)]
    Fasta(#[from] FastaError),
}

/// A source of reference alleles keyed by chromosome and position.
pub trait ReferenceLookup {
    /// Returns the reference allele at `chromosome:position`, or `None` once
    /// the source has no more records to offer.
    fn reference_allele(
        &mut self,
        chromosome: &str,
        position: u64,
    ) -> Result<Option<String>, LookupError>;
}

/// Reference records consumed one per lookup, in the same order as the
/// genotype input.
pub struct AlignedReference<R> {
    records: Reader<R>,
}

impl<R> AlignedReference<R>
where
    R: BufRead,
{
    pub fn new(records: Reader<R>) -> Self {
        Self { records }
    }
}

impl<R> ReferenceLookup for AlignedReference<R>
where
    R: BufRead,
{
    fn reference_allele(
        &mut self,
        chromosome: &str,
        position: u64,
    ) -> Result<Option<String>, LookupError> {
        let record = match self.records.next() {
            None => return Ok(None),
            Some(result) => result?,
        };

        if record.position != position
            || canonical_key(&record.chromosome) != canonical_key(chromosome)
        {
            return Err(LookupError::Misalignment {
                line: self.records.line_number(),
                expected_chromosome: chromosome.to_string(),
                expected_position: position,
                found_chromosome: record.chromosome,
                found_position: record.position,
            });
        }

        Ok(Some(record.reference_allele))
    }
}

/// Reference alleles held in memory, keyed by canonical chromosome and
/// position. The backing file may list sites in any order.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    alleles: HashMap<(String, u64), String>,
}

impl ReferenceTable {
    pub fn from_reader<R>(reader: Reader<R>) -> Result<Self, LookupError>
    where
        R: BufRead,
    {
        let mut table = Self::default();
        for result in reader {
            table.insert(result?)?;
        }
        Ok(table)
    }

    /// Adds a site. Re-inserting a site with the same allele is a no-op.
    pub fn insert(&mut self, record: ReferenceRecord) -> Result<(), LookupError> {
        let key = (canonical_key(&record.chromosome), record.position);
        match self.alleles.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(record.reference_allele);
                Ok(())
            }
            Entry::Occupied(entry) if entry.get().eq_ignore_ascii_case(&record.reference_allele) => {
                Ok(())
            }
            Entry::Occupied(entry) => Err(LookupError::ConflictingReference {
                chromosome: record.chromosome,
                position: record.position,
                first: entry.get().clone(),
                second: record.reference_allele,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }
}

impl ReferenceLookup for ReferenceTable {
    fn reference_allele(
        &mut self,
        chromosome: &str,
        position: u64,
    ) -> Result<Option<String>, LookupError> {
        self.alleles
            .get(&(canonical_key(chromosome), position))
            .cloned()
            .map(Some)
            .ok_or_else(|| LookupError::NotFound {
                chromosome: chromosome.to_string(),
                position,
            })
    }
}

/// Normalizes a chromosome name for comparison: drops a `chr` prefix,
/// upper-cases, and folds `M` into `MT`.
pub fn canonical_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("chr")
        .or_else(|| trimmed.strip_prefix("CHR"))
        .or_else(|| trimmed.strip_prefix("Chr"))
        .unwrap_or(trimmed);
    let upper = trimmed.to_ascii_uppercase();
    match upper.as_str() {
        "M" => "MT".to_string(),
        _ => upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reference_record() {
        let record: ReferenceRecord = "1\t100\tA".parse().unwrap();
        assert_eq!(record.chromosome, "1");
        assert_eq!(record.position, 100);
        assert_eq!(record.reference_allele, "A");

        let record: ReferenceRecord = "X\t5\tacgt\r\n".parse().unwrap();
        assert_eq!(record.reference_allele, "acgt");
    }

    #[test]
    fn reference_record_errors() {
        assert!(matches!(
            "1\t100".parse::<ReferenceRecord>(),
            Err(ParseErrorKind::MalformedRecord {
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            "1\tabc\tA".parse::<ReferenceRecord>(),
            Err(ParseErrorKind::InvalidPosition(_))
        ));
        assert!(matches!(
            "1\t100\t".parse::<ReferenceRecord>(),
            Err(ParseErrorKind::InvalidAllele(_))
        ));
        assert!(matches!(
            "1\t100\tA-".parse::<ReferenceRecord>(),
            Err(ParseErrorKind::InvalidAllele(_))
        ));
        assert!(matches!(
            "\t5\tA".parse::<ReferenceRecord>(),
            Err(ParseErrorKind::EmptyField("chromosome"))
        ));
        assert!(matches!(
            "1\t+5\tA".parse::<ReferenceRecord>(),
            Err(ParseErrorKind::InvalidPosition(_))
        ));
    }

    #[test]
    fn canonical_keys() {
        assert_eq!(canonical_key("chr1"), "1");
        assert_eq!(canonical_key("chrX"), "X");
        assert_eq!(canonical_key("M"), "MT");
        assert_eq!(canonical_key("chrM"), "MT");
        assert_eq!(canonical_key("MT"), "MT");
    }

    #[test]
    fn aligned_lookup_checks_order() {
        let data = b"1\t100\tA\nchr1\t200\tC\n1\t300\tG\n";
        let mut lookup = AlignedReference::new(Reader::new(&data[..]));
        assert_eq!(lookup.reference_allele("1", 100).unwrap().as_deref(), Some("A"));
        assert_eq!(lookup.reference_allele("1", 200).unwrap().as_deref(), Some("C"));

        let err = lookup.reference_allele("1", 301).unwrap_err();
        match err {
            LookupError::Misalignment {
                line,
                found_position,
                expected_position,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(found_position, 300);
                assert_eq!(expected_position, 301);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn aligned_lookup_signals_exhaustion() {
        let data = b"1\t100\tA\n";
        let mut lookup = AlignedReference::new(Reader::new(&data[..]));
        assert!(lookup.reference_allele("1", 100).unwrap().is_some());
        assert!(lookup.reference_allele("1", 101).unwrap().is_none());
    }

    #[test]
    fn table_lookup_ignores_order() {
        let data = b"2\t7\tT\n1\t100\tA\nchrMT\t3\tG\n";
        let mut table = ReferenceTable::from_reader(Reader::new(&data[..])).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.reference_allele("MT", 3).unwrap().as_deref(), Some("G"));
        assert_eq!(table.reference_allele("chr1", 100).unwrap().as_deref(), Some("A"));
        assert!(matches!(
            table.reference_allele("1", 101),
            Err(LookupError::NotFound { position: 101, .. })
        ));
    }

    #[test]
    fn table_rejects_conflicting_sites() {
        let data = b"1\t100\tA\n1\t100\ta\n1\t100\tC\n";
        let err = ReferenceTable::from_reader(Reader::new(&data[..])).unwrap_err();
        assert!(matches!(err, LookupError::ConflictingReference { .. }));
    }
}
