use std::{fmt, str::FromStr};

use crate::text::{ParseErrorKind, RecordReader, parse_position, split_fields};

/// One observed allele of a genotype call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Allele {
    Base(char),
    /// `D`: a deletion whose deleted bases the export does not report.
    Deletion,
    /// `I`: an insertion whose inserted bases the export does not report.
    Insertion,
    /// `-` paired with an observed allele.
    Missing,
}

/// A decoded genotype call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Call {
    NoCall,
    /// Two observed alleles in call order. Single-character calls are
    /// duplicated into a homozygous pair.
    Observed([Allele; 2]),
}

impl Call {
    pub fn is_no_call(&self) -> bool {
        matches!(self, Self::NoCall)
    }
}

/// A single genotype entry from a direct-to-consumer text export.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenotypeRecord {
    pub marker_id: String,
    pub chromosome: String,
    pub position: u64,
    /// Upper-cased call token as it appeared in the export.
    pub genotype: String,
    pub call: Call,
}

/// Iterator over genotype records in a raw genotype text file.
pub type Reader<R> = RecordReader<R, GenotypeRecord>;

impl FromStr for GenotypeRecord {
    type Err = ParseErrorKind;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\n', '\r']);
        let [marker_id, chromosome, position, genotype] = split_fields::<4>(line)?;

        let marker_id = marker_id.trim();
        if marker_id.is_empty() {
            return Err(ParseErrorKind::EmptyField("marker id"));
        }
        let chromosome = chromosome.trim();
        if chromosome.is_empty() {
            return Err(ParseErrorKind::EmptyField("chromosome"));
        }

        let position = parse_position(position)?;
        let genotype = genotype.trim().to_ascii_uppercase();
        let call = parse_call(&genotype)?;

        Ok(Self {
            marker_id: marker_id.to_string(),
            chromosome: chromosome.to_string(),
            position,
            genotype,
            call,
        })
    }
}

/// Decodes a call token: two symbols, one symbol, or a no-call.
///
/// Symbols are case-insensitive and drawn from `A C G T D I -`. An empty
/// token, `-` and `--` are no-calls.
pub fn parse_call(raw: &str) -> Result<Call, ParseErrorKind> {
    let token = raw.trim();
    let symbols: Vec<char> = token.chars().map(|c| c.to_ascii_uppercase()).collect();

    let alleles = match symbols.as_slice() {
        [] | ['-'] | ['-', '-'] => return Ok(Call::NoCall),
        [symbol] => {
            let allele = parse_allele(*symbol, token)?;
            [allele, allele]
        }
        [first, second] => [parse_allele(*first, token)?, parse_allele(*second, token)?],
        _ => return Err(ParseErrorKind::UnrecognizedCall(token.to_string())),
    };

    Ok(Call::Observed(alleles))
}

fn parse_allele(symbol: char, token: &str) -> Result<Allele, ParseErrorKind> {
    match symbol {
        'A' | 'C' | 'G' | 'T' => Ok(Allele::Base(symbol)),
        'D' => Ok(Allele::Deletion),
        'I' => Ok(Allele::Insertion),
        '-' => Ok(Allele::Missing),
        _ => Err(ParseErrorKind::UnrecognizedCall(token.to_string())),
    }
}

impl fmt::Display for GenotypeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.marker_id, self.chromosome, self.position, self.genotype
        )
    }
}
