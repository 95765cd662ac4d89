use std::{
    collections::HashMap,
    fs, io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::Utf8Error,
};

use lru::LruCache;
use noodles::{
    core::{Position, Region},
    fasta::{self, fai},
};
use thiserror::Error;

use crate::reference::{LookupError, ReferenceLookup, canonical_key};

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128 * 1024) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

#[derive(Debug, Clone)]
pub struct ReferenceContig {
    pub name: String,
    pub length: u64,
}

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid UTF-8 contig name: {0}")]
    InvalidContigName(#[from] Utf8Error),
    #[error("unknown contig: {query}")]
    UnknownContig { query: String },
    #[error("position {position} is outside contig {contig} length {length}")]
    PositionOutOfBounds {
        contig: String,
        position: u64,
        length: u64,
    },
    #[error("invalid genomic position: {0}")]
    InvalidPosition(#[from] noodles::core::position::TryFromIntError),
}

/// Single-base reference alleles read from an indexed FASTA.
pub struct FastaReference {
    path: PathBuf,
    reader: fasta::io::IndexedReader<fasta::io::BufReader<fs::File>>,
    contigs: Vec<ReferenceContig>,
    alias_to_index: HashMap<String, usize>,
    cache: LruCache<(usize, u64), u8>,
}

impl FastaReference {
    /// Opens `path`, reading the `.fai` index next to it (or at `fai_path`)
    /// and building it first if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P, fai_path: Option<PathBuf>) -> Result<Self, FastaError> {
        let canonical = fs::canonicalize(path.as_ref())?;

        let index_path = fai_path.unwrap_or_else(|| default_index_path(&canonical));
        let index = if index_path.exists() {
            fai::fs::read(&index_path)?
        } else {
            tracing::debug!(index = %index_path.display(), "building FASTA index");
            let index = fasta::fs::index(&canonical)?;
            fai::fs::write(&index_path, &index)?;
            index
        };

        let reader = fasta::io::indexed_reader::Builder::default()
            .set_index(index.clone())
            .build_from_path(&canonical)?;

        let contigs = index
            .as_ref()
            .iter()
            .map(|record| -> Result<ReferenceContig, FastaError> {
                let name = std::str::from_utf8(record.name().as_ref())?.to_string();
                Ok(ReferenceContig {
                    name,
                    length: record.length(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let alias_to_index = build_alias_map(&contigs);

        Ok(Self {
            path: canonical,
            reader,
            contigs,
            alias_to_index,
            cache: LruCache::new(CACHE_CAPACITY),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn contigs(&self) -> &[ReferenceContig] {
        self.contigs.as_slice()
    }

    pub fn resolve_contig_name(&self, query: &str) -> Option<&str> {
        self.contig_index(query)
            .map(|idx| self.contigs[idx].name.as_str())
    }

    fn contig_index(&self, query: &str) -> Option<usize> {
        self.alias_to_index.get(&canonical_key(query)).copied()
    }

    /// Upper-cased base at the 1-based `position` of contig `query`.
    pub fn base(&mut self, query: &str, position: u64) -> Result<u8, FastaError> {
        let idx = self
            .contig_index(query)
            .ok_or_else(|| FastaError::UnknownContig {
                query: query.to_string(),
            })?;
        let contig = &self.contigs[idx];

        if position == 0 || position > contig.length {
            return Err(FastaError::PositionOutOfBounds {
                contig: contig.name.clone(),
                position,
                length: contig.length,
            });
        }

        if let Some(base) = self.cache.get(&(idx, position)).copied() {
            return Ok(base);
        }

        let pos = usize::try_from(position).map_err(|_| FastaError::PositionOutOfBounds {
            contig: contig.name.clone(),
            position,
            length: contig.length,
        })?;
        let start = Position::try_from(pos)?;
        let region = Region::new(contig.name.clone(), start..=start);
        let record = self.reader.query(&region)?;
        let base = record
            .sequence()
            .as_ref()
            .first()
            .copied()
            .unwrap_or(b'N')
            .to_ascii_uppercase();
        self.cache.put((idx, position), base);
        Ok(base)
    }

    pub fn cache_usage(&self) -> usize {
        self.cache.len()
    }
}

impl ReferenceLookup for FastaReference {
    fn reference_allele(
        &mut self,
        chromosome: &str,
        position: u64,
    ) -> Result<Option<String>, LookupError> {
        let base = self.base(chromosome, position)?;
        Ok(Some(char::from(base).to_string()))
    }
}

fn default_index_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".fai");
    PathBuf::from(s)
}

fn build_alias_map(contigs: &[ReferenceContig]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, contig) in contigs.iter().enumerate() {
        map.entry(canonical_key(&contig.name)).or_insert(idx);
    }
    map
}
