#![doc = include_str!("../README.md")]

pub mod cli;
pub mod conversion;
pub mod dtc;
pub mod fasta;
pub mod header;
pub mod reference;
pub mod report;
pub mod smart_reader;
pub mod text;
pub mod variant;

pub use conversion::{
    ConversionConfig, ConversionOptions, ConversionSummary, ReferenceMode, convert, convert_files,
};
pub use dtc::GenotypeRecord;
pub use reference::{ReferenceLookup, ReferenceRecord};
pub use variant::{EmitterConfig, VariantRecord};
