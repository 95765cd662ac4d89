use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Opens a file and transparently peels off GZIP/BGZF layers to expose the
/// underlying text stream.
///
/// Genotype exports and reference tables are commonly distributed gzipped
/// (`.txt.gz`); detection is by magic bytes, not extension.
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let mut reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(file));

    // Bounded in case of pathological nesting.
    const MAX_DEPTH: usize = 4;

    for _ in 0..MAX_DEPTH {
        let is_gzip = {
            let buf = reader.fill_buf()?;
            // GZIP magic: 1f 8b
            buf.len() >= 2 && buf[0] == 0x1f && buf[1] == 0x8b
        };

        if !is_gzip {
            break;
        }

        tracing::debug!(path = %path.display(), "detected GZIP/BGZF layer");
        // MultiGzDecoder handles BGZF and concatenated members.
        reader = Box::new(BufReader::new(MultiGzDecoder::new(reader)));
    }

    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::{Read, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn reads_plain_and_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();
        let content = "rs1\t1\t10\tAA\n";

        let plain = dir.path().join("genome.txt");
        std::fs::write(&plain, content).unwrap();
        let gz = dir.path().join("genome.txt.gz");
        std::fs::write(&gz, gzip(content.as_bytes())).unwrap();
        let nested = dir.path().join("genome.txt.gz.gz");
        std::fs::write(&nested, gzip(&gzip(content.as_bytes()))).unwrap();

        for path in [plain, gz, nested] {
            let mut text = String::new();
            open_input(&path).unwrap().read_to_string(&mut text).unwrap();
            assert_eq!(text, content, "{}", path.display());
        }
    }

    #[test]
    fn empty_file_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();
        let mut text = String::new();
        open_input(&path).unwrap().read_to_string(&mut text).unwrap();
        assert!(text.is_empty());
    }
}
