use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bzip2::read::MultiBzDecoder;

use crate::error::{Error, Result};

/// Open a bzip2 file as a buffered sequential reader.
///
/// Wikipedia multistream dumps are concatenations of independently
/// compressed bzip2 blocks; `MultiBzDecoder` keeps reading across block
/// boundaries where a plain decoder would stop at the first stream's end.
pub fn open_bz2(path: &Path) -> Result<BufReader<MultiBzDecoder<File>>> {
    let file = File::open(path).map_err(|source| Error::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(MultiBzDecoder::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::{Read, Write};
    use tempfile::NamedTempFile;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn reads_single_stream() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&compress(b"hello bzip2")).unwrap();
        tmp.flush().unwrap();

        let mut reader = open_bz2(tmp.path()).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello bzip2");
    }

    #[test]
    fn reads_concatenated_streams() {
        // The multistream dump format: independent bzip2 blocks back to back.
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&compress(b"first block\n")).unwrap();
        tmp.write_all(&compress(b"second block\n")).unwrap();
        tmp.write_all(&compress(b"third block\n")).unwrap();
        tmp.flush().unwrap();

        let mut reader = open_bz2(tmp.path()).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "first block\nsecond block\nthird block\n");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = match open_bz2(Path::new("/nonexistent/dump.bz2")) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("/nonexistent/dump.bz2"));
    }

    #[test]
    fn corrupt_stream_fails_on_read() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"definitely not bzip2 data").unwrap();
        tmp.flush().unwrap();

        let mut reader = open_bz2(tmp.path()).unwrap();
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
    }
}
