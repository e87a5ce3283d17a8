use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::config::EncodingMode;
use crate::errors::{DictionaryError, DictionaryResult};

const BUFFER_CAPACITY: usize = 65536;
const LINE_CAPACITY: usize = 256;

/// Opens `path` for line streaming.
///
/// An open failure is returned here, before any line is read, so callers can
/// skip the file without a partial read.
pub fn enumerate_file(
    path: impl AsRef<Path>,
    encoding_mode: EncodingMode,
) -> DictionaryResult<FileLines> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| DictionaryError::io(path, e))?;
    trace!("Opened {}", path.display());

    Ok(FileLines {
        path: path.to_path_buf(),
        reader: BufReader::with_capacity(BUFFER_CAPACITY, file),
        encoding_mode,
        bytes_read: 0,
        lines_read: 0,
        warned_lossy: false,
        finished: false,
    })
}

/// Streams the lines of one file without loading it whole.
///
/// Lines are split on `\n`; a trailing `\r` is dropped too. A final line with no
/// terminator is still yielded. After a read or decoding error the iterator
/// yields that error once and then ends.
#[derive(Debug)]
pub struct FileLines {
    path: PathBuf,
    reader: BufReader<File>,
    encoding_mode: EncodingMode,
    bytes_read: u64,
    lines_read: u64,
    warned_lossy: bool,
    finished: bool,
}

impl FileLines {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed so far, terminators included
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Lines yielded so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    fn decode(&mut self, bytes: Vec<u8>) -> DictionaryResult<String> {
        match String::from_utf8(bytes) {
            Ok(line) => Ok(line),
            Err(err) => match self.encoding_mode {
                EncodingMode::FailFast => Err(DictionaryError::encoding_error(&self.path, err)),
                EncodingMode::Lossy => {
                    if !self.warned_lossy {
                        warn!("Invalid UTF-8 replaced in file: {}", self.path.display());
                        self.warned_lossy = true;
                    }
                    Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
                }
            },
        }
    }
}

impl Iterator for FileLines {
    type Item = DictionaryResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut buf = Vec::with_capacity(LINE_CAPACITY);
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(n) => {
                self.bytes_read += n as u64;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = self.decode(buf);
                match line {
                    Ok(_) => self.lines_read += 1,
                    Err(_) => self.finished = true,
                }
                Some(line)
            }
            Err(e) => {
                self.finished = true;
                Some(Err(DictionaryError::io(&self.path, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn read_all(path: &Path, mode: EncodingMode) -> Vec<DictionaryResult<String>> {
        enumerate_file(path, mode).unwrap().collect()
    }

    #[test]
    fn test_final_unterminated_line_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "first line\nsecond line\nno newline").unwrap();

        let lines: Vec<String> = read_all(&path, EncodingMode::Lossy)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["first line", "second line", "no newline"]);
    }

    #[test]
    fn test_terminators_are_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crlf.txt");
        fs::write(&path, "one\r\ntwo\n\nthree\n").unwrap();

        let mut lines = enumerate_file(&path, EncodingMode::Lossy).unwrap();
        let collected: Vec<String> = lines.by_ref().map(Result::unwrap).collect();
        assert_eq!(collected, vec!["one", "two", "", "three"]);
        assert_eq!(lines.lines_read(), 4);
        assert_eq!(lines.bytes_read(), 16);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        assert!(read_all(&path, EncodingMode::Lossy).is_empty());
    }

    #[test]
    fn test_open_failure_is_reported_up_front() {
        let dir = tempdir().unwrap();
        let result = enumerate_file(dir.path().join("missing.txt"), EncodingMode::Lossy);
        assert!(matches!(result, Err(DictionaryError::FileNotFound(_))));
    }

    #[test]
    fn test_lossy_decoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"caf\xe9 au lait\nplain\n").unwrap();

        let lines: Vec<String> = read_all(&path, EncodingMode::Lossy)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["caf\u{FFFD} au lait", "plain"]);
    }

    #[test]
    fn test_failfast_decoding_stops_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"good\ncaf\xe9\nnever read\n").unwrap();

        let items = read_all(&path, EncodingMode::FailFast);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "good");
        assert!(matches!(
            items[1],
            Err(DictionaryError::EncodingError { .. })
        ));
    }
}
