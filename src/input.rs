//! Reading dump files: decompression, byte progress and text decoding.
//!
//! Dumps are read whole. Conversion needs every table before it can place
//! the deferred foreign keys, so there is nothing to gain from streaming.

use crate::convert::ConvertError;
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the matching decompressor.
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Character encoding the dump text was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Single-byte fallback; every byte maps to the code point of the same value.
    Latin1,
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf-8"),
            TextEncoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

/// A fully decoded dump.
#[derive(Debug, Clone)]
pub struct DumpText {
    pub text: String,
    pub encoding: TextEncoding,
    /// Size of the file on disk (compressed size for compressed dumps).
    pub file_bytes: u64,
}

/// Decode raw dump bytes, falling back to Latin-1 when they are not valid UTF-8.
pub fn decode(bytes: Vec<u8>) -> (String, TextEncoding) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, TextEncoding::Utf8),
        Err(e) => {
            let text = e.into_bytes().iter().map(|&b| b as char).collect();
            (text, TextEncoding::Latin1)
        }
    }
}

/// Reader wrapper that reports compressed bytes consumed to a progress bar.
struct CountingReader<R: Read> {
    inner: R,
    consumed: u64,
    bar: Option<ProgressBar>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        if let Some(bar) = &self.bar {
            bar.set_position(self.consumed);
        }
        Ok(n)
    }
}

/// Read and decode a dump file, decompressing by extension.
pub fn read_dump(path: &Path, progress: Option<&ProgressBar>) -> Result<DumpText, ConvertError> {
    let unreadable = |source: io::Error| ConvertError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    let file_bytes = file.metadata().map_err(unreadable)?.len();
    if let Some(bar) = progress {
        bar.set_length(file_bytes);
    }

    let counting = CountingReader {
        inner: BufReader::with_capacity(256 * 1024, file),
        consumed: 0,
        bar: progress.cloned(),
    };
    let compression = Compression::from_path(path);
    let mut reader = compression
        .wrap_reader(Box::new(counting))
        .map_err(unreadable)?;

    let mut bytes = Vec::with_capacity(file_bytes as usize);
    reader.read_to_end(&mut bytes).map_err(unreadable)?;

    let (text, encoding) = decode(bytes);
    Ok(DumpText {
        text,
        encoding,
        file_bytes,
    })
}
