//! Streaming reader for raw files on disk
//!
//! The file is memory-mapped and plots are decoded one at a time as the
//! iterator advances, so only the plot being built is held in memory besides
//! the mapping itself.

use crate::raw_parser::RawParser;
use crate::types::{Plot, ReadOptions, Result, Warning};
use memmap2::Mmap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Bytes backing a stream reader
enum FileBytes {
    Mapped(Mmap),
    /// Zero-length files cannot be mapped on every platform
    Empty,
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Mapped(mmap) => &mmap[..],
            FileBytes::Empty => &[],
        }
    }
}

/// Plot-by-plot reader over a raw file
pub struct RawStreamReader {
    path: PathBuf,
    parser: RawParser<Cursor<FileBytes>>,
}

impl RawStreamReader {
    /// Open a file for streaming read
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        let bytes = if len == 0 {
            FileBytes::Empty
        } else {
            FileBytes::Mapped(unsafe { Mmap::map(&file)? })
        };

        info!(
            bytes = len,
            byte_order = ?options.byte_order,
            precision = options.precision.format_name(),
            "Stream reader opened"
        );

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            parser: RawParser::new(Cursor::new(bytes), options),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> ReadOptions {
        self.parser.options()
    }

    /// Diagnostics raised by the plots read so far
    pub fn warnings(&self) -> &[Warning] {
        self.parser.warnings()
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.parser.take_warnings()
    }

    /// Number of plots yielded so far
    pub fn plots_read(&self) -> usize {
        self.parser.plots_emitted()
    }
}

impl Iterator for RawStreamReader {
    type Item = Result<Plot>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Open a file for streaming read with default options
pub fn read_stream<P: AsRef<Path>>(path: P) -> Result<RawStreamReader> {
    RawStreamReader::open(path, ReadOptions::default())
}

/// Open a file for streaming read with explicit byte order and precision
pub fn read_stream_with_options<P: AsRef<Path>>(
    path: P,
    options: ReadOptions,
) -> Result<RawStreamReader> {
    RawStreamReader::open(path, options)
}
