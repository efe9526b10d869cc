//! # SPICE Raw File Reader - Core Library
//!
//! A library for reading the "raw" (nutmeg) waveform files written by
//! SPICE-family simulators such as ngspice.
//!
//! ## Supported Formats
//!
//! - ASCII bodies (`Values:`) and binary bodies (`Binary:`)
//! - Real and complex arithmetic
//! - Big- or little-endian, float32 or float64 binary data
//! - Any number of concatenated plots per file
//!
//! The raw format does not record byte order or precision, so both are
//! supplied through [`ReadOptions`] (default: big-endian float32).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spiceraw_core::{read_with_options, ReadOptions};
//!
//! let raw = read_with_options("simulation.raw", ReadOptions::from_flags(true, true)).unwrap();
//! for plot in &raw.plots {
//!     println!("{}: {} points", plot.plot_name(), plot.num_points());
//!     for vector in plot.data_vectors() {
//!         println!("  {} ({})", vector.name(), vector.kind());
//!     }
//! }
//! for warning in &raw.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use spiceraw_core::read_stream;
//!
//! for plot in read_stream("simulation.raw").unwrap() {
//!     let plot = plot.unwrap();
//!     println!("{} ({:?})", plot.plot_name(), plot.analysis());
//! }
//! ```
//!
//! ## Enabling Logging
//!
//! This library uses `tracing` for structured logging. Every non-fatal
//! diagnostic is logged at `warn` level as well as collected. To see log
//! output, initialize a tracing subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! let raw = spiceraw_core::read("simulation.raw").unwrap();
//! ```

mod block_reader;
mod header;
mod raw_parser;
mod stream;
mod table;
mod types;

pub use types::{
    AnalysisType, Endian, NumberKind, Plot, Precision, RawError, RawFile, ReadOptions, Result,
    VarType, Vector, VectorData, Warning, WarningKind, DATE_UNDEFINED,
    GENERIC_TRANSIENT_PLOTNAME, PLOTNAME_UNDEFINED, PLOTTYPE_UNDEFINED, TITLE_UNDEFINED,
};

pub use block_reader::BlockReader;
pub use raw_parser::RawParser;
pub use stream::{read_stream, read_stream_with_options, RawStreamReader};

pub use num_complex::Complex64;

use std::io::BufRead;
use std::path::Path;

// ============================================================================
// Public API Functions
// ============================================================================

/// Read every plot of a raw file with default options (big-endian float32).
///
/// # Example
/// ```rust,no_run
/// let raw = spiceraw_core::read("simulation.raw").unwrap();
/// if let Some(tran) = raw.get("Transient Analysis") {
///     println!("{} points", tran.num_points());
/// }
/// ```
pub fn read<P: AsRef<Path>>(path: P) -> Result<RawFile> {
    read_with_options(path, ReadOptions::default())
}

/// Read every plot of a raw file.
///
/// Stops at the first error. Use [`read_stream_with_options`] to keep the
/// plots that precede a malformed block.
pub fn read_with_options<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<RawFile> {
    let mut reader = RawStreamReader::open(path, options)?;
    let mut plots = Vec::new();
    for plot in &mut reader {
        plots.push(plot?);
    }
    Ok(RawFile {
        plots,
        warnings: reader.take_warnings(),
    })
}

/// Parse every plot from a buffered reader.
pub fn parse<R: BufRead>(reader: R, options: ReadOptions) -> Result<RawFile> {
    raw_parser::parse_raw(reader, options)
}

/// Parse every plot from an in-memory raw file.
pub fn parse_bytes(bytes: &[u8], options: ReadOptions) -> Result<RawFile> {
    raw_parser::parse_raw(bytes, options)
}
