//! Common types, errors, and constants for SPICE raw file operations

use num_complex::Complex64;
use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Sentinel values for plot metadata missing from the header
pub const TITLE_UNDEFINED: &str = "title undefined";
pub const DATE_UNDEFINED: &str = "date undefined";
pub const PLOTNAME_UNDEFINED: &str = "plotname undefined";
pub const PLOTTYPE_UNDEFINED: &str = "plottype undefined";

/// Generic plot name written by ngspice for transient runs
pub const GENERIC_TRANSIENT_PLOTNAME: &str = "transient time domain plot";

// ============================================================================
// Enums
// ============================================================================

/// Byte order of the binary data body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    Little,
    #[default]
    Big,
}

/// Floating-point width of the data body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 4-byte float32
    #[default]
    Single,
    /// 8-byte float64
    Double,
}

impl Precision {
    /// Size of one scalar in bytes
    #[inline]
    pub fn item_size(self) -> usize {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }

    /// Round a parsed value to this width.
    ///
    /// ASCII bodies are stored at the configured width so that they decode
    /// to the same samples as the equivalent binary body.
    #[inline]
    pub fn round(self, value: f64) -> f64 {
        match self {
            Precision::Single => value as f32 as f64,
            Precision::Double => value,
        }
    }

    #[inline]
    pub fn format_name(self) -> &'static str {
        match self {
            Precision::Single => "f32",
            Precision::Double => "f64",
        }
    }
}

/// Arithmetic mode declared by the `Flags:` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberKind {
    #[default]
    Real,
    Complex,
}

/// Analysis type, inferred from the plot name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    Transient,
    AC,
    DC,
    Operating,
    Noise,
    Unknown,
}

impl AnalysisType {
    /// The first word of the plot name that names an analysis decides.
    pub fn from_plot_name(plot_name: &str) -> Self {
        plot_name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .map(str::to_ascii_lowercase)
            .find_map(|word| match word.as_str() {
                w if w.starts_with("tran") => Some(AnalysisType::Transient),
                "ac" => Some(AnalysisType::AC),
                "dc" => Some(AnalysisType::DC),
                "operating" | "op" => Some(AnalysisType::Operating),
                "noise" => Some(AnalysisType::Noise),
                _ => None,
            })
            .unwrap_or(AnalysisType::Unknown)
    }
}

/// Physical quantity of a vector, derived from its kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Time,
    Frequency,
    Voltage,
    Current,
    Unknown,
}

impl VarType {
    pub fn from_kind(kind: &str) -> Self {
        match kind.to_lowercase().as_str() {
            "time" => VarType::Time,
            "frequency" => VarType::Frequency,
            "voltage" => VarType::Voltage,
            "current" => VarType::Current,
            _ => VarType::Unknown,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarType::Time => "time",
            VarType::Frequency => "frequency",
            VarType::Voltage => "voltage",
            VarType::Current => "current",
            VarType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Vector data - either real or complex
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Default for VectorData {
    fn default() -> Self {
        VectorData::Real(Vec::new())
    }
}

impl VectorData {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            VectorData::Real(v) => v.len(),
            VectorData::Complex(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, VectorData::Complex(_))
    }

    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            VectorData::Real(v) => Some(v),
            VectorData::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&[Complex64]> {
        match self {
            VectorData::Complex(v) => Some(v),
            VectorData::Real(_) => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Decode settings for the binary body.
///
/// The raw format carries no marker for either setting, so both apply to the
/// whole file and must come from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOptions {
    pub byte_order: Endian,
    pub precision: Precision,
}

impl ReadOptions {
    /// Build options from the `little-endian` / `double-precision` switches.
    pub fn from_flags(little_endian: bool, double_precision: bool) -> Self {
        Self {
            byte_order: if little_endian {
                Endian::Little
            } else {
                Endian::Big
            },
            precision: if double_precision {
                Precision::Double
            } else {
                Precision::Single
            },
        }
    }

    pub fn with_byte_order(mut self, byte_order: Endian) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for raw file reading operations
#[derive(Debug, thiserror::Error)]
pub enum RawError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid raw file (line {line_number}): {message}: {line:?}")]
    InvalidRawFile {
        line_number: usize,
        line: String,
        message: String,
    },
}

impl RawError {
    pub(crate) fn invalid(line_number: usize, line: &str, message: impl Into<String>) -> Self {
        RawError::InvalidRawFile {
            line_number,
            line: line.trim_end_matches(['\r', '\n']).to_string(),
            message: message.into(),
        }
    }

    /// The offending line, for format errors
    pub fn line(&self) -> Option<&str> {
        match self {
            RawError::InvalidRawFile { line, .. } => Some(line),
            RawError::IoError(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RawError>;

// ============================================================================
// Warnings
// ============================================================================

/// A non-fatal condition met while parsing
#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    UnknownFlag(String),
    MisplacedDimensions,
    DimensionsUnsupported,
    CommandUnsupported(String),
    OptionUnsupported(String),
    UnhandledVariableAttributes {
        name: String,
        attributes: Vec<String>,
    },
    VariableLineTooShort(String),
    VariableCountMismatch { declared: usize, parsed: usize },
    MissingScaleVector,
    IncompletePlot,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::UnknownFlag(flag) => write!(f, "unknown flag: \"{}\"", flag),
            WarningKind::MisplacedDimensions => {
                write!(f, "misplaced \"Dimensions:\" line before \"No. Points:\"")
            }
            WarningKind::DimensionsUnsupported => write!(f, "\"Dimensions\" not supported"),
            WarningKind::CommandUnsupported(line) => {
                write!(f, "\"command\" not implemented: {}", line)
            }
            WarningKind::OptionUnsupported(line) => {
                write!(f, "\"option\" not implemented: {}", line)
            }
            WarningKind::UnhandledVariableAttributes { name, attributes } => write!(
                f,
                "can't handle variable details for {}: {}",
                name,
                attributes.join(" ")
            ),
            WarningKind::VariableLineTooShort(line) => {
                write!(f, "variable line is too short: {:?}", line)
            }
            WarningKind::VariableCountMismatch { declared, parsed } => write!(
                f,
                "{} variables declared but only {} parsed",
                declared, parsed
            ),
            WarningKind::MissingScaleVector => write!(f, "data body without declared variables"),
            WarningKind::IncompletePlot => write!(f, "input ended before the plot's data body"),
        }
    }
}

/// A collected diagnostic with the text line it was raised on
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub line_number: usize,
    pub kind: WarningKind,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.kind)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A single named waveform
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    name: String,
    kind: String,
    data: VectorData,
}

impl Vector {
    /// A declared vector with no samples yet
    pub(crate) fn declared(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            data: VectorData::default(),
        }
    }

    pub(crate) fn with_data(mut self, data: VectorData) -> Self {
        self.data = data;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quantity tag as written in the file ("voltage", "time", ...)
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[inline]
    pub fn data(&self) -> &VectorData {
        &self.data
    }

    pub fn into_data(self) -> VectorData {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        self.data.is_complex()
    }

    pub fn quantity(&self) -> VarType {
        VarType::from_kind(&self.kind)
    }
}

/// Header metadata collected before a plot's data body
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlotHeader {
    pub title: String,
    pub date: String,
    pub plot_name: String,
    pub plot_type: String,
}

impl Default for PlotHeader {
    fn default() -> Self {
        Self {
            title: TITLE_UNDEFINED.to_string(),
            date: DATE_UNDEFINED.to_string(),
            plot_name: PLOTNAME_UNDEFINED.to_string(),
            plot_type: PLOTTYPE_UNDEFINED.to_string(),
        }
    }
}

/// One simulation result set: a scale vector plus its data vectors
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    header: PlotHeader,
    number: NumberKind,
    scale_vector: Vector,
    data_vectors: Vec<Vector>,
}

impl Plot {
    pub(crate) fn new(
        header: PlotHeader,
        number: NumberKind,
        scale_vector: Vector,
        data_vectors: Vec<Vector>,
    ) -> Self {
        Self {
            header,
            number,
            scale_vector,
            data_vectors,
        }
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn date(&self) -> &str {
        &self.header.date
    }

    pub fn plot_name(&self) -> &str {
        &self.header.plot_name
    }

    pub fn plot_type(&self) -> &str {
        &self.header.plot_type
    }

    /// The independent axis (time, frequency, sweep parameter)
    pub fn scale_vector(&self) -> &Vector {
        &self.scale_vector
    }

    pub fn data_vectors(&self) -> &[Vector] {
        &self.data_vectors
    }

    pub fn data_vector(&self, index: usize) -> Option<&Vector> {
        self.data_vectors.get(index)
    }

    /// Look up the scale or a data vector by name
    pub fn get(&self, name: &str) -> Option<&Vector> {
        std::iter::once(&self.scale_vector)
            .chain(self.data_vectors.iter())
            .find(|v| v.name == name)
    }

    /// Number of points along the scale
    pub fn num_points(&self) -> usize {
        self.scale_vector.len()
    }

    /// Arithmetic declared by the plot's `Flags:` line
    pub fn number_kind(&self) -> NumberKind {
        self.number
    }

    pub fn is_complex(&self) -> bool {
        self.number == NumberKind::Complex
    }

    pub fn analysis(&self) -> AnalysisType {
        AnalysisType::from_plot_name(&self.header.plot_name)
    }

    /// Name to store this plot under when it is the `index`-th of its file.
    ///
    /// Undefined and generic transient names fall back to `plot<index>`.
    pub fn storage_name(&self, index: usize) -> String {
        let name = self.header.plot_name.as_str();
        if name == PLOTNAME_UNDEFINED || name == GENERIC_TRANSIENT_PLOTNAME {
            format!("plot{}", index)
        } else {
            name.to_string()
        }
    }

    pub fn into_vectors(self) -> (Vector, Vec<Vector>) {
        (self.scale_vector, self.data_vectors)
    }
}

/// Result of reading a whole raw file
#[derive(Debug, Clone, Default)]
pub struct RawFile {
    /// Plots in file order
    pub plots: Vec<Plot>,
    /// Non-fatal diagnostics in the order they were raised
    pub warnings: Vec<Warning>,
}

impl RawFile {
    #[inline]
    pub fn len(&self) -> usize {
        self.plots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// Find a plot by its `Plotname:`
    pub fn get(&self, plot_name: &str) -> Option<&Plot> {
        self.plots.iter().find(|p| p.plot_name() == plot_name)
    }
}
