//! SPICE3/ngspice raw file parser
//!
//! Supports ASCII (`Values:`) and binary (`Binary:`) data bodies, real and
//! complex arithmetic, and any number of concatenated plots. The input is
//! consumed in a single pass: header lines are dispatched by keyword until a
//! data body is reached, the body is decoded, and the finished plot is handed
//! out before the next header is read.

use crate::block_reader::BlockReader;
use crate::header::{
    parse_flags, parse_variable_line, split_header_line, Flag, HeaderLine, Keyword,
};
use crate::table::SampleTable;
use crate::types::{
    NumberKind, Plot, PlotHeader, RawError, RawFile, ReadOptions, Result, Vector, VectorData,
    Warning, WarningKind,
};
use std::io::{self, BufRead};
use tracing::{debug, info, trace, warn};

/// Upper bound on capacity reserved from header counts alone
const MAX_PREALLOCATED_VALUES: usize = 1 << 20;

/// How the data body is encoded
#[derive(Debug, Clone, Copy, PartialEq)]
enum BodyEncoding {
    Ascii,
    Binary,
}

/// State collected for the plot currently being read.
///
/// A fresh value is built for every plot.
#[derive(Debug)]
struct Session {
    header: PlotHeader,
    num_variables: Option<usize>,
    num_points: Option<usize>,
    number: NumberKind,
    padded: bool,
    vectors: Vec<Vector>,
    /// Whether any non-blank header line was seen
    has_content: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            header: PlotHeader::default(),
            num_variables: None,
            num_points: None,
            number: NumberKind::Real,
            padded: true,
            vectors: Vec::new(),
            has_content: false,
        }
    }
}

/// Streaming parser over a raw file.
///
/// Yields each plot as soon as its data body has been consumed. After an
/// error the parser is finished and yields nothing more; plots already
/// returned stay valid.
pub struct RawParser<R: BufRead> {
    reader: R,
    options: ReadOptions,
    line: Vec<u8>,
    /// Number of text lines read so far
    line_number: usize,
    warnings: Vec<Warning>,
    plots_emitted: usize,
    finished: bool,
}

impl<R: BufRead> RawParser<R> {
    pub fn new(reader: R, options: ReadOptions) -> Self {
        Self {
            reader,
            options,
            line: Vec::with_capacity(256),
            line_number: 0,
            warnings: Vec::new(),
            plots_emitted: 0,
            finished: false,
        }
    }

    pub fn options(&self) -> ReadOptions {
        self.options
    }

    /// Diagnostics collected so far
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    #[inline]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    #[inline]
    pub fn plots_emitted(&self) -> usize {
        self.plots_emitted
    }

    /// Read the next complete plot, or `None` at end of input.
    pub fn next_plot(&mut self) -> Result<Option<Plot>> {
        if self.finished {
            return Ok(None);
        }
        let result = self.read_plot();
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    // ========================================================================
    // Header
    // ========================================================================

    fn read_plot(&mut self) -> Result<Option<Plot>> {
        let mut session = Session::new();

        loop {
            let Some(line) = self.read_line()? else {
                if session.has_content {
                    self.warn(WarningKind::IncompletePlot);
                }
                return Ok(None);
            };

            let HeaderLine { keyword, value } = split_header_line(&line);
            let Some(keyword) = Keyword::parse(&keyword) else {
                return Err(RawError::invalid(
                    self.line_number,
                    &line,
                    "unexpected line in raw file, load aborted",
                ));
            };
            trace!(line = self.line_number, ?keyword, "Header line");

            if keyword != Keyword::Blank {
                session.has_content = true;
            }

            match keyword {
                Keyword::Blank => {}
                Keyword::Title => session.header.title = value.to_string(),
                Keyword::Date => session.header.date = value.to_string(),
                Keyword::Plotname => session.header.plot_name = value.to_string(),
                Keyword::Flags => {
                    for flag in parse_flags(value) {
                        match flag {
                            Flag::Number(number) => session.number = number,
                            Flag::Padded(padded) => session.padded = padded,
                            Flag::Unknown(token) => self.warn(WarningKind::UnknownFlag(token)),
                        }
                    }
                }
                Keyword::NumVariables => {
                    session.num_variables = Some(self.parse_count(&line, value)?);
                }
                Keyword::NumPoints => {
                    session.num_points = Some(self.parse_count(&line, value)?);
                }
                Keyword::Dimensions => {
                    // Only meaningful after a non-zero point count
                    if session.num_points.unwrap_or(0) == 0 {
                        self.warn(WarningKind::MisplacedDimensions);
                    } else {
                        self.warn(WarningKind::DimensionsUnsupported);
                    }
                }
                Keyword::Command => {
                    self.warn(WarningKind::CommandUnsupported(line.trim().to_string()));
                }
                Keyword::Option => {
                    self.warn(WarningKind::OptionUnsupported(line.trim().to_string()));
                }
                Keyword::Variables => self.read_variables(&mut session)?,
                Keyword::Values => return self.read_body(session, BodyEncoding::Ascii).map(Some),
                Keyword::Binary => return self.read_body(session, BodyEncoding::Binary).map(Some),
            }
        }
    }

    fn parse_count(&self, line: &str, value: &str) -> Result<usize> {
        value.parse().map_err(|_| {
            RawError::invalid(self.line_number, line, format!("invalid count {:?}", value))
        })
    }

    /// Read the declared number of `Variables:` lines.
    ///
    /// Lines with fewer than three tokens are reported and skipped, so the
    /// declared list may end up shorter than `No. Variables`.
    fn read_variables(&mut self, session: &mut Session) -> Result<()> {
        let declared = session.num_variables.unwrap_or(0);

        for _ in 0..declared {
            let Some(line) = self.read_line()? else {
                break;
            };

            match parse_variable_line(&line) {
                Some(decl) => {
                    trace!(name = decl.name, kind = decl.kind, "Variable declared");
                    if !decl.attributes.is_empty() {
                        self.warn(WarningKind::UnhandledVariableAttributes {
                            name: decl.name.to_string(),
                            attributes: decl.attributes.iter().map(|a| a.to_string()).collect(),
                        });
                    }
                    session.vectors.push(Vector::declared(decl.name, decl.kind));
                }
                None => self.warn(WarningKind::VariableLineTooShort(line.trim().to_string())),
            }
        }

        if session.vectors.len() < declared {
            self.warn(WarningKind::VariableCountMismatch {
                declared,
                parsed: session.vectors.len(),
            });
        }

        Ok(())
    }

    // ========================================================================
    // Data body
    // ========================================================================

    fn read_body(&mut self, session: Session, encoding: BodyEncoding) -> Result<Plot> {
        let num_variables = session.num_variables.unwrap_or(0);
        let num_points = session.num_points.unwrap_or(0);
        let count = SampleTable::scalar_count(session.number, num_variables, num_points);

        debug!(
            ?encoding,
            number = ?session.number,
            padded = session.padded,
            variables = num_variables,
            points = num_points,
            precision = self.options.precision.format_name(),
            "Reading data body"
        );

        let values = match encoding {
            BodyEncoding::Ascii => self.read_ascii_values(session.number, count)?,
            BodyEncoding::Binary => {
                let mut block = BlockReader::new(
                    &mut self.reader,
                    self.options.precision,
                    self.options.byte_order,
                );
                let values = block.read_block(count)?;
                trace!(
                    format = block.format_name(),
                    bytes = block.bytes_consumed(),
                    "Binary body read"
                );
                values
            }
        };

        let table = SampleTable::new(values, session.number, num_variables, num_points);
        let (scale, data_vectors) = table.assemble(session.vectors);
        let scale = match scale {
            Some(scale) => scale,
            None => {
                self.warn(WarningKind::MissingScaleVector);
                Vector::declared("", "").with_data(VectorData::Real(table.scale_column()))
            }
        };

        let plot = Plot::new(session.header, session.number, scale, data_vectors);
        self.plots_emitted += 1;
        info!(
            plot = plot.plot_name(),
            index = self.plots_emitted - 1,
            vectors = plot.data_vectors().len() + 1,
            points = plot.num_points(),
            complex = plot.is_complex(),
            "Plot read"
        );

        Ok(plot)
    }

    /// Collect `count` scalars from tab separated `index\tvalue` lines.
    ///
    /// Lines without a second field are skipped. Complex values are written
    /// as `re,im` and contribute two scalars.
    fn read_ascii_values(&mut self, number: NumberKind, count: usize) -> Result<Vec<f64>> {
        let precision = self.options.precision;
        let mut values = Vec::with_capacity(count.min(MAX_PREALLOCATED_VALUES));

        while values.len() < count {
            let Some(line) = self.read_line()? else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "data body ended after {} of {} values",
                        values.len(),
                        count
                    ),
                )
                .into());
            };

            let Some(field) = line.split('\t').nth(1) else {
                continue;
            };

            match number {
                NumberKind::Real => {
                    values.push(precision.round(self.parse_value(&line, field)?));
                }
                NumberKind::Complex => {
                    let (re, im) = field.split_once(',').ok_or_else(|| {
                        RawError::invalid(self.line_number, &line, "complex value without ','")
                    })?;
                    values.push(precision.round(self.parse_value(&line, re)?));
                    values.push(precision.round(self.parse_value(&line, im)?));
                }
            }
        }

        Ok(values)
    }

    fn parse_value(&self, line: &str, field: &str) -> Result<f64> {
        let field = field.trim();
        field.parse().map_err(|_| {
            RawError::invalid(self.line_number, line, format!("invalid number {:?}", field))
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Read one text line, `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(String::from_utf8_lossy(&self.line).into_owned()))
    }

    fn warn(&mut self, kind: WarningKind) {
        let warning = Warning {
            line_number: self.line_number,
            kind,
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

impl<R: BufRead> Iterator for RawParser<R> {
    type Item = Result<Plot>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_plot().transpose()
    }
}

/// Parse every plot from `reader`.
///
/// Stops at the first error; use [`RawParser`] directly to keep the plots
/// read before it.
pub fn parse_raw<R: BufRead>(reader: R, options: ReadOptions) -> Result<RawFile> {
    let mut parser = RawParser::new(reader, options);
    let mut plots = Vec::new();

    while let Some(plot) = parser.next_plot()? {
        plots.push(plot);
    }

    Ok(RawFile {
        plots,
        warnings: parser.take_warnings(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Endian, Precision};
    use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
    use num_complex::Complex64;

    const EXAMPLE: &str = "Title: test\nDate: today\nPlotname: tran1\nFlags: real\n\
No. Variables: 2\nNo. Points: 2\nVariables:\n 0 time time\n 1 v(1) voltage\n\
Values:\n0\t0.0\n\t1.0\n1\t1e-3\n\t2.0\n";

    fn double() -> ReadOptions {
        ReadOptions::default().with_precision(Precision::Double)
    }

    fn parse_str(input: &str, options: ReadOptions) -> Result<RawFile> {
        parse_raw(input.as_bytes(), options)
    }

    #[test]
    fn test_example_plot() {
        let raw = parse_str(EXAMPLE, double()).unwrap();
        assert_eq!(raw.len(), 1);
        assert!(raw.warnings.is_empty());

        let plot = &raw.plots[0];
        assert_eq!(plot.title(), "test");
        assert_eq!(plot.date(), "today");
        assert_eq!(plot.plot_name(), "tran1");
        assert_eq!(plot.plot_type(), "plottype undefined");
        assert_eq!(plot.scale_vector().name(), "time");
        assert_eq!(plot.scale_vector().data(), &VectorData::Real(vec![0.0, 1e-3]));
        assert_eq!(plot.data_vectors().len(), 1);
        assert_eq!(plot.data_vectors()[0].name(), "v(1)");
        assert_eq!(plot.data_vectors()[0].kind(), "voltage");
        assert_eq!(plot.data_vectors()[0].data(), &VectorData::Real(vec![1.0, 2.0]));
    }

    #[test]
    fn test_ascii_rounds_to_single_precision_by_default() {
        let raw = parse_str(EXAMPLE, ReadOptions::default()).unwrap();
        let scale = raw.plots[0].scale_vector().data().as_real().unwrap().to_vec();
        assert_eq!(scale, vec![0.0, 1e-3_f32 as f64]);
    }

    #[test]
    fn test_missing_metadata_uses_sentinels() {
        let input = "No. Variables: 1\nNo. Points: 1\nVariables:\n0 x time\nValues:\n0\t5\n";
        let raw = parse_str(input, double()).unwrap();
        let plot = &raw.plots[0];
        assert_eq!(plot.title(), "title undefined");
        assert_eq!(plot.date(), "date undefined");
        assert_eq!(plot.plot_name(), "plotname undefined");
        assert!(plot.data_vectors().is_empty());
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let input = "TITLE: Mixed Case\nno. variables: 1\nNO. POINTS: 1\nvariables:\n0 t time\n\
VALUES:\n0\t1\n";
        let raw = parse_str(input, double()).unwrap();
        assert_eq!(raw.plots[0].title(), "Mixed Case");
    }

    #[test]
    fn test_unknown_keyword_is_fatal() {
        let input = "Title: t\nfrobnicate: 3\nNo. Points: 1\n";
        let err = parse_str(input, double()).unwrap_err();
        match err {
            RawError::InvalidRawFile {
                line_number, line, ..
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "frobnicate: 3");
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_is_fused_after_error() {
        let input = format!("bogus\n{}", EXAMPLE);
        let mut parser = RawParser::new(input.as_bytes(), double());
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_invalid_count_is_format_error() {
        let err = parse_str("No. Points: many\n", double()).unwrap_err();
        assert_eq!(err.line(), Some("No. Points: many"));
    }

    #[test]
    fn test_unsupported_keywords_warn() {
        let input = "Dimensions: 2,3\nNo. Points: 1\nDimensions: 1\nCommand: version 30\n\
Option: foo\nFlags: real fancy\nNo. Variables: 1\nVariables:\n0 t time\nValues:\n0\t1\n";
        let raw = parse_str(input, double()).unwrap();
        assert_eq!(raw.len(), 1);

        let kinds: Vec<_> = raw.warnings.iter().map(|w| w.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                WarningKind::MisplacedDimensions,
                WarningKind::DimensionsUnsupported,
                WarningKind::CommandUnsupported("Command: version 30".to_string()),
                WarningKind::OptionUnsupported("Option: foo".to_string()),
                WarningKind::UnknownFlag("fancy".to_string()),
            ]
        );
        assert_eq!(raw.warnings[0].line_number, 1);
    }

    #[test]
    fn test_dimensions_after_zero_points_is_misplaced() {
        let input = "No. Points: 0\nDimensions: 1\nNo. Variables: 1\nVariables:\n0 t time\n\
Values:\n";
        let raw = parse_str(input, double()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.warnings.len(), 1);
        assert_eq!(raw.warnings[0].kind, WarningKind::MisplacedDimensions);
        assert_eq!(raw.warnings[0].line_number, 2);
    }

    #[test]
    fn test_single_variable_complex_plot() {
        let input = "Flags: complex\nNo. Variables: 1\nNo. Points: 1\nVariables:\n\
0 frequency frequency\n\
Values:\n0\t1,2\n";
        let raw = parse_str(input, double()).unwrap();
        let plot = &raw.plots[0];
        assert!(plot.data_vectors().is_empty());
        assert!(plot.is_complex());
        assert_eq!(plot.number_kind(), NumberKind::Complex);
        assert_eq!(plot.scale_vector().data(), &VectorData::Real(vec![1.0]));
    }

    #[test]
    fn test_variable_attributes_are_dropped() {
        let input = "Flags: complex\nNo. Variables: 2\nNo. Points: 1\nVariables:\n\
0 frequency frequency grid=3\n1 v(out) voltage\nValues:\n0\t1.0,0.0\n\t0.5,0.25\n";
        let raw = parse_str(input, double()).unwrap();
        assert_eq!(
            raw.warnings[0].kind,
            WarningKind::UnhandledVariableAttributes {
                name: "frequency".to_string(),
                attributes: vec!["grid=3".to_string()],
            }
        );
        let plot = &raw.plots[0];
        assert_eq!(plot.scale_vector().kind(), "frequency");
        assert_eq!(
            plot.data_vectors()[0].data(),
            &VectorData::Complex(vec![Complex64::new(0.5, 0.25)])
        );
    }

    #[test]
    fn test_short_variable_line_drops_vector() {
        let input = "No. Variables: 3\nNo. Points: 1\nVariables:\n0 t time\n1 broken\n\
2 v(b) voltage\n\
Values:\n0\t0\n\t1\n\t2\n";
        let raw = parse_str(input, double()).unwrap();
        let plot = &raw.plots[0];
        assert_eq!(plot.data_vectors().len(), 1);
        assert_eq!(plot.data_vectors()[0].name(), "v(b)");
        // Columns are assigned by position, so v(b) receives column 1
        assert_eq!(plot.data_vectors()[0].data(), &VectorData::Real(vec![1.0]));

        assert!(raw
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::VariableLineTooShort("1 broken".to_string())));
        assert!(raw.warnings.iter().any(|w| w.kind
            == WarningKind::VariableCountMismatch {
                declared: 3,
                parsed: 2
            }));
    }

    #[test]
    fn test_ascii_skips_short_lines() {
        let input = "No. Variables: 2\nNo. Points: 2\nVariables:\n0 t time\n1 v voltage\nValues:\n\
0\t0\n\n\t10\n1\t1\n   \n\t11\n";
        let raw = parse_str(input, double()).unwrap();
        let plot = &raw.plots[0];
        assert_eq!(plot.scale_vector().data(), &VectorData::Real(vec![0.0, 1.0]));
        assert_eq!(plot.data_vectors()[0].data(), &VectorData::Real(vec![10.0, 11.0]));
    }

    #[test]
    fn test_invalid_sample_is_format_error() {
        let input = "No. Variables: 1\nNo. Points: 1\nVariables:\n0 t time\nValues:\n0\tabc\n";
        let err = parse_str(input, double()).unwrap_err();
        assert_eq!(err.line(), Some("0\tabc"));
    }

    #[test]
    fn test_truncated_ascii_body_is_io_error() {
        let input = "No. Variables: 2\nNo. Points: 2\nVariables:\n0 t time\n1 v voltage\n\
Values:\n0\t0\n";
        match parse_str(input, double()).unwrap_err() {
            RawError::IoError(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_real_big_endian_single() {
        let mut input = b"Plotname: Transient Analysis\nFlags: real\n\
No. Variables: 2\nNo. Points: 3\n\
Variables:\n\t0\ttime\ttime\n\t1\tv(out)\tvoltage\nBinary:\n"
            .to_vec();
        for (t, v) in [(0.0f32, 0.5f32), (1.0, 1.5), (2.0, 2.5)] {
            input.write_f32::<BigEndian>(t).unwrap();
            input.write_f32::<BigEndian>(v).unwrap();
        }

        let raw = parse_raw(&input[..], ReadOptions::default()).unwrap();
        let plot = &raw.plots[0];
        assert_eq!(plot.scale_vector().data(), &VectorData::Real(vec![0.0, 1.0, 2.0]));
        assert_eq!(
            plot.data_vectors()[0].data(),
            &VectorData::Real(vec![0.5, 1.5, 2.5])
        );
    }

    #[test]
    fn test_binary_complex_then_next_plot() {
        let mut input = b"Plotname: AC Analysis\nFlags: complex\nNo. Variables: 2\nNo. Points: 2\n\
Variables:\n0 frequency frequency\n1 v(out) voltage\nBinary:\n"
            .to_vec();
        for row in [[1.0f64, 0.0, 0.5, -0.5], [10.0, 0.0, 0.25, 0.75]] {
            for x in row {
                input.write_f64::<LittleEndian>(x).unwrap();
            }
        }
        input.extend_from_slice(
            b"Plotname: Operating Point\nFlags: real\nNo. Variables: 1\nNo. Points: 1\n\
Variables:\n0 v(in) voltage\nBinary:\n",
        );
        input.write_f64::<LittleEndian>(3.3).unwrap();

        let options = ReadOptions::from_flags(true, true);
        let raw = parse_raw(&input[..], options).unwrap();
        assert_eq!(raw.len(), 2);

        let ac = &raw.plots[0];
        assert!(ac.is_complex());
        assert_eq!(ac.scale_vector().data(), &VectorData::Real(vec![1.0, 10.0]));
        assert_eq!(
            ac.data_vectors()[0].data(),
            &VectorData::Complex(vec![Complex64::new(0.5, -0.5), Complex64::new(0.25, 0.75)])
        );

        let op = &raw.plots[1];
        assert_eq!(op.plot_name(), "Operating Point");
        assert_eq!(op.scale_vector().data(), &VectorData::Real(vec![3.3]));
        assert!(op.data_vectors().is_empty());
    }

    #[test]
    fn test_session_does_not_carry_over() {
        let input = "Title: first\nFlags: complex\nNo. Variables: 1\nNo. Points: 1\n\
Variables:\n0 f frequency\n\
Values:\n0\t1,2\nNo. Variables: 1\nNo. Points: 1\nVariables:\n0 t time\nValues:\n0\t4\n";
        let raw = parse_str(input, double()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.plots[1].title(), "title undefined");
        assert_eq!(raw.plots[1].scale_vector().data(), &VectorData::Real(vec![4.0]));
    }

    #[test]
    fn test_incomplete_plot_warns() {
        let input = format!("{}Title: dangling\nNo. Points: 3\n", EXAMPLE);
        let raw = parse_str(&input, double()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.warnings.len(), 1);
        assert_eq!(raw.warnings[0].kind, WarningKind::IncompletePlot);
    }

    #[test]
    fn test_body_without_variables() {
        let input = "No. Variables: 1\nNo. Points: 2\nValues:\n0\t7\n1\t8\n";
        let raw = parse_str(input, double()).unwrap();
        let plot = &raw.plots[0];
        assert_eq!(plot.scale_vector().name(), "");
        assert_eq!(plot.scale_vector().data(), &VectorData::Real(vec![7.0, 8.0]));
        assert_eq!(raw.warnings[0].kind, WarningKind::MissingScaleVector);
    }

    #[test]
    fn test_empty_input_has_no_plots() {
        let raw = parse_str("", double()).unwrap();
        assert!(raw.is_empty());
        assert!(raw.warnings.is_empty());

        let raw = parse_str("\n\n  \n", double()).unwrap();
        assert!(raw.is_empty());
        assert!(raw.warnings.is_empty());
    }

    #[test]
    fn test_options_are_kept() {
        let options = ReadOptions::default().with_byte_order(Endian::Little);
        let parser = RawParser::new(&b""[..], options);
        assert_eq!(parser.options().byte_order, Endian::Little);
        assert_eq!(parser.plots_emitted(), 0);
        assert_eq!(parser.line_number(), 0);
    }
}
