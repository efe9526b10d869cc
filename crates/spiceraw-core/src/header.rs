//! Header line handling for SPICE raw files
//!
//! Every header line has the form `Keyword: value`. The keyword is matched
//! case-insensitively; the value keeps its case.

use crate::types::NumberKind;

/// Recognized header keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    Title,
    Date,
    Plotname,
    Flags,
    NumVariables,
    NumPoints,
    Dimensions,
    Command,
    Option,
    Variables,
    Values,
    Binary,
    Blank,
}

impl Keyword {
    /// Classify a case-folded keyword. `None` for anything unrecognized.
    pub(crate) fn parse(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "" => Keyword::Blank,
            "title" => Keyword::Title,
            "date" => Keyword::Date,
            "plotname" => Keyword::Plotname,
            "flags" => Keyword::Flags,
            "no. variables" => Keyword::NumVariables,
            "no. points" => Keyword::NumPoints,
            "dimensions" => Keyword::Dimensions,
            "command" => Keyword::Command,
            "option" => Keyword::Option,
            "variables" => Keyword::Variables,
            "values" => Keyword::Values,
            "binary" => Keyword::Binary,
            _ => return None,
        })
    }
}

/// A header line split on its first colon
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct HeaderLine<'a> {
    /// Trimmed, lowercased keyword
    pub keyword: String,
    /// Trimmed value, empty when the line has no colon
    pub value: &'a str,
}

pub(crate) fn split_header_line(line: &str) -> HeaderLine<'_> {
    let (keyword, value) = match line.split_once(':') {
        Some((k, v)) => (k, v),
        None => (line, ""),
    };
    HeaderLine {
        keyword: keyword.trim().to_lowercase(),
        value: value.trim(),
    }
}

/// Effect of a single `Flags:` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Flag {
    Number(NumberKind),
    Padded(bool),
    Unknown(String),
}

pub(crate) fn parse_flags(value: &str) -> Vec<Flag> {
    value
        .split_whitespace()
        .map(|token| match token.to_lowercase().as_str() {
            "real" => Flag::Number(NumberKind::Real),
            "complex" => Flag::Number(NumberKind::Complex),
            "unpadded" => Flag::Padded(false),
            "padded" => Flag::Padded(true),
            other => Flag::Unknown(other.to_string()),
        })
        .collect()
}

/// A parsed line of the `Variables:` table
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct VariableDecl<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    /// Trailing `min=`, `max=`, `grid=`, `dims=` ... tokens
    pub attributes: Vec<&'a str>,
}

/// Parse `index name kind [attributes...]`; `None` when fewer than 3 tokens.
pub(crate) fn parse_variable_line(line: &str) -> Option<VariableDecl<'_>> {
    let mut tokens = line.split_whitespace();
    let _index = tokens.next()?;
    let name = tokens.next()?;
    let kind = tokens.next()?;
    Some(VariableDecl {
        name,
        kind,
        attributes: tokens.collect(),
    })
}
