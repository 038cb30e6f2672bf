//! Metric descriptor parser
//!
//! Parses Prometheus-style series descriptors into a canonical
//! (metric name, label set) pair.
//!
//! # Supported Syntax
//!
//! ```text
//! metric_name
//! metric_name{}
//! metric_name{key="value"}
//! metric_name{area_id="32",sensor_id="1",region="east"}
//! ```
//!
//! Label values are double-quoted and may contain `\"` and `\\` escapes.
//! Labels are stored sorted by name, so two descriptors written with their
//! labels in different orders compare equal.

use crate::error::{EngineError, EngineResult};
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt, value},
    multi::separated_list0,
    sequence::{delimited, separated_pair},
    IResult,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// One key/value pair attached to a series
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parsed identity of a series: metric name plus sorted label set
///
/// The label list is kept sorted by label name and free of duplicates, so
/// equality is independent of the order labels were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Metric name; empty only for anonymous series created without a
    /// descriptor argument
    pub name: String,
    labels: Vec<Label>,
}

impl MetricDescriptor {
    /// Descriptor for a series created without a descriptor argument
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a descriptor from a name and label pairs
    ///
    /// Fails if the name or any label name is malformed, or if a label
    /// name repeats.
    pub fn new(
        name: impl Into<String>,
        labels: impl IntoIterator<Item = (String, String)>,
    ) -> EngineResult<Self> {
        let name = name.into();
        validate_metric_name(&name)?;

        let mut descriptor = Self {
            name,
            labels: Vec::new(),
        };
        for (k, v) in labels {
            descriptor.add_label(k, v)?;
        }
        Ok(descriptor)
    }

    /// Labels, sorted by name
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Look up a label value by name
    pub fn label_value(&self, name: &str) -> Option<&str> {
        self.labels
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.labels[idx].value.as_str())
    }

    /// Insert a label, keeping the set sorted
    ///
    /// Fails on a malformed or duplicate label name.
    pub fn add_label(&mut self, name: String, value: String) -> EngineResult<()> {
        validate_label_name(&name)?;
        match self.labels.binary_search_by(|l| l.name.cmp(&name)) {
            Ok(_) => Err(EngineError::DescriptorFormat(format!(
                "duplicate label name '{}'",
                name
            ))),
            Err(idx) => {
                self.labels.insert(idx, Label { name, value });
                Ok(())
            }
        }
    }
}

impl fmt::Display for MetricDescriptor {
    /// Canonical Prometheus form: `name{a="1",b="2"}` with labels sorted
    /// by name; a bare name when the label set is empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.labels.is_empty() {
            return Ok(());
        }
        write!(f, "{{")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}=\"{}\"", label.name, escape_value(&label.value))?;
        }
        write!(f, "}}")
    }
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn metric_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").unwrap())
}

fn label_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap())
}

fn validate_metric_name(name: &str) -> EngineResult<()> {
    if !metric_name_regex().is_match(name) {
        return Err(EngineError::DescriptorFormat(format!(
            "invalid metric name '{}'",
            name
        )));
    }
    Ok(())
}

fn validate_label_name(name: &str) -> EngineResult<()> {
    if !label_name_regex().is_match(name) {
        return Err(EngineError::DescriptorFormat(format!(
            "invalid label name '{}'",
            name
        )));
    }
    Ok(())
}

/// Parse a descriptor string into a [`MetricDescriptor`]
///
/// A bare token (no braces) is a valid descriptor with an empty label set.
/// Parse failures never mutate any external state.
pub fn parse(input: &str) -> EngineResult<MetricDescriptor> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EngineError::DescriptorFormat(
            "empty descriptor".to_string(),
        ));
    }

    match parse_descriptor(trimmed) {
        Ok((remaining, (name, pairs))) => {
            if !remaining.is_empty() {
                return Err(EngineError::DescriptorFormat(format!(
                    "unexpected input after descriptor: '{}'",
                    remaining
                )));
            }
            MetricDescriptor::new(name, pairs)
        }
        Err(_) => Err(EngineError::DescriptorFormat(format!(
            "cannot parse '{}'",
            trimmed
        ))),
    }
}

/// Parse `name` optionally followed by a `{...}` label block
fn parse_descriptor(input: &str) -> IResult<&str, (&str, Vec<(String, String)>)> {
    let (input, name) = parse_metric_name(input)?;
    let (input, pairs) = opt(parse_label_block)(input)?;
    Ok((input, (name, pairs.unwrap_or_default())))
}

/// Metric name: a non-empty token free of the label-opening brace
fn parse_metric_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != '{' && c != '}' && !c.is_whitespace())(input)
}

/// Parse `{key="value",...}`; an empty block `{}` is valid
fn parse_label_block(input: &str) -> IResult<&str, Vec<(String, String)>> {
    delimited(
        char('{'),
        separated_list0(
            delimited(multispace0, char(','), multispace0),
            parse_label_pair,
        ),
        delimited(multispace0, char('}'), multispace0),
    )(input)
}

/// Parse a single `key="value"` pair
fn parse_label_pair(input: &str) -> IResult<&str, (String, String)> {
    separated_pair(
        map(
            delimited(multispace0, parse_label_token, multispace0),
            str::to_string,
        ),
        char('='),
        delimited(multispace0, parse_quoted_value, multispace0),
    )(input)
}

fn parse_label_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Parse a double-quoted value, honoring `\"` and `\\` escapes
fn parse_quoted_value(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\"\\"),
                '\\',
                alt((value("\"", tag("\"")), value("\\", tag("\\")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_name() {
        let desc = parse("temperature").unwrap();
        assert_eq!(desc.name, "temperature");
        assert!(desc.labels().is_empty());
    }

    #[test]
    fn test_parse_empty_label_block() {
        let desc = parse("temperature{}").unwrap();
        assert_eq!(desc.name, "temperature");
        assert!(desc.labels().is_empty());
    }

    #[test]
    fn test_parse_with_labels() {
        let desc = parse(r#"temperature{area_id="32",sensor_id="1",region="east"}"#).unwrap();
        assert_eq!(desc.name, "temperature");
        assert_eq!(desc.labels().len(), 3);
        assert_eq!(desc.label_value("area_id"), Some("32"));
        assert_eq!(desc.label_value("sensor_id"), Some("1"));
        assert_eq!(desc.label_value("region"), Some("east"));
        assert_eq!(desc.label_value("missing"), None);
    }

    #[test]
    fn test_label_order_independence() {
        let a = parse(r#"http_requests{method="GET",code="200"}"#).unwrap();
        let b = parse(r#"http_requests{code="200",method="GET"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_roundtrip_canonical_form() {
        let desc = parse(r#"temperature{region="east",area_id="32"}"#).unwrap();
        let serialized = desc.to_string();
        assert_eq!(serialized, r#"temperature{area_id="32",region="east"}"#);
        let reparsed = parse(&serialized).unwrap();
        assert_eq!(desc, reparsed);
    }

    #[test]
    fn test_escaped_value_roundtrip() {
        let desc = parse(r#"log_lines{path="C:\\tmp",quote="say \"hi\""}"#).unwrap();
        assert_eq!(desc.label_value("path"), Some(r"C:\tmp"));
        assert_eq!(desc.label_value("quote"), Some(r#"say "hi""#));

        let reparsed = parse(&desc.to_string()).unwrap();
        assert_eq!(desc, reparsed);
    }

    #[test]
    fn test_empty_label_value() {
        let desc = parse(r#"up{instance=""}"#).unwrap();
        assert_eq!(desc.label_value("instance"), Some(""));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = parse(r#"temperature{region="east",region="west"}"#).unwrap_err();
        assert!(matches!(err, EngineError::DescriptorFormat(_)));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(parse(r#"temperature{region="east""#).is_err());
        assert!(parse("temperature}").is_err());
        assert!(parse(r#"temperature{region=east}"#).is_err());
    }

    #[test]
    fn test_unbalanced_quotes_rejected() {
        assert!(parse(r#"temperature{region="east}"#).is_err());
        assert!(parse(r#"temperature{region=east"}"#).is_err());
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("{}").is_err());
        assert!(parse(r#"{region="east"}"#).is_err());
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(parse("9temperature").is_err());
        assert!(parse("temp-erature").is_err());
        assert!(parse(r#"temperature{9region="east"}"#).is_err());
    }

    #[test]
    fn test_colon_allowed_in_metric_name_only() {
        assert!(parse("node:cpu:rate5m").is_ok());
        assert!(parse(r#"up{na:me="x"}"#).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let desc = parse(r#"temperature{region="east"}"#).unwrap();
        let json = serde_json::to_string(&desc).unwrap();
        let restored: MetricDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(desc, restored);
    }
}
