//! Command argument validation
//!
//! Scans a creation request's token list left to right, type-checking and
//! range-checking each option, and short-circuiting on the first failure.
//! For string-typed values the primitive-type check always precedes the
//! range check, so a non-numeric CHUNK_SIZE reports a type error and an
//! oversized one reports a range error.

use crate::config::Config;
use crate::descriptor::{self, MetricDescriptor};
use crate::error::{EngineError, EngineResult};
use crate::series::chunk::validate_chunk_size;
use crate::series::types::{DuplicatePolicy, Encoding, SeriesOptions};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1},
    combinator::{eof, opt, value},
    sequence::tuple,
    IResult,
};

pub(crate) const CMD_ARG_RETENTION: &str = "RETENTION";
pub(crate) const CMD_ARG_CHUNK_SIZE: &str = "CHUNK_SIZE";
pub(crate) const CMD_ARG_ENCODING: &str = "ENCODING";
pub(crate) const CMD_ARG_DUPLICATE_POLICY: &str = "DUPLICATE_POLICY";
pub(crate) const CMD_ARG_LABELS: &str = "LABELS";

/// Whether a token is one of the recognized option keywords
pub(crate) fn is_option_keyword(token: &str) -> bool {
    [
        CMD_ARG_RETENTION,
        CMD_ARG_CHUNK_SIZE,
        CMD_ARG_ENCODING,
        CMD_ARG_DUPLICATE_POLICY,
        CMD_ARG_LABELS,
    ]
    .iter()
    .any(|kw| token.eq_ignore_ascii_case(kw))
}

/// A fully parsed and validated creation request
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    /// Target key in the host namespace
    pub key: Vec<u8>,
    /// Parsed series identity, with any LABELS merged in
    pub descriptor: MetricDescriptor,
    /// Validated creation options
    pub options: SeriesOptions,
}

/// Parse `<key> [<descriptor>] [OPTION value ...]` into a [`CreateRequest`]
///
/// Defaults for omitted options come from the engine configuration. Any
/// single violated rule aborts the whole request; nothing is applied
/// partially.
pub fn parse_create_args(args: &[String], config: &Config) -> EngineResult<CreateRequest> {
    let mut iter = args.iter().peekable();

    let key = iter
        .next()
        .ok_or(EngineError::WrongArity("TEMPO.CREATE"))?
        .clone()
        .into_bytes();

    let mut request = CreateRequest {
        key,
        descriptor: MetricDescriptor::anonymous(),
        options: config.series.default_options(),
    };

    if let Some(token) = iter.peek() {
        if !is_option_keyword(token.as_str()) {
            request.descriptor = descriptor::parse(iter.next().unwrap())?;
        }
    }

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            a if a.eq_ignore_ascii_case(CMD_ARG_RETENTION) => {
                let token = next_value(&mut iter, CMD_ARG_RETENTION)?;
                request.options.retention_ms = parse_duration_ms(CMD_ARG_RETENTION, token)?;
            }
            a if a.eq_ignore_ascii_case(CMD_ARG_CHUNK_SIZE) => {
                let token = next_value(&mut iter, CMD_ARG_CHUNK_SIZE)?;
                let bytes: i64 = token.parse().map_err(|_| EngineError::OptionType {
                    option: CMD_ARG_CHUNK_SIZE,
                    found: token.clone(),
                })?;
                request.options.chunk_size_bytes = validate_chunk_size(bytes)?;
            }
            a if a.eq_ignore_ascii_case(CMD_ARG_ENCODING) => {
                let token = next_value(&mut iter, CMD_ARG_ENCODING)?;
                request.options.encoding = Encoding::try_from(token.as_str())?;
            }
            a if a.eq_ignore_ascii_case(CMD_ARG_DUPLICATE_POLICY) => {
                let token = next_value(&mut iter, CMD_ARG_DUPLICATE_POLICY)?;
                request.options.duplicate_policy = DuplicatePolicy::try_from(token.as_str())?;
            }
            a if a.eq_ignore_ascii_case(CMD_ARG_LABELS) => {
                parse_labels(&mut iter, &mut request.descriptor)?;
            }
            other => {
                return Err(EngineError::OptionValue {
                    option: "TEMPO.CREATE",
                    message: format!("unrecognized argument '{}'", other),
                });
            }
        }
    }

    Ok(request)
}

/// Pull the value token that must follow an option keyword
fn next_value<'a, I>(iter: &mut std::iter::Peekable<I>, option: &'static str) -> EngineResult<&'a String>
where
    I: Iterator<Item = &'a String>,
{
    iter.next().ok_or(EngineError::OptionValue {
        option,
        message: "missing value".to_string(),
    })
}

/// Consume an even-length run of key/value tokens, merging them into the
/// descriptor's label set
///
/// The run ends at the next recognized option keyword or at end of input.
/// A key whose value slot is missing (end of input or a keyword) is an
/// arity error.
fn parse_labels<'a, I>(
    iter: &mut std::iter::Peekable<I>,
    descriptor: &mut MetricDescriptor,
) -> EngineResult<()>
where
    I: Iterator<Item = &'a String>,
{
    while let Some(token) = iter.peek() {
        if is_option_keyword(token.as_str()) {
            break;
        }
        let key = iter.next().unwrap();
        let has_value = iter
            .peek()
            .map(|v| !is_option_keyword(v.as_str()))
            .unwrap_or(false);
        if !has_value {
            return Err(EngineError::LabelArity(key.clone()));
        }
        let value = iter.next().unwrap();
        descriptor
            .add_label(key.clone(), value.clone())
            .map_err(|e| EngineError::OptionValue {
                option: CMD_ARG_LABELS,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

/// Parse a RETENTION-style duration into milliseconds
///
/// Accepts a bare non-negative integer (milliseconds) or an integer with
/// a unit suffix: `ms`, `s`, `m`, `h`, `d`, `w` (case-insensitive).
pub fn parse_duration_ms(option: &'static str, token: &str) -> EngineResult<i64> {
    if let Ok(millis) = token.parse::<i64>() {
        if millis < 0 {
            return Err(EngineError::OptionRange {
                option,
                message: format!("duration must be non-negative, got {}", millis),
            });
        }
        return Ok(millis);
    }

    let (negative, magnitude, unit_ms) = match duration_literal(token) {
        Ok((_, parts)) => parts,
        Err(_) => {
            return Err(EngineError::OptionType {
                option,
                found: token.to_string(),
            })
        }
    };

    let millis = magnitude
        .parse::<i64>()
        .ok()
        .and_then(|v| v.checked_mul(unit_ms))
        .ok_or(EngineError::OptionRange {
            option,
            message: format!("duration '{}' is too large", token),
        })?;

    if negative {
        return Err(EngineError::OptionRange {
            option,
            message: format!("duration must be non-negative, got {}", token),
        });
    }
    Ok(millis)
}

/// `[-]<digits><unit>`, consuming the whole token
fn duration_literal(input: &str) -> IResult<&str, (bool, &str, i64)> {
    let (rest, (sign, digits, unit, _)) =
        tuple((opt(char('-')), digit1, duration_unit_ms, eof))(input)?;
    Ok((rest, (sign.is_some(), digits, unit)))
}

/// Unit suffix to milliseconds-per-unit
fn duration_unit_ms(input: &str) -> IResult<&str, i64> {
    alt((
        value(1i64, tag_no_case("ms")),
        value(1000, tag_no_case("s")),
        value(60_000, tag_no_case("m")),
        value(3_600_000, tag_no_case("h")),
        value(86_400_000, tag_no_case("d")),
        value(604_800_000, tag_no_case("w")),
    ))(input)
}
