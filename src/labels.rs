//! Fingerprint resolution
//!
//! A fingerprint is an opaque string that identifies one series' label
//! set. The [`LabelResolver`] trait turns fingerprints into canonical
//! [`Labels`]; the engine consults it once per fingerprint and caches the
//! result for its whole lifetime, so resolution cost is paid once even if
//! a series leaves and re-enters the window.
//!
//! [`FingerprintResolver`] is the built-in implementation for the
//! canonical `{name="value", ...}` syntax. Resolution failure is non-fatal
//! to the engine: the offending sample is dropped and counted.

use std::collections::HashSet;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt, value},
    multi::separated_list0,
    sequence::{delimited, preceded, separated_pair},
    IResult,
};

use crate::error::LabelError;
use crate::types::Labels;

/// Maps a series fingerprint to its canonical parsed label set
pub trait LabelResolver {
    /// Resolve a fingerprint into sorted labels
    fn resolve(&self, fingerprint: &str) -> Result<Labels, LabelError>;
}

// ============================================================================
// Fingerprint Grammar
// ============================================================================

/// Label names: one or more alphanumerics or underscores
fn label_name(input: &str) -> IResult<&str, &str> {
    let (rest, name) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)?;
    Ok((rest, name))
}

/// Double-quoted value with `\"` and `\\` escapes
fn quoted_value(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\"", tag("\"")), value("\\", tag("\\")))),
            )),
            |v| v.unwrap_or_default(),
        ),
        char('"'),
    )(input)
}

/// One `name="value"` pair, tolerating whitespace around `=`
fn label_pair(input: &str) -> IResult<&str, (String, String)> {
    map(
        separated_pair(
            preceded(multispace0, label_name),
            preceded(multispace0, char('=')),
            preceded(multispace0, quoted_value),
        ),
        |(name, val)| (name.to_string(), val),
    )(input)
}

/// A full `{...}` label set, possibly empty
fn label_set(input: &str) -> IResult<&str, Vec<(String, String)>> {
    delimited(
        preceded(multispace0, char('{')),
        separated_list0(preceded(multispace0, char(',')), label_pair),
        preceded(multispace0, char('}')),
    )(input)
}

// ============================================================================
// FingerprintResolver
// ============================================================================

/// Parses `{name="value", ...}` fingerprints into sorted labels
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintResolver;

impl FingerprintResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self
    }
}

impl LabelResolver for FingerprintResolver {
    fn resolve(&self, fingerprint: &str) -> Result<Labels, LabelError> {
        let pairs = match label_set(fingerprint) {
            Ok((rest, pairs)) if rest.trim().is_empty() => pairs,
            Ok((rest, _)) => {
                return Err(LabelError::InvalidFingerprint {
                    fingerprint: fingerprint.to_string(),
                    reason: format!("unexpected trailing input {:?}", rest.trim()),
                })
            }
            Err(e) => {
                return Err(LabelError::InvalidFingerprint {
                    fingerprint: fingerprint.to_string(),
                    reason: format!("{:?}", e),
                })
            }
        };

        let mut seen = HashSet::new();
        for (name, _) in &pairs {
            if !seen.insert(name.as_str()) {
                return Err(LabelError::DuplicateLabel { name: name.clone() });
            }
        }

        Ok(Labels::from_pairs(pairs))
    }
}
