/*!
 * Clip time values of DAISY 2.02 timing documents.
 *
 * The wire format is `npt=<seconds>s`. Any non-negative decimal with a `.`
 * separator is accepted on read; output always carries exactly three
 * decimals.
 */

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{NodeId, XmlDocument};
use crate::errors::ClipError;

/// Attribute holding the start of an audio clip
pub const CLIP_BEGIN: &str = "clip-begin";

/// Attribute holding the end of an audio clip
pub const CLIP_END: &str = "clip-end";

// @const: npt clip value regex
static CLIP_VALUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^npt=([0-9]+)(?:\.([0-9]+))?s$").unwrap()
});

/// Parse an `npt=<seconds>s` value
pub fn parse_clip_value(attribute: &str, value: &str) -> Result<Duration, ClipError> {
    let invalid = || ClipError::InvalidValue {
        attribute: attribute.to_string(),
        value: value.to_string(),
    };

    let caps = CLIP_VALUE_REGEX.captures(value).ok_or_else(invalid)?;
    let seconds: u64 = caps[1].parse().map_err(|_| invalid())?;

    // Fractional digits are read exactly; anything past nanoseconds is dropped
    let nanos = match caps.get(2) {
        Some(fraction) => {
            let digits = &fraction.as_str()[..fraction.as_str().len().min(9)];
            let scale = 10u32.pow(9 - digits.len() as u32);
            digits.parse::<u32>().map_err(|_| invalid())? * scale
        }
        None => 0,
    };

    Ok(Duration::new(seconds, nanos))
}

/// Render a duration as `npt=<seconds>s` with exactly three decimals
pub fn format_clip_value(offset: Duration) -> String {
    let total_ms = (offset.as_nanos() + 500_000) / 1_000_000;
    format!("npt={}.{:03}s", total_ms / 1000, total_ms % 1000)
}

/// Parse a clip attribute of an element
pub fn parse_clip_attribute(doc: &XmlDocument, node: NodeId, attribute: &str) -> Result<Duration, ClipError> {
    let value = doc.attribute(node, attribute).ok_or_else(|| ClipError::Missing {
        attribute: attribute.to_string(),
    })?;
    parse_clip_value(attribute, value)
}
