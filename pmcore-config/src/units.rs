//! Parsing for the `seconds`, `bandwidth`, and `throttle` option kinds.

use crate::Error;

/// Sentinel returned by [`parse_seconds`] for the literal `never`.
pub const NEVER: u64 = u64::MAX;

fn invalid(name: &str, detail: impl Into<String>) -> Error {
    Error::InvalidValue {
        domain: "Option",
        name: name.to_string(),
        description: "could not parse value",
        detail: detail.into(),
    }
}

/// Parses a `seconds` value: a bare integer, an integer with a trailing
/// `s`/`m`/`h`/`d` suffix, a float fraction of a second, or the literal
/// `never` (mapped to [`NEVER`]). Negative values are rejected.
pub fn parse_seconds(name: &str, text: &str) -> Result<u64, Error> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("never") {
        return Ok(NEVER);
    }
    if let Some(stripped) = text.strip_prefix('-') {
        let _ = stripped;
        return Err(invalid(name, "negative durations are not allowed"));
    }
    let (number, multiplier) = match text.chars().last() {
        Some('s') => (&text[..text.len() - 1], 1u64),
        Some('m') => (&text[..text.len() - 1], 60),
        Some('h') => (&text[..text.len() - 1], 3600),
        Some('d') => (&text[..text.len() - 1], 86400),
        _ => (text, 1),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| invalid(name, format!("`{text}` is not a valid duration")))?;
    if value < 0.0 {
        return Err(invalid(name, "negative durations are not allowed"));
    }
    Ok((value * multiplier as f64) as u64)
}

/// Parses a `bandwidth` value in bytes, accepting `k`/`M`/`G` suffixes using
/// binary (1024-based) thousands.
pub fn parse_bandwidth(name: &str, text: &str) -> Result<u64, Error> {
    let text = text.trim();
    let (number, multiplier) = match text.chars().last() {
        Some('k') | Some('K') => (&text[..text.len() - 1], 1024u64),
        Some('M') => (&text[..text.len() - 1], 1024 * 1024),
        Some('G') => (&text[..text.len() - 1], 1024 * 1024 * 1024),
        _ => (text, 1),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| invalid(name, format!("`{text}` is not a valid bandwidth")))?;
    if value < 0.0 {
        return Err(invalid(name, "negative bandwidth is not allowed"));
    }
    Ok((value * multiplier as f64) as u64)
}

/// A throttle value: either an absolute bandwidth in bytes, or a fraction of
/// some externally supplied total bandwidth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Throttle {
    Bytes(u64),
    Percent(f64),
}

/// Parses a `throttle` value: a [`parse_bandwidth`] value, or a `0..100%`
/// percentage.
pub fn parse_throttle(name: &str, text: &str) -> Result<Throttle, Error> {
    let text = text.trim();
    if let Some(pct) = text.strip_suffix('%') {
        let value: f64 = pct
            .parse()
            .map_err(|_| invalid(name, format!("`{text}` is not a valid percentage")))?;
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid(name, "percentage must be within 0..100"));
        }
        return Ok(Throttle::Percent(value));
    }
    Ok(Throttle::Bytes(parse_bandwidth(name, text)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_suffixes() {
        assert_eq!(parse_seconds("x", "30").unwrap(), 30);
        assert_eq!(parse_seconds("x", "2m").unwrap(), 120);
        assert_eq!(parse_seconds("x", "1h").unwrap(), 3600);
        assert_eq!(parse_seconds("x", "never").unwrap(), NEVER);
    }

    #[test]
    fn seconds_rejects_negative() {
        assert!(parse_seconds("x", "-5").is_err());
    }

    #[test]
    fn bandwidth_binary_thousands() {
        assert_eq!(parse_bandwidth("x", "1k").unwrap(), 1024);
        assert_eq!(parse_bandwidth("x", "1M").unwrap(), 1024 * 1024);
    }

    #[test]
    fn throttle_percent_or_bytes() {
        assert_eq!(parse_throttle("x", "50%").unwrap(), Throttle::Percent(50.0));
        assert_eq!(parse_throttle("x", "1k").unwrap(), Throttle::Bytes(1024));
    }

    #[test]
    fn throttle_rejects_out_of_range_percent() {
        assert!(parse_throttle("x", "150%").is_err());
    }
}
