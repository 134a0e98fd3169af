//! Timeout Resolution
//!
//! Duration strings such as `"90s"`, `"5m"` or `"1h30m"` and the precedence
//! between an explicit timeout and `DEEPSEEK_TIMEOUT`.

use std::time::Duration;

use crate::error::{DeepseekError, Result};

/// Environment variable holding the fallback timeout
pub const TIMEOUT_ENV: &str = "DEEPSEEK_TIMEOUT";

/// Used when neither the client nor the environment sets a timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

// Longer suffixes first so "ms" is not read as "m"
const UNITS: &[(&str, f64)] = &[
    ("ns", 1e-9),
    ("us", 1e-6),
    ("µs", 1e-6),
    ("μs", 1e-6),
    ("ms", 1e-3),
    ("s", 1.0),
    ("m", 60.0),
    ("h", 3600.0),
];

/// Parse a duration string made of `<number><unit>` terms.
///
/// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; numbers may carry a
/// fraction. `"0"` on its own is a zero duration.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| {
        DeepseekError::Config(format!("invalid timeout duration {:?}: {}", input, reason))
    };

    let mut rest = input.trim();
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    if rest.starts_with('-') {
        return Err(invalid("must not be negative"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid("empty"));
    }

    let mut total = 0.0_f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[number_len..];

        let (unit, scale) = UNITS
            .iter()
            .find(|(unit, _)| rest.starts_with(unit))
            .ok_or_else(|| invalid("missing or unknown unit"))?;
        rest = &rest[unit.len()..];

        total += value * scale;
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid("out of range"))
}

/// Pick the effective timeout: explicit value, then the environment value,
/// then [`DEFAULT_TIMEOUT`]. A zero explicit timeout counts as unset.
pub fn resolve_timeout(explicit: Option<Duration>, env_value: Option<&str>) -> Result<Duration> {
    if let Some(timeout) = explicit.filter(|t| !t.is_zero()) {
        return Ok(timeout);
    }

    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => parse_duration(value),
        None => Ok(DEFAULT_TIMEOUT),
    }
}

/// Current value of [`TIMEOUT_ENV`], if set
pub fn timeout_from_env() -> Option<String> {
    std::env::var(TIMEOUT_ENV).ok()
}
