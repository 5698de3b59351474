// src/util.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Read a UTF-8 file into a String with a clear error message.
///
/// Only used for the config file. Descriptor files are read as raw bytes.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Longest duration Go's `time.ParseDuration` accepts (`i64::MAX` nanoseconds).
pub const MAX_DURATION: Duration = Duration::from_nanos(i64::MAX as u64);

/// Parse a Go-style duration string.
///
/// Accepts one or more `<integer><unit>` groups with units `h`, `m`, `s`,
/// `ms`, e.g. `30m`, `1h30m`, `15m0s`, `500ms`. A bare integer is taken as
/// seconds. Anything above [`MAX_DURATION`] is rejected.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let total = parse_unbounded(input)?;
    if total > MAX_DURATION {
        bail!("Duration out of range: {input}");
    }
    Ok(total)
}

fn parse_unbounded(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        bail!("Invalid duration: empty string");
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            bail!("Invalid duration: {input}");
        }
        let value: u64 = rest[..digits]
            .parse()
            .with_context(|| format!("Invalid duration: {input}"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "s" => Some(Duration::from_secs(value)),
            "ms" => Some(Duration::from_millis(value)),
            _ => bail!("Invalid duration unit {unit:?} in {input}"),
        };

        total = part
            .and_then(|p| total.checked_add(p))
            .with_context(|| format!("Duration out of range: {input}"))?;
    }

    Ok(total)
}

/// Render a duration the way `parse_duration` reads it back, e.g. `1h30m0s`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let ms = d.subsec_millis();

    if total == 0 {
        return format!("{ms}ms");
    }

    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if h > 0 || m > 0 {
        out.push_str(&format!("{m}m"));
    }
    out.push_str(&format!("{s}s"));
    if ms > 0 {
        out.push_str(&format!("{ms}ms"));
    }
    out
}

pub fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}
