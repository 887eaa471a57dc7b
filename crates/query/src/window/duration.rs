//! Duration literals used by `interval(..)` and `_window(..)`.

use rivulet_core::{Error, Result};
use std::time::Duration;

/// Parses `<n><unit>`: `ms`/`S` milliseconds, `s` seconds, `m` minutes,
/// `h`/`H` hours, `d` days. A bare number is milliseconds.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let amount: u64 = digits.parse().map_err(|_| Error::cast(text, "duration"))?;
    let millis_per_unit = match unit.trim() {
        "" | "ms" | "S" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" | "H" => 3_600_000,
        "d" => 86_400_000,
        _ => return Err(Error::cast(text, "duration")),
    };
    amount
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| Error::cast(text, "duration"))
}
