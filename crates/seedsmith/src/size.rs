/// Parses human-readable byte sizes: `16384`, `16K`, `16KB`, `16KiB`, `4m`, `1G`.
/// Every suffix is a binary multiple.
pub fn parse_size(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split_at);

    if digits.is_empty() {
        return Err(format!("{raw:?} doesn't start with a number"));
    }
    let value: u64 = digits.parse().map_err(|e| format!("{raw:?} is not a valid size: {e}"))?;

    let shift = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        other => return Err(format!("unknown size suffix {other:?}")),
    };

    value
        .checked_mul(1 << shift)
        .ok_or_else(|| format!("{raw:?} is too large"))
}
