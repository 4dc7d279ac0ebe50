/// Utility functions
use serde_json::Value;

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<f64>().ok();
    }
    None
}

/// Pick the first non-null value from a JSON object by trying multiple keys
pub fn pick<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| v.get(*k))
        .find(|x| !x.is_null())
}

/// Parse a free-form UTC offset ("+08:00", "-05:30", "8", "+0530") into signed decimal hours
pub fn parse_utc_offset(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s
        .strip_prefix("UTC")
        .or_else(|| s.strip_prefix("GMT"))
        .unwrap_or(s)
        .trim();
    if s.is_empty() {
        return None;
    }

    let (sign, rest) = match s.as_bytes()[0] {
        b'+' => (1.0, &s[1..]),
        b'-' => (-1.0, &s[1..]),
        _ => (1.0, s),
    };

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<f64>().ok()?, m.parse::<u32>().ok()?)
    } else if rest.len() == 4 && rest.bytes().all(|b| b.is_ascii_digit()) {
        (rest[..2].parse::<f64>().ok()?, rest[2..].parse::<u32>().ok()?)
    } else {
        (rest.parse::<f64>().ok()?, 0)
    };

    if !hours.is_finite() || hours < 0.0 || minutes >= 60 {
        return None;
    }
    let total = sign * (hours + f64::from(minutes) / 60.0);
    (total.abs() <= 14.0).then_some(total)
}

/// Truncate a string to at most `max` characters, on a char boundary
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
