use std::sync::LazyLock;

use regex::Regex;

static NEPAL_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?977)?[0-9]{7,10}$").expect("static phone pattern compiles")
});

fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Accepts an optional `+977`/`977` prefix followed by 7 to 10 digits.
pub fn is_valid(raw: &str) -> bool {
    NEPAL_PHONE.is_match(&compact(raw))
}

/// Normalizes a valid number to `+977<digits>`.
pub fn normalize(raw: &str) -> anyhow::Result<String> {
    let compacted = compact(raw);
    if !NEPAL_PHONE.is_match(&compacted) {
        anyhow::bail!("{raw} is not a valid phone number, use 9841234567 or +9779841234567");
    }
    // Up to ten bare digits are always a local number, even when they
    // happen to start with 977.
    let local = match compacted.strip_prefix("+977") {
        Some(rest) => rest,
        None if compacted.len() > 10 => compacted.strip_prefix("977").unwrap_or(&compacted),
        None => &compacted,
    };
    Ok(format!("+977{local}"))
}
