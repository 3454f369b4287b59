use moodle_prom_core::ExporterError;
use regex::Regex;
use std::sync::LazyLock;

static BASE64_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\sA-Za-z0-9_/+]*={0,2}$").ok());

/// Longest line accepted in a multi-line (PEM style) value.
const MAX_LINE: usize = 64;

/// Clean a presented token as base64 text, the way Moodle's `PARAM_BASE64`
/// does.
///
/// Only the character set and line layout are checked; nothing is decoded.
/// Whitespace-separated lines are rejoined with `\n`. Every line but the
/// last must be exactly 64 characters and the last at most 64. Anything
/// else cleans to the empty string.
pub fn clean_base64(raw: &str) -> String {
    let trimmed = raw.trim();
    let charset_ok = BASE64_CHARS
        .as_ref()
        .is_some_and(|re| re.is_match(trimmed));
    if trimmed.is_empty() || !charset_ok {
        return String::new();
    }

    let lines: Vec<&str> = trimmed.split_whitespace().collect();
    let (last, body) = match lines.split_last() {
        Some(split) => split,
        None => return String::new(),
    };
    if last.len() > MAX_LINE || body.iter().any(|line| line.len() != MAX_LINE) {
        return String::new();
    }

    lines.join("\n")
}

/// Check a presented token against the configured secret.
///
/// With no secret configured every request passes. Otherwise the cleaned
/// token must equal the secret exactly; a missing token counts as empty.
pub fn authorize(secret: Option<&str>, presented: Option<&str>) -> Result<(), ExporterError> {
    let Some(secret) = secret else {
        return Ok(());
    };

    if clean_base64(presented.unwrap_or_default()) == secret {
        Ok(())
    } else {
        Err(ExporterError::AuthFailed)
    }
}
