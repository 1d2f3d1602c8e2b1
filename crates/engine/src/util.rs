//! Input validation and normalization shared by every write path.

use chrono::NaiveDate;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

pub(crate) const TRANSACTION_NAME_MAX_LEN: usize = 50;
pub(crate) const NOTE_MAX_LEN: usize = 300;
pub(crate) const CATEGORY_NAME_MAX_LEN: usize = 80;
pub(crate) const USERNAME_MAX_LEN: usize = 64;
pub(crate) const PASSWORD_MAX_LEN: usize = 256;

/// Trim a required name and enforce `1..=max_len` characters.
pub(crate) fn normalize_required_name(
    value: &str,
    label: &str,
    max_len: usize,
) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    if trimmed.chars().count() > max_len {
        return Err(EngineError::Validation(format!(
            "{label} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional note; blank notes become `None`.
pub(crate) fn normalize_note(value: Option<&str>) -> ResultEngine<Option<String>> {
    let Some(note) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if note.chars().count() > NOTE_MAX_LEN {
        return Err(EngineError::Validation(format!(
            "note must be at most {NOTE_MAX_LEN} characters"
        )));
    }
    Ok(Some(note.to_string()))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub(crate) fn parse_iso_date(value: &str) -> ResultEngine<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        EngineError::Validation("Invalid date format. Expected YYYY-MM-DD.".to_string())
    })
}

/// Validate a username as typed by the user.
///
/// Usernames are case-sensitive and kept verbatim, so surrounding whitespace
/// is rejected instead of trimmed.
pub(crate) fn validate_username(value: &str) -> ResultEngine<()> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    if value.trim() != value {
        return Err(EngineError::Validation(
            "username must not start or end with whitespace".to_string(),
        ));
    }
    if value.chars().count() > USERNAME_MAX_LEN {
        return Err(EngineError::Validation(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_password(value: &str) -> ResultEngine<()> {
    if value.is_empty() {
        return Err(EngineError::Validation(
            "password must not be empty".to_string(),
        ));
    }
    if value.chars().count() > PASSWORD_MAX_LEN {
        return Err(EngineError::Validation("Password too long".to_string()));
    }
    Ok(())
}

/// Build the uniqueness key of a category name.
///
/// `"  Café   Bar "` and `"cafe bar"` share the key `"cafe bar"`.
pub(crate) fn normalize_category_key(display: &str) -> String {
    let folded: String = display
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim and collapse inner whitespace of a category name for display.
pub(crate) fn normalize_category_display(value: &str) -> ResultEngine<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    normalize_required_name(&collapsed, "category name", CATEGORY_NAME_MAX_LEN)
}
