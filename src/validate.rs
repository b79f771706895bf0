//! App-name grammar and submission preconditions.

use crate::errors::BuildError;

/// Longest accepted app name, in characters.
pub const MAX_APP_NAME_LEN: usize = 128;

/// Check `name` against `^[a-z0-9][-a-z0-9]{0,127}$`.
///
/// ASCII only: a leading lowercase letter or digit, then up to 127 lowercase
/// letters, digits or hyphens.
pub fn is_valid_app_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return false;
    };
    if bytes.len() > MAX_APP_NAME_LEN {
        return false;
    }
    let lower_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    lower_alnum(first) && rest.iter().all(|&b| lower_alnum(b) || b == b'-')
}

/// Preconditions for a build submission. No I/O.
pub fn validate_submission(app_name: &str, description: &str) -> Result<(), BuildError> {
    if app_name.is_empty() || description.trim().is_empty() {
        return Err(BuildError::Validation(
            "App name and description are required".to_string(),
        ));
    }
    if !is_valid_app_name(app_name) {
        return Err(BuildError::Validation(format!(
            "Invalid app name '{}': use lowercase letters, digits and hyphens, \
             starting with a letter or digit (max {} characters)",
            app_name, MAX_APP_NAME_LEN
        )));
    }
    Ok(())
}
