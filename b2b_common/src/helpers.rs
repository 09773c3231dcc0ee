use std::{env, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads and parses the environment variable `name`.
///
/// Returns `None` if the variable is not set, and `Some(Err(raw_value))` if it could not be parsed, so that callers
/// can log the bad value before falling back to a default.
pub fn parse_env_var<T: FromStr>(name: &str) -> Option<Result<T, String>> {
    let raw = env::var(name).ok()?;
    Some(raw.trim().parse::<T>().map_err(|_| raw))
}

/// The first 8 characters of an identifier, used in user-facing copy.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
