//! Normalization of the names that appear on the right-hand side of `extra == "..."` markers.

use thiserror::Error;

pub use extra_name::ExtraName;

mod extra_name;

/// Validate and normalize an owned extra name.
pub(crate) fn validate_and_normalize_owned(name: String) -> Result<String, InvalidNameError> {
    if is_normalized(&name)? {
        Ok(name)
    } else {
        validate_and_normalize_ref(name)
    }
}

/// Validate and normalize an unowned extra name.
pub(crate) fn validate_and_normalize_ref(
    name: impl AsRef<str>,
) -> Result<String, InvalidNameError> {
    let name = name.as_ref();
    let mut normalized = String::with_capacity(name.len());

    let mut last = None;
    for char in name.bytes() {
        match char {
            b'A'..=b'Z' => {
                normalized.push(char.to_ascii_lowercase() as char);
            }
            b'a'..=b'z' | b'0'..=b'9' => {
                normalized.push(char as char);
            }
            b'-' | b'_' | b'.' => match last {
                // Names can't start with punctuation.
                None => return Err(InvalidNameError(name.to_string())),
                Some(b'-' | b'_' | b'.') => {}
                Some(_) => normalized.push('-'),
            },
            _ => return Err(InvalidNameError(name.to_string())),
        }
        last = Some(char);
    }

    // Names can't end with punctuation.
    if matches!(last, Some(b'-' | b'_' | b'.')) {
        return Err(InvalidNameError(name.to_string()));
    }

    Ok(normalized)
}

/// Returns `true` if the name is already normalized.
fn is_normalized(name: impl AsRef<str>) -> Result<bool, InvalidNameError> {
    let name = name.as_ref();
    let mut last = None;
    for char in name.bytes() {
        match char {
            // Uppercase characters need to be converted to lowercase.
            b'A'..=b'Z' => return Ok(false),
            b'a'..=b'z' | b'0'..=b'9' => {}
            // `_` and `.` are normalized to `-`.
            b'_' | b'.' => return Ok(false),
            b'-' => match last {
                None => return Err(InvalidNameError(name.to_string())),
                // Runs of `-` are normalized to a single `-`.
                Some(b'-') => return Ok(false),
                Some(_) => {}
            },
            _ => return Err(InvalidNameError(name.to_string())),
        }
        last = Some(char);
    }

    if matches!(last, Some(b'-' | b'_' | b'.')) {
        return Err(InvalidNameError(name.to_string()));
    }

    Ok(true)
}

/// Invalid [`ExtraName`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "Not a valid extra name: \"{0}\". Names must start and end with a letter or digit and may only contain -, _, ., and alphanumeric characters."
)]
pub struct InvalidNameError(String);

impl InvalidNameError {
    /// Returns the invalid name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("friendly-bard"; "already normal")]
    #[test_case("Friendly-Bard"; "uppercase")]
    #[test_case("FRIENDLY-BARD"; "all caps")]
    #[test_case("friendly.bard"; "dot")]
    #[test_case("friendly_bard"; "underscore")]
    #[test_case("friendly--bard"; "double dash")]
    #[test_case("FrIeNdLy-._.-bArD"; "mixed run")]
    fn normalize(input: &str) {
        assert_eq!(validate_and_normalize_ref(input).unwrap(), "friendly-bard");
        assert_eq!(
            validate_and_normalize_owned(input.to_string()).unwrap(),
            "friendly-bard"
        );
    }

    #[test]
    fn check() {
        assert!(is_normalized("friendly-bard").unwrap());
        assert!(!is_normalized("friendly_bard").unwrap());
        assert!(!is_normalized("Friendly-Bard").unwrap());
        assert!(!is_normalized("friendly--bard").unwrap());
    }

    #[test_case("-friendly"; "leading dash")]
    #[test_case("friendly-"; "trailing dash")]
    #[test_case("_friendly"; "leading underscore")]
    #[test_case("friendly."; "trailing dot")]
    #[test_case("friendly bard"; "space")]
    #[test_case("friendly!"; "bang")]
    fn unsupported(input: &str) {
        let err = validate_and_normalize_ref(input).unwrap_err();
        assert_eq!(err.as_str(), input);
        assert!(validate_and_normalize_owned(input.to_string()).is_err());
    }

    #[test]
    fn error_message() {
        let err = validate_and_normalize_ref("-foo").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not a valid extra name: \"-foo\". Names must start and end with a letter or digit and may only contain -, _, ., and alphanumeric characters."
        );
    }
}
