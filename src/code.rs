//! Error codes with a process-wide registry.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};

/// A numeric error code paired with a human-readable message.
///
/// Equality and hashing consider only the numeric code: two instances with
/// the same code compare equal even when their messages differ. Creating an
/// instance registers it as the canonical message for that code in the
/// process-wide [`ErrorCodeRegistry`]; registering the same code again
/// replaces the canonical message (latest wins).
///
/// Code `0` is reserved for success.
///
/// # Examples
///
/// ```
/// use itonami::ErrorCode;
///
/// let code = ErrorCode::new(7000, "upstream service unavailable");
/// assert_eq!(code.code(), 7000);
///
/// // Equality ignores the message.
/// assert_eq!(code, ErrorCode::new(7000, "a different message"));
///
/// // Appending never changes the code.
/// let annotated = code.append_message(Some("FailWorker:FetchWorker"));
/// assert_eq!(annotated.code(), 7000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCode {
    code: i32,
    message: String,
}

impl ErrorCode {
    /// The reserved success code.
    pub const OK_CODE: i32 = 0;

    /// Creates an error code and registers it as the canonical instance for
    /// its numeric value.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        let error_code = Self {
            code,
            message: message.into(),
        };
        ErrorCodeRegistry::global().register(&error_code);
        error_code
    }

    /// The canonical success code.
    pub fn ok() -> Self {
        Self {
            code: Self::OK_CODE,
            message: "Ok".to_string(),
        }
    }

    /// Looks up the canonical instance for a bare numeric code.
    ///
    /// Unknown codes fall back to an empty-message instance; `0` falls back
    /// to the canonical success instance.
    pub fn from_code(code: i32) -> Self {
        if let Some(known) = ErrorCodeRegistry::global().lookup(code) {
            return known;
        }

        if code == Self::OK_CODE {
            return Self::ok();
        }

        Self {
            code,
            message: String::new(),
        }
    }

    /// Returns the numeric code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if this is the success code.
    pub fn is_ok(&self) -> bool {
        self.code == Self::OK_CODE
    }

    /// Returns a new instance with the same code and the extra text appended
    /// to the message. `None` returns an unchanged clone.
    pub fn append_message(&self, append: Option<&str>) -> Self {
        match append {
            None => self.clone(),
            Some(append) => Self::new(self.code, format!("{} {}", self.message, append)),
        }
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for ErrorCode {}

impl Hash for ErrorCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Process-wide mapping from numeric codes to their canonical instances.
///
/// The registry is logically append-only for the process lifetime. Register
/// the application's codes once at startup (by constructing them with
/// [`ErrorCode::new`]) rather than relying on first-use ordering; the last
/// registration for a code wins.
#[derive(Debug, Default)]
pub struct ErrorCodeRegistry {
    codes: Mutex<HashMap<i32, ErrorCode>>,
}

impl ErrorCodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`ErrorCode::new`] and
    /// [`ErrorCode::from_code`].
    pub fn global() -> &'static ErrorCodeRegistry {
        static GLOBAL: OnceLock<ErrorCodeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ErrorCodeRegistry::new)
    }

    /// Records `code` as the canonical instance for its numeric value.
    pub fn register(&self, code: &ErrorCode) {
        let mut codes = self.codes.lock().unwrap_or_else(PoisonError::into_inner);
        codes.insert(code.code, code.clone());
    }

    /// Returns the canonical instance for a numeric value, if registered.
    pub fn lookup(&self, code: i32) -> Option<ErrorCode> {
        let codes = self.codes.lock().unwrap_or_else(PoisonError::into_inner);
        codes.get(&code).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_message() {
        let a = ErrorCode::new(9001, "first");
        let b = ErrorCode::new(9001, "second");
        assert_eq!(a, b);
        assert_ne!(a, ErrorCode::new(9002, "first"));
    }

    #[test]
    fn test_append_message_keeps_code() {
        let code = ErrorCode::new(9003, "base");
        let appended = code.append_message(Some("extra"));
        assert_eq!(appended.code(), 9003);
        assert_eq!(appended.message(), "base extra");

        let unchanged = code.append_message(None);
        assert_eq!(unchanged.message(), "base");
    }

    #[test]
    fn test_from_code_returns_canonical() {
        let _ = ErrorCode::new(9004, "canonical message");
        let looked_up = ErrorCode::from_code(9004);
        assert_eq!(looked_up.message(), "canonical message");
    }

    #[test]
    fn test_from_code_latest_registration_wins() {
        let _ = ErrorCode::new(9005, "old");
        let _ = ErrorCode::new(9005, "new");
        assert_eq!(ErrorCode::from_code(9005).message(), "new");
    }

    #[test]
    fn test_from_code_unknown_falls_back_to_empty_message() {
        let unknown = ErrorCode::from_code(123_456_789);
        assert_eq!(unknown.code(), 123_456_789);
        assert_eq!(unknown.message(), "");
    }

    #[test]
    fn test_ok_is_reserved_zero() {
        assert!(ErrorCode::ok().is_ok());
        assert_eq!(ErrorCode::ok().code(), ErrorCode::OK_CODE);
        assert!(ErrorCode::from_code(0).is_ok());
        assert!(!ErrorCode::new(9006, "fail").is_ok());
    }

    #[test]
    fn test_display() {
        let code = ErrorCode::new(9007, "boom");
        assert_eq!(code.to_string(), "9007 boom");
    }
}
