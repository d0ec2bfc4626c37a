//! Worker execution outcomes.

use std::fmt;

use crate::code::ErrorCode;

/// The outcome of one worker execution.
///
/// A failing result records whether another attempt may succeed
/// (`can_retry`); the engine consults this flag together with the worker's
/// own retry policy before re-running an attempt.
///
/// # Examples
///
/// ```
/// use itonami::{ErrorCode, WorkerResult};
///
/// let ok = WorkerResult::success();
/// assert!(ok.is_success());
///
/// let failed = WorkerResult::fail(ErrorCode::new(7000, "unavailable"), true);
/// assert!(failed.is_fail());
/// assert!(failed.can_retry());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResult {
    is_success: bool,
    error_code: ErrorCode,
    can_retry: bool,
}

impl WorkerResult {
    /// A successful result.
    pub fn success() -> Self {
        Self {
            is_success: true,
            error_code: ErrorCode::ok(),
            can_retry: false,
        }
    }

    /// A failing result.
    ///
    /// A failing result must never carry the success code; passing code `0`
    /// is a contract violation and aborts immediately.
    pub fn fail(error_code: ErrorCode, can_retry: bool) -> Self {
        assert!(
            !error_code.is_ok(),
            "a failing result must not carry the Ok code"
        );
        Self {
            is_success: false,
            error_code,
            can_retry,
        }
    }

    /// Returns `true` if the execution succeeded.
    pub fn is_success(&self) -> bool {
        self.is_success
    }

    /// Returns `true` if the execution failed.
    pub fn is_fail(&self) -> bool {
        !self.is_success
    }

    /// The result's error code (`Ok` for successes).
    pub fn error_code(&self) -> &ErrorCode {
        &self.error_code
    }

    /// Whether another attempt may succeed.
    pub fn can_retry(&self) -> bool {
        self.can_retry
    }
}

impl fmt::Display for WorkerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success {
            write!(f, "[Ok]")
        } else {
            write!(f, "[Fail] {}", self.error_code)
        }
    }
}

/// The outcome of a typed worker execution, carrying an output value on
/// success.
///
/// Success is defined as "value present": the only way to represent failure
/// is to omit the value. Note the latent gap this creates when the output
/// type has its own notion of absence: `TypedResult<Option<T>>` cannot
/// distinguish a successful `None` from a failure by the value alone, so
/// prefer concrete output types.
#[derive(Debug, Clone)]
pub struct TypedResult<T> {
    value: Option<T>,
    error_code: ErrorCode,
    can_retry: bool,
}

impl<T> TypedResult<T> {
    /// A successful result carrying `value`.
    pub fn from_value(value: T) -> Self {
        Self {
            value: Some(value),
            error_code: ErrorCode::ok(),
            can_retry: false,
        }
    }

    /// A failing result with no value.
    ///
    /// `can_retry` is explicit per call site: chain failures pass `false`
    /// because the task has already failed and no later retry can help.
    /// Passing the success code is a contract violation and aborts
    /// immediately.
    pub fn fail(error_code: ErrorCode, can_retry: bool) -> Self {
        assert!(
            !error_code.is_ok(),
            "a failing result must not carry the Ok code"
        );
        Self {
            value: None,
            error_code,
            can_retry,
        }
    }

    /// Returns `true` if a value is present.
    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }

    /// Returns `true` if no value is present.
    pub fn is_fail(&self) -> bool {
        self.value.is_none()
    }

    /// The carried value, if any.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consumes the result and returns the carried value, if any.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// The result's error code (`Ok` for successes).
    pub fn error_code(&self) -> &ErrorCode {
        &self.error_code
    }

    /// Whether another attempt may succeed.
    pub fn can_retry(&self) -> bool {
        self.can_retry
    }

    /// The untyped view of this result.
    pub fn to_worker_result(&self) -> WorkerResult {
        if self.is_success() {
            WorkerResult::success()
        } else {
            WorkerResult::fail(self.error_code.clone(), self.can_retry)
        }
    }
}

impl<T: Default> TypedResult<T> {
    /// Consumes the result and returns the carried value, or the type's
    /// default when failed.
    pub fn unwrap_or_default(self) -> T {
        self.value.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_round_trip() {
        let result = TypedResult::from_value(41u32);
        assert!(result.is_success());
        assert_eq!(result.value(), Some(&41));
        assert!(result.error_code().is_ok());
        assert_eq!(result.into_value(), Some(41));
    }

    #[test]
    fn test_fail_carries_no_value() {
        let result: TypedResult<u32> = TypedResult::fail(ErrorCode::new(9201, "nope"), false);
        assert!(result.is_fail());
        assert_eq!(result.value(), None);
        assert_eq!(result.error_code().code(), 9201);
        assert!(!result.can_retry());
    }

    #[test]
    fn test_unwrap_or_default() {
        let result: TypedResult<u32> = TypedResult::fail(ErrorCode::new(9202, "nope"), true);
        assert_eq!(result.unwrap_or_default(), 0);
        assert_eq!(TypedResult::from_value(9u32).unwrap_or_default(), 9);
    }

    #[test]
    fn test_to_worker_result() {
        let ok = TypedResult::from_value("v".to_string()).to_worker_result();
        assert!(ok.is_success());

        let failed: TypedResult<String> = TypedResult::fail(ErrorCode::new(9203, "nope"), true);
        let untyped = failed.to_worker_result();
        assert!(untyped.is_fail());
        assert_eq!(untyped.error_code().code(), 9203);
        assert!(untyped.can_retry());
    }

    #[test]
    #[should_panic(expected = "must not carry the Ok code")]
    fn test_fail_with_ok_code_is_a_contract_violation() {
        let _ = WorkerResult::fail(ErrorCode::ok(), true);
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkerResult::success().to_string(), "[Ok]");
        let failed = WorkerResult::fail(ErrorCode::new(9204, "boom"), false);
        assert_eq!(failed.to_string(), "[Fail] 9204 boom");
    }
}
