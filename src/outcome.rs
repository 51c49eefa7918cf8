use std::{
    any::{type_name, Any},
    error::Error,
    sync::Arc,
};

use crate::{error::from_boxed, Message, MessageError, NotOk, SharedError};

/// Whether an operation failed, in one of the shapes fallible code commonly reports it.
///
/// An `Outcome` is normalized to either no error or exactly one [`SharedError`] with
/// [`into_error`]:
///
/// [`into_error`]: Outcome::into_error
///
/// | Converted from                 | Variant        | Normalizes to     |
/// |--------------------------------|----------------|-------------------|
/// | `()`, `None`, `Ok(_)`          | [`Absent`]     | no error          |
/// | `true`                         | [`Success`]    | no error          |
/// | `false`                        | [`Failure`]    | [`NotOk`]         |
/// | `Some(e)`, `Err(e)`, an error  | [`Error`]      | the error itself  |
///
/// [`Absent`]: Outcome::Absent
/// [`Success`]: Outcome::Success
/// [`Failure`]: Outcome::Failure
/// [`Error`]: Outcome::Error
///
/// ```
/// # use may::Outcome;
/// assert!(Outcome::from(()).into_error().is_none());
/// assert!(Outcome::from(true).into_error().is_none());
/// assert_eq!(Outcome::from(false).into_error().unwrap().to_string(), "not ok");
///
/// let parsed = "nope".parse::<u32>();
/// assert_eq!(
///     Outcome::from(parsed).into_error().unwrap().to_string(),
///     "invalid digit found in string",
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    /// Nothing was reported.
    #[default]
    Absent,

    /// A success flag of `true`.
    Success,

    /// A success flag of `false`. Normalizes to [`NotOk`].
    Failure,

    /// An error value.
    Error(SharedError),
}

impl Outcome {
    /// Wraps any concrete error.
    pub fn err(error: impl Error + Send + Sync + 'static) -> Self {
        Outcome::Error(Arc::new(error))
    }

    /// Converts a dynamically-typed value into an `Outcome`.
    ///
    /// Accepted types are `bool`, `()`, [`SharedError`], `Option<SharedError>` and `Outcome`.
    ///
    /// # Panics
    ///
    /// Passing any other type is a bug in the calling code, not a recoverable failure, so this
    /// panics immediately with the name of the offending type.
    ///
    /// ```should_panic
    /// # use may::Outcome;
    /// Outcome::from_any(vec!["foo", "bar"]); // Panics
    /// ```
    #[track_caller]
    pub fn from_any<V: Any>(value: V) -> Self {
        let value: Box<dyn Any> = Box::new(value);
        let value = match value.downcast::<bool>() {
            Ok(flag) => return Outcome::from(*flag),
            Err(value) => value,
        };
        let value = match value.downcast::<SharedError>() {
            Ok(error) => return Outcome::Error(*error),
            Err(value) => value,
        };
        let value = match value.downcast::<Option<SharedError>>() {
            Ok(error) => return (*error).map_or(Outcome::Absent, Outcome::Error),
            Err(value) => value,
        };
        let value = match value.downcast::<Outcome>() {
            Ok(outcome) => return *outcome,
            Err(value) => value,
        };
        if value.is::<()>() {
            return Outcome::Absent;
        }

        panic!(
            "may: invalid err type '{}', should either be a bool or an error",
            type_name::<V>()
        )
    }

    /// Normalizes this outcome into an error, or `None` if it does not represent a failure.
    pub fn into_error(self) -> Option<SharedError> {
        match self {
            Outcome::Absent | Outcome::Success => None,
            Outcome::Failure => Some(Arc::new(NotOk)),
            Outcome::Error(error) => Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure | Outcome::Error(_))
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Absent
    }
}

impl From<bool> for Outcome {
    fn from(ok: bool) -> Self {
        if ok {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

impl From<SharedError> for Outcome {
    fn from(error: SharedError) -> Self {
        Outcome::Error(error)
    }
}

impl From<&SharedError> for Outcome {
    fn from(error: &SharedError) -> Self {
        Outcome::Error(error.clone())
    }
}

impl<E: Into<Box<dyn Error + Send + Sync>>> From<Option<E>> for Outcome {
    fn from(error: Option<E>) -> Self {
        match error {
            Some(error) => Outcome::Error(from_boxed(error.into())),
            None => Outcome::Absent,
        }
    }
}

impl<T, E: Into<Box<dyn Error + Send + Sync>>> From<Result<T, E>> for Outcome {
    fn from(result: Result<T, E>) -> Self {
        Outcome::from(result.err())
    }
}

/// Normalizes anything convertible to an [`Outcome`] into an error, or `None`.
///
/// See [`Outcome::into_error`].
pub fn normalize(outcome: impl Into<Outcome>) -> Option<SharedError> {
    outcome.into().into_error()
}

/// Prefixes the rendered `message` to `error`.
///
/// - If there is no error, the result is `None` whatever the message is.
/// - If the message renders empty, `error` is returned unchanged.
/// - Otherwise the result is a [`MessageError`] with the text `"{message}: {error}"`, which keeps
///   `error` as its source.
///
/// ```
/// # use may::{attach_message, msg, shared};
/// let err = shared("something went wrong");
///
/// assert!(attach_message(None, &msg!("ignored")).is_none());
/// assert_eq!(attach_message(Some(err.clone()), &msg!()).unwrap().to_string(), "something went wrong");
/// assert_eq!(
///     attach_message(Some(err), &msg!("operation shouldn't fail with %s", "foo")).unwrap().to_string(),
///     "operation shouldn't fail with foo: something went wrong",
/// );
/// ```
pub fn attach_message(error: Option<SharedError>, message: &Message) -> Option<SharedError> {
    let error = error?;
    let message = message.render();
    if message.is_empty() {
        Some(error)
    } else {
        Some(Arc::new(MessageError::new(message, error)))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{find_cause, msg, shared};

    #[test]
    fn normalize_absent_and_flags() {
        assert!(normalize(()).is_none());
        assert!(normalize(Option::<SharedError>::None).is_none());
        assert!(normalize(true).is_none());

        let err = normalize(false).unwrap();
        assert_eq!(err.to_string(), "not ok");
        assert!(err.downcast_ref::<NotOk>().is_some());
    }

    #[test]
    fn normalize_returns_existing_error_unchanged() {
        let err = shared("boom");
        let normalized = normalize(&err).unwrap();
        assert!(Arc::ptr_eq(&err, &normalized));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn shared_errors_in_options_and_results_are_not_rewrapped() {
        let err: SharedError = Arc::new(DiskFull);

        let from_some = normalize(Some(err.clone())).unwrap();
        assert!(Arc::ptr_eq(&err, &from_some));
        assert!(from_some.downcast_ref::<DiskFull>().is_some());

        let from_err = normalize(Err::<(), SharedError>(err.clone())).unwrap();
        assert!(Arc::ptr_eq(&err, &from_err));
        assert!(from_err.downcast_ref::<DiskFull>().is_some());

        assert!(Arc::ptr_eq(&err, &shared(err.clone())));
    }

    #[test]
    fn normalize_results() {
        assert!(normalize(Ok::<_, io::Error>(5)).is_none());

        let err = normalize(Err::<(), _>(io::Error::new(io::ErrorKind::NotFound, "gone"))).unwrap();
        assert_eq!(err.to_string(), "gone");
        assert!(find_cause::<io::Error>(&*err).is_some());
    }

    #[test]
    fn from_any_accepts_supported_types() {
        assert!(Outcome::from_any(()).into_error().is_none());
        assert!(Outcome::from_any(true).into_error().is_none());
        assert!(Outcome::from_any(false).is_failure());
        assert!(Outcome::from_any(shared("x")).is_failure());
        assert!(Outcome::from_any(Some(shared("x"))).is_failure());
        assert!(!Outcome::from_any(Option::<SharedError>::None).is_failure());
        assert!(Outcome::from_any(Outcome::Failure).is_failure());
    }

    #[test]
    #[should_panic(
        expected = "may: invalid err type 'alloc::vec::Vec<&str>', should either be a bool or an error"
    )]
    fn from_any_rejects_other_types() {
        Outcome::from_any(vec!["foo", "bar"]);
    }

    #[test]
    #[should_panic(expected = "should either be a bool or an error")]
    fn from_any_rejects_integers() {
        Outcome::from_any(1u8);
    }

    #[test]
    fn attach_message_to_nothing_is_nothing() {
        assert!(attach_message(None, &msg!()).is_none());
        assert!(attach_message(None, &msg!("error occurred")).is_none());
    }

    #[test]
    fn attach_message_without_message_is_unchanged() {
        let err = shared("assert.AnError general error for testing");
        let attached = attach_message(Some(err.clone()), &msg!()).unwrap();
        assert!(Arc::ptr_eq(&err, &attached));

        let attached = attach_message(Some(err.clone()), &msg!("")).unwrap();
        assert!(Arc::ptr_eq(&err, &attached));
    }

    #[test]
    fn attach_message_wraps_error() {
        let err: SharedError = Arc::new(io::Error::new(io::ErrorKind::Other, "cause"));

        let attached = attach_message(Some(err.clone()), &msg!("error occurred")).unwrap();
        assert_eq!(attached.to_string(), "error occurred: cause");
        assert!(find_cause::<io::Error>(&*attached).is_some());

        let attached = attach_message(Some(err), &msg!(vec!["error occurred", "foo"])).unwrap();
        assert_eq!(attached.to_string(), "[error occurred foo]: cause");
    }

    #[test]
    fn attach_message_to_not_ok() {
        let attached = attach_message(normalize(false), &msg!("m")).unwrap();
        assert_eq!(attached.to_string(), "m: not ok");
    }
}
