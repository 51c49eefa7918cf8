use std::{error::Error, fmt, sync::Arc};

/// The error type passed around by this crate.
///
/// Errors are shared rather than owned, so that a recorded error can be handed to several
/// handlers and copied out of a [`May`](crate::May) without being cloned itself.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Converts anything that can become a boxed error (including `&str` and `String`) into a
/// [`SharedError`]. A `SharedError` passed in comes back as the same shared error, not wrapped
/// in another one.
///
/// ```
/// # use may::shared;
/// let err = shared("something went wrong");
/// assert_eq!(err.to_string(), "something went wrong");
/// ```
pub fn shared(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> SharedError {
    from_boxed(error.into())
}

pub(crate) fn from_boxed(error: Box<dyn Error + Send + Sync + 'static>) -> SharedError {
    match error.downcast::<SharedError>() {
        Ok(error) => *error,
        Err(error) => Arc::from(error),
    }
}

/// The error produced when an outcome of `false` is normalized.
///
/// ```
/// # use may::NotOk;
/// assert_eq!(NotOk.to_string(), "not ok");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("not ok")]
pub struct NotOk;

/// An error with a contextual message prefixed to it.
///
/// The text is `"{message}: {cause}"`, and the cause remains available through
/// [`Error::source`].
#[derive(Debug, Clone)]
pub struct MessageError {
    message: String,
    cause: SharedError,
}

impl MessageError {
    pub fn new(message: impl Into<String>, cause: SharedError) -> Self {
        Self { message: message.into(), cause }
    }

    /// The message which was prefixed to the cause.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &SharedError {
        &self.cause
    }
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.cause)
    }
}

impl Error for MessageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Several errors combined into one, in order.
///
/// The text is the text of each error joined with `"; "`. Every error stays inspectable through
/// [`errors`], and [`find_cause`] searches all of them.
///
/// [`errors`]: MultiError::errors
///
/// ```
/// # use may::{shared, MultiError};
/// let errors = vec![shared("first"), shared("second")];
/// let combined = MultiError::new(errors);
///
/// assert_eq!(combined.to_string(), "first; second");
/// assert_eq!(combined.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MultiError {
    errors: Vec<SharedError>,
}

impl MultiError {
    pub fn new(errors: Vec<SharedError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[SharedError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SharedError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl Error for MultiError {
    /// Only the first cause fits in the `source` chain; use [`find_cause`] to search them all.
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.errors.first().map(|e| &**e as &(dyn Error + 'static))
    }
}

impl FromIterator<SharedError> for MultiError {
    fn from_iter<I: IntoIterator<Item = SharedError>>(iter: I) -> Self {
        Self { errors: iter.into_iter().collect() }
    }
}

/// Searches an error and everything it was caused by for an error of type `E`.
///
/// This follows [`Error::source`], and descends into every cause of a [`MultiError`] rather than
/// only the first.
///
/// ```
/// # use may::{find_cause, NotOk, Outcome, attach_message, msg};
/// let err = attach_message(Outcome::from(false).into_error(), &msg!("while reading")).unwrap();
///
/// assert_eq!(err.to_string(), "while reading: not ok");
/// assert!(find_cause::<NotOk>(&*err).is_some());
/// ```
pub fn find_cause<'a, E: Error + 'static>(error: &'a (dyn Error + 'static)) -> Option<&'a E> {
    if let Some(found) = error.downcast_ref::<E>() {
        return Some(found);
    }

    // A shared error can end up boxed inside another box, e.g. via `Into<Box<dyn Error>>`
    if let Some(shared) = error.downcast_ref::<SharedError>() {
        return find_cause(&**shared);
    }

    if let Some(multi) = error.downcast_ref::<MultiError>() {
        return multi.errors.iter().find_map(|e| find_cause(&**e));
    }

    error.source().and_then(find_cause::<E>)
}

/// Whether `error`, or anything it was caused by, is an `E`. See [`find_cause`].
pub fn is_caused_by<E: Error + 'static>(error: &(dyn Error + 'static)) -> bool {
    find_cause::<E>(error).is_some()
}
