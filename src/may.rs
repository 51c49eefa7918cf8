use std::{error::Error, fmt, marker::PhantomData, sync::Arc};

use log::trace;

use crate::{
    attach_message, ErrorCollector, Handlers, Message, MultiError, Outcome, SharedError,
};

/// Collects the errors of many fallible operations within one unit of work, so they can be
/// handled together at the end instead of after each operation.
///
/// `T` is the type of value the operations produce. [`invoke`] accepts it only so that an
/// operation's value and outcome can be passed in together; it is never stored.
///
/// [`invoke`]: May::invoke
///
/// # Collecting
///
/// Each call to [`invoke`] normalizes an [`Outcome`], prefixes the rendered [`Message`] to it,
/// and records the result if it is an error. Nothing is recorded for a successful outcome.
///
/// ```
/// # use may::{May, msg};
/// let mut may = May::<&str>::new();
///
/// may.invoke("", Some("something went wrong"), msg!());
/// may.invoke("", Some("something went wrong"), msg!("operation shouldn't fail"));
/// may.invoke("", Some("something went wrong"), msg!("operation shouldn't fail with %s", "foo"));
/// may.invoke("fine", None::<&str>, msg!("not recorded"));
///
/// let errs = may.collect_as_errors();
/// assert_eq!(errs.len(), 3);
/// assert_eq!(errs[2].to_string(), "operation shouldn't fail with foo: something went wrong");
/// ```
///
/// # Converging
///
/// The recorded errors are read, never consumed, by:
///
/// - [`collect_as_error`]: one combined error, or `None`
/// - [`collect_as_errors`]: a copy of the errors
/// - [`handle_errors`] and [`handle_errors_with_return`]: custom handling
///
/// To guarantee handling when the unit of work ends, however it ends, use
/// [`handle_errors_on_drop`] or [`scope`].
///
/// [`collect_as_error`]: May::collect_as_error
/// [`collect_as_errors`]: May::collect_as_errors
/// [`handle_errors`]: May::handle_errors
/// [`handle_errors_with_return`]: May::handle_errors_with_return
/// [`handle_errors_on_drop`]: May::handle_errors_on_drop
/// [`scope`]: May::scope
pub struct May<T> {
    errors: Vec<SharedError>,
    handlers: Handlers,
    value: PhantomData<fn(T)>,
}

impl<T> May<T> {
    /// Constructs a new `May` with no errors and no handlers.
    pub fn new() -> Self {
        Self::with_handlers(Handlers::new())
    }

    /// Constructs a new `May` which runs `handlers` at the moment each error is invoked.
    ///
    /// Handlers see the error as the operation reported it and the unrendered message, before
    /// the message is attached.
    ///
    /// ```
    /// # use std::sync::{Arc, Mutex};
    /// # use may::{logger_handler, May, Handlers, msg};
    /// let out = Arc::new(Mutex::new(Vec::<u8>::new()));
    /// let mut may = May::<()>::with_handlers(Handlers::from(vec![logger_handler(out.clone())]));
    ///
    /// may.invoke((), false, msg!("step %d", 1));
    ///
    /// assert_eq!(String::from_utf8(out.lock().unwrap().clone()).unwrap(), "step 1: not ok\n");
    /// assert_eq!(may.len(), 1);
    /// ```
    pub fn with_handlers(handlers: Handlers) -> Self {
        Self { errors: vec![], handlers, value: PhantomData }
    }

    /// Records the error represented by `outcome`, if any, with `message` prefixed to it.
    ///
    /// `value` is discarded.
    pub fn invoke(&mut self, value: T, outcome: impl Into<Outcome>, message: impl Into<Message>) {
        drop(value);
        self.record(outcome.into(), message.into());
    }

    /// Like [`invoke`](May::invoke), for an operation which returns a [`Result`]. The value is
    /// passed through if there was one.
    ///
    /// ```
    /// # use may::{May, msg};
    /// let mut may = May::new();
    /// let port = may.invoke_result("80".parse::<u16>(), msg!("port"));
    /// let limit = may.invoke_result("lots".parse::<u16>(), msg!("limit"));
    ///
    /// assert_eq!(port, Some(80));
    /// assert_eq!(limit, None);
    /// assert_eq!(may.collect_as_error().unwrap().to_string(), "limit: invalid digit found in string");
    /// ```
    pub fn invoke_result<E>(&mut self, result: Result<T, E>, message: impl Into<Message>) -> Option<T>
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.record(Outcome::from(Some(error)), message.into());
                None
            }
        }
    }

    fn record(&mut self, outcome: Outcome, message: Message) {
        let Some(error) = outcome.into_error() else {
            return;
        };

        if !self.handlers.is_empty() {
            self.handlers.dispatch(&error, &message);
        }

        if let Some(error) = attach_message(Some(error), &message) {
            trace!(target: "may", "recorded error #{}: {error}", self.errors.len() + 1);
            self.errors.push(error);
        }
    }

    /// Combines the recorded errors into one [`MultiError`], or returns `None` if there are none.
    ///
    /// The combined text is each error's text, in order, joined with `"; "`.
    pub fn collect_as_error(&self) -> Option<SharedError> {
        if self.errors.is_empty() {
            return None;
        }

        Some(Arc::new(MultiError::new(self.errors.clone())))
    }

    /// A copy of the recorded errors, in the order they were invoked.
    pub fn collect_as_errors(&self) -> Vec<SharedError> {
        self.errors.clone()
    }

    /// Handles the recorded errors by passing them to a closure, even if there are none.
    ///
    /// ```
    /// # use may::{May, msg};
    /// let mut may = May::new();
    /// may.invoke(1, false, msg!("first"));
    /// may.invoke(2, true, msg!("second"));
    ///
    /// may.handle_errors(|errs| {
    ///     for err in &errs {
    ///         println!("error: {err}");
    ///     }
    ///     assert_eq!(errs.len(), 1);
    /// });
    /// ```
    pub fn handle_errors(&self, handler: impl FnOnce(Vec<SharedError>)) {
        handler(self.collect_as_errors())
    }

    /// Handles the recorded errors by passing them to a closure, returning whatever it returns.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use may::{May, MultiError, SharedError};
    /// let may = May::<()>::new();
    /// let err = may.handle_errors_with_return(|errs| -> Option<SharedError> {
    ///     if errs.is_empty() {
    ///         return None;
    ///     }
    ///     Some(Arc::new(MultiError::new(errs)))
    /// });
    ///
    /// assert!(err.is_none());
    /// ```
    pub fn handle_errors_with_return<R>(&self, handler: impl FnOnce(Vec<SharedError>) -> R) -> R {
        handler(self.collect_as_errors())
    }

    /// The recorded errors, without copying them.
    pub fn errors(&self) -> &[SharedError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<T> Default for May<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for May<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("May")
            .field("errors", &self.errors)
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl<T> ErrorCollector<SharedError> for May<T> {
    type WrappedInner = ();

    fn push_error(&mut self, error: SharedError) {
        self.errors.push(error);
    }

    fn propagate(self, other: &mut impl ErrorCollector<SharedError>) {
        self.errors.propagate(other)
    }
}
