use std::{
    mem,
    ops::{Deref, DerefMut},
};

use crate::{May, SharedError};

/// A [`May`] whose errors are handled when it goes out of scope.
///
/// `Sentinel` has a custom implementation of the [`Drop`] trait which passes the recorded errors
/// to its handler, however the scope ends: falling off the end, an early `return`, a `?`, or a
/// panic unwinding through it. This is the place to put the one call which decides what the
/// unit of work's errors amount to.
///
/// A `Sentinel` dereferences to its `May`, so errors are invoked through it directly.
///
/// ```
/// # use std::{cell::RefCell, num::ParseIntError};
/// # use may::{May, msg};
/// fn sum(inputs: &[&str], report: &RefCell<Vec<String>>) -> Result<u32, ParseIntError> {
///     let mut may = May::<u32>::new().handle_errors_on_drop(|errs| {
///         report.borrow_mut().extend(errs.iter().map(|e| e.to_string()));
///     });
///
///     let mut total = 0;
///     for input in inputs {
///         if input.is_empty() {
///             may.invoke(0, false, msg!("empty input"));
///             continue;
///         }
///         // Leaves early, but the errors so far are still handled
///         total += input.parse::<u32>()?;
///     }
///     Ok(total)
/// }
///
/// let report = RefCell::new(vec![]);
/// assert!(sum(&["1", "", "x", "2"], &report).is_err());
/// assert_eq!(*report.borrow(), ["empty input: not ok"]);
/// ```
pub struct Sentinel<T, F>
where
    F: FnOnce(Vec<SharedError>),
{
    may: May<T>,

    /// The handler to run on drop. Wrapped in an [`Option`] so that it can be moved out of
    /// `self` when it runs, or taken away by [`cancel`](Sentinel::cancel).
    handler: Option<F>,
}

impl<T> May<T> {
    /// Wraps this `May` in a [`Sentinel`], which calls [`handle_errors`] with `handler` when it
    /// is dropped.
    ///
    /// [`handle_errors`]: May::handle_errors
    pub fn handle_errors_on_drop<F>(self, handler: F) -> Sentinel<T, F>
    where
        F: FnOnce(Vec<SharedError>),
    {
        Sentinel { may: self, handler: Some(handler) }
    }

    /// Runs `body` with this `May`, then converges its errors with `handler`, returning both the
    /// body's value and the handler's result.
    ///
    /// The handler runs through a [`Sentinel`], so it still runs if `body` panics (the panic then
    /// continues, and the handler's result is discarded).
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use may::{May, MessageError, MultiError, SharedError, msg};
    /// let (count, err) = May::<usize>::new().scope(
    ///     |may| {
    ///         may.invoke(0, Some("something went wrong"), msg!());
    ///         may.invoke(0, Some("something went wrong"), msg!("operation shouldn't fail"));
    ///         may.len()
    ///     },
    ///     |errs| -> Option<SharedError> {
    ///         let combined: SharedError = Arc::new(MultiError::new(errs));
    ///         Some(Arc::new(MessageError::new("error occurred", combined)))
    ///     },
    /// );
    ///
    /// assert_eq!(count, 2);
    /// assert_eq!(
    ///     err.unwrap().to_string(),
    ///     "error occurred: something went wrong; operation shouldn't fail: something went wrong",
    /// );
    /// ```
    pub fn scope<R, B, H>(self, body: B, handler: H) -> (R, Option<SharedError>)
    where
        B: FnOnce(&mut May<T>) -> R,
        H: FnOnce(Vec<SharedError>) -> Option<SharedError>,
    {
        let mut converged = None;
        let value = {
            let mut sentinel = self.handle_errors_on_drop(|errs| converged = handler(errs));
            body(&mut sentinel)
        };
        (value, converged)
    }
}

impl<T, F> Sentinel<T, F>
where
    F: FnOnce(Vec<SharedError>),
{
    /// Disarms the sentinel without running its handler, returning the `May` with its errors
    /// intact so that they can be handled some other way.
    pub fn cancel(mut self) -> May<T> {
        self.handler = None;
        mem::take(&mut self.may)
    }
}

impl<T, F> Deref for Sentinel<T, F>
where
    F: FnOnce(Vec<SharedError>),
{
    type Target = May<T>;

    fn deref(&self) -> &May<T> {
        &self.may
    }
}

impl<T, F> DerefMut for Sentinel<T, F>
where
    F: FnOnce(Vec<SharedError>),
{
    fn deref_mut(&mut self) -> &mut May<T> {
        &mut self.may
    }
}

impl<T, F> Drop for Sentinel<T, F>
where
    F: FnOnce(Vec<SharedError>),
{
    fn drop(&mut self) {
        // Runs during unwinding too; a handler which panics then will abort the process.
        if let Some(handler) = self.handler.take() {
            self.may.handle_errors(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        panic::{catch_unwind, AssertUnwindSafe},
    };

    use super::*;
    use crate::{msg, Outcome};

    fn early_exit(fail_fast: bool, seen: &RefCell<Option<Vec<String>>>) -> Result<(), String> {
        let mut may = May::<()>::new().handle_errors_on_drop(|errs| {
            *seen.borrow_mut() = Some(errs.iter().map(|e| e.to_string()).collect());
        });

        may.invoke((), false, msg!("first"));
        if fail_fast {
            return Err("bailed".to_owned());
        }
        may.invoke((), false, msg!("second"));
        Ok(())
    }

    #[test]
    fn handler_runs_on_normal_exit() {
        let seen = RefCell::new(None);
        early_exit(false, &seen).unwrap();
        assert_eq!(seen.into_inner().unwrap(), ["first: not ok", "second: not ok"]);
    }

    #[test]
    fn handler_runs_on_early_return() {
        let seen = RefCell::new(None);
        assert!(early_exit(true, &seen).is_err());
        assert_eq!(seen.into_inner().unwrap(), ["first: not ok"]);
    }

    #[test]
    fn handler_runs_once_with_no_errors() {
        let calls = Cell::new(0);
        {
            let _may = May::<()>::new().handle_errors_on_drop(|errs| {
                assert!(errs.is_empty());
                calls.set(calls.get() + 1);
            });
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn handler_runs_while_unwinding() {
        let seen = Cell::new(0);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut may = May::<()>::new().handle_errors_on_drop(|errs| seen.set(errs.len()));
            may.invoke((), false, msg!("before the panic"));
            panic!("operation blew up");
        }));

        assert!(result.is_err());
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn invalid_outcome_still_converges() {
        let seen = Cell::new(None);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut may = May::<()>::new().handle_errors_on_drop(|errs| seen.set(Some(errs.len())));
            may.invoke((), true, msg!());
            may.invoke((), Outcome::from_any("not an outcome"), msg!());
        }));

        assert!(result.is_err());
        assert_eq!(seen.get(), Some(0));
    }

    #[test]
    fn cancel_skips_handler_and_keeps_errors() {
        let calls = Cell::new(0);
        let mut sentinel = May::<()>::new().handle_errors_on_drop(|_| calls.set(calls.get() + 1));
        sentinel.invoke((), false, msg!("kept"));

        let may = sentinel.cancel();
        assert_eq!(calls.get(), 0);
        assert_eq!(may.errors()[0].to_string(), "kept: not ok");
    }

    #[test]
    fn scope_returns_handler_result() {
        let (value, err) = May::<u8>::new().scope(
            |may| {
                may.invoke(1, Some("boom"), msg!("step %d", 1));
                7
            },
            |errs| errs.into_iter().next(),
        );

        assert_eq!(value, 7);
        assert_eq!(err.unwrap().to_string(), "step 1: boom");
    }

    #[test]
    fn scope_returns_none_when_handler_does() {
        let (_, err) = May::<u8>::new().scope(|_| (), |_| None);
        assert!(err.is_none());
    }
}
