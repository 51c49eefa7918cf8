/// Something which tracks a collection of errors.
///
/// This generalizes merging the errors of one collector into another, such as a helper's
/// [`May`] into its caller's.
///
/// [`May`]: crate::May
///
/// ```
/// # use may::{ErrorCollector, May, msg};
/// let mut inner = May::<()>::new();
/// inner.invoke((), false, msg!("inner step"));
///
/// let mut outer = May::<u32>::new();
/// outer.invoke(1, false, msg!("outer step"));
/// inner.propagate(&mut outer);
///
/// assert_eq!(outer.collect_as_error().unwrap().to_string(), "outer step: not ok; inner step: not ok");
/// ```
pub trait ErrorCollector<E> {
    /// The type returned by [`propagate`].
    ///
    /// [`propagate`]: ErrorCollector::propagate
    type WrappedInner;

    /// Add a new error to the collection of errors.
    fn push_error(&mut self, error: E);

    /// Consumes this collector and pushes all of its errors, in order, into a different
    /// collector. If the type is wrapping some kind of value, it may return it too.
    fn propagate(self, other: &mut impl ErrorCollector<E>) -> Self::WrappedInner;
}

impl<E> ErrorCollector<E> for Vec<E> {
    type WrappedInner = ();

    fn push_error(&mut self, error: E) {
        self.push(error);
    }

    fn propagate(self, other: &mut impl ErrorCollector<E>) {
        for error in self {
            other.push_error(error);
        }
    }
}
