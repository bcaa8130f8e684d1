//! Result of an operation that may have been queued instead of dispatched.

/// What a client operation produced.
///
/// While batch mode is active, calls are queued and yield
/// [`Outcome::Queued`]; their results only exist inside the response of
/// `batch_end`. Outside batch mode every call yields [`Outcome::Done`], whose
/// payload may itself be `null`.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Queued,
    Done(T),
}

impl<T> Outcome<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, Outcome::Queued)
    }

    /// The completed value, or `None` if the call was queued.
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Queued => None,
            Outcome::Done(value) => Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Queued => Outcome::Queued,
            Outcome::Done(value) => Outcome::Done(f(value)),
        }
    }
}
