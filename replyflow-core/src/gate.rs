//! Gate predicates evaluated over [`SharedState`].

use std::{fmt, sync::Arc};

use crate::context::SharedState;

type Check = Arc<dyn Fn(&SharedState) -> bool + Send + Sync>;

/// A named boolean condition over the shared state.
///
/// Predicates never fail: a missing key or a value of the wrong shape simply
/// evaluates to `false`.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    check: Check,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .finish()
    }
}

impl Predicate {
    /// Wrap an arbitrary condition.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&SharedState) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// True iff `state[key]["status"]` is the string `expected`.
    pub fn status_is(key: impl Into<String>, expected: impl Into<String>) -> Self {
        let key = key.into();
        let expected = expected.into();
        let name = format!("{key}.status == {expected:?}");
        let path = format!("{key}.status");
        Self::new(name, move |state| {
            state.lookup_str(&path) == Some(expected.as_str())
        })
    }

    /// True iff the top-level key is present.
    pub fn key_present(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(format!("{key} is set"), move |state| state.contains(&key))
    }

    /// Human readable description used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Evaluate a predicate against the current state.
pub fn evaluate(predicate: &Predicate, state: &SharedState) -> bool {
    (predicate.check)(state)
}
