//! Proof that a write reached the store.
//!
//! A [`Committed<T>`] can only be minted inside the persistence layer after
//! the backend acknowledged the write. The broadcast adapter only accepts
//! `Committed` change events, so a broadcast can never precede the write it
//! describes.

/// A value produced by a successful store write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a committed change should be handed to the notifier or unwrapped"]
pub struct Committed<T> {
    value: T,
}

impl<T> Committed<T> {
    pub(super) const fn new(value: T) -> Self {
        Self { value }
    }

    /// Borrows the committed value.
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Returns the committed value, discarding the proof.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Derives a new committed value from this one. The result is covered
    /// by the same write.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed { value: f(self.value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keeps_commit_proof() {
        let committed = Committed::new(2_u32).map(|v| v * 21);
        assert_eq!(*committed.get(), 42);
        assert_eq!(committed.into_inner(), 42);
    }
}
