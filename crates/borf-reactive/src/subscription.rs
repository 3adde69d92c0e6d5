#![forbid(unsafe_code)]

//! Cancellation handle returned by every `observe` call.

/// Owner of one observer registration.
///
/// [`stop`](Subscription::stop) cancels the registration; calling it again is
/// a no-op. Dropping the guard stops it as well, so a subscription lives
/// exactly as long as whoever holds it.
#[must_use = "dropping a Subscription stops it immediately"]
pub struct Subscription {
    stop: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(stop: impl FnOnce() + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// A subscription with nothing to cancel (constant sources).
    pub fn inert() -> Self {
        Self { stop: None }
    }

    /// Cancel the registration. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }

    /// Whether [`stop`](Subscription::stop) has not been called yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn stop_runs_once() {
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        let mut sub = Subscription::new(move || count_clone.set(count_clone.get() + 1));

        assert!(sub.is_active());
        sub.stop();
        sub.stop();
        drop(sub);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_stops() {
        let stopped = Rc::new(Cell::new(false));
        let stopped_clone = Rc::clone(&stopped);
        let sub = Subscription::new(move || stopped_clone.set(true));
        drop(sub);
        assert!(stopped.get());
    }

    #[test]
    fn inert_is_inactive() {
        let mut sub = Subscription::inert();
        assert!(!sub.is_active());
        sub.stop();
    }
}
