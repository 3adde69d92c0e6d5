#![forbid(unsafe_code)]

//! Two-tier collection of render failures.
//!
//! A **report** is a component-local fault: something failed while
//! re-rendering in response to a state change, the rest of the app keeps
//! running, and the error lands in a capped ring. A **crash** is an
//! application-level fault: the collector records it and invokes the crash
//! handler, which the [`App`](crate::App) uses to unmount its root and show
//! the crash view.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::config::RenderConfig;
use crate::error::RenderError;

/// Report vs crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Report,
    Crash,
}

/// One collected failure.
#[derive(Debug, Clone)]
pub struct CrashReport {
    pub severity: Severity,
    /// Where it happened: a handle kind or a view name.
    pub origin: String,
    pub error: Rc<RenderError>,
}

impl CrashReport {
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for CrashReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.error)
    }
}

type CrashHandler = Rc<dyn Fn(&CrashReport)>;

struct CollectorState {
    reports: VecDeque<CrashReport>,
    capacity: usize,
    log_reports: bool,
    crash: Option<CrashReport>,
    handler: Option<CrashHandler>,
}

/// Shared collector; clones feed the same ring.
#[derive(Clone)]
pub struct CrashCollector {
    state: Rc<RefCell<CollectorState>>,
}

impl fmt::Debug for CrashCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CrashCollector")
            .field("reports", &state.reports.len())
            .field("crashed", &state.crash.is_some())
            .finish()
    }
}

impl Default for CrashCollector {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

impl CrashCollector {
    #[must_use]
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(CollectorState {
                reports: VecDeque::new(),
                capacity: config.max_reports,
                log_reports: config.log_reports,
                crash: None,
                handler: None,
            })),
        }
    }

    /// Install the callback run on every crash.
    pub fn set_handler(&self, handler: impl Fn(&CrashReport) + 'static) {
        self.state.borrow_mut().handler = Some(Rc::new(handler));
    }

    /// Record a non-fatal failure. The oldest report is evicted when the
    /// ring is full; a zero capacity keeps nothing.
    pub fn report(&self, error: RenderError, origin: &str) {
        let mut state = self.state.borrow_mut();
        if state.log_reports {
            tracing::warn!(message = "render.report", origin, error = %error);
        }
        if state.capacity == 0 {
            return;
        }
        while state.reports.len() >= state.capacity {
            state.reports.pop_front();
        }
        state.reports.push_back(CrashReport {
            severity: Severity::Report,
            origin: origin.to_owned(),
            error: Rc::new(error),
        });
    }

    /// Record a fatal failure and run the crash handler. Only the first
    /// crash is kept; later ones are logged and dropped.
    pub fn crash(&self, error: RenderError, origin: &str) {
        tracing::error!(message = "render.crash", origin, error = %error);
        let (report, handler) = {
            let mut state = self.state.borrow_mut();
            if state.crash.is_some() {
                return;
            }
            let report = CrashReport {
                severity: Severity::Crash,
                origin: origin.to_owned(),
                error: Rc::new(error),
            };
            state.crash = Some(report.clone());
            (report, state.handler.clone())
        };
        if let Some(handler) = handler {
            handler(&report);
        }
    }

    #[must_use]
    pub fn reports(&self) -> Vec<CrashReport> {
        self.state.borrow().reports.iter().cloned().collect()
    }

    #[must_use]
    pub fn crash_report(&self) -> Option<CrashReport> {
        self.state.borrow().crash.clone()
    }

    #[must_use]
    pub fn is_crashed(&self) -> bool {
        self.state.borrow().crash.is_some()
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.reports.clear();
        state.crash = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn collector(max_reports: usize) -> CrashCollector {
        CrashCollector::new(&RenderConfig {
            max_reports,
            log_reports: false,
            ..RenderConfig::default()
        })
    }

    #[test]
    fn report_ring_evicts_oldest() {
        let crash = collector(2);
        for i in 0..3 {
            crash.report(RenderError::msg(format!("e{i}")), "test");
        }
        let messages: Vec<_> = crash.reports().iter().map(CrashReport::message).collect();
        assert_eq!(messages, ["e1", "e2"]);
        assert!(!crash.is_crashed());
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let crash = collector(0);
        crash.report(RenderError::msg("dropped"), "test");
        assert!(crash.reports().is_empty());
    }

    #[test]
    fn first_crash_wins_and_runs_handler_once() {
        let crash = collector(4);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        crash.set_handler(move |_| calls_clone.set(calls_clone.get() + 1));

        crash.crash(RenderError::msg("first"), "root");
        crash.crash(RenderError::msg("second"), "root");

        assert_eq!(calls.get(), 1);
        let report = crash.crash_report().unwrap();
        assert_eq!(report.severity, Severity::Crash);
        assert_eq!(report.to_string(), "root: first");
    }

    #[test]
    fn handler_may_read_the_collector() {
        let crash = collector(4);
        let seen = Rc::new(Cell::new(false));
        let (seen_clone, crash_clone) = (Rc::clone(&seen), crash.clone());
        crash.set_handler(move |_| seen_clone.set(crash_clone.is_crashed()));
        crash.crash(RenderError::msg("boom"), "root");
        assert!(seen.get());
    }
}
