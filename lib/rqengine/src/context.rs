//! The per-execution evaluation context.

use crate::error::EvaluationError;
use crate::service::ServiceHandler;
use crate::table::VariableTable;
use oxiri::Iri;
use rqrdf::{Dataset, NamedNode, Term};
use rqxsd::DateTime;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) type CustomFunctionRegistry =
    FxHashMap<NamedNode, Rc<dyn Fn(&[Term]) -> Option<Term>>>;

/// Everything one query execution shares: the dataset, the variables table,
/// the runtime binding frame consulted for `EXISTS` pre-binding, the value
/// of `NOW()` fixed at execute time, and the cooperative limits.
pub(crate) struct EvalContext {
    pub dataset: Rc<Dataset>,
    pub table: Rc<VariableTable>,
    pub frame: RefCell<Vec<Option<Term>>>,
    pub now: DateTime,
    pub base_iri: Option<Iri<String>>,
    pub service_handler: Option<Rc<dyn ServiceHandler>>,
    pub custom_functions: Rc<CustomFunctionRegistry>,
    pub limits: LimitState,
}

/// Caps on one query execution: an optional wall-clock budget and an
/// optional externally-settable stop flag, both polled cooperatively before
/// each row emission and inside buffering loops.
#[derive(Debug, Clone, Default)]
pub struct QueryLimits {
    pub(crate) timeout: Option<Duration>,
    pub(crate) stop: Option<Arc<AtomicBool>>,
}

impl QueryLimits {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Raising the returned flag makes the running query terminate with
    /// [`EvaluationError::Cancelled`] at its next poll point.
    #[inline]
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }
}

pub(crate) struct LimitState {
    deadline: Option<(Instant, Duration)>,
    stop: Option<Arc<AtomicBool>>,
}

impl LimitState {
    pub fn start(limits: &QueryLimits) -> Self {
        Self {
            deadline: limits
                .timeout
                .map(|timeout| (Instant::now() + timeout, timeout)),
            stop: limits.stop.clone(),
        }
    }

    pub fn check(&self) -> Result<(), EvaluationError> {
        if let Some(stop) = &self.stop {
            if stop.load(Ordering::Relaxed) {
                return Err(EvaluationError::Cancelled);
            }
        }
        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() > deadline {
                return Err(EvaluationError::Timeout(timeout));
            }
        }
        Ok(())
    }
}
