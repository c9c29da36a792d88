//! Build interceptors: host hooks around event construction.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use beacon_core::errors::{BeaconResult, BuildError};
use beacon_core::event::{EventBuilder, EventRecord};
use tracing::warn;

/// Outcome of a will-build hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildDecision {
    #[default]
    Continue,
    /// Discard the event silently.
    Drop,
}

/// Hook invoked by the build actor for every event.
///
/// `will_build` runs before filtering and may mutate the builder or veto the
/// event. `did_build` observes the finished record and cannot change it.
/// Errors and panics are logged and the interceptor is treated as absent.
pub trait BuildInterceptor: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn will_build(&self, _builder: &mut EventBuilder) -> BeaconResult<BuildDecision> {
        Ok(BuildDecision::Continue)
    }

    fn did_build(&self, _record: &EventRecord) {}
}

type WillFn = dyn Fn(&mut EventBuilder) -> BeaconResult<BuildDecision> + Send + Sync;
type DidFn = dyn Fn(&EventRecord) + Send + Sync;

/// Adapts closures into a [`BuildInterceptor`].
pub struct FnInterceptor {
    name: String,
    will: Option<Box<WillFn>>,
    did: Option<Box<DidFn>>,
}

impl FnInterceptor {
    pub fn will_build<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut EventBuilder) -> BeaconResult<BuildDecision> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            will: Some(Box::new(f)),
            did: None,
        }
    }

    pub fn did_build<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&EventRecord) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            will: None,
            did: Some(Box::new(f)),
        }
    }
}

impl BuildInterceptor for FnInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn will_build(&self, builder: &mut EventBuilder) -> BeaconResult<BuildDecision> {
        match &self.will {
            Some(f) => f(builder),
            None => Ok(BuildDecision::Continue),
        }
    }

    fn did_build(&self, record: &EventRecord) {
        if let Some(f) = &self.did {
            f(record);
        }
    }
}

/// Ordered interceptor list, run in registration order.
#[derive(Default, Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn BuildInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: Arc<dyn BuildInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every will-build hook. Stops at the first `Drop`. A hook that
    /// fails or panics leaves the builder as it found it.
    pub fn run_will_build(&self, builder: &mut EventBuilder) -> BuildDecision {
        for interceptor in &self.interceptors {
            let before = builder.clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| interceptor.will_build(builder)));
            let err = match outcome {
                Ok(Ok(BuildDecision::Continue)) => continue,
                Ok(Ok(BuildDecision::Drop)) => return BuildDecision::Drop,
                Ok(Err(e)) => BuildError::InterceptorFailed {
                    name: interceptor.name().to_string(),
                    message: e.to_string(),
                },
                Err(_) => BuildError::InterceptorPanicked {
                    name: interceptor.name().to_string(),
                },
            };
            *builder = before;
            warn!(error = %err, event_type = %builder.event_type(), "will-build hook skipped");
        }
        BuildDecision::Continue
    }

    pub fn run_did_build(&self, record: &EventRecord) {
        for interceptor in &self.interceptors {
            if catch_unwind(AssertUnwindSafe(|| interceptor.did_build(record))).is_err() {
                let err = BuildError::InterceptorPanicked {
                    name: interceptor.name().to_string(),
                };
                warn!(error = %err, event_type = %record.event_type, "did-build hook skipped");
            }
        }
    }
}
