// In-order filter chain: acquire context, run filters, release context
use crate::context::RequestContext;
use crate::error::{ContextError, FilterError};
use crate::lifecycle::RequestScope;
use crate::origin::{OriginRequest, OriginResponse};
use crate::summary::{ExecutionStatus, FilterExecutionSummary};
use std::time::Instant;

/// What the chain does after a filter returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Short-circuit: no later filter runs.
    Stop,
}

pub trait Filter: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, ctx: &RequestContext) -> Result<Flow, FilterError>;
}

/// Result of one pass through the chain. The context itself is released by
/// the time the caller sees this.
#[derive(Debug)]
pub struct Processed {
    pub response: Option<OriginResponse>,
    pub summary: FilterExecutionSummary,
    pub error: Option<FilterError>,
}

pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
    log_summary: bool,
}

impl FilterChain {
    pub fn new() -> Self {
        FilterChain { filters: Vec::new(), log_summary: true }
    }

    pub fn with_summary_logging(mut self, on: bool) -> Self {
        self.log_summary = on;
        self
    }

    pub fn add(&mut self, f: Box<dyn Filter>) {
        tracing::debug!(filter = f.name(), "filter registered");
        self.filters.push(f);
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every filter for `request` against a fresh context bound to the
    /// calling unit. The context is released on every exit path, including
    /// a panicking filter.
    pub fn process(&self, request: OriginRequest) -> Result<Processed, ContextError> {
        let scope = RequestScope::enter()?;
        scope.set_origin_request(request);

        let mut error = None;
        for f in &self.filters {
            let start = Instant::now();
            let result = f.run(&scope);
            let ms = start.elapsed().as_millis() as u64;
            match result {
                Ok(flow) => {
                    scope.add_filter_execution_summary(f.name(), ExecutionStatus::Success, ms);
                    if flow == Flow::Stop {
                        break;
                    }
                }
                Err(e) => {
                    scope.add_filter_execution_summary(f.name(), ExecutionStatus::Failed, ms);
                    tracing::warn!(filter = f.name(), error = %e, "filter failed, stopping chain");
                    error = Some(e);
                    break;
                }
            }
        }

        let summary = scope.filter_execution_summary();
        if self.log_summary {
            if scope.debug_routing() {
                tracing::info!(executed = %summary, elapsed_ms = scope.elapsed_ms() as u64, "request routed");
            } else {
                tracing::debug!(executed = %summary, elapsed_ms = scope.elapsed_ms() as u64, "request routed");
            }
        }
        Ok(Processed { response: scope.origin_response(), summary, error })
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}
