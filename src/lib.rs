//! Request-scoped state for gateway filter pipelines.
//!
//! One [`RequestContext`] lives for the duration of one request. Filters read
//! and write it through the generic key/value store or the typed accessors
//! for the reserved keys. The pipeline acquires it with
//! [`RequestScope::enter`] (or [`lifecycle::current`]) and releases it when
//! the request ends.
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod log;
pub mod origin;
pub mod pipeline;
pub mod summary;
pub mod value;


pub use context::{RequestContext, DEBUG_ROUTING, EXECUTED_FILTERS, ORIGIN_REQUEST, ORIGIN_RESPONSE};
pub use error::{ConfigError, ContextError, FilterError};
pub use lifecycle::{current, set_context_type, unset, ContextType, ContextTypes, RequestScope};
pub use origin::{OriginRequest, OriginResponse};
pub use pipeline::{Filter, FilterChain, Flow, Processed};
pub use summary::{ExecutionStatus, FilterExecution, FilterExecutionSummary};
pub use value::Value;
