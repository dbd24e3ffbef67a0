// Per-request context shared by every filter handling one request
use crate::origin::{OriginRequest, OriginResponse};
use crate::summary::FilterExecutionSummary;
use crate::value::Value;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ORIGIN_REQUEST: &str = "originRequest";
pub const ORIGIN_RESPONSE: &str = "originResponse";
pub const DEBUG_ROUTING: &str = "debugRouting";
pub const EXECUTED_FILTERS: &str = "executedFilters";

pub(crate) const BASE_KIND: &str = "default";

#[derive(Clone, Copy)]
enum Reserved {
    OriginRequest,
    OriginResponse,
    DebugRouting,
    ExecutedFilters,
}

impl Reserved {
    fn parse(k: &str) -> Option<Self> {
        match k {
            ORIGIN_REQUEST => Some(Reserved::OriginRequest),
            ORIGIN_RESPONSE => Some(Reserved::OriginResponse),
            DEBUG_ROUTING => Some(Reserved::DebugRouting),
            EXECUTED_FILTERS => Some(Reserved::ExecutedFilters),
            _ => None,
        }
    }
}

const RESERVED_KEYS: [&str; 4] = [ORIGIN_REQUEST, ORIGIN_RESPONSE, DEBUG_ROUTING, EXECUTED_FILTERS];

#[derive(Default)]
struct Slots {
    origin_request: Option<Arc<OriginRequest>>,
    origin_response: Option<Arc<OriginResponse>>,
    // last value written; boolean reads fall back unless it is a Bool
    debug_routing: Option<Value>,
}

/// State shared by the filters of one request.
///
/// Reserved keys ([`ORIGIN_REQUEST`], [`ORIGIN_RESPONSE`], [`DEBUG_ROUTING`],
/// [`EXECUTED_FILTERS`]) are typed fields; the generic `get`/`set` route to
/// them so filters addressing them by name see the same state as the named
/// accessors. Every other key lives in a concurrent side map.
///
/// All methods take `&self`; a context is normally handed around as
/// `Arc<RequestContext>`.
pub struct RequestContext {
    kind: Arc<str>,
    values: DashMap<String, Value>,
    slots: RwLock<Slots>,
    executed: Mutex<FilterExecutionSummary>,
    extensions: RwLock<http::Extensions>,
    started_at: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        RequestContext {
            kind: Arc::from(BASE_KIND),
            values: DashMap::new(),
            slots: RwLock::new(Slots::default()),
            executed: Mutex::new(FilterExecutionSummary::new()),
            extensions: RwLock::new(http::Extensions::new()),
            started_at: Instant::now(),
        }
    }

    pub(crate) fn set_kind(&mut self, kind: Arc<str>) {
        self.kind = kind;
    }

    /// Name of the context type that built this instance.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn get(&self, k: &str) -> Option<Value> {
        match Reserved::parse(k) {
            None => self.values.get(k).map(|v| v.value().clone()),
            Some(Reserved::OriginRequest) => self.slots.read().origin_request.clone().map(Value::shared),
            Some(Reserved::OriginResponse) => self.slots.read().origin_response.clone().map(Value::shared),
            Some(Reserved::DebugRouting) => self.slots.read().debug_routing.clone(),
            Some(Reserved::ExecutedFilters) => {
                let s = self.executed.lock();
                if s.is_empty() { None } else { Some(Value::Str(s.to_string())) }
            }
        }
    }

    /// Store `v` under `k`, or remove `k` when `v` is null.
    pub fn set(&self, k: &str, v: impl Into<Value>) {
        let v = v.into();
        match Reserved::parse(k) {
            None if v.is_null() => {
                self.values.remove(k);
            }
            None => {
                self.values.insert(k.to_string(), v);
            }
            Some(r) => self.set_reserved(r, k, v),
        }
    }

    fn set_reserved(&self, r: Reserved, k: &str, v: Value) {
        match (r, v) {
            (Reserved::OriginRequest, Value::Null) => self.slots.write().origin_request = None,
            (Reserved::OriginResponse, Value::Null) => self.slots.write().origin_response = None,
            (Reserved::DebugRouting, Value::Null) => self.slots.write().debug_routing = None,
            (Reserved::DebugRouting, v) => self.slots.write().debug_routing = Some(v),
            (Reserved::OriginRequest, v @ Value::Any(_)) => match v.downcast::<OriginRequest>() {
                Some(h) => self.slots.write().origin_request = Some(h),
                None => reject(k, &v),
            },
            (Reserved::OriginResponse, v @ Value::Any(_)) => match v.downcast::<OriginResponse>() {
                Some(h) => self.slots.write().origin_response = Some(h),
                None => reject(k, &v),
            },
            (_, v) => reject(k, &v),
        }
    }

    /// Shorthand for `set(k, true)`.
    pub fn set_flag(&self, k: &str) {
        self.set(k, true);
    }

    pub fn remove(&self, k: &str) -> Option<Value> {
        match Reserved::parse(k) {
            None => self.values.remove(k).map(|(_, v)| v),
            Some(Reserved::ExecutedFilters) => {
                reject(k, &Value::Null);
                None
            }
            Some(r) => {
                let prev = self.get(k);
                self.set_reserved(r, k, Value::Null);
                prev
            }
        }
    }

    pub fn contains_key(&self, k: &str) -> bool {
        match Reserved::parse(k) {
            None => self.values.contains_key(k),
            Some(_) => self.get(k).is_some(),
        }
    }

    /// Custom keys plus the reserved keys that currently hold a value.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.iter().map(|e| e.key().clone()).collect();
        for name in RESERVED_KEYS {
            if self.contains_key(name) {
                keys.push(name.to_string());
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_boolean(&self, k: &str) -> bool {
        self.get_boolean_or(k, false)
    }

    /// The stored boolean, or `d` when `k` is absent or holds another type.
    pub fn get_boolean_or(&self, k: &str, d: bool) -> bool {
        match self.get(k) {
            None => d,
            Some(Value::Bool(b)) => b,
            Some(other) => {
                tracing::debug!(key = k, found = other.type_name(), "non-boolean context value read as boolean, using default");
                d
            }
        }
    }

    pub fn get_str(&self, k: &str) -> Option<String> {
        self.get(k).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn get_int(&self, k: &str) -> Option<i64> {
        self.get(k).and_then(|v| v.as_int())
    }

    pub fn get_any<T: Any + Send + Sync>(&self, k: &str) -> Option<Arc<T>> {
        self.get(k).and_then(|v| v.downcast::<T>())
    }

    pub fn origin_request(&self) -> Option<OriginRequest> {
        self.slots.read().origin_request.as_deref().cloned()
    }

    pub fn set_origin_request(&self, req: OriginRequest) {
        self.slots.write().origin_request = Some(Arc::new(req));
    }

    pub fn origin_response(&self) -> Option<OriginResponse> {
        self.slots.read().origin_response.as_deref().cloned()
    }

    pub fn set_origin_response(&self, resp: OriginResponse) {
        self.slots.write().origin_response = Some(Arc::new(resp));
    }

    pub fn clear_origin_response(&self) -> Option<OriginResponse> {
        self.slots.write().origin_response.take().map(|r| (*r).clone())
    }

    pub fn set_debug_routing(&self, on: bool) {
        self.slots.write().debug_routing = Some(Value::Bool(on));
    }

    pub fn debug_routing(&self) -> bool {
        self.get_boolean(DEBUG_ROUTING)
    }

    /// Append `name[status][Nms]` to this request's filter trace.
    pub fn add_filter_execution_summary(&self, name: &str, status: impl fmt::Display, elapsed_ms: u64) {
        self.executed.lock().push(name, status, elapsed_ms);
    }

    /// Snapshot of the filter trace so far.
    pub fn filter_execution_summary(&self) -> FilterExecutionSummary {
        self.executed.lock().clone()
    }

    /// Attach a typed field. Extended context types seed these at construction.
    pub fn insert_extension<T: Clone + Send + Sync + 'static>(&self, v: T) -> Option<T> {
        self.extensions.write().insert(v)
    }

    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions.read().get::<T>().cloned()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

fn reject(k: &str, v: &Value) {
    tracing::warn!(key = k, found = v.type_name(), "rejected write to reserved context key");
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("kind", &self.kind)
            .field("keys", &self.keys())
            .field("executed_filters", &self.executed.lock().to_string())
            .finish()
    }
}
