// Binds one RequestContext to each execution unit for the length of a request
//
// An execution unit is the tokio task running inside `scope`, or else the OS
// thread. Helper tasks spawned mid-request get their own slot: hand them the
// `Arc<RequestContext>` instead of calling `current()` from them.
use crate::context::{RequestContext, BASE_KIND};
use crate::error::ContextError;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

type Factory = dyn Fn() -> Result<RequestContext, ContextError> + Send + Sync;

/// A named constructor for request contexts.
///
/// Deployments that need extra per-request fields register a type built with
/// [`ContextType::with_extension`] (or a custom factory) and select it once at
/// startup with [`set_context_type`].
#[derive(Clone)]
pub struct ContextType {
    name: Arc<str>,
    factory: Arc<Factory>,
}

impl ContextType {
    pub fn new<F>(name: &str, factory: F) -> Self
    where
        F: Fn() -> Result<RequestContext, ContextError> + Send + Sync + 'static,
    {
        ContextType { name: Arc::from(name), factory: Arc::new(factory) }
    }

    pub fn base() -> Self {
        Self::new(BASE_KIND, || Ok(RequestContext::new()))
    }

    /// A context type whose instances start with `init()` as an extension.
    pub fn with_extension<T, F>(name: &str, init: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(name, move || {
            let ctx = RequestContext::new();
            ctx.insert_extension(init());
            Ok(ctx)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> Result<RequestContext, ContextError> {
        let mut ctx = (self.factory)().map_err(|e| match e {
            ContextError::Construction { .. } => e,
            other => ContextError::construction(self.name(), other.to_string()),
        })?;
        ctx.set_kind(Arc::clone(&self.name));
        Ok(ctx)
    }
}

impl Default for ContextType {
    fn default() -> Self {
        Self::base()
    }
}

impl fmt::Debug for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextType").field(&self.name).finish()
    }
}

/// Named context types that configuration can choose from.
#[derive(Clone, Debug)]
pub struct ContextTypes {
    types: HashMap<String, ContextType>,
}

impl ContextTypes {
    /// A registry holding only the base type.
    pub fn new() -> Self {
        let mut types = HashMap::new();
        types.insert(BASE_KIND.to_string(), ContextType::base());
        ContextTypes { types }
    }

    pub fn register(&mut self, ty: ContextType) {
        if self.types.insert(ty.name().to_string(), ty.clone()).is_some() {
            tracing::warn!(context_type = ty.name(), "context type registered twice, keeping the latest");
        }
    }

    pub fn get(&self, name: &str) -> Option<&ContextType> {
        self.types.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut n: Vec<&str> = self.types.keys().map(|k| k.as_str()).collect();
        n.sort_unstable();
        n
    }
}

impl Default for ContextTypes {
    fn default() -> Self {
        Self::new()
    }
}

static CONTEXT_TYPE: OnceLock<RwLock<ContextType>> = OnceLock::new();

fn active_type() -> &'static RwLock<ContextType> {
    CONTEXT_TYPE.get_or_init(|| RwLock::new(ContextType::base()))
}

/// Select the context type for contexts created from now on.
/// Contexts already bound keep their type.
pub fn set_context_type(ty: ContextType) {
    tracing::info!(context_type = ty.name(), "request context type selected");
    *active_type().write() = ty;
}

pub fn context_type() -> ContextType {
    active_type().read().clone()
}

/// Look up `name`, check that it can be built, and make it the active type.
pub fn configure(name: &str, types: &ContextTypes) -> Result<(), ContextError> {
    let ty = types
        .get(name)
        .cloned()
        .ok_or_else(|| ContextError::UnknownContextType(name.to_string()))?;
    if let Err(e) = ty.instantiate() {
        tracing::error!(context_type = name, error = %e, "context type failed its startup check");
        return Err(e);
    }
    set_context_type(ty);
    Ok(())
}

/// A unit's binding. `scoped` marks a context owned by a live
/// `RequestScope`, as opposed to one left behind by a bare `current()`.
#[derive(Default)]
struct Binding {
    ctx: Option<Arc<RequestContext>>,
    scoped: bool,
}

type Slot = RefCell<Binding>;

thread_local! {
    static THREAD_CONTEXT: Slot = const { RefCell::new(Binding { ctx: None, scoped: false }) };
}

tokio::task_local! {
    static TASK_CONTEXT: Slot;
}

fn with_slot<R>(f: impl Fn(&Slot) -> R) -> R {
    match TASK_CONTEXT.try_with(|s| f(s)) {
        Ok(r) => r,
        Err(_) => THREAD_CONTEXT.with(|s| f(s)),
    }
}

/// The context bound to the calling execution unit, created on first use.
pub fn current() -> Result<Arc<RequestContext>, ContextError> {
    with_slot(|slot| {
        let existing = slot.borrow().ctx.clone();
        if let Some(ctx) = existing {
            return Ok(ctx);
        }
        let ctx = match context_type().instantiate() {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(error = %e, "request context construction failed");
                return Err(e);
            }
        };
        tracing::trace!(kind = ctx.kind(), "request context created");
        slot.borrow_mut().ctx = Some(Arc::clone(&ctx));
        Ok(ctx)
    })
}

/// Release the calling unit's context. Must run once at the end of every
/// request; the next `current()` on this unit starts from an empty context.
pub fn unset() -> Option<Arc<RequestContext>> {
    with_slot(|slot| slot.replace(Binding::default()).ctx)
}

pub fn is_bound() -> bool {
    with_slot(|slot| slot.borrow().ctx.is_some())
}

/// Run `fut` as its own execution unit. Its context is released when the
/// future completes or is dropped, so timeouts and aborts cannot leak it.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    TASK_CONTEXT.scope(RefCell::new(Binding::default()), fut).await
}

/// Acquire/release guard for one request on the current unit.
///
/// Scopes nest: entering while another scope is live (a filter running a
/// sub-request) binds a fresh context and restores the outer one on drop.
/// Not `Send`: it must be dropped on the unit that entered it.
#[must_use = "the request context is released when the scope is dropped"]
pub struct RequestScope {
    ctx: Arc<RequestContext>,
    outer: Option<Arc<RequestContext>>,
    _unit: PhantomData<*const ()>,
}

impl RequestScope {
    /// Bind a fresh context. A context still bound from an earlier request
    /// (not owned by a live scope) is logged and discarded first.
    pub fn enter() -> Result<Self, ContextError> {
        let prev = with_slot(|slot| slot.replace(Binding::default()));
        let outer = if prev.scoped {
            prev.ctx
        } else {
            if let Some(stale) = prev.ctx {
                tracing::warn!(
                    kind = stale.kind(),
                    executed = %stale.filter_execution_summary(),
                    "discarding request context leaked by a previous request"
                );
            }
            None
        };
        let ctx = match current() {
            Ok(c) => c,
            Err(e) => {
                restore(&outer);
                return Err(e);
            }
        };
        with_slot(|slot| slot.borrow_mut().scoped = true);
        Ok(RequestScope { ctx, outer, _unit: PhantomData })
    }

    pub fn context(&self) -> &Arc<RequestContext> {
        &self.ctx
    }
}

fn restore(outer: &Option<Arc<RequestContext>>) {
    with_slot(|slot| {
        *slot.borrow_mut() = Binding { ctx: outer.clone(), scoped: outer.is_some() };
    });
}

impl Deref for RequestScope {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        &self.ctx
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        restore(&self.outer);
    }
}
