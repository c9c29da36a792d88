//! Type-pair keyed plugin registry.
//!
//! A capability is identified by the pair of its request type and result
//! type. Plugins register a [`HandlerFactory`] for a pair; callers resolve a
//! handler for the same pair without knowing which plugin provides it.
//!
//! The registry is populated by a single owner during startup, then frozen
//! behind an `Arc` and read without locks.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::errors::{BeaconError, BeaconResult, RegistryError};

/// Handles one request of type `Req`, producing `Res`.
pub trait Handler<Req, Res>: Send + Sync {
    fn handle(&self, request: Req) -> BeaconResult<Res>;
}

/// Builds (or reuses) a handler for a type pair.
pub trait HandlerFactory<Req, Res>: Send + Sync {
    fn build(&self) -> BeaconResult<Arc<dyn Handler<Req, Res>>>;
}

/// A bundle of plugins registered together.
///
/// Modules installed later override entries from modules installed earlier,
/// so host modules go after the built-in ones.
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;
    fn register_components(&self, registry: &mut Registry);
}

/// Adapts a closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<Req, Res, F> Handler<Req, Res> for FnHandler<F>
where
    F: Fn(Req) -> BeaconResult<Res> + Send + Sync,
{
    fn handle(&self, request: Req) -> BeaconResult<Res> {
        (self.f)(request)
    }
}

/// Factory that hands out one shared handler instance.
pub struct InstanceFactory<Req, Res> {
    handler: Arc<dyn Handler<Req, Res>>,
}

impl<Req, Res> InstanceFactory<Req, Res> {
    pub fn new(handler: Arc<dyn Handler<Req, Res>>) -> Self {
        Self { handler }
    }
}

impl<Req, Res> HandlerFactory<Req, Res> for InstanceFactory<Req, Res> {
    fn build(&self) -> BeaconResult<Arc<dyn Handler<Req, Res>>> {
        Ok(Arc::clone(&self.handler))
    }
}

type InitFn<Req, Res> = dyn Fn() -> BeaconResult<Arc<dyn Handler<Req, Res>>> + Send + Sync;

/// Lazily constructs an expensive handler on first resolve and reuses it.
/// A failed construction is not cached; the next resolve retries.
pub struct SingletonFactory<Req, Res> {
    init: Box<InitFn<Req, Res>>,
    instance: Mutex<Option<Arc<dyn Handler<Req, Res>>>>,
}

impl<Req, Res> SingletonFactory<Req, Res> {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> BeaconResult<Arc<dyn Handler<Req, Res>>> + Send + Sync + 'static,
    {
        Self {
            init: Box::new(init),
            instance: Mutex::new(None),
        }
    }
}

impl<Req, Res> HandlerFactory<Req, Res> for SingletonFactory<Req, Res> {
    fn build(&self) -> BeaconResult<Arc<dyn Handler<Req, Res>>> {
        let mut slot = self.instance.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handler) = slot.as_ref() {
            return Ok(Arc::clone(handler));
        }
        let handler = (self.init)()?;
        *slot = Some(Arc::clone(&handler));
        Ok(handler)
    }
}

struct Entry {
    // Always an `Arc<dyn HandlerFactory<Req, Res>>` for the entry's key.
    factory: Box<dyn Any + Send + Sync>,
    request: &'static str,
    result: &'static str,
}

/// Map from `(TypeId of request, TypeId of result)` to a factory.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<(TypeId, TypeId), Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the factory for `(Req, Res)`. Last registration wins.
    pub fn register<Req, Res>(&mut self, factory: impl HandlerFactory<Req, Res> + 'static)
    where
        Req: 'static,
        Res: 'static,
    {
        let factory: Arc<dyn HandlerFactory<Req, Res>> = Arc::new(factory);
        let entry = Entry {
            factory: Box::new(factory),
            request: type_name::<Req>(),
            result: type_name::<Res>(),
        };
        let (request, result) = (entry.request, entry.result);
        if self.entries.insert(key::<Req, Res>(), entry).is_some() {
            warn!(request, result, "registry entry overridden");
        } else {
            debug!(request, result, "registry entry added");
        }
    }

    /// Register one shared handler instance.
    pub fn register_handler<Req, Res>(&mut self, handler: Arc<dyn Handler<Req, Res>>)
    where
        Req: 'static,
        Res: 'static,
    {
        self.register(InstanceFactory::new(handler));
    }

    /// Register a closure as the handler for `(Req, Res)`.
    pub fn register_fn<Req, Res, F>(&mut self, f: F)
    where
        Req: 'static,
        Res: 'static,
        F: Fn(Req) -> BeaconResult<Res> + Send + Sync + 'static,
    {
        self.register_handler::<Req, Res>(Arc::new(FnHandler::new(f)));
    }

    /// Register a lazily constructed singleton.
    pub fn register_singleton<Req, Res, F>(&mut self, init: F)
    where
        Req: 'static,
        Res: 'static,
        F: Fn() -> BeaconResult<Arc<dyn Handler<Req, Res>>> + Send + Sync + 'static,
    {
        self.register(SingletonFactory::new(init));
    }

    /// Install every component of a module.
    pub fn install(&mut self, module: &dyn Module) {
        debug!(module = module.name(), "installing module");
        module.register_components(self);
    }

    pub fn contains<Req: 'static, Res: 'static>(&self) -> bool {
        self.entries.contains_key(&key::<Req, Res>())
    }

    /// Startup validation: fail if `(Req, Res)` has no provider.
    pub fn require<Req: 'static, Res: 'static>(&self) -> Result<(), RegistryError> {
        if self.contains::<Req, Res>() {
            Ok(())
        } else {
            Err(missing::<Req, Res>())
        }
    }

    /// Build (or reuse) the handler for `(Req, Res)`.
    pub fn resolve<Req: 'static, Res: 'static>(
        &self,
    ) -> BeaconResult<Arc<dyn Handler<Req, Res>>> {
        let entry = self
            .entries
            .get(&key::<Req, Res>())
            .ok_or_else(missing::<Req, Res>)?;
        let factory = entry
            .factory
            .downcast_ref::<Arc<dyn HandlerFactory<Req, Res>>>()
            .ok_or_else(missing::<Req, Res>)?;
        factory.build().map_err(|e| {
            BeaconError::from(RegistryError::FactoryFailed {
                request: entry.request,
                result: entry.result,
                reason: e.to_string(),
            })
        })
    }

    /// Resolve and invoke synchronously, propagating the handler's failure.
    pub fn execute<Req: 'static, Res: 'static>(&self, request: Req) -> BeaconResult<Res> {
        self.resolve::<Req, Res>()?.handle(request)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self
            .entries
            .values()
            .map(|e| format!("{} -> {}", e.request, e.result))
            .collect();
        pairs.sort();
        f.debug_struct("Registry").field("entries", &pairs).finish()
    }
}

fn key<Req: 'static, Res: 'static>() -> (TypeId, TypeId) {
    (TypeId::of::<Req>(), TypeId::of::<Res>())
}

fn missing<Req, Res>() -> RegistryError {
    RegistryError::NoRegisteredHandler {
        request: type_name::<Req>(),
        result: type_name::<Res>(),
    }
}
