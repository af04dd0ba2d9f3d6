//! WebAssembly handler modules.
//!
//! # Responsibilities
//! - Compile build output (binary or text format) into a module
//! - Instantiate it in a fresh store, one per load
//! - Marshal JSON events in and JSON outcomes out through linear memory
//! - Interrupt guest code that runs past its deadline
//!
//! # Module Contract
//! ```text
//! export memory
//! export alloc(len: i32) -> i32
//! export api_config() -> i64                   ; (ptr << 32) | len of ApiConfig JSON
//! export proxy_router(ptr: i32, len: i32) -> i64 ; (ptr << 32) | len of HandlerOutcome JSON
//! ```
//!
//! # Design Decisions
//! - The engine is shared; stores never are, so generations cannot see
//!   each other's memory or globals
//! - Modules get no imports; anything they need must be compiled in
//! - Calls into one instance are serialized behind a mutex and run on the
//!   blocking pool
//! - Epoch interruption bounds every call: the start function and
//!   `api_config` get the load timeout, `alloc` and `proxy_router` the call
//!   timeout. A guest that overruns traps like any other fault.
//! - A trap is reported as a handler error for that request only

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use wasmtime::{Config, Engine, Instance, Memory, Module, Store, TypedFunc};

use crate::handler::{
    ApiConfig, Done, Handler, HandlerError, HandlerOutcome, InvocationEvent, InvocationResponse,
    ModuleLoadError, ModuleLoader,
};

/// Interval between epoch increments.
pub const EPOCH_TICK: Duration = Duration::from_millis(10);

/// Default bound for the start function and `api_config`.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound for one `proxy_router` call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// The wasm engine could not be created.
#[derive(Debug, Error)]
#[error("failed to create wasm engine: {0}")]
pub struct EngineError(String);

/// Loads handler instances from WebAssembly build output.
#[derive(Clone)]
pub struct WasmLoader {
    engine: Engine,
    load_timeout: Duration,
    call_timeout: Duration,
}

impl WasmLoader {
    /// Create a loader with an epoch-interrupting engine and default limits.
    ///
    /// A background thread advances the engine epoch until the engine and
    /// everything compiled with it are gone.
    pub fn new() -> Result<Self, EngineError> {
        let mut config = Config::new();
        config.epoch_interruption(true);
        let engine = Engine::new(&config).map_err(|e| EngineError(format!("{:#}", e)))?;

        let weak = engine.weak();
        thread::Builder::new()
            .name("wasm-epoch".into())
            .spawn(move || {
                while let Some(engine) = weak.upgrade() {
                    engine.increment_epoch();
                    drop(engine);
                    thread::sleep(EPOCH_TICK);
                }
            })
            .map_err(|e| EngineError(format!("epoch ticker: {}", e)))?;

        Ok(Self {
            engine,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    /// Bound for the start function and `api_config`.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Bound for each `proxy_router` call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Epoch ticks covering `timeout`, plus one for the partial tick in progress.
fn deadline_ticks(timeout: Duration) -> u64 {
    (timeout.as_millis() / EPOCH_TICK.as_millis()).max(1) as u64 + 1
}

impl ModuleLoader for WasmLoader {
    fn load(&self, source: &[u8], filename: &str) -> Result<Arc<dyn Handler>, ModuleLoadError> {
        let module =
            Module::new(&self.engine, source).map_err(|e| ModuleLoadError::new(filename, format!("{:#}", e)))?;

        let load_ticks = deadline_ticks(self.load_timeout);
        let mut store = Store::new(&self.engine, ());
        store.set_epoch_deadline(load_ticks);
        let instance = Instance::new(&mut store, &module, &[])
            .map_err(|e| ModuleLoadError::new(filename, format!("{:#}", e)))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| ModuleLoadError::new(filename, "missing export 'memory'"))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, "alloc")
            .map_err(|e| ModuleLoadError::new(filename, format!("export 'alloc': {:#}", e)))?;
        let api_config = instance
            .get_typed_func::<(), i64>(&mut store, "api_config")
            .map_err(|e| ModuleLoadError::new(filename, format!("export 'api_config': {:#}", e)))?;
        let proxy_router = instance
            .get_typed_func::<(i32, i32), i64>(&mut store, "proxy_router")
            .map_err(|e| ModuleLoadError::new(filename, format!("export 'proxy_router': {:#}", e)))?;

        tracing::debug!(filename = %filename, bytes = source.len(), "Instantiated handler module");

        Ok(Arc::new(WasmHandler {
            filename: filename.to_string(),
            instance: Arc::new(Mutex::new(WasmInstance {
                store,
                memory,
                alloc,
                api_config,
                proxy_router,
                load_ticks,
                call_ticks: deadline_ticks(self.call_timeout),
            })),
        }))
    }
}

struct WasmInstance {
    store: Store<()>,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    api_config: TypedFunc<(), i64>,
    proxy_router: TypedFunc<(i32, i32), i64>,
    load_ticks: u64,
    call_ticks: u64,
}

impl WasmInstance {
    fn write(&mut self, bytes: &[u8]) -> Result<(i32, i32), String> {
        let len = i32::try_from(bytes.len()).map_err(|_| "event too large for a 32-bit module".to_string())?;
        self.store.set_epoch_deadline(self.call_ticks);
        let ptr = self
            .alloc
            .call(&mut self.store, len)
            .map_err(|e| format!("alloc failed: {:#}", e))?;
        let offset = usize::try_from(ptr).map_err(|_| format!("alloc returned invalid pointer {}", ptr))?;
        self.memory
            .write(&mut self.store, offset, bytes)
            .map_err(|e| format!("writing event: {}", e))?;
        Ok((ptr, len))
    }

    fn read_packed(&self, packed: i64) -> Result<Vec<u8>, String> {
        let packed = packed as u64;
        let ptr = (packed >> 32) as usize;
        let len = (packed & 0xffff_ffff) as usize;

        let mut buf = vec![0u8; len];
        self.memory
            .read(&self.store, ptr, &mut buf)
            .map_err(|e| format!("reading output at {}+{}: {}", ptr, len, e))?;
        Ok(buf)
    }

    fn call_api_config(&mut self) -> Result<Vec<u8>, String> {
        self.store.set_epoch_deadline(self.load_ticks);
        let packed = self
            .api_config
            .call(&mut self.store, ())
            .map_err(|e| format!("{:#}", e))?;
        self.read_packed(packed)
    }

    fn call_proxy_router(&mut self, event: &[u8]) -> Result<Vec<u8>, String> {
        let (ptr, len) = self.write(event)?;
        self.store.set_epoch_deadline(self.call_ticks);
        let packed = self
            .proxy_router
            .call(&mut self.store, (ptr, len))
            .map_err(|e| format!("{:#}", e))?;
        self.read_packed(packed)
    }
}

/// A live WebAssembly handler instance.
pub struct WasmHandler {
    filename: String,
    instance: Arc<Mutex<WasmInstance>>,
}

fn lock(instance: &Mutex<WasmInstance>) -> Result<MutexGuard<'_, WasmInstance>, HandlerError> {
    instance
        .lock()
        .map_err(|_| HandlerError::new("handler instance is unusable after an earlier panic"))
}

fn invoke(instance: &Mutex<WasmInstance>, event: &[u8]) -> Result<InvocationResponse, HandlerError> {
    let output = lock(instance)?
        .call_proxy_router(event)
        .map_err(HandlerError::new)?;
    let outcome: HandlerOutcome = serde_json::from_slice(&output)
        .map_err(|e| HandlerError::new(format!("invalid proxy_router output: {}", e)))?;
    outcome.into()
}

impl Handler for WasmHandler {
    fn api_config(&self) -> Result<ApiConfig, HandlerError> {
        let output = lock(&self.instance)?
            .call_api_config()
            .map_err(|e| HandlerError::new(format!("{}: {}", self.filename, e)))?;
        serde_json::from_slice(&output)
            .map_err(|e| HandlerError::new(format!("invalid api_config output: {}", e)))
    }

    fn proxy_router(&self, event: InvocationEvent, done: Done) {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => return done.fail(format!("failed to encode event: {}", e)),
        };

        let instance = self.instance.clone();
        let filename = self.filename.clone();
        let run = move || {
            let result = invoke(&instance, &payload);
            if let Err(e) = &result {
                tracing::debug!(filename = %filename, error = %e, "proxy_router failed");
            }
            done.done(result)
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(run);
            }
            Err(_) => run(),
        }
    }
}
