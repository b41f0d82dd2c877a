//! WASM Contract Host - wasmtime-backed invocation driver.
//!
//! This module owns the call path from a host-side value tree to a decoded
//! contract result. Key features:
//!
//! - **Single-word ABI**: exports take zero or more `i64` words and return
//!   one `i64` word, always read back as a packed slice into the guest's
//!   exported `memory`
//! - **Instance Pooling**: thread-local pools to avoid instantiation overhead
//! - **Hot-Publish**: ContractRegistry swaps in new contract code without
//!   disturbing in-flight calls
//! - **Resource Limits**: linear-memory cap and optional fuel budget to
//!   contain runaway guests
//!
//! # Call pipeline
//!
//! ```text
//! params: &[SborValue]
//!    │ sbor::encode                     (ParamEncode on failure)
//!    ▼
//! guest memory append -> packed words   (ParamWrite on failure)
//!    │ wasmtime Func::call              (Trap on guest fault)
//!    ▼
//! returned i64 word -> Slice -> bytes   (ResultDecodeFailed/memory)
//!    │ sbor::decode                     (ResultDecodeFailed/decode)
//!    ▼
//! SborValue
//! ```
//!
//! One instance serves at most one in-flight call: callers hold exclusive
//! access for the duration of `invoke`, and memory is only touched strictly
//! before and after the guest runs, never concurrently with it.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use wasmtime::{
    Config, Engine, Instance, Linker, Module, OptLevel, Store, StoreLimits, StoreLimitsBuilder,
    Val, ValType,
};

use crate::memory::{GuestMemory, MemoryError};
use crate::sbor::{self, DecodeError, EncodeError, SborValue};
use crate::slice::Slice;

/// Name of the linear memory export every contract must provide.
pub const MEMORY_EXPORT: &str = "memory";

// ============================================================================
// Error Types
// ============================================================================

/// Failure while turning the returned slice word into a value: either the
/// slice did not fit guest memory, or the bytes behind it were not valid
/// SBOR. Both are guest-supplied-data problems, distinct from a trap.
#[derive(Debug, Error)]
pub enum ResultError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors raised across the invocation pipeline, typed by stage.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("contract compilation failed: {0}")]
    Compilation(String),

    #[error("contract instantiation failed: {0}")]
    Instantiation(String),

    #[error("export not found: {0}")]
    MissingExport(String),

    #[error("export {name} does not match the i64-words-in, one-i64-out convention")]
    BadExportSignature { name: String },

    /// Host-side parameter tree violated a codec invariant
    #[error("parameter encoding failed: {0}")]
    ParamEncode(#[from] EncodeError),

    /// Writing an encoded parameter into guest memory failed
    #[error("parameter write failed: {0}")]
    ParamWrite(#[source] MemoryError),

    /// The guest faulted (unreachable, illegal access, out of fuel). Fatal
    /// for the call, reported as-is, never retried.
    #[error("guest trapped: {0}")]
    Trap(String),

    /// The call returned, but its result could not be read back
    #[error("result decode failed: {0}")]
    ResultDecodeFailed(#[source] ResultError),
}

// ============================================================================
// Host Configuration
// ============================================================================

/// Resource limits and pooling knobs for a contract host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Hard cap on guest linear memory in bytes; grows past it are refused
    pub max_memory_bytes: Option<usize>,
    /// Fuel budget per instance; exhaustion traps the guest
    pub fuel: Option<u64>,
    /// Pooled instances kept per thread
    pub pool_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: None,
            fuel: None,
            pool_size: 4,
        }
    }
}

// ============================================================================
// Contract Instance
// ============================================================================

/// One instantiated contract: a wasmtime store, the instance, and a
/// bounds-checked view of its exported linear memory.
///
/// Not shared: a `&mut` receiver on [`ContractInstance::invoke`] makes one
/// in-flight call per instance a compile-time guarantee.
pub struct ContractInstance {
    store: Store<StoreLimits>,
    instance: Instance,
    memory: GuestMemory,

    /// Start of the host-owned parameter region: the memory size at
    /// instantiation. Rewritten on every call rather than appended to, so
    /// repeated calls on one instance do not grow the memory past the
    /// largest call's high-water mark.
    param_base: u64,
}

impl ContractInstance {
    /// Instantiates a compiled module and resolves its memory export.
    pub fn new(engine: &Engine, module: &Module, config: &HostConfig) -> Result<Self, InvokeError> {
        let mut builder = StoreLimitsBuilder::new();
        if let Some(bytes) = config.max_memory_bytes {
            builder = builder.memory_size(bytes);
        }
        let mut store = Store::new(engine, builder.build());
        store.limiter(|limits| limits);
        if let Some(fuel) = config.fuel {
            store
                .set_fuel(fuel)
                .map_err(|e| InvokeError::Instantiation(e.to_string()))?;
        }

        let linker = Linker::new(engine);
        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| InvokeError::Instantiation(e.to_string()))?;

        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| InvokeError::MissingExport(MEMORY_EXPORT.to_owned()))?;

        let memory = GuestMemory::new(memory);
        let param_base = memory.size(&store);

        Ok(Self {
            store,
            instance,
            memory,
            param_base,
        })
    }

    /// Invokes `export` with SBOR-encoded parameters and decodes its result.
    ///
    /// Each parameter is encoded, written into the instance's parameter
    /// region (growing memory as needed) and passed as a packed slice word.
    /// The region starts at the memory size observed at instantiation and is
    /// reused across calls. The returned word is read back out of the
    /// post-call memory and decoded into a value tree.
    pub fn invoke(
        &mut self,
        export: &str,
        params: &[SborValue],
    ) -> Result<SborValue, InvokeError> {
        let mut words = Vec::with_capacity(params.len());
        let mut cursor = self.param_base;
        for param in params {
            let bytes = sbor::encode(param)?;
            let handle = self
                .memory
                .write(&mut self.store, cursor, &bytes)
                .map_err(InvokeError::ParamWrite)?;
            cursor = handle.slice().end();
            words.push(handle.to_word());
        }

        let word = self.invoke_raw(export, &words)?;

        // The guest may have grown or rewritten its memory during the call;
        // stamp against the post-call state and consume the slice before any
        // further host-side mutation.
        let handle = self.memory.stamp(Slice::from_word(word));
        let bytes = self
            .memory
            .read(&self.store, &handle)
            .map_err(|e| InvokeError::ResultDecodeFailed(e.into()))?;
        let value =
            sbor::decode(&bytes).map_err(|e| InvokeError::ResultDecodeFailed(e.into()))?;

        debug!(
            export,
            params = params.len(),
            result_len = bytes.len(),
            "contract invocation completed"
        );

        Ok(value)
    }

    /// Invokes `export` with raw `i64` words, returning the raw result word.
    ///
    /// The export's signature is checked against the calling convention
    /// before the call: `words.len()` `i64` parameters, one `i64` result.
    pub fn invoke_raw(&mut self, export: &str, words: &[u64]) -> Result<u64, InvokeError> {
        let func = self
            .instance
            .get_func(&mut self.store, export)
            .ok_or_else(|| InvokeError::MissingExport(export.to_owned()))?;

        let ty = func.ty(&self.store);
        let signature_ok = ty.params().len() == words.len()
            && ty.params().all(|p| matches!(p, ValType::I64))
            && ty.results().len() == 1
            && ty.results().all(|r| matches!(r, ValType::I64));
        if !signature_ok {
            return Err(InvokeError::BadExportSignature {
                name: export.to_owned(),
            });
        }

        let args: Vec<Val> = words.iter().map(|&w| Val::I64(w as i64)).collect();
        let mut results = [Val::I64(0)];
        func.call(&mut self.store, &args, &mut results)
            .map_err(|e| InvokeError::Trap(e.to_string()))?;

        match results[0] {
            Val::I64(word) => Ok(word as u64),
            _ => Err(InvokeError::BadExportSignature {
                name: export.to_owned(),
            }),
        }
    }

    /// Current guest memory size in bytes.
    pub fn memory_size(&self) -> u64 {
        self.memory.size(&self.store)
    }
}

// ============================================================================
// Contract Registry - Hot-Publish Support
// ============================================================================

/// Registry holding the current compiled module for one contract.
///
/// New code versions publish atomically; instances created earlier keep
/// running their version until they drain out of the pools.
pub struct ContractRegistry {
    engine: Engine,
    config: HostConfig,

    /// Current module (ArcSwap for lock-free reads)
    current: ArcSwap<Module>,

    /// Code version counter, starts at 1
    version: AtomicU64,

    /// Recently replaced modules, kept for graceful drain
    history: Mutex<Vec<(u64, Arc<Module>)>>,
    history_limit: usize,
}

impl ContractRegistry {
    /// Compiles `code` (WASM binary, or WAT in tests) and creates a registry.
    pub fn new(code: &[u8], config: HostConfig) -> Result<Self, InvokeError> {
        let mut engine_config = Config::new();
        engine_config.cranelift_opt_level(OptLevel::Speed);
        engine_config.parallel_compilation(true);
        engine_config.consume_fuel(config.fuel.is_some());

        let engine = Engine::new(&engine_config)
            .map_err(|e| InvokeError::Compilation(e.to_string()))?;
        let module =
            Module::new(&engine, code).map_err(|e| InvokeError::Compilation(e.to_string()))?;

        info!(code_size = code.len(), "contract registry initialized");

        Ok(Self {
            engine,
            config,
            current: ArcSwap::new(Arc::new(module)),
            version: AtomicU64::new(1),
            history: Mutex::new(Vec::new()),
            history_limit: 3,
        })
    }

    /// Compiles and atomically publishes a new code version.
    pub fn publish(&self, code: &[u8]) -> Result<u64, InvokeError> {
        let module =
            Module::new(&self.engine, code).map_err(|e| InvokeError::Compilation(e.to_string()))?;

        let new_version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let old_module = self.current.swap(Arc::new(module));

        {
            let mut history = self.history.lock();
            history.push((new_version - 1, old_module));
            while history.len() > self.history_limit {
                history.remove(0);
            }
        }

        info!(
            version = new_version,
            code_size = code.len(),
            "published new contract version"
        );

        Ok(new_version)
    }

    /// Current code version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn current_module(&self) -> Arc<Module> {
        self.current.load_full()
    }

    /// Instantiates the current code version.
    pub fn instantiate(&self) -> Result<ContractInstance, InvokeError> {
        let module = self.current.load();
        ContractInstance::new(&self.engine, &module, &self.config)
    }
}

// ============================================================================
// Thread-Local Instance Pool
// ============================================================================

/// Thread-local pool of contract instances.
///
/// Avoids instantiation overhead by reusing instances. Each thread gets its
/// own pool to avoid lock contention. Instances carry the code version they
/// were built from; after a publish, stale instances drain on checkout.
pub struct InstancePool {
    registry: Arc<ContractRegistry>,
    pool_size: usize,
}

thread_local! {
    static LOCAL_POOL: RefCell<Vec<(u64, ContractInstance)>> = const { RefCell::new(Vec::new()) };
}

impl InstancePool {
    pub fn new(registry: Arc<ContractRegistry>, pool_size: usize) -> Self {
        Self {
            registry,
            pool_size,
        }
    }

    /// Checks out an instance of the current code version, creating one if
    /// the pool has none.
    pub fn get(&self) -> Result<PooledInstance, InvokeError> {
        let current = self.registry.version();
        let reused = LOCAL_POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            while let Some((version, instance)) = pool.pop() {
                if version == current {
                    return Some(instance);
                }
                // Built from replaced code; drop it and keep draining.
            }
            None
        });

        let instance = match reused {
            Some(instance) => instance,
            None => self.registry.instantiate()?,
        };

        Ok(PooledInstance {
            instance: Some(instance),
            version: current,
            pool_size: self.pool_size,
        })
    }
}

/// RAII wrapper that returns its instance to the thread-local pool on drop.
pub struct PooledInstance {
    instance: Option<ContractInstance>,
    version: u64,
    pool_size: usize,
}

impl PooledInstance {
    /// Access the contract instance.
    pub fn contract(&mut self) -> &mut ContractInstance {
        self.instance.as_mut().expect("instance already returned")
    }

    /// Drops the instance instead of returning it to the pool.
    ///
    /// Called after a failed invocation: the instance's memory and fuel
    /// state are suspect, and pooling it would make every later checkout
    /// inherit the failure.
    pub fn discard(mut self) {
        self.instance = None;
    }
}

impl Drop for PooledInstance {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            let version = self.version;
            let pool_size = self.pool_size;
            LOCAL_POOL.with(|pool| {
                let mut pool = pool.borrow_mut();
                if pool.len() < pool_size {
                    pool.push((version, instance));
                }
                // Otherwise drop the instance to prevent unbounded growth
            });
        }
    }
}

// ============================================================================
// High-Level API
// ============================================================================

/// High-level contract host.
///
/// Wraps registry and pooling behind a simple call API.
pub struct ContractHost {
    registry: Arc<ContractRegistry>,
    pool: InstancePool,
}

impl ContractHost {
    /// Creates a host for the given contract code with default limits.
    pub fn new(code: &[u8]) -> Result<Self, InvokeError> {
        Self::with_config(code, HostConfig::default())
    }

    /// Creates a host with explicit resource limits.
    pub fn with_config(code: &[u8], config: HostConfig) -> Result<Self, InvokeError> {
        let pool_size = config.pool_size;
        let registry = Arc::new(ContractRegistry::new(code, config)?);
        let pool = InstancePool::new(Arc::clone(&registry), pool_size);
        Ok(Self { registry, pool })
    }

    /// Invokes an exported contract function with SBOR parameters.
    ///
    /// An instance whose call failed is discarded rather than pooled, so one
    /// bad call cannot poison later checkouts.
    pub fn invoke(&self, export: &str, params: &[SborValue]) -> Result<SborValue, InvokeError> {
        let mut pooled = self.pool.get()?;
        match pooled.contract().invoke(export, params) {
            Ok(value) => Ok(value),
            Err(e) => {
                pooled.discard();
                Err(e)
            }
        }
    }

    /// Invokes an export with raw `i64` words.
    pub fn invoke_raw(&self, export: &str, words: &[u64]) -> Result<u64, InvokeError> {
        let mut pooled = self.pool.get()?;
        match pooled.contract().invoke_raw(export, words) {
            Ok(word) => Ok(word),
            Err(e) => {
                pooled.discard();
                Err(e)
            }
        }
    }

    /// Publishes a new contract code version.
    pub fn publish(&self, code: &[u8]) -> Result<u64, InvokeError> {
        self.registry.publish(code)
    }

    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }
}

// ============================================================================
// Tests
// ============================================================================
