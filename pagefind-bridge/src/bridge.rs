//! Sequential adapter over an [`EngineModule`].
//!
//! [`EngineBridge`] owns the module and the engine's current handle. Each
//! public method performs one full marshaling cycle:
//!
//! 1. copy every argument into engine-owned memory via `malloc`
//! 2. reserve return scratch on the shadow stack (string-returning calls)
//! 3. call the export with the current handle
//! 4. release the scratch and free the returned buffer, on success or failure
//! 5. store the handle the engine hands back
//!
//! Argument buffers are owned by the engine once passed and are not freed
//! here.

use std::num::NonZeroU32;

use crate::error::{BridgeError, Result};
use crate::memory::{self, MemoryView};
use crate::module::{EngineModule, RawSlice};

/// Bytes of shadow stack reserved for a returned `(ptr, len)` pair.
const RETURN_SCRATCH: i32 = 16;

/// Alignment requested for byte and string buffers.
const BYTE_ALIGN: u32 = 1;

/// The engine's token for its current state.
///
/// Every state-changing call returns a new one; it replaces the previous
/// token for all later calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(NonZeroU32);

impl EngineHandle {
    /// The raw value passed to engine exports.
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

/// Single-owner adapter exposing the engine's seven operations.
pub struct EngineBridge {
    module: Box<dyn EngineModule>,
    handle: Option<EngineHandle>,
    memory_len: usize,
}

impl std::fmt::Debug for EngineBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBridge")
            .field("handle", &self.handle)
            .field("memory_len", &self.memory_len)
            .finish_non_exhaustive()
    }
}

impl EngineBridge {
    /// Wrap a freshly instantiated module. No engine call is made.
    pub fn new(module: Box<dyn EngineModule>) -> Self {
        let memory_len = module.memory().len();
        Self {
            module,
            handle: None,
            memory_len,
        }
    }

    /// The most recent handle, if `init` has succeeded.
    pub fn handle(&self) -> Option<EngineHandle> {
        self.handle
    }

    /// Whether `init` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }

    /// Initialise the engine from the decompressed meta index.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NullHandle`] if the engine rejects the meta
    /// bytes, or a memory/call error from the marshaling cycle.
    pub fn init(&mut self, meta: &[u8]) -> Result<EngineHandle> {
        let meta = self.pass_bytes(meta)?;
        let raw = self.module.init_pagefind(meta)?;
        self.thread_handle("init_pagefind", raw)
    }

    /// Replace the engine's ranking weights with a JSON object.
    pub fn set_ranking_weights(&mut self, weights_json: &str) -> Result<EngineHandle> {
        let handle = self.current("set_ranking_weights")?;
        let weights = self.pass_bytes(weights_json.as_bytes())?;
        let raw = self.module.set_ranking_weights(handle, weights)?;
        self.thread_handle("set_ranking_weights", raw)
    }

    /// Load one decompressed index chunk.
    pub fn load_index_chunk(&mut self, chunk: &[u8]) -> Result<EngineHandle> {
        let handle = self.current("load_index_chunk")?;
        let chunk = self.pass_bytes(chunk)?;
        let raw = self.module.load_index_chunk(handle, chunk)?;
        self.thread_handle("load_index_chunk", raw)
    }

    /// Load one decompressed filter chunk.
    pub fn load_filter_chunk(&mut self, chunk: &[u8]) -> Result<EngineHandle> {
        let handle = self.current("load_filter_chunk")?;
        let chunk = self.pass_bytes(chunk)?;
        let raw = self.module.load_filter_chunk(handle, chunk)?;
        self.thread_handle("load_filter_chunk", raw)
    }

    /// Ask which index chunks a normalized query needs.
    ///
    /// Returns the engine's space-separated hash list verbatim.
    pub fn request_indexes(&mut self, query: &str) -> Result<String> {
        let handle = self.current("request_indexes")?;
        let query = self.pass_bytes(query.as_bytes())?;
        self.call_returning_string("request_indexes", |module, ret| {
            module.request_indexes(ret, handle, query)
        })
    }

    /// Ask which filter chunks a filter object needs.
    ///
    /// Returns the engine's space-separated hash list verbatim.
    pub fn request_filter_indexes(&mut self, filters_json: &str) -> Result<String> {
        let handle = self.current("request_filter_indexes")?;
        let filters = self.pass_bytes(filters_json.as_bytes())?;
        self.call_returning_string("request_filter_indexes", |module, ret| {
            module.request_filter_indexes(ret, handle, filters)
        })
    }

    /// Run a search and return the engine's raw response string.
    pub fn search(
        &mut self,
        query: &str,
        filters_json: &str,
        sort: &str,
        exact: bool,
    ) -> Result<String> {
        let handle = self.current("search")?;
        let query = self.pass_bytes(query.as_bytes())?;
        let filters = self.pass_bytes(filters_json.as_bytes())?;
        let sort = self.pass_bytes(sort.as_bytes())?;
        self.call_returning_string("search", |module, ret| {
            module.search(ret, handle, query, filters, sort, exact)
        })
    }

    fn current(&self, export: &str) -> Result<u32> {
        self.handle
            .map(EngineHandle::raw)
            .ok_or_else(|| BridgeError::Uninitialized(export.to_owned()))
    }

    fn thread_handle(&mut self, export: &str, raw: u32) -> Result<EngineHandle> {
        let handle = NonZeroU32::new(raw)
            .map(EngineHandle)
            .ok_or_else(|| BridgeError::NullHandle(export.to_owned()))?;
        self.handle = Some(handle);
        Ok(handle)
    }

    /// Copy `data` into a fresh engine allocation sized to the payload.
    fn pass_bytes(&mut self, data: &[u8]) -> Result<RawSlice> {
        let len = u32::try_from(data.len()).map_err(|_| {
            BridgeError::Memory(format!("payload of {} bytes is too large", data.len()))
        })?;
        let ptr = self.module.malloc(len, BYTE_ALIGN)?;
        // malloc may have grown memory; take the slice only now.
        self.note_memory_size();
        memory::write(self.module.memory_mut(), ptr, data)?;
        Ok(RawSlice { ptr, len })
    }

    /// Reserve return scratch, run `call`, then always release the scratch
    /// and free whatever buffer the engine handed back.
    fn call_returning_string<F>(&mut self, export: &str, call: F) -> Result<String>
    where
        F: FnOnce(&mut dyn EngineModule, u32) -> Result<()>,
    {
        let ret = self.module.add_to_stack_pointer(-RETURN_SCRATCH)?;
        let returned = call(self.module.as_mut(), ret).and_then(|()| {
            self.note_memory_size();
            MemoryView::new(self.module.memory()).read_pair(ret)
        });
        let released = self.module.add_to_stack_pointer(RETURN_SCRATCH);

        let (ptr, len) = returned.map_err(|e| match e {
            BridgeError::Call(msg) => BridgeError::Call(format!("{export}: {msg}")),
            other => other,
        })?;
        let text = MemoryView::new(self.module.memory())
            .read(ptr, len)
            .and_then(|bytes| {
                String::from_utf8(bytes.to_vec()).map_err(|_| BridgeError::Utf8(export.to_owned()))
            });
        let freed = self.module.free(ptr, len, BYTE_ALIGN);

        released?;
        freed?;
        let text = text?;
        tracing::trace!(export, bytes = text.len(), "engine returned string");
        Ok(text)
    }

    fn note_memory_size(&mut self) {
        let current = self.module.memory().len();
        if current != self.memory_len {
            tracing::trace!(from = self.memory_len, to = current, "engine memory resized");
            self.memory_len = current;
        }
    }
}
