//! A scriptable in-memory engine for tests.
//!
//! [`ScriptedEngine`] implements the raw [`EngineModule`] ABI over a plain
//! byte vector: a downward-growing shadow stack below a bump-allocated heap
//! that grows in 64 KiB pages. Responses come from an [`EngineScript`];
//! every call is recorded and can be inspected through an [`EngineProbe`]
//! after the engine has been moved into a bridge or client.

#![doc(hidden)]

use std::sync::{Arc, Mutex};

use crate::error::{BridgeError, Result};
use crate::memory::{self, MemoryView};
use crate::module::{EngineLoader, EngineModule, RawSlice};

const PAGE: usize = 64 * 1024;

/// The shadow stack occupies `[0, STACK_TOP)`; the heap starts at `STACK_TOP`.
const STACK_TOP: u32 = 16 * 1024;

/// Handle value the engine hands out from `init_pagefind`.
const FIRST_HANDLE: u32 = 0x40;

/// Canned engine responses.
#[derive(Debug, Clone)]
pub struct EngineScript {
    /// Returned from `request_indexes`.
    pub index_hashes: String,
    /// Returned from `request_filter_indexes`.
    pub filter_hashes: String,
    /// Returned from `search`.
    pub search_response: String,
    /// `init_pagefind` returns a null handle.
    pub reject_meta: bool,
    /// `search` fails as if the engine trapped.
    pub fail_search: bool,
}

impl Default for EngineScript {
    fn default() -> Self {
        Self {
            index_hashes: String::new(),
            filter_hashes: String::new(),
            search_response: "0::__PF_UNFILTERED_DELIM__".into(),
            reject_meta: false,
            fail_search: false,
        }
    }
}

/// Arguments of one recorded `search` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub query: String,
    pub filters: String,
    pub sort: String,
    pub exact: bool,
}

/// Everything the engine has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct EngineCalls {
    pub binaries: Vec<Vec<u8>>,
    pub meta: Vec<Vec<u8>>,
    pub ranking: Vec<String>,
    pub index_chunks: Vec<Vec<u8>>,
    pub filter_chunks: Vec<Vec<u8>>,
    pub index_requests: Vec<String>,
    pub filter_requests: Vec<String>,
    pub searches: Vec<SearchCall>,
    pub returned_buffers: usize,
    pub freed_buffers: usize,
    pub stale_handles: usize,
}

#[derive(Debug, Default)]
struct ProbeState {
    calls: EngineCalls,
    stack_pointer: u32,
    memory_len: usize,
}

/// Read-only window onto a [`ScriptedEngine`]'s activity.
#[derive(Debug, Clone, Default)]
pub struct EngineProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl EngineProbe {
    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> EngineCalls {
        self.with(|s| s.calls.clone())
    }

    /// Current shadow-stack pointer.
    pub fn stack_pointer(&self) -> u32 {
        self.with(|s| s.stack_pointer)
    }

    /// Current size of the engine's linear memory.
    pub fn memory_len(&self) -> usize {
        self.with(|s| s.memory_len)
    }

    fn with<T>(&self, f: impl FnOnce(&mut ProbeState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

/// In-memory engine driven by an [`EngineScript`].
pub struct ScriptedEngine {
    script: EngineScript,
    memory: Vec<u8>,
    heap_top: u32,
    stack_pointer: u32,
    handle: u32,
    probe: EngineProbe,
}

impl ScriptedEngine {
    /// Create an engine with its own probe.
    pub fn new(script: EngineScript) -> Self {
        Self::with_probe(script, EngineProbe::default())
    }

    /// Create an engine that records into an existing probe.
    pub fn with_probe(script: EngineScript, probe: EngineProbe) -> Self {
        let engine = Self {
            script,
            memory: vec![0; PAGE],
            heap_top: STACK_TOP,
            stack_pointer: STACK_TOP,
            handle: 0,
            probe,
        };
        engine.probe.with(|s| {
            s.stack_pointer = engine.stack_pointer;
            s.memory_len = engine.memory.len();
        });
        engine
    }

    /// A probe sharing this engine's call log.
    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    fn bytes(&self, slice: RawSlice) -> Result<Vec<u8>> {
        MemoryView::new(&self.memory)
            .read(slice.ptr, slice.len)
            .map(<[u8]>::to_vec)
    }

    fn text(&self, slice: RawSlice, export: &str) -> Result<String> {
        String::from_utf8(self.bytes(slice)?).map_err(|_| BridgeError::Utf8(export.to_owned()))
    }

    fn advance(&mut self, given: u32, export: &str) -> Result<u32> {
        if given != self.handle {
            self.probe.with(|s| s.calls.stale_handles += 1);
            return Err(BridgeError::Call(format!(
                "{export}: stale handle {given}, expected {}",
                self.handle
            )));
        }
        self.handle += 1;
        Ok(self.handle)
    }

    fn check(&self, given: u32, export: &str) -> Result<()> {
        if given == self.handle {
            return Ok(());
        }
        self.probe.with(|s| s.calls.stale_handles += 1);
        Err(BridgeError::Call(format!("{export}: stale handle {given}")))
    }

    fn return_string(&mut self, ret: u32, text: &str) -> Result<()> {
        let len = text.len() as u32;
        let ptr = self.malloc(len, 1)?;
        memory::write(&mut self.memory, ptr, text.as_bytes())?;
        let mut pair = [0u8; 8];
        pair[..4].copy_from_slice(&ptr.to_le_bytes());
        pair[4..].copy_from_slice(&len.to_le_bytes());
        memory::write(&mut self.memory, ret, &pair)?;
        self.probe.with(|s| s.calls.returned_buffers += 1);
        Ok(())
    }
}

impl EngineModule for ScriptedEngine {
    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn malloc(&mut self, size: u32, align: u32) -> Result<u32> {
        let align = align.max(1);
        let ptr = self.heap_top.div_ceil(align) * align;
        let end = ptr as usize + size as usize;
        if end > self.memory.len() {
            let pages = (end - self.memory.len()).div_ceil(PAGE);
            self.memory.resize(self.memory.len() + pages * PAGE, 0);
            let len = self.memory.len();
            self.probe.with(|s| s.memory_len = len);
        }
        self.heap_top = end as u32;
        Ok(ptr)
    }

    fn free(&mut self, _ptr: u32, _size: u32, _align: u32) -> Result<()> {
        self.probe.with(|s| s.calls.freed_buffers += 1);
        Ok(())
    }

    fn add_to_stack_pointer(&mut self, delta: i32) -> Result<u32> {
        let moved = i64::from(self.stack_pointer) + i64::from(delta);
        if !(0..=i64::from(STACK_TOP)).contains(&moved) {
            return Err(BridgeError::Memory(format!("stack pointer moved to {moved}")));
        }
        self.stack_pointer = moved as u32;
        let sp = self.stack_pointer;
        self.probe.with(|s| s.stack_pointer = sp);
        Ok(sp)
    }

    fn init_pagefind(&mut self, meta: RawSlice) -> Result<u32> {
        let meta = self.bytes(meta)?;
        self.probe.with(|s| s.calls.meta.push(meta));
        if self.script.reject_meta {
            return Ok(0);
        }
        self.handle = FIRST_HANDLE;
        Ok(self.handle)
    }

    fn set_ranking_weights(&mut self, handle: u32, weights: RawSlice) -> Result<u32> {
        let weights = self.text(weights, "set_ranking_weights")?;
        let next = self.advance(handle, "set_ranking_weights")?;
        self.probe.with(|s| s.calls.ranking.push(weights));
        Ok(next)
    }

    fn load_index_chunk(&mut self, handle: u32, chunk: RawSlice) -> Result<u32> {
        let chunk = self.bytes(chunk)?;
        let next = self.advance(handle, "load_index_chunk")?;
        self.probe.with(|s| s.calls.index_chunks.push(chunk));
        Ok(next)
    }

    fn load_filter_chunk(&mut self, handle: u32, chunk: RawSlice) -> Result<u32> {
        let chunk = self.bytes(chunk)?;
        let next = self.advance(handle, "load_filter_chunk")?;
        self.probe.with(|s| s.calls.filter_chunks.push(chunk));
        Ok(next)
    }

    fn request_indexes(&mut self, ret: u32, handle: u32, query: RawSlice) -> Result<()> {
        self.check(handle, "request_indexes")?;
        let query = self.text(query, "request_indexes")?;
        self.probe.with(|s| s.calls.index_requests.push(query));
        let response = self.script.index_hashes.clone();
        self.return_string(ret, &response)
    }

    fn request_filter_indexes(&mut self, ret: u32, handle: u32, filters: RawSlice) -> Result<()> {
        self.check(handle, "request_filter_indexes")?;
        let filters = self.text(filters, "request_filter_indexes")?;
        self.probe.with(|s| s.calls.filter_requests.push(filters));
        let response = self.script.filter_hashes.clone();
        self.return_string(ret, &response)
    }

    fn search(
        &mut self,
        ret: u32,
        handle: u32,
        query: RawSlice,
        filters: RawSlice,
        sort: RawSlice,
        exact: bool,
    ) -> Result<()> {
        self.check(handle, "search")?;
        let call = SearchCall {
            query: self.text(query, "search")?,
            filters: self.text(filters, "search")?,
            sort: self.text(sort, "search")?,
            exact,
        };
        self.probe.with(|s| s.calls.searches.push(call));
        if self.script.fail_search {
            return Err(BridgeError::Call("unreachable executed".into()));
        }
        let response = self.script.search_response.clone();
        self.return_string(ret, &response)
    }
}

/// Loader that hands out [`ScriptedEngine`]s sharing one probe.
#[derive(Debug, Clone)]
pub struct ScriptedLoader {
    script: EngineScript,
    probe: EngineProbe,
    fail: bool,
}

impl ScriptedLoader {
    pub fn new(script: EngineScript) -> Self {
        Self {
            script,
            probe: EngineProbe::default(),
            fail: false,
        }
    }

    /// A loader whose `instantiate` always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(EngineScript::default())
        }
    }

    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }
}

impl EngineLoader for ScriptedLoader {
    fn instantiate(&self, binary: &[u8]) -> Result<Box<dyn EngineModule>> {
        self.probe.with(|s| s.calls.binaries.push(binary.to_vec()));
        if self.fail {
            return Err(BridgeError::Instantiate("scripted failure".into()));
        }
        Ok(Box::new(ScriptedEngine::with_probe(
            self.script.clone(),
            self.probe.clone(),
        )))
    }
}
