//! Raw call surface of the prebuilt engine module.
//!
//! [`EngineModule`] is the seam between this crate and whatever runtime
//! hosts the engine binary. It mirrors the module's exports one-to-one:
//! pointers and lengths in, pointers and handles out. Nothing above
//! [`crate::EngineBridge`] ever sees these raw values.

use crate::error::Result;

/// A `(pointer, length)` pair addressing bytes in engine memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSlice {
    /// Byte offset into the engine's linear memory.
    pub ptr: u32,
    /// Number of bytes.
    pub len: u32,
}

/// The exports of a loaded engine module.
///
/// Implementors wrap a live module instance. All handle values are the
/// engine's own opaque tokens; the bridge threads the most recent one
/// into every call.
///
/// Methods returning a string (`request_indexes`, `request_filter_indexes`,
/// `search`) write a little-endian `(ptr, len)` pair into the scratch
/// region at `ret` instead of returning it. The caller owns the pointed-to
/// buffer and must release it with [`EngineModule::free`].
pub trait EngineModule: Send {
    /// The module's linear memory as it is right now.
    ///
    /// The length may grow after any call into the module.
    fn memory(&self) -> &[u8];

    /// Mutable access to the module's linear memory.
    fn memory_mut(&mut self) -> &mut [u8];

    /// Allocate `size` bytes inside engine memory.
    fn malloc(&mut self, size: u32, align: u32) -> Result<u32>;

    /// Release a buffer previously returned by the engine.
    fn free(&mut self, ptr: u32, size: u32, align: u32) -> Result<()>;

    /// Move the shadow-stack pointer by `delta` bytes and return the new value.
    fn add_to_stack_pointer(&mut self, delta: i32) -> Result<u32>;

    /// Initialise engine state from the decompressed meta index.
    fn init_pagefind(&mut self, meta: RawSlice) -> Result<u32>;

    /// Replace the ranking weights; `weights` is a JSON object.
    fn set_ranking_weights(&mut self, handle: u32, weights: RawSlice) -> Result<u32>;

    /// Feed one decompressed index chunk into the engine.
    fn load_index_chunk(&mut self, handle: u32, chunk: RawSlice) -> Result<u32>;

    /// Feed one decompressed filter chunk into the engine.
    fn load_filter_chunk(&mut self, handle: u32, chunk: RawSlice) -> Result<u32>;

    /// List the index chunk hashes a query needs, space separated.
    fn request_indexes(&mut self, ret: u32, handle: u32, query: RawSlice) -> Result<()>;

    /// List the filter chunk hashes a filter object needs, space separated.
    fn request_filter_indexes(&mut self, ret: u32, handle: u32, filters: RawSlice) -> Result<()>;

    /// Run a search against everything loaded so far.
    fn search(
        &mut self,
        ret: u32,
        handle: u32,
        query: RawSlice,
        filters: RawSlice,
        sort: RawSlice,
        exact: bool,
    ) -> Result<()>;
}

/// Turns an engine binary into a live [`EngineModule`].
///
/// The client fetches and decompresses the binary for the selected
/// language; the loader owns whatever runtime executes it.
pub trait EngineLoader: Send + Sync {
    /// Instantiate the engine from its (decompressed) binary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::Instantiate`] if the binary cannot be
    /// compiled or linked.
    fn instantiate(&self, binary: &[u8]) -> Result<Box<dyn EngineModule>>;
}
