//! # pagefind-bridge
//!
//! Typed marshaling layer in front of the prebuilt Pagefind engine module.
//!
//! The engine is an opaque state machine reached through raw exports that
//! take pointers into its linear memory. This crate confines that protocol
//! to one place:
//!
//! - [`EngineModule`] mirrors the raw exports; a host runtime implements it
//! - [`EngineBridge`] owns a module and the current [`EngineHandle`], and
//!   exposes exactly seven safe operations taking and returning Rust
//!   strings and byte slices
//! - [`EngineLoader`] turns a fetched engine binary into a module
//!
//! The bridge is strictly sequential: every method takes `&mut self`, so
//! two engine calls can never overlap on one instance.

pub mod bridge;
pub mod error;
pub mod memory;
pub mod module;
pub mod testing;

pub use bridge::{EngineBridge, EngineHandle};
pub use error::{BridgeError, Result};
pub use module::{EngineLoader, EngineModule, RawSlice};
