//! Error types for the engine bridge.
//!
//! Every variant names the engine export or memory region involved so a
//! failure can be traced back to the call that produced it. Engine payloads
//! (query text, chunk bytes) never appear in messages.

/// Errors raised while marshaling calls into the opaque engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A call that needs a handle was issued before `init` succeeded.
    #[error("engine not initialized: {0}")]
    Uninitialized(String),

    /// The engine returned a null handle from a state-changing call.
    #[error("engine returned a null handle from {0}")]
    NullHandle(String),

    /// A read or write fell outside the engine's linear memory.
    #[error("memory error: {0}")]
    Memory(String),

    /// The engine export itself failed or trapped.
    #[error("engine call failed: {0}")]
    Call(String),

    /// A string returned by the engine was not valid UTF-8.
    #[error("invalid UTF-8 from {0}")]
    Utf8(String),

    /// The engine binary could not be instantiated.
    #[error("instantiate error: {0}")]
    Instantiate(String),
}

/// Convenience type alias for bridge results.
pub type Result<T> = std::result::Result<T, BridgeError>;
