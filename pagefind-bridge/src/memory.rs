//! Bounds-checked access to engine linear memory.
//!
//! A [`MemoryView`] borrows the module's memory for the duration of one
//! read. It cannot outlive a call into the module, so a view taken before
//! a call that grows memory is never reused after it.

use crate::error::{BridgeError, Result};

/// A read-only window over engine memory at a single point in time.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    bytes: &'a [u8],
}

impl<'a> MemoryView<'a> {
    /// Derive a view from the module's current memory.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Size of the memory this view was derived from.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Borrow `len` bytes starting at `ptr`.
    pub fn read(&self, ptr: u32, len: u32) -> Result<&'a [u8]> {
        let start = ptr as usize;
        let end = start
            .checked_add(len as usize)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                BridgeError::Memory(format!(
                    "read of {len} bytes at {ptr} exceeds {}",
                    self.bytes.len()
                ))
            })?;
        Ok(&self.bytes[start..end])
    }

    /// Read a little-endian `u32` at `ptr`.
    pub fn read_u32(&self, ptr: u32) -> Result<u32> {
        let raw = self.read(ptr, 4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Read the `(ptr, len)` pair an export wrote into scratch space.
    pub fn read_pair(&self, at: u32) -> Result<(u32, u32)> {
        let second = at
            .checked_add(4)
            .ok_or_else(|| BridgeError::Memory(format!("pair at {at} overflows")))?;
        Ok((self.read_u32(at)?, self.read_u32(second)?))
    }
}

/// Copy `data` into engine memory at `ptr`.
pub fn write(memory: &mut [u8], ptr: u32, data: &[u8]) -> Result<()> {
    let start = ptr as usize;
    let end = start
        .checked_add(data.len())
        .filter(|end| *end <= memory.len())
        .ok_or_else(|| {
            BridgeError::Memory(format!(
                "write of {} bytes at {ptr} exceeds {}",
                data.len(),
                memory.len()
            ))
        })?;
    memory[start..end].copy_from_slice(data);
    Ok(())
}
