//! Payload serialization support
//!
//! Data types implement the `canadensis_encoding` traits reexported here. `BufferType` adds
//! a scratch buffer type able to hold the longest serialization, so publishers can serialize
//! without dynamic memory.

#![no_std]

pub use canadensis_encoding::*;

pub trait BufferType {
    /// Buffer with capacity sufficient for correct message serialization
    type Buffer: Sized + Default + AsMut<[u8]> + AsRef<[u8]>;
}

pub struct StaticBuffer<const N: usize>([u8; N]);

impl<const N: usize> Default for StaticBuffer<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> AsRef<[u8]> for StaticBuffer<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> AsMut<[u8]> for StaticBuffer<N> {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Serialized length in whole bytes
pub fn serialized_len<T: Serialize + ?Sized>(value: &T) -> usize {
    value.size_bits().div_ceil(8)
}

/// Serializes `value` into a fresh scratch buffer
///
/// Returns the buffer and the number of meaningful leading bytes.
pub fn serialize_to_buffer<T: Serialize + BufferType>(value: &T) -> (T::Buffer, usize) {
    let mut buffer = T::Buffer::default();
    let length = serialized_len(value);
    value.serialize_to_bytes(buffer.as_mut());
    (buffer, length)
}
