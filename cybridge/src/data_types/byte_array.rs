use cybridge_encoding::{
    BufferType, DataType, Deserialize, DeserializeError, Message, ReadCursor, Serialize,
    StaticBuffer, WriteCursor,
};
use heapless::Vec;

const CAPACITY: usize = 256;

/// Length-prefixed byte string for tests and demos
///
/// Wire-compatible with `uavcan.primitive.array.Natural8.1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteArray {
    pub bytes: Vec<u8, CAPACITY>,
}

impl ByteArray {
    pub const CAPACITY: usize = CAPACITY;

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes).ok().map(|bytes| Self { bytes })
    }
}

impl DataType for ByteArray {
    const EXTENT_BYTES: Option<u32> = None;
}

impl Message for ByteArray {}

impl Serialize for ByteArray {
    fn size_bits(&self) -> usize {
        16 + self.bytes.len() * 8
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_aligned_u16(unwrap!(u16::try_from(self.bytes.len())));
        cursor.write_aligned_bytes(&self.bytes);
    }
}

impl Deserialize for ByteArray {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DeserializeError> {
        let length = usize::from(cursor.read_aligned_u16());
        if length > Self::CAPACITY {
            return Err(DeserializeError::ArrayLength);
        }
        let mut bytes = Vec::new();
        unwrap!(bytes.resize_default(length));
        cursor.read_bytes(&mut bytes);
        Ok(Self { bytes })
    }
}

impl BufferType for ByteArray {
    type Buffer = StaticBuffer<{ 2 + CAPACITY }>;
}
