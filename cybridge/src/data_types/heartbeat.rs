use crate::core::SubjectId;
use crate::time::Duration;
use cybridge_encoding as enc;

/// `uavcan.node.Heartbeat.1.0`
///
/// Fixed size 7 bytes. Published by every node that has a node id; anonymous nodes stay
/// silent on this subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Heartbeat {
    /// Seconds since start, saturating at `u32::MAX`
    pub uptime: u32,
    pub health: Health,
    pub mode: Mode,
    pub vendor_specific_status_code: u8,
}

impl Heartbeat {
    /// The fixed subject ID for this message type
    pub const SUBJECT: SubjectId = SubjectId::new(7509).unwrap();
    pub const MAX_PUBLICATION_PERIOD: Duration = Duration::from_secs(1);
    /// A node silent for longer than this is considered offline
    pub const OFFLINE_TIMEOUT: Duration = Duration::from_secs(3);
    pub const SIZE: usize = 7;
}

impl enc::DataType for Heartbeat {
    /// Delimited with an extent of 12 bytes
    const EXTENT_BYTES: Option<u32> = Some(12);
}

impl enc::Message for Heartbeat {}

impl enc::BufferType for Heartbeat {
    type Buffer = enc::StaticBuffer<{ Heartbeat::SIZE }>;
}

impl enc::Serialize for Heartbeat {
    fn size_bits(&self) -> usize {
        Self::SIZE * 8
    }

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_aligned_u32(self.uptime);
        cursor.write_composite(&self.health);
        cursor.write_composite(&self.mode);
        cursor.write_aligned_u8(self.vendor_specific_status_code);
    }
}

impl enc::Deserialize for Heartbeat {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(Heartbeat {
            uptime: cursor.read_u32(),
            health: cursor.read_composite()?,
            mode: cursor.read_composite()?,
            vendor_specific_status_code: cursor.read_u8(),
        })
    }
}

/// `uavcan.node.Health.1.0`
///
/// Reflects the worst-performing activity of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Health {
    #[default]
    Nominal = 0,
    /// Minor failure; all real-time functions still performed.
    Advisory = 1,
    /// Major failure; running degraded.
    Caution = 2,
    /// Unable to perform the intended function.
    Warning = 3,
}

impl From<u8> for Health {
    /// Only the two low bits are significant
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => Health::Nominal,
            1 => Health::Advisory,
            2 => Health::Caution,
            _ => Health::Warning,
        }
    }
}

impl enc::DataType for Health {
    const EXTENT_BYTES: Option<u32> = None;
}

impl enc::Serialize for Health {
    fn size_bits(&self) -> usize {
        8
    }

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_u2(*self as u8);
    }
}

impl enc::Deserialize for Health {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(Health::from(cursor.read_u2()))
    }
}

/// `uavcan.node.Mode.1.0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    #[default]
    Operational = 0,
    /// Entered right after startup.
    Initialization = 1,
    Maintenance = 2,
    SoftwareUpdate = 3,
}

impl TryFrom<u8> for Mode {
    type Error = enc::DeserializeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Operational),
            1 => Ok(Mode::Initialization),
            2 => Ok(Mode::Maintenance),
            3 => Ok(Mode::SoftwareUpdate),
            // 4..=7 are reserved
            _ => Err(enc::DeserializeError::UnionTag),
        }
    }
}

impl enc::DataType for Mode {
    const EXTENT_BYTES: Option<u32> = None;
}

impl enc::Serialize for Mode {
    fn size_bits(&self) -> usize {
        8
    }

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_u3(*self as u8);
    }
}

impl enc::Deserialize for Mode {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Mode::try_from(cursor.read_u3())
    }
}
