//! Link-level frame object

use crate::time::Instant;

/// A transport-layer maximum transmission unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mtu {
    Classic,
    Fd,
}

impl From<Mtu> for usize {
    fn from(value: Mtu) -> Self {
        match value {
            Mtu::Classic => 8,
            Mtu::Fd => 64,
        }
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IncorrectMtu;

impl TryFrom<usize> for Mtu {
    type Error = IncorrectMtu;
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Mtu::Classic),
            64 => Ok(Mtu::Fd),
            _ => Err(IncorrectMtu),
        }
    }
}

/// CAN-FD-compatible data length
///
/// CAN-FD frames carry 0..=8, 12, 16, 20, 24, 32, 48 or 64 bytes. Each length has a
/// 4-bit data length code (DLC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataLength(u8);

impl DataLength {
    pub const MAX: usize = 64;

    const DLC_TO_LENGTH: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

    /// Exact length, if it is a valid CAN-FD length
    pub const fn new(value: usize) -> Option<Self> {
        let floor = Self::new_floor(value);
        if floor.as_usize() == value {
            Some(floor)
        } else {
            None
        }
    }

    /// Largest valid length not exceeding `value`
    pub const fn new_floor(value: usize) -> Self {
        let floor = match value {
            0..8 => value,
            8..24 => value / 4 * 4,
            24..32 => value / 8 * 8,
            32..64 => value / 16 * 16,
            64.. => 64,
        };
        Self(floor as u8)
    }

    /// Smallest valid length not below `value`
    pub const fn new_ceil(value: usize) -> Option<Self> {
        if value <= Self::MAX {
            let ceil = match value {
                0..8 => value,
                8..24 => value.div_ceil(4) * 4,
                24..32 => value.div_ceil(8) * 8,
                32.. => value.div_ceil(16) * 16,
            };
            Some(Self(ceil as u8))
        } else {
            None
        }
    }

    pub const fn from_dlc(dlc: u8) -> Option<Self> {
        if (dlc as usize) < Self::DLC_TO_LENGTH.len() {
            Some(Self(Self::DLC_TO_LENGTH[dlc as usize]))
        } else {
            None
        }
    }

    pub const fn dlc(&self) -> u8 {
        match self.0 {
            0..=8 => self.0,
            12 => 9,
            16 => 10,
            20 => 11,
            24 => 12,
            32 => 13,
            48 => 14,
            _ => 15,
        }
    }

    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl From<DataLength> for usize {
    fn from(value: DataLength) -> Self {
        value.as_usize()
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

/// CAN-FD frame compatible data vector
///
/// Classic CAN frames use the subset of lengths up to 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Data {
    length: DataLength,
    bytes: [u8; DataLength::MAX],
}

impl Data {
    /// Creates a new vector from a slice of compatible length.
    pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
        let length = DataLength::new(data.len()).ok_or(InvalidLength)?;
        let mut bytes = [0; DataLength::MAX];
        bytes[..data.len()].copy_from_slice(data);

        Ok(Self { length, bytes })
    }

    pub fn new_zeros(length: DataLength) -> Self {
        Self {
            length,
            bytes: [0; DataLength::MAX],
        }
    }

    pub fn length(&self) -> DataLength {
        self.length
    }
}

impl core::ops::Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..usize::from(self.length)]
    }
}

impl core::ops::DerefMut for Data {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes[..usize::from(self.length)]
    }
}

/// A single extended-ID CAN or CAN-FD frame
///
/// `id` holds the 29-bit extended identifier. `timestamp` is the reception instant for
/// received frames and the transmission deadline for outgoing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub id: u32,
    pub data: Data,
    pub fd: bool,
    pub timestamp: Instant,
}

impl Frame {
    pub const EXTENDED_ID_MASK: u32 = 0x1fff_ffff;

    /// Builds a frame from the raw parts a CAN controller reports
    pub fn from_dlc(
        id: u32,
        dlc: u8,
        bytes: &[u8],
        fd: bool,
        timestamp: Instant,
    ) -> Result<Self, InvalidLength> {
        let length = DataLength::from_dlc(dlc).ok_or(InvalidLength)?;
        let data = bytes.get(..length.as_usize()).ok_or(InvalidLength)?;
        Ok(Self {
            id: id & Self::EXTENDED_ID_MASK,
            data: Data::new(data)?,
            fd,
            timestamp,
        })
    }

    pub fn dlc(&self) -> u8 {
        self.data.length().dlc()
    }
}
