//! Cyphal protocol scalar types
//!
//! Identifier and priority types shared by the link boundary and the transport core.
//! Applications should use the `cybridge::core` reexport instead of depending on this crate.
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Transfer priority \[1; 4.1.1.3\]
///
/// Numeric codes match the CAN ID priority field, so a lower code is more urgent and
/// `Exceptional < Optional` in the derived ordering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Priority {
    /// Reserved for total system failure handling.
    Exceptional = 0,
    Immediate = 1,
    Fast = 2,
    /// Commands that must pass through a bus loaded with nominal traffic.
    High = 3,
    /// Default priority, used by heartbeats.
    Nominal = 4,
    Low = 5,
    Slow = 6,
    /// Diagnostic traffic that may never be sent.
    Optional = 7,
}

impl Priority {
    pub const MIN: Priority = Priority::Exceptional;
    pub const MAX: Priority = Priority::Optional;
    pub const COUNT: usize = Self::MAX.into_u8() as usize + 1;

    pub const fn try_from_u8(code: u8) -> Option<Priority> {
        if code <= Self::MAX.into_u8() {
            Some(Priority::from_u8_truncating(code))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(code: u8) -> Priority {
        match code & 0x7 {
            0 => Priority::Exceptional,
            1 => Priority::Immediate,
            2 => Priority::Fast,
            3 => Priority::High,
            4 => Priority::Nominal,
            5 => Priority::Low,
            6 => Priority::Slow,
            _ => Priority::Optional,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    /// Next less urgent level
    pub const fn next(self) -> Option<Self> {
        Self::try_from_u8(self.into_u8() + 1)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.into_u8()
    }
}

impl From<Priority> for usize {
    fn from(value: Priority) -> Self {
        u8::from(value).into()
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// A set of priority levels
///
/// `first()` returns the most urgent member, i.e. the one with the lowest code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PrioritySet(u8);

impl PrioritySet {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u8::MAX);

    pub const fn new_eq(priority: Priority) -> Self {
        Self(1u8 << priority.into_u8())
    }

    /// Levels with a code greater or equal to `priority` (same or less urgent)
    pub const fn new_ge(priority: Priority) -> Self {
        Self(u8::MAX << priority.into_u8())
    }

    /// Levels with a code less or equal to `priority` (same or more urgent)
    pub const fn new_le(priority: Priority) -> Self {
        Self(u8::MAX >> (Priority::MAX.into_u8() - priority.into_u8()))
    }

    pub const fn contains(&self, priority: Priority) -> bool {
        (self.0 >> priority.into_u8()) & 0x1 != 0
    }

    pub const fn insert(&mut self, priority: Priority) {
        self.0 |= Self::new_eq(priority).0
    }

    pub const fn remove(&mut self, priority: Priority) {
        self.0 &= !Self::new_eq(priority).0
    }

    pub const fn first(&self) -> Option<Priority> {
        Priority::try_from_u8(self.0.trailing_zeros() as u8)
    }

    pub const fn last(&self) -> Option<Priority> {
        let n = u8::BITS - self.0.leading_zeros();
        Priority::try_from_u8((n as u8).wrapping_sub(1))
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == Self::NONE.0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

impl core::ops::BitAnd<PrioritySet> for PrioritySet {
    type Output = Self;
    fn bitand(self, rhs: PrioritySet) -> Self::Output {
        PrioritySet(self.0 & rhs.0)
    }
}

impl core::ops::BitOr<PrioritySet> for PrioritySet {
    type Output = Self;
    fn bitor(self, rhs: PrioritySet) -> Self::Output {
        PrioritySet(self.0 | rhs.0)
    }
}

impl core::iter::IntoIterator for PrioritySet {
    type Item = Priority;
    type IntoIter = PrioritySetIter;
    fn into_iter(self) -> Self::IntoIter {
        PrioritySetIter { residual: self }
    }
}

/// Iterates from the most to the least urgent member
pub struct PrioritySetIter {
    residual: PrioritySet,
}

impl core::iter::Iterator for PrioritySetIter {
    type Item = Priority;
    fn next(&mut self) -> Option<Self::Item> {
        let first = self.residual.first();
        if let Some(priority) = first {
            self.residual.remove(priority);
        }
        first
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeId(u8);

impl NodeId {
    const MAX_VALUE: u8 = 0x7f;
    pub const MAX: NodeId = NodeId(Self::MAX_VALUE);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<NodeId> for u8 {
    fn from(value: NodeId) -> Self {
        value.into_u8()
    }
}

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        u8::from(value).into()
    }
}

impl TryFrom<u8> for NodeId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubjectId(u16);

impl SubjectId {
    const MAX_VALUE: u16 = 0x1fff;
    pub const MAX: SubjectId = SubjectId(Self::MAX_VALUE);

    pub const fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u16_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u16_truncating(value: u16) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u16(self) -> u16 {
        self.0
    }
}

impl From<SubjectId> for u16 {
    fn from(value: SubjectId) -> Self {
        value.into_u16()
    }
}

impl TryFrom<u16> for SubjectId {
    type Error = InvalidValue;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceId(u16);

impl ServiceId {
    const MAX_VALUE: u16 = 0x1ff;
    pub const MAX: ServiceId = ServiceId(Self::MAX_VALUE);

    pub const fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u16_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u16_truncating(value: u16) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u16(self) -> u16 {
        self.0
    }
}

impl From<ServiceId> for u16 {
    fn from(value: ServiceId) -> Self {
        value.into_u16()
    }
}

impl TryFrom<u16> for ServiceId {
    type Error = InvalidValue;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Port identifier together with the transfer kind
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataSpecifier {
    Message(SubjectId),
    Request(ServiceId),
    Response(ServiceId),
}

impl DataSpecifier {
    pub const fn is_service(&self) -> bool {
        !matches!(self, DataSpecifier::Message(_))
    }

    /// Raw subject or service identifier
    pub const fn port_id(&self) -> u16 {
        match self {
            DataSpecifier::Message(subject) => subject.into_u16(),
            DataSpecifier::Request(service) | DataSpecifier::Response(service) => {
                service.into_u16()
            }
        }
    }
}

/// Transfer sequence number, wrapping modulo 32 \[1; 4.1.1.7\]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferId(u8);

impl TransferId {
    const MAX_VALUE: u8 = 0x1f;
    const MODULO: u8 = Self::MAX_VALUE + 1;
    pub const MAX: TransferId = TransferId(Self::MAX_VALUE);

    /// TransferId of the first transfer in a session
    pub const SESSION_START: TransferId = TransferId(0);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self::from_u8_truncating(self.0 + 1)
    }

    /// Number of increments needed to get from `self` to `other`
    pub const fn forward_distance(self, other: TransferId) -> u8 {
        (other.0 + Self::MODULO - self.0) & Self::MAX_VALUE
    }

    /// True if `other` lies in the forward half of the wrapping sequence space
    pub const fn precedes(self, other: TransferId) -> bool {
        let distance = self.forward_distance(other);
        distance != 0 && distance < Self::MODULO / 2
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::SESSION_START
    }
}

impl From<TransferId> for u8 {
    fn from(value: TransferId) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for TransferId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}
