use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Receive-pending flag shared between a CAN interrupt and the node mainloop
///
/// The interrupt handler only calls [`RxSignal::raise`]. The mainloop clears the flag with
/// [`RxSignal::take`] before draining the link, so a frame arriving during the drain raises
/// it again. Both run under `M`; with `CriticalSectionRawMutex` the check-and-clear cannot
/// interleave with the interrupt.
pub struct RxSignal<M: RawMutex> {
    pending: Mutex<M, Cell<bool>>,
}

impl<M: RawMutex> RxSignal<M> {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::const_new(M::INIT, Cell::new(false)),
        }
    }

    pub fn raise(&self) {
        self.pending.lock(|pending| pending.set(true));
    }

    /// Clears the flag and returns its previous state
    pub fn take(&self) -> bool {
        self.pending.lock(|pending| pending.replace(false))
    }

    pub fn is_raised(&self) -> bool {
        self.pending.lock(|pending| pending.get())
    }
}

impl<M: RawMutex> Default for RxSignal<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    #[test]
    fn test_take_clears() {
        static SIGNAL: RxSignal<CriticalSectionRawMutex> = RxSignal::new();
        assert!(!SIGNAL.take());
        SIGNAL.raise();
        SIGNAL.raise();
        assert!(SIGNAL.is_raised());
        assert!(SIGNAL.take());
        assert!(!SIGNAL.is_raised());
        assert!(!SIGNAL.take());
    }
}
