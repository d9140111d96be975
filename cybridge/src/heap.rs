//! Constant-time allocator over a fixed arena
//!
//! The arena is split into `UNITS` fragments of [`FRAGMENT_SIZE`] bytes. Free fragments are
//! kept in segregated lists, one per power-of-two size class, with a bitmask of non-empty
//! classes. A request is rounded up to a power-of-two number of units, so any fragment from
//! the smallest non-empty class at or above the request fits; finding it is a single
//! `trailing_zeros`. Freeing merges the block with both address neighbours. Neither
//! operation depends on the arena size or on the number of live blocks.
//!
//! The rounding bounds worst-case fragmentation: an arena of at least twice the peak live
//! size (in rounded units) never fails.
//!
//! The heap hands out [`Block`] handles instead of pointers. A handle is consumed by
//! [`Heap::deallocate`], so a block cannot be freed twice.

use core::cmp::max;

/// Allocation granularity in bytes
pub const FRAGMENT_SIZE: usize = 16;

const BIN_COUNT: usize = u16::BITS as usize;
const NIL: u16 = u16::MAX;

#[derive(Debug, Clone, Copy)]
struct Fragment {
    /// Fragment length in units; meaningful at fragment heads only
    units: u16,
    used: bool,
    /// Head of the preceding fragment in address order
    prev: u16,
    next_free: u16,
    prev_free: u16,
}

impl Fragment {
    const VACANT: Self = Self {
        units: 0,
        used: false,
        prev: NIL,
        next_free: NIL,
        prev_free: NIL,
    };
}

/// The arena cannot satisfy the request right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfMemory;

/// Heap usage counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Arena size in bytes
    pub capacity: usize,
    /// Bytes held by live blocks, including rounding
    pub allocated: usize,
    pub peak_allocated: usize,
    /// Largest request seen, successful or not
    pub peak_request_size: usize,
    pub live_blocks: usize,
    pub oom_count: u32,
}

/// Handle to an allocated block
///
/// Obtained from [`Heap::allocate`] and given back through [`Heap::deallocate`].
/// Dropping a handle leaks its block until the heap itself is dropped.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub struct Block {
    head: u16,
    units: u16,
    len: usize,
}

impl Block {
    /// Requested length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes reserved in the arena
    pub fn footprint(&self) -> usize {
        usize::from(self.units) * FRAGMENT_SIZE
    }
}

pub struct Heap<const UNITS: usize> {
    arena: [[u8; FRAGMENT_SIZE]; UNITS],
    fragments: [Fragment; UNITS],
    bins: [u16; BIN_COUNT],
    nonempty: u16,
    diagnostics: Diagnostics,
}

impl<const UNITS: usize> Heap<UNITS> {
    pub const CAPACITY: usize = UNITS * FRAGMENT_SIZE;

    pub fn new() -> Self {
        const { ::core::assert!(UNITS > 0 && UNITS < NIL as usize) };

        let mut heap = Self {
            arena: [[0; FRAGMENT_SIZE]; UNITS],
            fragments: [Fragment::VACANT; UNITS],
            bins: [NIL; BIN_COUNT],
            nonempty: 0,
            diagnostics: Diagnostics {
                capacity: Self::CAPACITY,
                ..Default::default()
            },
        };
        heap.fragments[0].units = UNITS as u16;
        heap.link_free(0);
        heap
    }

    pub fn allocate(&mut self, size: usize) -> Result<Block, OutOfMemory> {
        self.diagnostics.peak_request_size = max(self.diagnostics.peak_request_size, size);

        let units = match Self::rounded_units(size) {
            Some(units) => units,
            None => return Err(self.out_of_memory(size)),
        };
        let wanted_bin = units.trailing_zeros();
        let candidates = self.nonempty & (u16::MAX << wanted_bin);
        if candidates == 0 {
            return Err(self.out_of_memory(size));
        }

        let head = self.bins[candidates.trailing_zeros() as usize];
        self.unlink_free(head);

        let available = self.fragment(head).units;
        if available > units {
            let rest = head + units;
            let rest_units = available - units;
            *self.fragment_mut(rest) = Fragment {
                units: rest_units,
                prev: head,
                ..Fragment::VACANT
            };
            self.set_prev_of_following(rest);
            self.fragment_mut(head).units = units;
            self.link_free(rest);
        }
        self.fragment_mut(head).used = true;

        let block = Block {
            head,
            units,
            len: size,
        };
        let diagnostics = &mut self.diagnostics;
        diagnostics.allocated += block.footprint();
        diagnostics.peak_allocated = max(diagnostics.peak_allocated, diagnostics.allocated);
        diagnostics.live_blocks += 1;
        Ok(block)
    }

    pub fn deallocate(&mut self, block: Block) {
        let mut head = block.head;
        debug_assert!(self.fragment(head).used);
        debug_assert!(self.fragment(head).units == block.units);

        let mut units = self.fragment(head).units;
        self.fragment_mut(head).used = false;

        let next = usize::from(head) + usize::from(units);
        if next < UNITS && !self.fragments[next].used {
            let next = next as u16;
            self.unlink_free(next);
            units += self.fragment(next).units;
        }

        let prev = self.fragment(head).prev;
        if prev != NIL && !self.fragment(prev).used {
            self.unlink_free(prev);
            units += self.fragment(prev).units;
            head = prev;
        }

        self.fragment_mut(head).units = units;
        self.set_prev_of_following(head);
        self.link_free(head);

        self.diagnostics.allocated -= block.footprint();
        self.diagnostics.live_blocks -= 1;
    }

    pub fn bytes(&self, block: &Block) -> &[u8] {
        let start = usize::from(block.head) * FRAGMENT_SIZE;
        &self.arena.as_flattened()[start..start + block.len]
    }

    pub fn bytes_mut(&mut self, block: &Block) -> &mut [u8] {
        let start = usize::from(block.head) * FRAGMENT_SIZE;
        &mut self.arena.as_flattened_mut()[start..start + block.len]
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    fn rounded_units(size: usize) -> Option<u16> {
        let units = max(1, size.div_ceil(FRAGMENT_SIZE)).checked_next_power_of_two()?;
        if units <= UNITS {
            u16::try_from(units).ok()
        } else {
            None
        }
    }

    fn out_of_memory(&mut self, size: usize) -> OutOfMemory {
        self.diagnostics.oom_count = self.diagnostics.oom_count.saturating_add(1);
        trace!("heap: no room for {} bytes", size);
        OutOfMemory
    }

    fn fragment(&self, head: u16) -> &Fragment {
        &self.fragments[usize::from(head)]
    }

    fn fragment_mut(&mut self, head: u16) -> &mut Fragment {
        &mut self.fragments[usize::from(head)]
    }

    fn set_prev_of_following(&mut self, head: u16) {
        let following = usize::from(head) + usize::from(self.fragment(head).units);
        if following < UNITS {
            self.fragments[following].prev = head;
        }
    }

    fn bin_index(units: u16) -> usize {
        (u16::BITS - 1 - units.leading_zeros()) as usize
    }

    fn link_free(&mut self, head: u16) {
        let bin = Self::bin_index(self.fragment(head).units);
        let first = self.bins[bin];
        let fragment = self.fragment_mut(head);
        fragment.next_free = first;
        fragment.prev_free = NIL;
        if first != NIL {
            self.fragment_mut(first).prev_free = head;
        }
        self.bins[bin] = head;
        self.nonempty |= 1 << bin;
    }

    fn unlink_free(&mut self, head: u16) {
        let Fragment {
            units,
            next_free,
            prev_free,
            ..
        } = *self.fragment(head);
        let bin = Self::bin_index(units);

        if prev_free != NIL {
            self.fragment_mut(prev_free).next_free = next_free;
        } else {
            self.bins[bin] = next_free;
        }
        if next_free != NIL {
            self.fragment_mut(next_free).prev_free = prev_free;
        }
        if self.bins[bin] == NIL {
            self.nonempty &= !(1 << bin);
        }
    }
}

impl<const UNITS: usize> Default for Heap<UNITS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl<const UNITS: usize> Heap<UNITS> {
    /// Walks the fragment chain and checks that it tiles the arena
    fn check_layout(&self) {
        let mut head = 0usize;
        let mut prev = NIL;
        let mut prev_free = false;
        let mut used_units = 0usize;
        while head < UNITS {
            let fragment = &self.fragments[head];
            assert!(fragment.units > 0);
            assert_eq!(fragment.prev, prev);
            assert!(fragment.used || !prev_free, "adjacent free fragments");
            if fragment.used {
                used_units += usize::from(fragment.units);
            }
            prev_free = !fragment.used;
            prev = head as u16;
            head += usize::from(fragment.units);
        }
        assert_eq!(head, UNITS);
        assert_eq!(used_units * FRAGMENT_SIZE, self.diagnostics.allocated);
    }
}
