use crate::utils::DuplexArray;

struct Link {
    next: u8,
    prev: u8,
}

pub const MAX_CAPACITY: usize = u8::MAX as usize + 1;

/// Set of circular doubly-linked lists over a fixed index space
///
/// Every index starts as a single-element cycle.
struct CycleLists<const N1: usize, const N2: usize> {
    links: DuplexArray<Link, N1, N2>,
}

impl<const N1: usize, const N2: usize> CycleLists<N1, N2> {
    pub fn new() -> Self {
        const { ::core::assert!(N1 + N2 <= MAX_CAPACITY) };
        Self {
            links: DuplexArray::from_fn(|i| {
                let index = unwrap!(u8::try_from(i));
                Link {
                    next: index,
                    prev: index,
                }
            }),
        }
    }

    pub fn next(&self, index: u8) -> u8 {
        self.links[usize::from(index)].next
    }

    pub fn prev(&self, index: u8) -> u8 {
        self.links[usize::from(index)].prev
    }

    pub fn detach(&mut self, index: u8) {
        let Link { next, prev } = self.links[usize::from(index)];
        self.links[usize::from(index)] = Link {
            next: index,
            prev: index,
        };
        self.links[usize::from(next)].prev = prev;
        self.links[usize::from(prev)].next = next;
    }

    pub fn insert_after(&mut self, index: u8, prev: u8) {
        self.detach(index);

        let next = self.links[usize::from(prev)].next;
        self.links[usize::from(index)] = Link { next, prev };
        self.links[usize::from(next)].prev = index;
        self.links[usize::from(prev)].next = index;
    }

    pub fn insert_before(&mut self, index: u8, next: u8) {
        self.detach(index);
        let prev = self.links[usize::from(next)].prev;
        self.insert_after(index, prev);
    }
}

/// Entries distributed among `CLASS_COUNT` ordered queues
///
/// Each entry belongs to exactly one class. Classes occupy the first indices of the link
/// space and act as list heads.
pub struct MultiClassQueue<const CLASS_COUNT: usize, const ENTRY_COUNT: usize> {
    lists: CycleLists<CLASS_COUNT, ENTRY_COUNT>,
}

impl<const CLASS_COUNT: usize, const ENTRY_COUNT: usize> MultiClassQueue<CLASS_COUNT, ENTRY_COUNT> {
    const ENTRY_OFFSET: u8 = CLASS_COUNT as u8;

    pub fn new() -> Self {
        Self {
            lists: CycleLists::new(),
        }
    }

    fn entry(&self, index: u8) -> Option<u8> {
        index.checked_sub(Self::ENTRY_OFFSET)
    }

    pub fn front(&self, class: u8) -> Option<u8> {
        debug_assert!(usize::from(class) < CLASS_COUNT);
        self.entry(self.lists.next(class))
    }

    pub fn back(&self, class: u8) -> Option<u8> {
        debug_assert!(usize::from(class) < CLASS_COUNT);
        self.entry(self.lists.prev(class))
    }

    pub fn is_empty(&self, class: u8) -> bool {
        self.front(class).is_none()
    }

    /// Entry following `entry` in its class
    pub fn next(&self, entry: u8) -> Option<u8> {
        debug_assert!(usize::from(entry) < ENTRY_COUNT);
        self.entry(self.lists.next(Self::ENTRY_OFFSET + entry))
    }

    /// Entry preceding `entry` in its class
    pub fn prev(&self, entry: u8) -> Option<u8> {
        debug_assert!(usize::from(entry) < ENTRY_COUNT);
        self.entry(self.lists.prev(Self::ENTRY_OFFSET + entry))
    }

    pub fn push_front(&mut self, class: u8, entry: u8) {
        debug_assert!(usize::from(class) < CLASS_COUNT);
        debug_assert!(usize::from(entry) < ENTRY_COUNT);
        self.lists.insert_after(Self::ENTRY_OFFSET + entry, class);
    }

    pub fn push_back(&mut self, class: u8, entry: u8) {
        debug_assert!(usize::from(class) < CLASS_COUNT);
        debug_assert!(usize::from(entry) < ENTRY_COUNT);
        self.lists.insert_before(Self::ENTRY_OFFSET + entry, class);
    }

    /// Moves `entry` right behind `anchor`, into the class of `anchor`
    pub fn insert_after(&mut self, anchor: u8, entry: u8) {
        debug_assert!(usize::from(anchor) < ENTRY_COUNT);
        debug_assert!(usize::from(entry) < ENTRY_COUNT);
        self.lists
            .insert_after(Self::ENTRY_OFFSET + entry, Self::ENTRY_OFFSET + anchor);
    }
}
