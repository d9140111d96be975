use crate::core::{Priority, PrioritySet};
use crate::utils::multi_class_queue::{self, MultiClassQueue};

const PRIORITY_CLASS: u8 = 0;
const FREE_CLASS: u8 = PRIORITY_CLASS + Priority::MAX.into_u8() + 1;
const CLASS_COUNT: usize = FREE_CLASS as usize + 1;

pub const MAX_CAPACITY: usize = multi_class_queue::MAX_CAPACITY - CLASS_COUNT;

/// Bounded queue ordered by priority, then by key, then by insertion
///
/// Each priority level keeps its own key-sorted list. Insertion walks the level list from
/// the back, so pushing keys in non-decreasing order is O(1).
pub struct DeadlineQueue<K, V, const N: usize> {
    links: MultiClassQueue<CLASS_COUNT, N>,
    slots: [Option<(K, V)>; N],
    priorities: PrioritySet,
    len: usize,
}

impl<K: Ord + Copy, V, const N: usize> DeadlineQueue<K, V, N> {
    pub fn new() -> Self {
        const { ::core::assert!(N <= MAX_CAPACITY) };

        let mut links = MultiClassQueue::new();
        for i in 0..N {
            links.push_back(FREE_CLASS, unwrap!(u8::try_from(i)));
        }
        Self {
            links,
            slots: core::array::from_fn(|_| None),
            priorities: PrioritySet::NONE,
            len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn free_count(&self) -> usize {
        N - self.len
    }

    /// Priority levels holding at least one entry
    pub fn priorities(&self) -> PrioritySet {
        self.priorities
    }

    pub fn push(&mut self, priority: Priority, key: K, value: V) -> Result<(), V> {
        let Some(entry) = self.links.front(FREE_CLASS) else {
            return Err(value);
        };
        let class = PRIORITY_CLASS + u8::from(priority);

        let mut anchor = self.links.back(class);
        while let Some(index) = anchor {
            match &self.slots[usize::from(index)] {
                Some((anchor_key, _)) if *anchor_key > key => anchor = self.links.prev(index),
                _ => break,
            }
        }
        match anchor {
            Some(index) => self.links.insert_after(index, entry),
            None => self.links.push_front(class, entry),
        }

        self.slots[usize::from(entry)] = Some((key, value));
        self.priorities.insert(priority);
        self.len += 1;
        Ok(())
    }

    /// Most urgent entry: highest priority, then smallest key
    pub fn peek(&self) -> Option<(Priority, &K, &V)> {
        let priority = self.priorities.first()?;
        self.peek_level(priority).map(|(key, value)| (priority, key, value))
    }

    pub fn pop(&mut self) -> Option<(K, V)> {
        let priority = self.priorities.first()?;
        self.pop_level(priority)
    }

    pub fn peek_level(&self, priority: Priority) -> Option<(&K, &V)> {
        let entry = self.links.front(PRIORITY_CLASS + u8::from(priority))?;
        self.slots[usize::from(entry)]
            .as_ref()
            .map(|(key, value)| (key, value))
    }

    pub fn pop_level(&mut self, priority: Priority) -> Option<(K, V)> {
        let class = PRIORITY_CLASS + u8::from(priority);
        let entry = self.links.front(class)?;
        self.links.push_back(FREE_CLASS, entry);
        if self.links.is_empty(class) {
            self.priorities.remove(priority);
        }
        self.len -= 1;
        self.slots[usize::from(entry)].take()
    }
}

impl<K: Ord + Copy, V, const N: usize> Default for DeadlineQueue<K, V, N> {
    fn default() -> Self {
        Self::new()
    }
}
