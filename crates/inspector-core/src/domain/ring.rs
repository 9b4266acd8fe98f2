//! Fixed-capacity FIFO buffer.
//!
//! Both the live log view and the network capture keep a bounded history of
//! what the peer reported.  When a new item arrives at capacity, the oldest
//! item is evicted: eviction is strictly by insertion order.

use std::collections::VecDeque;

/// A ring buffer that evicts its oldest element when full.
///
/// # Examples
///
/// ```rust
/// use inspector_core::RingBuffer;
///
/// let mut ring = RingBuffer::new(2);
/// ring.push(1);
/// ring.push(2);
/// assert_eq!(ring.push(3), Some(1));
/// assert_eq!(ring.to_vec(), vec![2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` items.
    ///
    /// A capacity of 0 is raised to 1 so the newest item is always visible.
    /// Storage grows with the items actually pushed, so a large `capacity`
    /// costs nothing up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends `item`, returning the evicted oldest item if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Maximum number of items retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently stored.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Returns the most recently inserted item.
    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the contents into a `Vec`, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
