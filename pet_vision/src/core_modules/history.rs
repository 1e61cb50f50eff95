use std::collections::VecDeque;

/// Capacity used for both the client-local buffer and the hub history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Append-only FIFO that evicts its oldest entry once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        self.entries.push_back(value);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    /// The last `n` entries in arrival order.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &T> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }
}

impl<T> Default for BoundedHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_entries_in_arrival_order() {
        let mut history = BoundedHistory::new(DEFAULT_HISTORY_CAPACITY);
        for i in 0..1500 {
            history.push(i);
        }
        assert_eq!(history.len(), 1000);
        let kept: Vec<i32> = history.iter().copied().collect();
        let expected: Vec<i32> = (500..1500).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn tail_returns_newest_suffix() {
        let mut history = BoundedHistory::new(10);
        for i in 0..5 {
            history.push(i);
        }
        assert_eq!(history.tail(3).copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(history.tail(100).count(), 5);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut history = BoundedHistory::new(0);
        history.push("a");
        history.push("b");
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec!["b"]);
    }
}
