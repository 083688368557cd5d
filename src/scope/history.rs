//! Bounded point history shared between the capture thread and the render loop.
//!
//! A fixed-capacity ring buffer: `head` is the next write slot, `count` the number of
//! valid points. Once full, each push overwrites the oldest point in place, so insertion
//! is O(1) and the storage never reallocates or shifts.

use parking_lot::Mutex;

use super::point::Point;

struct Ring {
    slots: Vec<Point>,
    head: usize,
    count: usize,
    total_pushed: u64,
}

impl Ring {
    fn push(&mut self, point: Point) {
        let capacity = self.slots.len();
        self.slots[self.head] = point;
        self.head = (self.head + 1) % capacity;
        if self.count < capacity {
            self.count += 1;
        }
        self.total_pushed += 1;
    }

    /// Index of the oldest valid point.
    fn tail(&self) -> usize {
        let capacity = self.slots.len();
        (self.head + capacity - self.count) % capacity
    }
}

/// Thread-safe ring buffer of the most recent points.
///
/// Every operation runs under one mutex. Readers copy the ordered sequence out while
/// holding the lock and draw afterwards, so the producer never waits on rendering.
pub struct PointHistory {
    ring: Mutex<Ring>,
    capacity: usize,
}

impl PointHistory {
    /// Creates a history holding at most `capacity` points. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Mutex::new(Ring {
                slots: vec![Point::default(); capacity],
                head: 0,
                count: 0,
                total_pushed: 0,
            }),
            capacity,
        }
    }

    pub fn push(&self, point: Point) {
        self.ring.lock().push(point);
    }

    /// Pushes a batch under a single lock acquisition.
    pub fn extend<I>(&self, points: I)
    where
        I: IntoIterator<Item = Point>,
    {
        let mut ring = self.ring.lock();
        for point in points {
            ring.push(point);
        }
    }

    /// Returns the stored points ordered oldest to newest.
    pub fn snapshot(&self) -> Vec<Point> {
        let mut out = Vec::with_capacity(self.capacity);
        self.snapshot_into(&mut out);
        out
    }

    /// Replaces the contents of `out` with the stored points, oldest to newest,
    /// reusing its allocation. Returns the number of points copied.
    pub fn snapshot_into(&self, out: &mut Vec<Point>) -> usize {
        out.clear();
        let ring = self.ring.lock();
        let tail = ring.tail();
        let first_len = ring.count.min(self.capacity - tail);
        out.extend_from_slice(&ring.slots[tail..tail + first_len]);
        out.extend_from_slice(&ring.slots[..ring.count - first_len]);
        ring.count
    }

    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of points pushed since construction, including evicted ones.
    pub fn total_pushed(&self) -> u64 {
        self.ring.lock().total_pushed
    }

    /// Drops all stored points. Capacity is unchanged.
    pub fn clear(&self) {
        let mut ring = self.ring.lock();
        ring.head = 0;
        ring.count = 0;
    }
}
