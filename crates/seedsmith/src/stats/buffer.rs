use std::ops::Deref;

/// Keeps the last `capacity` items, overwriting the oldest one
pub struct CircularBuffer<T> {
    pos: usize,
    capacity: usize,
    inner: Vec<T>,
}

impl<T> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CircularBuffer {
            pos: 0,
            capacity,
            inner: Vec::with_capacity(capacity),
        }
    }

    pub fn push_back(&mut self, item: T) {
        if self.inner.len() < self.capacity {
            self.inner.push(item);
        } else {
            self.inner[self.pos] = item;
        }

        self.pos = (self.pos + 1) % self.capacity;
    }
}

impl<T> Deref for CircularBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
