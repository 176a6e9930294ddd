//! Ping-pong storage for phases that read one snapshot and write another.

/// Two instances of `T` with a current (read) and next (write) role.
///
/// The roles only change through [`swap`](DoubleBuffer::swap), and
/// [`split`](DoubleBuffer::split) is the only way to hold both at once, so a
/// phase can never write the buffer it samples from.
#[derive(Clone, Debug)]
pub struct DoubleBuffer<T> {
    buffers: [T; 2],
    front: usize,
}

impl<T> DoubleBuffer<T> {
    pub fn new(current: T, next: T) -> Self {
        Self {
            buffers: [current, next],
            front: 0,
        }
    }

    /// The buffer readers sample from.
    pub fn current(&self) -> &T {
        &self.buffers[self.front]
    }

    /// The buffer the next phase writes into.
    pub fn next(&mut self) -> &mut T {
        &mut self.buffers[1 - self.front]
    }

    /// Read the current buffer while writing the next one.
    pub fn split(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.buffers;
        if self.front == 0 {
            (&*a, b)
        } else {
            (&*b, a)
        }
    }

    /// Exchange roles: what was written becomes current.
    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }

    /// Apply `f` to both buffers, e.g. to clear them.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for buffer in &mut self.buffers {
            f(buffer);
        }
    }
}

impl<T: Clone> DoubleBuffer<T> {
    /// Both roles start from copies of `value`.
    pub fn from_value(value: T) -> Self {
        Self::new(value.clone(), value)
    }
}
