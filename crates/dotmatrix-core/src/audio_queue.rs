use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Single-producer / single-consumer ring buffer of stereo f32 frames.
///
/// Intended for the emulator thread (producer) feeding an audio callback
/// thread (consumer) without locks. Capacity is rounded up to a power of two
/// so slot lookup is an index mask; head and tail are free-running counters,
/// which makes `head == tail` empty and `head - tail == capacity` full.
///
/// This queue is *lossy* when full: new pushes are dropped. The consumer
/// substitutes silence when the queue runs dry.
pub struct AudioProducer {
    inner: Arc<Inner>,
}

pub struct AudioConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    buf: Box<[UnsafeCell<[f32; 2]>]>,
    mask: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// Safe because:
// - Only the producer writes to `buf[head]`.
// - Only the consumer reads from `buf[tail]`.
// - All coordination happens through the head/tail atomics.
unsafe impl Sync for Inner {}
unsafe impl Send for Inner {}

pub fn audio_queue(capacity_frames: usize) -> (AudioProducer, AudioConsumer) {
    let cap = capacity_frames.next_power_of_two().max(2);
    let mut v: Vec<UnsafeCell<[f32; 2]>> = Vec::with_capacity(cap);
    for _ in 0..cap {
        v.push(UnsafeCell::new([0.0, 0.0]));
    }

    let inner = Arc::new(Inner {
        buf: v.into_boxed_slice(),
        mask: cap - 1,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
    });

    (
        AudioProducer {
            inner: Arc::clone(&inner),
        },
        AudioConsumer { inner },
    )
}

impl Inner {
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }
}

impl AudioProducer {
    /// Enqueue one stereo frame. Returns false (dropping the frame) when the
    /// queue is full.
    #[inline]
    pub fn push_stereo(&self, left: f32, right: f32) -> bool {
        let head = self.inner.head.load(Ordering::Relaxed);
        let tail = self.inner.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == self.inner.buf.len() {
            return false;
        }

        unsafe {
            *self.inner.buf[head & self.inner.mask].get() = [left, right];
        }
        self.inner.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.inner.buf.len()
    }
}

impl AudioConsumer {
    /// Dequeue one stereo frame, or None when the queue is empty.
    #[inline]
    pub fn pop_stereo(&self) -> Option<(f32, f32)> {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let head = self.inner.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        let frame = unsafe { *self.inner.buf[tail & self.inner.mask].get() };
        self.inner.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some((frame[0], frame[1]))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.inner.buf.len()
    }
}
