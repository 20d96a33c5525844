//! Single-producer/single-consumer ring of interleaved samples.
//!
//! The ring decouples an input device's callback cadence from the output
//! device's. It never blocks and never fails:
//!
//! - `write` always advances the write cursor by the full block, silently
//!   overwriting unread samples when the producer runs ahead.
//! - `read` always returns the requested count, handing back stale (or
//!   initial zero) samples when the consumer runs ahead.
//!
//! Both cursors live in `[0, capacity)`. There is no full/empty flag, so
//! `available` is ambiguous once a full capacity is outstanding; callers size
//! the ring at several callback periods to stay clear of that.
//!
//! Samples are stored as `f32` bit patterns in `AtomicU32` slots, so an
//! overrun that races the reader yields a mix of old and new samples rather
//! than undefined behavior.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

struct Ring {
    slots: Box<[AtomicU32]>,
    read_pos: CachePadded<AtomicUsize>,
    write_pos: CachePadded<AtomicUsize>,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        distance(read, write, self.capacity())
    }
}

#[inline]
fn distance(read: usize, write: usize, capacity: usize) -> usize {
    if write >= read {
        write - read
    } else {
        capacity - read + write
    }
}

/// Create a ring holding `capacity` samples, split into its two halves.
///
/// A zero capacity is raised to one slot.
pub fn ring_buffer(capacity: usize) -> (RingProducer, RingConsumer) {
    let capacity = capacity.max(1);
    let slots = (0..capacity)
        .map(|_| AtomicU32::new(0.0f32.to_bits()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let ring = Arc::new(Ring {
        slots,
        read_pos: CachePadded::new(AtomicUsize::new(0)),
        write_pos: CachePadded::new(AtomicUsize::new(0)),
    });

    (
        RingProducer {
            ring: Arc::clone(&ring),
        },
        RingConsumer { ring },
    )
}

/// Writing half. Lives in an input device callback.
pub struct RingProducer {
    ring: Arc<Ring>,
}

impl RingProducer {
    /// Append every sample of `block`, advancing the write cursor unconditionally.
    pub fn write(&mut self, block: &[f32]) {
        let ring = &*self.ring;
        let capacity = ring.capacity();
        let mut pos = ring.write_pos.load(Ordering::Relaxed);

        for &sample in block {
            ring.slots[pos].store(sample.to_bits(), Ordering::Relaxed);
            pos += 1;
            if pos == capacity {
                pos = 0;
            }
        }

        ring.write_pos.store(pos, Ordering::Release);
    }

    /// Samples between the read and write cursors.
    pub fn available(&self) -> usize {
        self.ring.available()
    }

    /// Total slots in the ring.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Reading half. Lives in the output device callback.
pub struct RingConsumer {
    ring: Arc<Ring>,
}

impl RingConsumer {
    /// Fill `out` from the read cursor, advancing it by `out.len()`.
    ///
    /// Never waits for data: slots the producer has not reached yet are
    /// returned as they are.
    pub fn read(&mut self, out: &mut [f32]) {
        let ring = &*self.ring;
        let capacity = ring.capacity();
        // Acquire pairs with the producer's release store of the write cursor.
        let _published = ring.write_pos.load(Ordering::Acquire);
        let mut pos = ring.read_pos.load(Ordering::Relaxed);

        for sample in out.iter_mut() {
            *sample = f32::from_bits(ring.slots[pos].load(Ordering::Relaxed));
            pos += 1;
            if pos == capacity {
                pos = 0;
            }
        }

        ring.read_pos.store(pos, Ordering::Release);
    }

    /// Samples between the read and write cursors.
    pub fn available(&self) -> usize {
        self.ring.available()
    }

    /// Total slots in the ring.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_returns_written_block() {
        let (mut producer, mut consumer) = ring_buffer(16);
        let block = [0.1, -0.2, 0.3, -0.4, 0.5];
        producer.write(&block);
        assert_eq!(consumer.available(), 5);

        let mut out = [0.0; 5];
        consumer.read(&mut out);
        assert_eq!(out, block);
        assert_eq!(consumer.available(), 0);
    }

    #[test]
    fn test_underrun_returns_zeroed_slots() {
        let (mut producer, mut consumer) = ring_buffer(8);
        producer.write(&[0.7, 0.7]);

        let mut out = [1.0; 4];
        consumer.read(&mut out);
        assert_eq!(out, [0.7, 0.7, 0.0, 0.0]);
    }

    #[test]
    fn test_cursors_wrap() {
        let (mut producer, mut consumer) = ring_buffer(4);
        let mut out = [0.0; 3];

        producer.write(&[1.0, 2.0, 3.0]);
        consumer.read(&mut out);
        producer.write(&[4.0, 5.0, 6.0]);
        assert_eq!(producer.available(), 3);

        consumer.read(&mut out);
        assert_eq!(out, [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_overrun_overwrites_oldest() {
        let (mut producer, mut consumer) = ring_buffer(4);
        producer.write(&[1.0, 2.0, 3.0]);
        producer.write(&[4.0, 5.0, 6.0]);

        // Write cursor lapped the reader: positions 0 and 1 hold 5.0 and 6.0.
        assert_eq!(consumer.available(), 2);
        let mut out = [0.0; 4];
        consumer.read(&mut out);
        assert_eq!(out, [5.0, 6.0, 3.0, 4.0]);
    }

    #[test]
    fn test_available_wraps_modulo_capacity() {
        assert_eq!(distance(0, 0, 10), 0);
        assert_eq!(distance(2, 7, 10), 5);
        assert_eq!(distance(7, 2, 10), 5);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (mut producer, mut consumer) = ring_buffer(0);
        assert_eq!(producer.capacity(), 1);
        producer.write(&[0.25]);
        let mut out = [0.0; 1];
        consumer.read(&mut out);
        assert_eq!(out, [0.25]);
    }

    #[test]
    fn test_concurrent_producer_and_consumer() {
        let (mut producer, mut consumer) = ring_buffer(4096);
        let writer = std::thread::spawn(move || {
            for i in 0..256 {
                producer.write(&[i as f32; 8]);
            }
        });

        let mut out = [0.0; 8];
        for _ in 0..256 {
            consumer.read(&mut out);
            assert!(out.iter().all(|s| s.is_finite()));
        }
        writer.join().unwrap();
    }
}
