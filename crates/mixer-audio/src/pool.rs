//! Preallocated scratch blocks for the mixing callback.

use std::ops::{Deref, DerefMut};

/// A fixed-length block of interleaved samples.
#[derive(Debug)]
pub struct SampleBlock {
    samples: Box<[f32]>,
}

impl SampleBlock {
    /// Allocate a silent block.
    pub fn zeroed(len: usize) -> Self {
        Self {
            samples: vec![0.0; len].into_boxed_slice(),
        }
    }
}

impl Deref for SampleBlock {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.samples
    }
}

impl DerefMut for SampleBlock {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }
}

/// Free-list room reserved beyond the preallocated blocks.
const SPARE_SLOTS: usize = 4;

/// Pool of same-size sample blocks, lent out by value.
///
/// Handing a block out moves it, so a block is never held by two callers.
/// Blocks come back zeroed.
pub struct SamplePool {
    block_len: usize,
    free: Vec<SampleBlock>,
}

impl SamplePool {
    /// Create a pool of `preallocated` blocks of `block_len` samples.
    ///
    /// The free list reserves room for a few blocks beyond the preallocated
    /// ones, so keeping blocks allocated on a cold start rarely grows it.
    pub fn new(block_len: usize, preallocated: usize) -> Self {
        let block_len = block_len.max(1);
        let mut free = Vec::with_capacity(preallocated + SPARE_SLOTS);
        free.extend((0..preallocated).map(|_| SampleBlock::zeroed(block_len)));
        Self { block_len, free }
    }

    /// Samples per block.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Blocks currently available without allocating.
    pub fn free_blocks(&self) -> usize {
        self.free.len()
    }

    /// Take a block, allocating a fresh one only if the pool is empty.
    pub fn acquire(&mut self) -> SampleBlock {
        self.free
            .pop()
            .unwrap_or_else(|| SampleBlock::zeroed(self.block_len))
    }

    /// Zero `block` and return it to the pool.
    ///
    /// Blocks of a foreign size are dropped instead of kept.
    pub fn release(&mut self, mut block: SampleBlock) {
        if block.len() != self.block_len {
            return;
        }
        block.fill(0.0);
        self.free.push(block);
    }
}
