//! The mixing pass run from the output device callback.

use std::sync::Arc;
use std::time::Instant;

use crate::meter::rms;
use crate::params::{InputChannel, MixerParams};
use crate::pool::SamplePool;
use crate::ring::RingConsumer;

/// Samples at or below this magnitude pass through the clipper untouched.
const KNEE_START: f32 = 0.9;

/// Headroom above the knee that the tanh curve compresses into.
const KNEE_RANGE: f32 = 0.1;

/// Steepness of the knee curve.
const KNEE_DRIVE: f32 = 5.0;

/// Soft clipping to prevent harsh digital clipping.
///
/// Linear in `[-0.9, 0.9]`, a tanh knee up to full scale, and hard limits at
/// ±1.0. NaN becomes silence.
#[inline]
pub fn soft_clip(sample: f32) -> f32 {
    if sample.is_nan() {
        0.0
    } else if sample >= 1.0 {
        1.0
    } else if sample <= -1.0 {
        -1.0
    } else if sample > KNEE_START {
        KNEE_START + KNEE_RANGE * ((sample - KNEE_START) * KNEE_DRIVE).tanh()
    } else if sample < -KNEE_START {
        -KNEE_START + KNEE_RANGE * ((sample + KNEE_START) * KNEE_DRIVE).tanh()
    } else {
        sample
    }
}

/// Combines the two input rings into the output block.
///
/// Owned by the output callback. Scratch space comes from the pool, so a pass
/// never allocates.
pub struct MixingEngine {
    input1: Option<RingConsumer>,
    input2: Option<RingConsumer>,
    pool: SamplePool,
    params: Arc<MixerParams>,
}

impl MixingEngine {
    /// Create an engine draining the given rings. A missing ring is silence.
    pub fn new(
        input1: Option<RingConsumer>,
        input2: Option<RingConsumer>,
        pool: SamplePool,
        params: Arc<MixerParams>,
    ) -> Self {
        Self {
            input1,
            input2,
            pool,
            params,
        }
    }

    /// Fill `out` with the mix and publish output level and processing time.
    ///
    /// Blocks longer than one pool block are mixed in pool-sized slices.
    pub fn process(&mut self, out: &mut [f32]) {
        let started = Instant::now();

        let gain1 = self.params.effective_gain(InputChannel::Input1);
        let gain2 = self.params.effective_gain(InputChannel::Input2);
        let master = self.params.master_gain();

        let block_len = self.pool.block_len();
        for chunk in out.chunks_mut(block_len) {
            self.mix_chunk(chunk, gain1, gain2, master);
        }

        self.params.publish_output_level(rms(out));
        self.params.publish_latency(started.elapsed());
    }

    fn mix_chunk(&mut self, out: &mut [f32], gain1: f32, gain2: f32, master: f32) {
        let len = out.len();
        let mut scratch1 = self.pool.acquire();
        let mut scratch2 = self.pool.acquire();

        // Pool blocks come back zeroed, so a missing input stays silent.
        if let Some(ring) = self.input1.as_mut() {
            ring.read(&mut scratch1[..len]);
        }
        if let Some(ring) = self.input2.as_mut() {
            ring.read(&mut scratch2[..len]);
        }

        for ((sample, &a), &b) in out.iter_mut().zip(scratch1.iter()).zip(scratch2.iter()) {
            *sample = soft_clip((a * gain1 + b * gain2) * master);
        }

        self.pool.release(scratch1);
        self.pool.release(scratch2);
    }
}
