//! Lock-free gain parameters and telemetry.
//!
//! Every field is an independent atomic scalar. Writers publish with a single
//! store and readers observe with a single load; there is no cross-field
//! consistency, which is fine for control-knob and meter semantics.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crate::{MAX_GAIN, MIN_GAIN};

/// An `f32` stored as its bit pattern.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    #[inline]
    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }
}

/// Clamp a gain into the accepted range. NaN maps to silence.
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        return MIN_GAIN;
    }
    gain.clamp(MIN_GAIN, MAX_GAIN)
}

/// Identifies one of the two mixer inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChannel {
    Input1,
    Input2,
}

#[derive(Debug)]
struct InputParams {
    gain: AtomicF32,
    muted: AtomicBool,
    level: AtomicF32,
}

impl InputParams {
    fn new(gain: f32) -> Self {
        Self {
            gain: AtomicF32::new(clamp_gain(gain)),
            muted: AtomicBool::new(false),
            level: AtomicF32::new(0.0),
        }
    }
}

/// Gains, mutes and telemetry shared between control, monitoring and audio threads.
#[derive(Debug)]
pub struct MixerParams {
    input1: InputParams,
    input2: InputParams,
    master_gain: AtomicF32,
    output_level: AtomicF32,
    latency_ns: AtomicU64,
}

impl MixerParams {
    /// Create parameters with the given initial gains, clamped.
    pub fn new(input1_gain: f32, input2_gain: f32, master_gain: f32) -> Self {
        Self {
            input1: InputParams::new(input1_gain),
            input2: InputParams::new(input2_gain),
            master_gain: AtomicF32::new(clamp_gain(master_gain)),
            output_level: AtomicF32::new(0.0),
            latency_ns: AtomicU64::new(0),
        }
    }

    fn input(&self, channel: InputChannel) -> &InputParams {
        match channel {
            InputChannel::Input1 => &self.input1,
            InputChannel::Input2 => &self.input2,
        }
    }

    /// Set input 1 gain, clamped to 0.0 - 2.0.
    pub fn set_input1_gain(&self, gain: f32) {
        self.set_input_gain(InputChannel::Input1, gain);
    }

    /// Set input 2 gain, clamped to 0.0 - 2.0.
    pub fn set_input2_gain(&self, gain: f32) {
        self.set_input_gain(InputChannel::Input2, gain);
    }

    /// Set the gain of either input, clamped to 0.0 - 2.0.
    pub fn set_input_gain(&self, channel: InputChannel, gain: f32) {
        self.input(channel)
            .gain
            .store(clamp_gain(gain), Ordering::Relaxed);
    }

    /// Set master gain, clamped to 0.0 - 2.0.
    pub fn set_master_gain(&self, gain: f32) {
        self.master_gain.store(clamp_gain(gain), Ordering::Relaxed);
    }

    pub fn input1_gain(&self) -> f32 {
        self.input_gain(InputChannel::Input1)
    }

    pub fn input2_gain(&self) -> f32 {
        self.input_gain(InputChannel::Input2)
    }

    pub fn input_gain(&self, channel: InputChannel) -> f32 {
        self.input(channel).gain.load(Ordering::Relaxed)
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain.load(Ordering::Relaxed)
    }

    /// Mute or unmute an input. A muted input still reports its level.
    pub fn set_input_muted(&self, channel: InputChannel, muted: bool) {
        self.input(channel).muted.store(muted, Ordering::Relaxed);
    }

    pub fn is_input_muted(&self, channel: InputChannel) -> bool {
        self.input(channel).muted.load(Ordering::Relaxed)
    }

    /// Gain applied at mix time: zero while muted.
    #[inline]
    pub(crate) fn effective_gain(&self, channel: InputChannel) -> f32 {
        if self.is_input_muted(channel) {
            0.0
        } else {
            self.input_gain(channel)
        }
    }

    /// RMS level of input 1 before gain.
    pub fn input1_level(&self) -> f32 {
        self.input_level(InputChannel::Input1)
    }

    /// RMS level of input 2 before gain.
    pub fn input2_level(&self) -> f32 {
        self.input_level(InputChannel::Input2)
    }

    pub fn input_level(&self, channel: InputChannel) -> f32 {
        self.input(channel).level.load(Ordering::Relaxed)
    }

    /// RMS level of the last mixed block.
    pub fn output_level(&self) -> f32 {
        self.output_level.load(Ordering::Relaxed)
    }

    /// Time spent in the last mixing pass.
    pub fn processing_latency(&self) -> Duration {
        Duration::from_nanos(self.latency_ns.load(Ordering::Relaxed))
    }

    pub(crate) fn publish_input_level(&self, channel: InputChannel, level: f32) {
        self.input(channel).level.store(level, Ordering::Relaxed);
    }

    pub(crate) fn publish_output_level(&self, level: f32) {
        self.output_level.store(level, Ordering::Relaxed);
    }

    pub(crate) fn publish_latency(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.latency_ns.store(nanos, Ordering::Relaxed);
    }

    /// Zero every telemetry value. Gains and mutes are kept.
    pub(crate) fn reset_telemetry(&self) {
        self.publish_input_level(InputChannel::Input1, 0.0);
        self.publish_input_level(InputChannel::Input2, 0.0);
        self.publish_output_level(0.0);
        self.latency_ns.store(0, Ordering::Relaxed);
    }
}

impl Default for MixerParams {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn stored_gain_is_clamped(gain in -10.0f32..10.0) {
            let params = MixerParams::default();
            params.set_input1_gain(gain);
            params.set_input2_gain(gain);
            params.set_master_gain(gain);

            let expected = gain.clamp(0.0, 2.0);
            prop_assert_eq!(params.input1_gain(), expected);
            prop_assert_eq!(params.input2_gain(), expected);
            prop_assert_eq!(params.master_gain(), expected);
        }
    }

    #[test]
    fn test_gain_clamping_edges() {
        let params = MixerParams::default();
        params.set_master_gain(f32::INFINITY);
        assert_eq!(params.master_gain(), 2.0);
        params.set_master_gain(f32::NEG_INFINITY);
        assert_eq!(params.master_gain(), 0.0);
        params.set_master_gain(f32::NAN);
        assert_eq!(params.master_gain(), 0.0);
    }

    #[test]
    fn test_initial_gains_are_clamped() {
        let params = MixerParams::new(3.0, -1.0, 0.5);
        assert_eq!(params.input1_gain(), 2.0);
        assert_eq!(params.input2_gain(), 0.0);
        assert_eq!(params.master_gain(), 0.5);
    }

    #[test]
    fn test_mute_zeroes_effective_gain() {
        let params = MixerParams::new(1.5, 1.0, 1.0);
        params.set_input_muted(InputChannel::Input1, true);
        assert_eq!(params.effective_gain(InputChannel::Input1), 0.0);
        assert_eq!(params.input1_gain(), 1.5);

        params.set_input_muted(InputChannel::Input1, false);
        assert_eq!(params.effective_gain(InputChannel::Input1), 1.5);
    }

    #[test]
    fn test_telemetry_publish_and_reset() {
        let params = MixerParams::default();
        params.publish_input_level(InputChannel::Input2, 0.3);
        params.publish_output_level(0.4);
        params.publish_latency(Duration::from_micros(250));
        assert_eq!(params.input2_level(), 0.3);
        assert_eq!(params.output_level(), 0.4);
        assert_eq!(params.processing_latency(), Duration::from_micros(250));

        params.reset_telemetry();
        assert_eq!(params.input2_level(), 0.0);
        assert_eq!(params.output_level(), 0.0);
        assert_eq!(params.processing_latency(), Duration::ZERO);
    }

    #[test]
    fn test_concurrent_setters_and_getters() {
        let params = Arc::new(MixerParams::default());
        let writer = {
            let params = Arc::clone(&params);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    params.set_input1_gain(i as f32 / 250.0);
                }
            })
        };

        for _ in 0..1000 {
            let gain = params.input1_gain();
            assert!((0.0..=2.0).contains(&gain));
        }
        writer.join().unwrap();
        assert_eq!(params.input1_gain(), 2.0);
    }
}
