//! Configuration sanitization.
//!
//! A session always ends up with a usable configuration: out-of-range values
//! are replaced by defaults instead of rejected.

use tracing::warn;

use mixer_ipc::MixerConfig;

use crate::params::clamp_gain;
use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, MAX_CHANNELS};

/// Return `config` with invalid format values replaced by defaults and gains clamped.
pub fn sanitize_config(config: &MixerConfig) -> MixerConfig {
    let mut config = config.clone();

    if config.sample_rate == 0 {
        warn!(default = DEFAULT_SAMPLE_RATE, "Invalid sample rate 0, using default");
        config.sample_rate = DEFAULT_SAMPLE_RATE;
    }

    if config.buffer_size == 0 {
        warn!(default = DEFAULT_BUFFER_SIZE, "Invalid buffer size 0, using default");
        config.buffer_size = DEFAULT_BUFFER_SIZE;
    }

    if config.channels == 0 || config.channels > MAX_CHANNELS {
        warn!(
            channels = config.channels,
            default = DEFAULT_CHANNELS,
            "Unsupported channel count, using default"
        );
        config.channels = DEFAULT_CHANNELS;
    }

    config.input1_gain = clamp_gain(config.input1_gain);
    config.input2_gain = clamp_gain(config.input2_gain);
    config.master_gain = clamp_gain(config.master_gain);

    config
}
