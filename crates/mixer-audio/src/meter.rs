//! Level metering.

/// Levels below this are reported as [`SILENCE_DB`].
const SILENCE_FLOOR: f32 = 0.00001;

/// Decibel value reported for silence.
pub const SILENCE_DB: f32 = -100.0;

/// Root-mean-square level of a block. An empty block has level 0.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Convert a linear level to dBFS.
pub fn level_to_db(level: f32) -> f32 {
    if level < SILENCE_FLOOR {
        return SILENCE_DB;
    }
    20.0 * level.log10()
}
