//! Level and load reporting.

use std::sync::Arc;
use std::time::Duration;

use mixer_audio::MixerParams;
use mixer_ipc::{LevelSnapshot, WarningType};

/// Processing load above which an overload warning is raised, in percent.
pub const OVERLOAD_LOAD_PERCENT: f32 = 80.0;

/// Output level above which a near-clipping warning is raised.
pub const NEAR_CLIPPING_LEVEL: f32 = 0.9;

/// Reads mixer telemetry and turns it into reports and warnings.
pub struct MetricsCollector {
    params: Arc<MixerParams>,
    callback_period: Duration,
}

impl MetricsCollector {
    /// Create a collector for a session whose callbacks arrive every `callback_period`.
    pub fn new(params: Arc<MixerParams>, callback_period: Duration) -> Self {
        Self {
            params,
            callback_period,
        }
    }

    /// Fraction of the callback period spent mixing (1.0 = the whole period).
    pub fn processing_load(&self) -> f32 {
        if self.callback_period.is_zero() {
            return 0.0;
        }
        (self.params.processing_latency().as_secs_f64() / self.callback_period.as_secs_f64()) as f32
    }

    /// Get current levels snapshot.
    pub fn snapshot(&self) -> LevelSnapshot {
        let latency = self.params.processing_latency();

        LevelSnapshot {
            input1_level: self.params.input1_level(),
            input2_level: self.params.input2_level(),
            output_level: self.params.output_level(),
            input1_gain: self.params.input1_gain(),
            input2_gain: self.params.input2_gain(),
            master_gain: self.params.master_gain(),
            processing_latency_us: u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
            processing_load_percent: self.processing_load() * 100.0,
        }
    }

    /// Check for warnings based on current telemetry.
    pub fn check_warnings(&self) -> Vec<WarningType> {
        warnings_for(self.processing_load() * 100.0, self.params.output_level())
    }
}

/// Warnings for a processing load (percent) and an output level.
pub fn warnings_for(load_percent: f32, output_level: f32) -> Vec<WarningType> {
    let mut warnings = Vec::new();

    if load_percent > OVERLOAD_LOAD_PERCENT {
        warnings.push(WarningType::ProcessingOverload { load_percent });
    }

    if output_level > NEAR_CLIPPING_LEVEL {
        warnings.push(WarningType::OutputNearClipping {
            level: output_level,
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use mixer_audio::{MixingEngine, SamplePool};

    use super::*;

    #[test]
    fn test_idle_snapshot() {
        let params = Arc::new(MixerParams::new(1.5, 0.5, 1.0));
        let metrics = MetricsCollector::new(params, Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.input1_gain, 1.5);
        assert_eq!(snapshot.input2_gain, 0.5);
        assert_eq!(snapshot.output_level, 0.0);
        assert_eq!(snapshot.processing_latency_us, 0);
        assert_eq!(snapshot.processing_load_percent, 0.0);
        assert!(metrics.check_warnings().is_empty());
    }

    #[test]
    fn test_zero_period_has_no_load() {
        let metrics = MetricsCollector::new(Arc::new(MixerParams::default()), Duration::ZERO);
        assert_eq!(metrics.processing_load(), 0.0);
    }

    #[test]
    fn test_hot_output_warns_near_clipping() {
        let params = Arc::new(MixerParams::new(2.0, 2.0, 1.0));
        let (mut producer, consumer) = mixer_audio::ring_buffer(64);
        producer.write(&[0.95; 32]);

        // Drive one mixing pass so the output level is published.
        let mut engine = MixingEngine::new(
            Some(consumer),
            None,
            SamplePool::new(32, 2),
            Arc::clone(&params),
        );
        let mut out = [0.0; 32];
        engine.process(&mut out);

        let metrics = MetricsCollector::new(params, Duration::from_secs(1));
        let warnings = metrics.check_warnings();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, WarningType::OutputNearClipping { level } if *level > 0.9)));
        assert!(!warnings
            .iter()
            .any(|w| matches!(w, WarningType::ProcessingOverload { .. })));
    }

    #[test]
    fn test_overload_threshold() {
        assert!(warnings_for(79.9, 0.0).is_empty());
        assert!(warnings_for(80.0, 0.0).is_empty());
        assert_eq!(
            warnings_for(80.1, 0.0),
            vec![WarningType::ProcessingOverload { load_percent: 80.1 }]
        );
    }

    #[test]
    fn test_near_clipping_threshold() {
        assert!(warnings_for(0.0, 0.9).is_empty());
        assert_eq!(
            warnings_for(95.0, 0.95),
            vec![
                WarningType::ProcessingOverload { load_percent: 95.0 },
                WarningType::OutputNearClipping { level: 0.95 },
            ]
        );
    }
}
