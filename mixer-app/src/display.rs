//! Terminal level meter.

use mixer_audio::level_to_db;
use mixer_ipc::LevelSnapshot;

/// Character width of each level bar.
pub const METER_WIDTH: usize = 20;

/// Render a linear level as a bar of `width` cells.
pub fn level_bar(level: f32, width: usize) -> String {
    // NaN casts to 0 cells.
    let filled = ((level * width as f32) as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// One status line with every level, the latency and the load.
pub fn format_levels(snapshot: &LevelSnapshot) -> String {
    format!(
        "[Input1: {:6.1} dB {}] [Input2: {:6.1} dB {}] [Output: {:6.1} dB {}] [Latency: {}µs, load {:.1}%]",
        level_to_db(snapshot.input1_level),
        level_bar(snapshot.input1_level, METER_WIDTH),
        level_to_db(snapshot.input2_level),
        level_bar(snapshot.input2_level, METER_WIDTH),
        level_to_db(snapshot.output_level),
        level_bar(snapshot.output_level, METER_WIDTH),
        snapshot.processing_latency_us,
        snapshot.processing_load_percent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bar() {
        assert_eq!(level_bar(0.0, 4), "░░░░");
        assert_eq!(level_bar(0.5, 4), "██░░");
        assert_eq!(level_bar(1.0, 4), "████");
        assert_eq!(level_bar(3.0, 4), "████");
        assert_eq!(level_bar(-1.0, 4), "░░░░");
        assert_eq!(level_bar(f32::NAN, 4), "░░░░");
    }

    #[test]
    fn test_format_levels() {
        let line = format_levels(&LevelSnapshot {
            input1_level: 1.0,
            output_level: 0.5,
            processing_latency_us: 42,
            processing_load_percent: 0.4,
            ..Default::default()
        });
        assert!(line.starts_with("[Input1:    0.0 dB ████████████████████]"));
        assert!(line.contains("[Input2: -100.0 dB ░░░░░░░░░░░░░░░░░░░░]"));
        assert!(line.contains("[Output:   -6.0 dB ██████████░░░░░░░░░░]"));
        assert!(line.ends_with("[Latency: 42µs, load 0.4%]"));
    }
}
