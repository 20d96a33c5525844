//! Definition of the command line.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use mixer_ipc::{DeviceSelector, MixerConfig};

#[derive(Debug, Parser)]
#[command(name = "audio-mixer", version, about = "Mix two audio inputs into one output")]
pub struct CliArgs {
    /// Configuration file (default: ~/.audio-mixer/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start mixing and show live levels until Ctrl-C.
    Run(RunArgs),

    /// List audio devices.
    Devices,

    /// Print the effective configuration and where it is stored.
    Config,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Use generated test signals instead of audio hardware.
    #[arg(long)]
    pub simulate: bool,

    /// Stop after this many seconds.
    #[arg(long)]
    pub seconds: Option<u64>,

    /// Input 1 device name, or "default".
    #[arg(long)]
    pub input1: Option<String>,

    /// Input 2 device name, or "default".
    #[arg(long, conflicts_with = "no_input2")]
    pub input2: Option<String>,

    /// Disable input 2.
    #[arg(long)]
    pub no_input2: bool,

    /// Output device name, or "default".
    #[arg(long)]
    pub output: Option<String>,

    #[arg(long)]
    pub input1_gain: Option<f32>,

    #[arg(long)]
    pub input2_gain: Option<f32>,

    #[arg(long)]
    pub master_gain: Option<f32>,

    /// Sample rate in Hz.
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames per callback.
    #[arg(long)]
    pub buffer_size: Option<u32>,

    /// Write the resulting configuration back to the config file.
    #[arg(long)]
    pub save: bool,
}

impl RunArgs {
    /// Apply command line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut MixerConfig) {
        if let Some(name) = &self.input1 {
            config.input1_device = Some(parse_device(name));
        }
        if let Some(name) = &self.input2 {
            config.input2_device = Some(parse_device(name));
        }
        if self.no_input2 {
            config.input2_device = None;
        }
        if let Some(name) = &self.output {
            config.output_device = Some(parse_device(name));
        }
        if let Some(gain) = self.input1_gain {
            config.input1_gain = gain;
        }
        if let Some(gain) = self.input2_gain {
            config.input2_gain = gain;
        }
        if let Some(gain) = self.master_gain {
            config.master_gain = gain;
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(frames) = self.buffer_size {
            config.buffer_size = frames;
        }
    }
}

fn parse_device(name: &str) -> DeviceSelector {
    if name.eq_ignore_ascii_case("default") {
        DeviceSelector::Default
    } else {
        DeviceSelector::named(name)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_run_overrides() {
        let args = parse(&[
            "audio-mixer",
            "run",
            "--input2",
            "BlackHole 2ch",
            "--output",
            "default",
            "--master-gain",
            "0.8",
            "--buffer-size",
            "256",
        ]);
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };

        let mut config = MixerConfig::default();
        run.apply(&mut config);
        assert_eq!(config.input2_device, Some(DeviceSelector::named("BlackHole 2ch")));
        assert_eq!(config.output_device, Some(DeviceSelector::Default));
        assert_eq!(config.master_gain, 0.8);
        assert_eq!(config.buffer_size, 256);
        assert_eq!(config.input1_gain, 1.0);
    }

    #[test]
    fn test_no_input2_disables_path() {
        let args = parse(&["audio-mixer", "run", "--no-input2"]);
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };

        let mut config = MixerConfig {
            input2_device: Some(DeviceSelector::named("loopback")),
            ..Default::default()
        };
        run.apply(&mut config);
        assert_eq!(config.input2_device, None);
    }

    #[test]
    fn test_global_config_flag() {
        let args = parse(&["audio-mixer", "config", "--config", "/tmp/mixer.json"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/mixer.json")));
        assert!(matches!(args.command, Command::Config));
    }
}
