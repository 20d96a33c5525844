//! Subcommand handlers.

use std::io::Write;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use mixer_audio::{sanitize_config, DeviceLayer, Signal, SimulatedDevices, DEFAULT_DEVICE};
use mixer_engine::create_engine;
use mixer_ipc::{
    command_channel, event_channel, DeviceSelector, LevelSnapshot, MixerCommand, MixerConfig,
    MixerEvent, MixerState,
};

use crate::cli::RunArgs;
use crate::display::format_levels;
use crate::settings::{load_config, save_config};

/// How often the level meter is redrawn.
const DISPLAY_INTERVAL: Duration = Duration::from_millis(500);

/// Run the mixer until Ctrl-C or the requested duration elapses.
pub async fn run(args: RunArgs, config_path: &Path) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);

    if args.save {
        save_config(&config, config_path)?;
    }

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    let engine = if args.simulate {
        let layer = simulated_layer(&config);
        spawn_engine(move || layer, config, command_rx, event_tx)?
    } else {
        spawn_hardware_engine(config, command_rx, event_tx)?
    };

    command_tx
        .send(MixerCommand::Start)
        .context("Engine exited before start")?;
    println!("Mixing. Press Ctrl+C to stop.");

    let outcome = monitor(&event_rx, args.seconds).await;

    println!();
    info!("Shutting down");
    // The engine may already be gone if the command channel closed.
    let _ = command_tx.send(MixerCommand::Shutdown);
    tokio::task::spawn_blocking(move || engine.join())
        .await
        .context("Failed to join engine thread")?
        .map_err(|_| anyhow!("Engine thread panicked"))?;

    outcome
}

async fn monitor(events: &Receiver<MixerEvent>, seconds: Option<u64>) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let deadline = async move {
        match seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(DISPLAY_INTERVAL);
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                return Ok(());
            }
            _ = &mut deadline => return Ok(()),
            _ = ticker.tick() => {
                if let Some(snapshot) = drain_events(events)? {
                    write!(stdout, "\r{}", format_levels(&snapshot))?;
                    stdout.flush()?;
                }
            }
        }
    }
}

/// Handle pending engine events, returning the newest level snapshot.
fn drain_events(events: &Receiver<MixerEvent>) -> Result<Option<LevelSnapshot>> {
    let mut latest = None;

    for event in events.try_iter() {
        match event {
            MixerEvent::Levels(snapshot) => latest = Some(snapshot),
            MixerEvent::StateChanged { current, .. } => match *current {
                MixerState::Error { message, .. } => bail!("Mixer failed to start: {}", message),
                MixerState::Running => info!("Mixer running"),
                MixerState::Stopped => info!("Mixer stopped"),
            },
            MixerEvent::PerformanceWarning(warning) => warn!(?warning, "Performance warning"),
            MixerEvent::Error { message, .. } => warn!("Mixer error: {}", message),
            other @ (MixerEvent::Ready | MixerEvent::Shutdown) => debug!(event = ?other, "Engine event"),
        }
    }

    Ok(latest)
}

/// Run the engine on its own thread. The layer is built there because
/// device streams cannot move between threads.
fn spawn_engine<L, F>(
    make_layer: F,
    config: MixerConfig,
    command_rx: Receiver<MixerCommand>,
    event_tx: Sender<MixerEvent>,
) -> Result<JoinHandle<()>>
where
    L: DeviceLayer,
    F: FnOnce() -> L + Send + 'static,
{
    thread::Builder::new()
        .name("mixer-engine".to_string())
        .spawn(move || {
            info!("Engine thread starting");
            let mut engine = create_engine(make_layer(), &config, command_rx, event_tx);
            engine.run();
            info!("Engine thread stopped");
        })
        .context("Failed to spawn engine thread")
}

#[cfg(feature = "cpal-backend")]
fn spawn_hardware_engine(
    config: MixerConfig,
    command_rx: Receiver<MixerCommand>,
    event_tx: Sender<MixerEvent>,
) -> Result<JoinHandle<()>> {
    spawn_engine(mixer_audio::CpalDeviceLayer::new, config, command_rx, event_tx)
}

#[cfg(not(feature = "cpal-backend"))]
fn spawn_hardware_engine(
    _config: MixerConfig,
    _command_rx: Receiver<MixerCommand>,
    _event_tx: Sender<MixerEvent>,
) -> Result<JoinHandle<()>> {
    bail!("Built without audio hardware support; rebuild with --features cpal-backend or pass --simulate")
}

/// Test signals for every input the configuration names.
fn simulated_layer(config: &MixerConfig) -> SimulatedDevices {
    let mut devices = SimulatedDevices::new();

    let inputs = [
        (&config.input1_device, Signal::Sine { frequency: 440.0, amplitude: 0.5 }),
        (&config.input2_device, Signal::Sine { frequency: 660.0, amplitude: 0.3 }),
    ];
    for (selector, signal) in inputs {
        let name = match selector {
            Some(DeviceSelector::Default) => DEFAULT_DEVICE,
            Some(DeviceSelector::Named(name)) => name.as_str(),
            None => continue,
        };
        devices = devices.with_input(name, signal);
    }

    devices
}

/// Print capture and playback devices.
#[cfg(feature = "cpal-backend")]
pub fn devices() -> Result<()> {
    use mixer_ipc::AudioDeviceType;

    let devices = mixer_audio::enumerate_audio_devices().context("Failed to enumerate devices")?;

    for (title, device_type) in [
        ("Input Devices:", AudioDeviceType::Input),
        ("Output Devices:", AudioDeviceType::Output),
    ] {
        println!("{}", title);
        for device in devices.iter().filter(|d| d.device_type == device_type) {
            let marker = if device.is_default { " [DEFAULT]" } else { "" };
            println!("  {}{}", device.name, marker);
        }
        println!();
    }

    Ok(())
}

#[cfg(not(feature = "cpal-backend"))]
pub fn devices() -> Result<()> {
    bail!("Built without audio hardware support; rebuild with --features cpal-backend")
}

/// Print the configuration the mixer would run with.
pub fn show_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let effective = sanitize_config(&config);

    println!("Configuration file: {}", config_path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(&effective).context("Failed to serialize config")?
    );
    println!(
        "Callback period: {:.2} ms ({} samples per block)",
        effective.callback_period().as_secs_f64() * 1000.0,
        effective.samples_per_callback()
    );
    Ok(())
}
