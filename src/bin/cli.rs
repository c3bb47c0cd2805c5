//! vstudio CLI: headless playback, tone generation and vocal rendering.
//!
//! Usage:
//!   vs-cli play path/to/file.wav [--loop] [--wav out.wav]
//!   vs-cli tone --waveform saw --freq 220 --seconds 2 [--wav out.wav]
//!   vs-cli vocal project.json [--wav out.wav]
//!   vs-cli config

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use vs_core::{AudioBuffer, AudioSpec, ChannelLayout, GeneratorStream, Waveform};
use vs_engine::{EngineConfig, Source};
use vs_master::Controller;
use vs_vocal::VocalProject;

#[derive(Parser)]
#[command(name = "vs-cli", about = "Headless vstudio audio pipeline")]
struct Cli {
    /// Engine config (YAML). Defaults are used for missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a WAV file through the engine.
    Play {
        file: PathBuf,
        /// Loop until interrupted (device playback only).
        #[arg(long = "loop")]
        looping: bool,
        /// Render to this WAV file instead of the audio device.
        #[arg(long)]
        wav: Option<PathBuf>,
    },
    /// Play a generated test tone.
    Tone {
        #[arg(long, default_value = "sine")]
        waveform: String,
        #[arg(long, default_value_t = 440.0)]
        freq: f64,
        #[arg(long, default_value_t = 0.5)]
        amp: f32,
        #[arg(long, default_value_t = 2.0)]
        seconds: f64,
        #[arg(long)]
        wav: Option<PathBuf>,
    },
    /// Render a vocal project.
    Vocal {
        project: PathBuf,
        #[arg(long)]
        wav: Option<PathBuf>,
    },
    /// Print the effective engine config.
    Config,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Config => {
            print!("{}", config.to_yaml_string()?);
            Ok(())
        }
        Command::Play { file, looping, wav } => {
            let buffer = vs_formats::load_wav_file(&file).with_context(|| format!("reading {}", file.display()))?;
            println!(
                "{}: {} Hz, {:?}, {} channels, {:.2} s",
                file.display(),
                buffer.sample_rate(),
                buffer.spec().format,
                buffer.channels(),
                buffer.duration()
            );
            if wav.is_some() {
                config.worker = false;
            }
            let mut ctrl = Controller::new(config)?;
            let seconds = buffer.duration();
            let source = ctrl
                .play_buffer(buffer, looping && wav.is_none())
                .context("engine rejected the buffer")?;
            match wav {
                Some(out) => render_to_wav(&ctrl, seconds, &out),
                None => play_source(&mut ctrl, &source, None),
            }
        }
        Command::Tone {
            waveform,
            freq,
            amp,
            seconds,
            wav,
        } => {
            let Some(waveform) = Waveform::from_name(&waveform) else {
                bail!("unknown waveform '{waveform}'");
            };
            if wav.is_some() {
                config.worker = false;
            }
            let mut ctrl = Controller::new(config)?;
            ctrl.ensure_listener().context("engine has no listener")?;
            let spec = AudioSpec::float(ctrl.config().sample_rate, ChannelLayout::Mono);
            let source = ctrl.engine().create_source().context("engine not initialised")?;
            source.set_stream(Box::new(GeneratorStream::new(spec, waveform, freq, amp)));
            source.play();
            info!("{waveform:?} tone at {freq} Hz");
            match wav {
                Some(out) => render_to_wav(&ctrl, seconds, &out),
                None => play_source(&mut ctrl, &source, Some(seconds)),
            }
        }
        Command::Vocal { project, wav } => {
            let project = VocalProject::load(&project)?;
            let mut synth = project.synth();
            synth.set_progress_callback(|done| {
                print!("\rSynthesising... {:3.0}%", done * 100.0);
                let _ = std::io::stdout().flush();
            });
            let buffer = synth.synthesize(config.sample_rate);
            println!();
            match wav {
                Some(out) => write_buffer(&buffer, &out),
                None => {
                    let mut ctrl = Controller::new(config)?;
                    let source = ctrl.play_buffer(buffer, false).context("engine rejected the buffer")?;
                    play_source(&mut ctrl, &source, None)
                }
            }
        }
    }
}

/// Play on the default device until the source stops or `limit` elapses.
fn play_source(ctrl: &mut Controller, source: &Arc<Source>, limit: Option<f64>) -> Result<()> {
    ctrl.start_playback()?;
    println!("Playing...");
    let started = std::time::Instant::now();
    while source.is_playing() {
        if limit.is_some_and(|l| started.elapsed().as_secs_f64() >= l) {
            break;
        }
        print!("\r{:7.2} s", source.current_time());
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(50));
    }
    ctrl.stop_playback();
    println!("\rDone.          ");
    Ok(())
}

fn render_to_wav(ctrl: &Controller, seconds: f64, path: &Path) -> Result<()> {
    println!("Rendering {seconds:.2} s to {}...", path.display());
    let wav = ctrl.render_to_wav(seconds)?;
    std::fs::write(path, &wav).with_context(|| format!("writing {}", path.display()))?;
    println!("Rendered {} bytes", wav.len());
    Ok(())
}

fn write_buffer(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    vs_formats::save_wav(path, buffer)?;
    println!("Wrote {} frames to {}", buffer.frames(), path.display());
    Ok(())
}
