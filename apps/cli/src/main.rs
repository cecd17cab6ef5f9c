use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use herold_core::{
    AvailabilityProbe, ManifestSource, PipelineConfig, PipelineEvent, ProviderEnv,
    ProviderSynthesizer, SystemProbe, TARGET_DURATION_SECONDS, TtsProvider,
    ensure_kokoro_models, format::format_tempo_chain, format_manifest_readable,
    generate_narration, load_slides, provider::ProviderKind, resolve_provider,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use crate::transport::{ClockTransport, FfplayTransport, Transport};

mod presenter;
mod transport;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

#[derive(Parser)]
#[command(name = "herold")]
#[command(about = "Generate narrated slideshow audio with local or cloud TTS and play it back")]
struct Cli {
    /// Project directory holding content/ and public/
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Log pipeline internals to stderr (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize every narration segment and write the track and timing manifest
    GenerateAudio {
        /// TTS provider (kokoro, piper, coqui, openai). Auto-detected when omitted.
        #[arg(long, env = "TTS_PROVIDER")]
        tts_provider: Option<String>,

        /// Voice name. Defaults to the provider's default voice.
        #[arg(long)]
        voice: Option<String>,

        /// Slide content JSON, relative to the project root
        #[arg(long, default_value = "content/slides.json")]
        content: PathBuf,

        /// Length of the final track in seconds
        #[arg(long, default_value_t = TARGET_DURATION_SECONDS)]
        target_duration: f64,

        /// Silence inserted between segments, in seconds
        #[arg(long)]
        gap: Option<f64>,

        /// Pause between synthesis calls, in milliseconds
        #[arg(long, default_value_t = 400)]
        delay_ms: u64,
    },
    /// List TTS providers and whether they are usable on this machine
    Providers,
    /// Download the Kokoro ONNX model and voices into the local cache
    DownloadModels,
    /// Play the slideshow in the terminal, synchronized to the narration
    Present {
        /// Timing manifest path or http(s) URL
        #[arg(long)]
        manifest: Option<String>,

        /// Narration track. Defaults to the generated presentation audio.
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Slide content JSON, relative to the project root
        #[arg(long, default_value = "content/slides.json")]
        content: PathBuf,

        /// Run on a silent clock even if audio is available
        #[arg(long)]
        no_audio: bool,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "herold=info,herold_core=info",
        _ => "herold=debug,herold_core=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), e);
    std::process::exit(1);
}

fn banner(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("herold").cyan().bold(),
        style(subtitle).dim()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::GenerateAudio {
            tts_provider,
            voice,
            content,
            target_duration,
            gap,
            delay_ms,
        } => {
            let mut config = PipelineConfig::new(&cli.project_root);
            config.target_duration = target_duration;
            config.silence_gap = gap;
            config.segment_delay = Duration::from_millis(delay_ms);
            generate_audio(
                config,
                &cli.project_root.join(content),
                tts_provider.as_deref(),
                voice,
            )
            .await
        }
        Command::Providers => list_providers().await,
        Command::DownloadModels => download_models().await,
        Command::Present {
            manifest,
            audio,
            content,
            no_audio,
        } => {
            let config = PipelineConfig::new(&cli.project_root);
            let source = match manifest {
                Some(manifest) => ManifestSource::parse(&manifest),
                None => ManifestSource::File(config.manifest_path()),
            };
            let audio = audio.unwrap_or_else(|| config.final_output_path());
            let slides = load_slides(&cli.project_root.join(content))
                .await
                .unwrap_or_else(|e| fail(e));
            let transport = pick_transport(&audio, no_audio);
            presenter::present(slides, transport, source).await
        }
    }
}

async fn generate_audio(
    config: PipelineConfig,
    content: &Path,
    requested: Option<&str>,
    voice: Option<String>,
) -> Result<()> {
    banner("Narration Generator");
    config.validate().unwrap_or_else(|e| fail(e));

    let env = ProviderEnv::from_env();
    let provider = resolve_provider(requested, &SystemProbe::new(&env))
        .await
        .unwrap_or_else(|e| fail(e));
    let voice = voice.unwrap_or_else(|| provider.config().default_voice.to_string());
    println!(
        "{} Provider: {} {}",
        style("✓").green().bold(),
        style(provider.name()).yellow(),
        style(format!("(voice {})", voice)).dim()
    );

    let slides = load_slides(content).await.unwrap_or_else(|e| fail(e));
    println!(
        "{} Loaded {} slides from {}",
        style("✓").green().bold(),
        slides.len(),
        style(content.display()).dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let synth = ProviderSynthesizer::new(provider, env, &config.audio_dir);
    let total_start = Instant::now();
    let mut step_start = Instant::now();
    let mut spinner: Option<ProgressBar> = None;

    let result = generate_narration(&config, &slides, &synth, &voice, |event| match event {
        PipelineEvent::Cleaned { removed } => {
            println!(
                "{} Cleaned audio directory {}",
                style("✓").green().bold(),
                style(format!("({} removed)", removed)).dim()
            );
        }
        PipelineEvent::SegmentStarted {
            index,
            total,
            filename,
        } => {
            step_start = Instant::now();
            spinner = Some(create_spinner(&format!(
                "[{}/{}] Synthesizing {}...",
                index + 1,
                total,
                filename
            )));
        }
        PipelineEvent::SegmentSynthesized {
            index,
            total,
            filename,
            duration,
        } => {
            let msg = format!(
                "{} [{}/{}] {} {:.2}s {}",
                style("✓").green().bold(),
                index + 1,
                total,
                filename,
                duration,
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            );
            match spinner.take() {
                Some(pb) => pb.finish_with_message(msg),
                None => println!("{}", msg),
            }
            step_start = Instant::now();
            if index + 1 == total {
                spinner = Some(create_spinner("Assembling track..."));
            }
        }
        PipelineEvent::Concatenated { raw_duration } => {
            let msg = format!(
                "{} Concatenated: {:.2}s raw {}",
                style("✓").green().bold(),
                raw_duration,
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            );
            match spinner.take() {
                Some(pb) => pb.finish_with_message(msg),
                None => println!("{}", msg),
            }
            step_start = Instant::now();
            spinner = Some(create_spinner("Rescaling to target duration..."));
        }
        PipelineEvent::Rescaled { tempo_stages } => {
            let msg = format!(
                "{} Rescaled: {} {}",
                style("✓").green().bold(),
                style(format_tempo_chain(&tempo_stages)).yellow(),
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            );
            match spinner.take() {
                Some(pb) => pb.finish_with_message(msg),
                None => println!("{}", msg),
            }
        }
        PipelineEvent::ManifestWritten { path } => {
            println!(
                "{} Manifest written: {}",
                style("✓").green().bold(),
                style(path.display()).dim()
            );
        }
    })
    .await;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if e.is_configuration() {
                eprintln!(
                    "{}",
                    style("Run `herold providers` to see what is installed.").dim()
                );
            }
            std::process::exit(1);
        }
    };

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{} Done in {} ({} segments, scale {:.4})\n",
        style("✓").green().bold(),
        style(format_duration(total_start.elapsed())).cyan(),
        summary.segments,
        summary.duration_scale
    );
    println!("{}", format_manifest_readable(&summary.manifest));
    println!(
        "{} {}",
        style("Audio:").dim(),
        style(summary.audio_path.display()).cyan()
    );
    println!(
        "{} {}",
        style("Timings:").dim(),
        style(summary.manifest_path.display()).cyan()
    );

    Ok(())
}

async fn list_providers() -> Result<()> {
    banner("TTS Providers");

    let env = ProviderEnv::from_env();
    let probe = SystemProbe::new(&env);
    for provider in TtsProvider::PREFERENCE {
        let config = provider.config();
        let kind = match config.kind {
            ProviderKind::Local => "local",
            ProviderKind::Cloud => "cloud",
        };
        let status = if probe.is_available(provider).await {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        println!(
            "{} {:<8} {} {}",
            status,
            provider.id(),
            style(provider.name()).bold(),
            style(format!("({})", kind)).dim()
        );
        println!(
            "    voices: {} {}",
            config.voices.join(", "),
            style(format!("[default {}]", config.default_voice)).dim()
        );
        println!("    install: {}", style(config.install_hint).dim());
    }

    Ok(())
}

async fn download_models() -> Result<()> {
    banner("Kokoro Models");

    let env = ProviderEnv::from_env();
    let spinner = create_spinner("Checking Kokoro model cache...");
    let report = match ensure_kokoro_models(&env.kokoro_model_dir).await {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            fail(e);
        }
    };

    if !report.already_present.is_empty() {
        spinner.finish_with_message(format!(
            "{} Models already present: {} {}",
            style("✓").green().bold(),
            report.already_present.join(", "),
            style("(cached)").dim()
        ));
    } else {
        spinner.finish_with_message(format!(
            "{} Downloaded: {}",
            style("✓").green().bold(),
            report.downloaded.join(", ")
        ));
    }
    for name in &report.missing {
        println!(
            "{} {} not found in release assets",
            style("!").yellow().bold(),
            name
        );
    }
    println!(
        "{} {}",
        style("Models:").dim(),
        style(report.model_dir.display()).cyan()
    );

    Ok(())
}

fn pick_transport(audio: &Path, no_audio: bool) -> Transport {
    let duration = TARGET_DURATION_SECONDS;
    if no_audio {
        return Transport::Silent(ClockTransport::new(duration));
    }
    if !audio.exists() {
        tracing::warn!(path = %audio.display(), "narration audio missing, playing silently");
        return Transport::Silent(ClockTransport::new(duration));
    }
    if ProviderEnv::from_env().find_executable("ffplay").is_none() {
        tracing::warn!("ffplay not found on PATH, playing silently");
        return Transport::Silent(ClockTransport::new(duration));
    }
    Transport::Ffplay(FfplayTransport::new(audio, duration))
}
