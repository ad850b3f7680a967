use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use smart_deck::assistant::TurnOutcome;
use smart_deck::calendar::CalendarMonth;
use smart_deck::config::ConfigOverrides;
use smart_deck::environment::snapshot_slot;
use smart_deck::inference::{BackendKind, InferenceBackend, LoadProgress};
use smart_deck::voice::{AudioCapture, AudioPlayback, SpeechOutput, calculate_energy};
use smart_deck::weather::WeatherSource;
use smart_deck::{Config, Daemon, daemon};

/// Deck - smart dashboard with a voice assistant
#[derive(Parser)]
#[command(name = "deck", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "DECK_PORT")]
    port: Option<u16>,

    /// Inference backend ("cloud" or "local")
    #[arg(long, env = "DECK_INFERENCE")]
    backend: Option<BackendKind>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable microphone and speakers (typed commands only)
    #[arg(long, env = "DECK_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Fetch the weather once and print it
    Weather,
    /// Print this month's calendar
    Calendar,
    /// Run one assistant turn for typed text
    Ask {
        /// What to say to the assistant
        text: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,smart_deck=info",
        1 => "info,smart_deck=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = ConfigOverrides {
        backend: cli.backend,
        port: cli.port,
        disable_voice: cli.disable_voice,
    };

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Weather => weather(&overrides).await,
            Command::Calendar => {
                println!("{}", CalendarMonth::current());
                Ok(())
            }
            Command::Ask { text } => ask(&overrides, &text).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&overrides, &text).await,
        };
    }

    tracing::info!(
        port = ?cli.port,
        backend = ?cli.backend,
        disable_voice = cli.disable_voice,
        "starting smart deck"
    );

    let config = Config::load_with_options(&overrides)?;
    tracing::debug!(?config, "loaded configuration");

    Daemon::new(config).run().await?;

    Ok(())
}

/// Poll the forecast endpoint once
async fn weather(overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let config = Config::load_with_options(overrides)?;
    let source = WeatherSource::new(
        config.weather.base_url,
        config.location.latitude,
        config.location.longitude,
    );

    let reading = source.fetch().await?;
    println!("{} {}", reading.temperature_label, reading.condition_label);
    Ok(())
}

/// One typed turn through the full pipeline
async fn ask(overrides: &ConfigOverrides, text: &str) -> anyhow::Result<()> {
    let config = Config::load_with_options(overrides)?;

    let backend = daemon::build_backend(&config.inference)?;
    let progress = |p: LoadProgress| println!("{}", p.text);
    backend.prepare(&progress).await?;

    // Weather context for the prompt
    let (writer, snapshot) = snapshot_slot();
    WeatherSource::new(
        config.weather.base_url.clone(),
        config.location.latitude,
        config.location.longitude,
    )
    .poll(&writer)
    .await;

    let pipeline = daemon::build_pipeline(&config, backend, snapshot);
    match pipeline.run_turn(text).await {
        TurnOutcome::Replied {
            spoken_text,
            commands,
        } => {
            println!("{spoken_text}");
            for command in commands {
                println!("  -> {command:?}");
            }
        }
        TurnOutcome::Apologized { phrase } => println!("{phrase}"),
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = AudioCapture::open()?;

    println!("Sample rate: {} Hz", smart_deck::voice::SAMPLE_RATE);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.drain();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    drop(capture);

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    // Generate 2 seconds of 440Hz sine wave at 24kHz sample rate
    let sample_rate = 24000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output through the configured speech API
async fn test_tts(overrides: &ConfigOverrides, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load_with_options(overrides)?;
    if config.voice.api_key.is_none() {
        anyhow::bail!("OPENAI_API_KEY required for TTS");
    }

    println!("Synthesizing speech...");
    daemon::build_speech(&config.voice).speak(text).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
