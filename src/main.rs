//! Dinner robot CLI

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dinner_robot::daemon::build_synthesizer;
use dinner_robot::language;
use dinner_robot::voice::{AudioPlayback, AudioSink, Microphone, SpeechSynthesizer, Speaker, rms};
use dinner_robot::{Config, Daemon};

/// Voice backend for the Dinner delivery robot
#[derive(Parser)]
#[command(name = "dinner", version, about)]
struct Cli {
    /// Config file (defaults to DINNER_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port, overrides config and environment
    #[arg(long)]
    port: Option<u16>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Serve text requests only, no microphone or speaker
    #[arg(long, env = "DINNER_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input levels
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Play a test tone through the speakers
    TestSpeaker,
    /// Synthesize and play a phrase
    TestTts {
        #[arg(default_value = "Hola, soy Dinner, tu robot repartidor.")]
        text: String,
    },
    /// Send one utterance to the language model and print the reply
    Ask { text: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,dinner_robot=info",
        1 => "info,dinner_robot=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.disable_voice {
        config.voice.enabled = false;
        tracing::info!("voice explicitly disabled via --disable-voice");
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::Ask { text } => ask(config, &text).await,
        };
    }

    tracing::info!(
        port = config.server.port,
        voice = config.voice.enabled,
        "starting dinner robot"
    );

    Daemon::new(config)?.run().await?;

    Ok(())
}

async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let microphone = Microphone::new()?;
        println!("Sample rate: {} Hz", microphone.sample_rate());
        println!("---");

        for i in 0..duration {
            let samples = microphone.capture_for(Duration::from_secs(1))?;
            let energy = rms(&samples);
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

            println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
        }

        Ok(())
    })
    .await??;

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());

    tokio::task::spawn_blocking(move || AudioPlayback::new(sample_rate)?.play_samples(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    let language = language::detect(text);
    println!("Testing TTS ({language}) with text: \"{text}\"\n");

    let tts = build_synthesizer(config)?;
    let audio = tts.synthesize(text, language).await?;
    println!("Received {} bytes of audio", audio.len());

    tokio::task::spawn_blocking(move || Speaker.play(&audio)).await??;

    println!("Done.");
    Ok(())
}

async fn ask(config: Config, text: &str) -> anyhow::Result<()> {
    let daemon = Daemon::new(config)?;
    let envelope = daemon.responder().generate(text).await;

    println!(
        "[{}] ({}) {}",
        envelope.language, envelope.gesture, envelope.message
    );

    Ok(())
}
