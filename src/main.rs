use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use malik::api::ApiServerBuilder;
use malik::listen::{PassiveLoop, Stopped};
use malik::voice::{AudioCapture, AudioPlayback, DecodedAudio, Speaker, WakeWord, calculate_energy};
use malik::{Assistant, Config, Services};

/// Malik - voice and text personal assistant
#[derive(Parser)]
#[command(name = "malik", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web chat page and `/api/chat`
    Serve {
        /// Bind address
        #[arg(long, env = "MALIK_HOST")]
        host: Option<String>,
        /// Port to listen on
        #[arg(long, env = "MALIK_PORT")]
        port: Option<u16>,
        /// Static files directory
        #[arg(long, env = "MALIK_STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },
    /// Listen for the wake word and answer out loud
    Listen {
        /// Treat every utterance as a command
        #[arg(long)]
        always_on: bool,
    },
    /// Open the desktop chat window
    Desktop,
    /// Route one request and print the reply
    Ask {
        /// Request text
        #[arg(required = true)]
        text: Vec<String>,
        /// Also speak the reply
        #[arg(short, long)]
        speak: bool,
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
        #[arg(default_value = "Hello! I am Malik, your intelligent assistant.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let default_filter = match cli.verbose {
        0 => "info,malik=info",
        1 => "info,malik=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
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
    let command = cli.command.unwrap_or(if cfg!(feature = "desktop") {
        Command::Desktop
    } else {
        Command::Serve {
            host: None,
            port: None,
            static_dir: None,
        }
    });

    match command {
        Command::TestMic { duration } => return test_mic(duration).await,
        Command::TestSpeaker => return test_speaker().await,
        _ => {}
    }

    let mut config = Config::load()?;
    tracing::debug!(
        model = %config.llm.model,
        tts = ?config.voice.tts_provider,
        stt = ?config.voice.stt_provider,
        "loaded configuration"
    );

    match command {
        Command::Serve {
            host,
            port,
            static_dir,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = static_dir {
                config.server.static_dir = dir;
            }
            serve(&config).await
        }
        Command::Listen { always_on } => listen(&config, always_on).await,
        Command::Desktop => desktop(&config).await,
        Command::Ask { text, speak } => ask(&config, &text.join(" "), speak).await,
        Command::TestTts { text } => test_tts(&config, &text).await,
        Command::TestMic { .. } | Command::TestSpeaker => Ok(()),
    }
}

/// Run the web server until interrupted
async fn serve(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config).await;

    let server = ApiServerBuilder::new(services.router)
        .synthesizer(services.synthesizer)
        .server_config(&config.server)
        .build();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }

    Ok(())
}

/// Run the passive-listen loop until shutdown
#[allow(clippy::future_not_send)]
async fn listen(config: &Config, always_on: bool) -> anyhow::Result<()> {
    let services = Services::from_config(config).await;
    let mut listener = services
        .listener(config)
        .ok_or_else(|| anyhow::anyhow!("speech recognition is not configured"))?;

    let wake_word = (!always_on).then(|| WakeWord::new(&config.voice.wake_word));
    if let Some(wake) = &wake_word {
        tracing::info!("Malik is ready - say \"{}\"", wake.phrase());
    }

    let passive = PassiveLoop::new(Assistant::from_services(&services), wake_word);
    let stopped = passive
        .run(&mut listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    match stopped {
        Stopped::Shutdown => tracing::info!("Malik shutting down"),
        Stopped::Interrupted => tracing::info!("Malik interrupted"),
    }
    Ok(())
}

/// Open the desktop window; blocks until it closes
#[cfg(feature = "desktop")]
async fn desktop(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config).await;
    let assistant = Assistant::from_services(&services);
    let listener = services.listener(config);

    malik::desktop::run(assistant, listener, tokio::runtime::Handle::current())
        .map_err(|e| anyhow::anyhow!("desktop window failed: {e}"))
}

#[cfg(not(feature = "desktop"))]
#[allow(clippy::unused_async)]
async fn desktop(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("this build has no desktop window; rebuild with `--features desktop`")
}

/// Route one request and print the reply
async fn ask(config: &Config, text: &str, speak: bool) -> anyhow::Result<()> {
    let services = Services::from_config(config).await;
    let assistant = Assistant::from_services(&services);

    let reply = if speak {
        assistant.handle_and_speak(text).await
    } else {
        assistant.handle(text).await
    };

    println!("{}", reply.text);
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!(
        "Device: {} Hz, {} channel(s); delivered as {} Hz mono",
        capture.device_rate(),
        capture.device_channels(),
        malik::voice::SAMPLE_RATE
    );
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check that your mic is plugged in and unmuted.");

    Ok(())
}

/// Test speaker output with a sine wave
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

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    let audio = DecodedAudio {
        samples,
        sample_rate,
    };
    tokio::task::spawn_blocking(move || AudioPlayback::new().play_samples(audio)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let services = Services::from_config(config).await;
    let synthesizer = services
        .synthesizer
        .ok_or_else(|| anyhow::anyhow!("speech synthesis is not configured"))?;

    println!("Synthesizing speech...");
    Speaker::new(synthesizer).try_speak(text).await?;

    println!("\n---");
    println!("TTS test complete!");

    Ok(())
}
