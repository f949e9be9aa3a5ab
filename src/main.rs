use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use talkback::device::RecordingSink;
use talkback::{
    AudioDevice, BlobStore, Config, CpalDevice, Interaction, PlatformKind, TransportClient,
    platform, probe,
};

/// talkback - push-to-talk voice turns with a remote assistant
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Assistant service base URL (`/talk` is appended), overrides `TALKBACK_ENDPOINT`
    #[arg(long)]
    endpoint: Option<String>,

    /// Platform branch: "native" or "browser", overrides `TALKBACK_PLATFORM`
    #[arg(long)]
    platform: Option<PlatformKind>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether the microphone is usable
    Probe,
    /// Record for a fixed time, then send and play the reply
    Talk {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
        /// Seconds to keep running while the reply plays
        #[arg(long, default_value = "15")]
        linger: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,talkback=info",
        1 => "info,talkback=debug",
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

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint.filter(|e| !e.trim().is_empty()) {
        config.endpoint = Some(endpoint);
    }
    if let Some(kind) = cli.platform {
        config.platform = kind;
    }
    tracing::debug!(?config, "loaded configuration");

    let blobs = BlobStore::new();
    let sink = match config.platform {
        PlatformKind::Browser => RecordingSink::Blob(blobs.clone()),
        PlatformKind::Native => RecordingSink::File(config.cache_dir.clone()),
    };
    let device: Rc<dyn AudioDevice> = Rc::new(CpalDevice::new(sink));

    if matches!(cli.command, Some(Command::Probe)) {
        let capability = probe(device.as_ref()).await;
        if capability.available {
            println!("microphone available");
        } else {
            println!("microphone NOT available");
        }
        return Ok(());
    }

    let platform = platform::for_kind(&config, blobs)?;
    let transport = TransportClient::new(&config)?;
    let mut interaction = Interaction::new(device, platform, transport).await;

    if !interaction.status().capture_available {
        anyhow::bail!("no usable microphone");
    }

    match cli.command {
        Some(Command::Talk { duration, linger }) => {
            talk_once(&mut interaction, duration, linger).await;
        }
        _ => push_to_talk(&mut interaction).await?,
    }

    interaction.shutdown();
    Ok(())
}

/// One timed turn
#[allow(clippy::future_not_send)]
async fn talk_once(interaction: &mut Interaction, duration: u64, linger: u64) {
    interaction.start_capture().await;
    if !interaction.status().capturing {
        return;
    }

    println!("Recording for {duration} seconds...");
    tokio::time::sleep(Duration::from_secs(duration)).await;

    println!("Waiting for reply...");
    interaction.stop_capture().await;

    if interaction.has_reply_loaded() {
        tokio::time::sleep(Duration::from_secs(linger)).await;
    }
}

/// Interactive loop: Enter toggles recording, `q` quits
#[allow(clippy::future_not_send)]
async fn push_to_talk(interaction: &mut Interaction) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Press Enter to start talking, Enter again to send. Type q to quit.");

    while let Some(line) = lines.next_line().await? {
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        if interaction.status().capturing {
            println!("Waiting for reply...");
            interaction.stop_capture().await;
            println!("Press Enter to talk again.");
        } else {
            interaction.start_capture().await;
            if interaction.status().capturing {
                println!("Recording... press Enter to send.");
            }
        }
    }

    Ok(())
}
