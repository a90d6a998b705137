//! facemime - Recorded facial expression playback
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facemime::{
    avatar::ImageAvatarDecoder,
    config::Config,
    playback::{AssetState, PlaybackSession, TickOutcome},
    render::headless::HeadlessRenderer,
};

/// facemime - play a recorded expression animation on an avatar image
#[derive(Parser, Debug)]
#[command(name = "facemime", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Avatar image (overrides config)
    #[arg(short, long)]
    avatar: Option<PathBuf>,

    /// Animation JSON (overrides config)
    #[arg(short = 'n', long)]
    animation: Option<PathBuf>,

    /// Loop playback instead of holding the last frame
    #[arg(short, long = "loop")]
    looping: bool,

    /// Mesh topology file (overrides the packaged one)
    #[arg(short, long)]
    topology: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Launch native UI window
    #[cfg(feature = "native-ui")]
    #[arg(long)]
    ui: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", facemime::NAME, facemime::VERSION);

    let config = load_config(&args)?;

    info!(
        "Avatar: {}",
        display_path(config.playback.avatar_path.as_ref())
    );
    info!(
        "Animation: {}",
        display_path(config.playback.animation_path.as_ref())
    );
    info!("Looping: {}", config.playback.loop_playback);

    let session = PlaybackSession::from_config(&config, Arc::new(ImageAvatarDecoder::new()));

    #[cfg(feature = "native-ui")]
    if args.ui {
        info!("Launching native UI window");
        if let Err(e) = facemime::ui::FacemimeApp::run(session, config) {
            error!("UI error: {}", e);
            anyhow::bail!("UI error: {}", e);
        }
        info!("UI window closed");
        return Ok(());
    }

    run_headless(session, &config)
}

/// Load the config file and apply CLI overrides.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    if let Some(ref path) = args.avatar {
        config.playback.avatar_path = Some(path.clone());
    }
    if let Some(ref path) = args.animation {
        config.playback.animation_path = Some(path.clone());
    }
    if args.looping {
        config.playback.loop_playback = true;
    }
    if let Some(ref path) = args.topology {
        config.render.topology_path = Some(path.clone());
    }

    config.validate()?;
    Ok(config)
}

fn display_path(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

/// Wait for all assets, summarize them and play one pass without a GPU.
fn run_headless(mut session: PlaybackSession, config: &Config) -> anyhow::Result<()> {
    if config.playback.avatar_path.is_none() || config.playback.animation_path.is_none() {
        anyhow::bail!("Headless playback needs both an avatar and an animation (see --help)");
    }

    let timeout = Duration::from_secs(config.playback.load_timeout_secs);
    let status = session.wait_until_settled(timeout);

    if status.avatar == AssetState::Loading || status.animation == AssetState::Loading {
        anyhow::bail!("Assets did not finish loading within {:?}", timeout);
    }
    if let Some(message) = status.error {
        error!("Playback unavailable: {}", message);
        anyhow::bail!(message);
    }

    let (Some(animation), Some(avatar), Some(topology)) = (
        session.animation().cloned(),
        session.avatar().cloned(),
        session.topology().cloned(),
    ) else {
        anyhow::bail!("Playback unavailable");
    };

    info!(
        "Animation: {} frames at {} fps ({:.2}s), max_coord {:.3}, {} without a face",
        animation.frame_count(),
        animation.fps(),
        animation.duration().as_secs_f64(),
        animation.max_coord(),
        animation.faceless_frames()
    );
    info!("Avatar: {}x{}", avatar.width(), avatar.height());
    info!("Topology: {} triangles", topology.triangle_count());

    let mut renderer = HeadlessRenderer::new();
    let (mut drawn, mut cleared) = (0usize, 0usize);

    for i in 0..animation.frame_count() {
        let now_ms = (i as f64 * 1000.0 / animation.fps()).ceil() as u64;
        match session.tick(now_ms, &mut renderer) {
            TickOutcome::Drawn { .. } => drawn += 1,
            TickOutcome::Cleared { .. } => cleared += 1,
            TickOutcome::Waiting => warn!("Tick {} found assets still loading", i),
            TickOutcome::Unavailable => {
                let reason = session
                    .status()
                    .error
                    .unwrap_or_else(|| "renderer unavailable".to_string());
                anyhow::bail!("Playback stopped at tick {}: {}", i, reason);
            }
        }
    }

    info!(
        "Simulated playback: {} ticks drawn, {} cleared, {} texture upload(s)",
        drawn,
        cleared,
        renderer.upload_count()
    );
    Ok(())
}
