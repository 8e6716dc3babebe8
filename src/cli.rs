use crate::Config;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pagesnap")]
#[command(about = "Web page screenshot service over HTTP")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "HTTP listen port (overrides PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Keep failed tabs open and log verbosely (overrides DEBUG)")]
    pub debug: bool,

    #[arg(long, help = "Run the browser with a visible window (overrides HEADFUL)")]
    pub headful: bool,

    #[arg(long, help = "Chrome executable path (overrides CHROME_BIN)")]
    pub chrome_path: Option<String>,

    #[arg(
        long,
        help = "Delay between navigation and capture in milliseconds \
                (overrides PRE_SCREENSHOT_RENDER_WAIT_TIME)"
    )]
    pub stabilization_ms: Option<u64>,

    #[arg(long, help = "JSON file with an array of URL patterns to block")]
    pub denylist: Option<PathBuf>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

/// Environment configuration with CLI overrides applied on top.
pub async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env();

    if let Some(port) = args.port {
        config.port = port;
    }
    if args.debug {
        config.debug = true;
    }
    if args.headful {
        config.headful = true;
    }
    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }
    if let Some(ms) = args.stabilization_ms {
        config.stabilization_delay = Duration::from_millis(ms);
    }
    if let Some(path) = &args.denylist {
        let content = tokio::fs::read_to_string(path).await?;
        config.denylist = serde_json::from_str(&content)?;
    }

    Ok(config)
}

pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}
