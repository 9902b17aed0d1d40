use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

use clubcam::app::{CaptureScript, ClubcamOrchestrator};
use clubcam::frame::Facing;
use clubcam::services::ServiceHub;
use clubcam::session::SessionMode;
use clubcam::ClubcamConfig;

#[derive(Parser, Debug)]
#[command(name = "clubcam")]
#[command(about = "Camera capture with face-tracked AR overlays, filters and masks")]
#[command(version)]
#[command(long_about = "Runs one capture session against the built-in synthetic camera: \
the live view is filtered and decorated with an AR overlay, the shutter takes a photo or \
holds for a recording, and the result can be captioned, stickered and published to local \
storage. Ctrl-C tears the session down at any point.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "clubcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without opening a session")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Camera to open
    #[arg(long, value_name = "FACING", help = "Camera facing: front or back")]
    facing: Option<Facing>,

    /// Color filter applied to the capture
    #[arg(long, value_name = "ID", help = "Color filter id (normal, warm, cool, vintage, bw, dramatic, fade)")]
    filter: Option<String>,

    /// AR overlay drawn on the live view
    #[arg(long, value_name = "ID", help = "AR filter id (dog, cat, crown, hearts, ...)")]
    ar_filter: Option<String>,

    /// Decorative mask burned into photos
    #[arg(long, value_name = "ID", help = "Mask id (hearts, frame, sparkle, cat)")]
    mask: Option<String>,

    /// Hold the shutter for this many seconds instead of taking a photo
    #[arg(long, value_name = "SECONDS", help = "Record a clip of this length instead of a photo")]
    record_seconds: Option<u32>,

    /// Session mode
    #[arg(long, value_name = "MODE", help = "Session mode: post or avatar")]
    mode: Option<SessionMode>,

    /// Post caption
    #[arg(long, help = "Caption attached to the post")]
    caption: Option<String>,

    /// Sticker to attach (repeatable)
    #[arg(long = "sticker", value_name = "ID", help = "Sticker id to attach; may be repeated")]
    stickers: Vec<String>,

    /// Upload the result
    #[arg(long, help = "Publish the capture to the configured storage")]
    publish: bool,

    /// Live view time before the shutter
    #[arg(long, value_name = "MS", default_value_t = 1000, help = "Milliseconds of live view before the shutter")]
    warmup_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Clubcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match ClubcamConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(mode) = args.mode {
        config.session.mode = mode;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    ServiceHub::install(ServiceHub::from_config(&config.upload))
        .context("Failed to install platform services")?;

    let script = CaptureScript {
        facing: args.facing,
        filter: args.filter,
        ar_filter: args.ar_filter,
        mask: args.mask,
        record_seconds: args.record_seconds,
        caption: args.caption,
        stickers: args.stickers,
        publish: args.publish,
        warmup: Duration::from_millis(args.warmup_ms),
    };

    let mut orchestrator = ClubcamOrchestrator::new(config);
    let report = orchestrator.run(script).await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    let exit_code = report.exit_code();
    info!("Clubcam exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("clubcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Clubcam Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Environment overrides use CLUBCAM_<SECTION>__<KEY>, e.g. CLUBCAM_CAPTURE__JPEG_QUALITY=80");
    println!();
    let rendered = toml::to_string_pretty(&ClubcamConfig::default())
        .context("Failed to render default configuration")?;
    println!("{}", rendered);
    Ok(())
}
