//! Perch CLI
//!
//! Inspect overlay placement and replay scripted combobox sessions against
//! the headless host.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use perch_core::{AnchorRect, PerchConfig, Size, Viewport};
use perch_layout::{compute_placement, Placement, PlacementRequest};

mod script;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG: &str = "perch.toml";

#[derive(Parser)]
#[command(name = "perch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Perch overlay placement and combobox toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./perch.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute one overlay placement and print it as JSON
    Place {
        /// Anchor box in viewport coordinates: x,y,width,height
        #[arg(long, value_parser = parse_floats::<4>)]
        anchor: [f32; 4],

        /// Overlay content size: width,height (height 0 = unmeasured menu)
        #[arg(long, value_parser = parse_floats::<2>)]
        overlay: [f32; 2],

        /// Viewport size: width,height
        #[arg(long, value_parser = parse_floats::<2>)]
        viewport: [f32; 2],

        /// Page scroll offset: x,y
        #[arg(long, value_parser = parse_floats::<2>, default_value = "0,0")]
        scroll: [f32; 2],

        /// Preferred side (auto, top, bottom, left, right)
        #[arg(short, long, default_value = "auto")]
        placement: Placement,

        /// Place a flexible-height menu instead of a fixed-size popper
        #[arg(long)]
        menu: bool,
    },

    /// Replay a combobox session script and print the view after every step
    Simulate {
        /// Script file (TOML)
        script: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Place {
            anchor,
            overlay,
            viewport,
            scroll,
            placement,
            menu,
        } => cmd_place(&config, anchor, overlay, viewport, scroll, placement, menu),

        Commands::Simulate { script } => cmd_simulate(&config, &script),

        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<PerchConfig> {
    match path {
        Some(path) => PerchConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => PerchConfig::load_or_default(DEFAULT_CONFIG)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG)),
    }
}

/// Parse `N` comma-separated numbers
fn parse_floats<const N: usize>(s: &str) -> std::result::Result<[f32; N], String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| format!("'{}': {}", part.trim(), e))
        })
        .collect::<std::result::Result<Vec<f32>, String>>()?;

    values
        .try_into()
        .map_err(|values: Vec<f32>| format!("expected {} values, got {}", N, values.len()))
}

fn cmd_place(
    config: &PerchConfig,
    anchor: [f32; 4],
    overlay: [f32; 2],
    viewport: [f32; 2],
    scroll: [f32; 2],
    placement: Placement,
    menu: bool,
) -> Result<()> {
    let [x, y, width, height] = anchor;
    let anchor = Some(AnchorRect::from_xywh(x, y, width, height));
    let overlay = Size::new(overlay[0], overlay[1]);
    let viewport = Viewport::new(viewport[0], viewport[1]).with_scroll(scroll[0], scroll[1]);

    let request = if menu {
        PlacementRequest::menu(anchor, overlay, viewport)
    } else {
        PlacementRequest::popper(anchor, overlay, viewport)
    }
    .with_config(config)
    .preferred(placement);

    let result = compute_placement(&request);
    info!("Placed on {} at ({}, {})", result.placement, result.left, result.top);

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_simulate(config: &PerchConfig, path: &Path) -> Result<()> {
    let script = script::Script::load(path)?;
    info!("Replaying {} steps from {}", script.steps.len(), path.display());

    for record in script::run(&script, config) {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

fn cmd_config(config: &PerchConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
