mod cli;

use dasher::config::{self, properties};
use dasher::pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "dasher=trace,dasher_media=trace,dasher_av=trace".to_string()
        } else {
            "dasher=info,dasher_media=info,dasher_av=info".to_string()
        }
    });

    let log_file = cli.log_file.clone().or_else(|| configured_log_file(&cli));
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create log file {:?}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(&env_filter))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    match cli.command {
        Commands::Run { dry_run, ref overrides } => run(cli.config.as_deref(), overrides, dry_run),
        Commands::Probe { ref file, json } => probe_file(&cli, file, json),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate { json, ref overrides } => validate(cli.config.as_deref(), overrides, json),
        Commands::Version => {
            println!("dasher {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// `logfile` from the configuration of a `run`, read before logging starts.
fn configured_log_file(cli: &Cli) -> Option<PathBuf> {
    let Commands::Run { overrides, .. } = &cli.command else {
        return None;
    };
    let overrides = parse_overrides(overrides).ok()?;
    config::load_config_or_default(cli.config.as_deref(), &overrides)
        .ok()?
        .log_file
}

fn parse_overrides(args: &[String]) -> Result<properties::Properties> {
    args.iter()
        .map(|arg| properties::parse_override(arg).with_context(|| format!("Invalid override '{}'", arg)))
        .collect()
}

fn run(config_path: Option<&Path>, overrides: &[String], dry_run: bool) -> Result<()> {
    let overrides = parse_overrides(overrides)?;
    let config = config::load_config_or_default(config_path, &overrides)?;

    let executor = pipeline::PipelineExecutor::new(config, dry_run)?;
    let summary = executor.execute()?;

    if dry_run {
        println!("[DRY RUN] Nothing was executed");
    }
    println!("Output: {}", executor.output().display());
    println!("Renditions: {}", summary.renditions);
    println!("DRM: {}", if summary.drm { "yes" } else { "no" });
    for manifest in &summary.manifests {
        println!("  {}", manifest.display());
    }
    Ok(())
}

fn probe_file(cli: &Cli, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = config::load_config_or_default(cli.config.as_deref(), &Default::default())
        .map(|c| c.tools)
        .unwrap_or_default();
    let ffprobe = dasher_av::get_tool_path(dasher_av::tools::FFPROBE, tools.ffprobe_path.as_deref())?;
    let metadata = dasher_av::probe(&ffprobe, file)?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = metadata
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        println!("File: {}", file.display());
        for (key, value) in metadata.to_pairs() {
            println!("{}: {}", key, value);
        }
        println!("GOP frame rate: {} fps", metadata.fps_or_default());
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = config::load_config_or_default(config_path, &Default::default())
        .map(|c| c.tools)
        .unwrap_or_default();
    let toolset = dasher_av::Toolset::unresolved(
        tools.ffmpeg_path.as_deref(),
        tools.ffprobe_path.as_deref(),
        tools.mp4box_path.as_deref(),
    );

    let mut all_ok = true;
    for tool in dasher_av::check_tools(&toolset) {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("Some tools are missing; install ffmpeg, ffprobe and MP4Box")
    }
}

fn validate(config_path: Option<&Path>, overrides: &[String], json: bool) -> Result<()> {
    let overrides = parse_overrides(overrides)?;
    let config = config::load_config_or_default(config_path, &overrides)?;
    let params = properties::to_properties(&config);

    if json {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    println!("✓ Configuration is valid");
    let specs = config.rendition_specs();
    println!("  Mode: {}", config.mode);
    println!(
        "  Renditions: {} ({} enabled)",
        specs.len(),
        specs.iter().filter(|s| s.enabled).count()
    );
    println!("  Secondary inputs: {}", config.inputs.len());
    println!("  Subtitles: {}", config.subtitles.len());
    println!("  DRM: {}", if config.drm.requested() { "requested" } else { "off" });
    for (key, value) in &params {
        println!("  {}={}", key, value);
    }
    Ok(())
}
