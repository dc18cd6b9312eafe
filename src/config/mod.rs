pub mod properties;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use properties::{apply_properties, from_properties, parse_properties, Properties};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Load configuration from a TOML or `.properties` file, then apply
/// command-line `key=value` overrides.
pub fn load_config(path: &Path, overrides: &Properties) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = if is_properties(path) {
        let mut props = parse_properties(&content);
        props.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        from_properties(&props).with_context(|| format!("Failed to parse config file: {:?}", path))?
    } else {
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        apply_properties(&mut config, overrides).context("Invalid command-line override")?;
        config
    };

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations, or build it from overrides alone.
pub fn load_config_or_default(custom_path: Option<&Path>, overrides: &Properties) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path, overrides);
    }

    let default_paths = [
        "./dasher.toml",
        "./dasher.properties",
        "~/.config/dasher/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path, overrides);
        }
    }

    let mut config = from_properties(overrides).context("Invalid command-line override")?;
    expand_paths(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn is_properties(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("properties"))
}

/// Expand `~` in every configured path.
fn expand_paths(config: &mut Config) {
    for path in [&mut config.input, &mut config.output, &mut config.log_file]
        .into_iter()
        .flatten()
    {
        expand_tilde(path);
    }
    config.inputs.iter_mut().for_each(expand_tilde);
    config.subtitles.iter_mut().for_each(|s| expand_tilde(&mut s.path));
}

fn expand_tilde(path: &mut PathBuf) {
    if let Some(s) = path.to_str().filter(|s| s.starts_with('~')) {
        let expanded = PathBuf::from(shellexpand::tilde(s).as_ref());
        *path = expanded;
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let output = config
        .output
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Invalid output value ''"))?;
    if output == Path::new("/") {
        anyhow::bail!("Invalid output value '/'");
    }

    if config.input.is_none() {
        anyhow::bail!("No input file configured");
    }

    if config.segment_duration == 0 {
        anyhow::bail!("Segment duration cannot be 0");
    }
    if config.gop_duration == 0 {
        anyhow::bail!("GOP duration cannot be 0");
    }

    let mut names = HashSet::new();
    for video in &config.video {
        if video.size.width == 0 || video.size.height == 0 {
            anyhow::bail!("Video '{}' has an empty frame size", video.name);
        }
        if !names.insert(video.name.as_str()) {
            anyhow::bail!("Duplicate rendition name '{}'", video.name);
        }
    }
    for audio in &config.audio {
        if audio.sample_rate == 0 || audio.channels == 0 {
            anyhow::bail!("Audio '{}' needs a sample rate and channel count", audio.name);
        }
        if !names.insert(audio.name.as_str()) {
            anyhow::bail!("Duplicate rendition name '{}'", audio.name);
        }
    }

    let mut ids = HashSet::new();
    for subtitle in &config.subtitles {
        if !ids.insert((subtitle.mode, subtitle.id.as_str())) {
            anyhow::bail!("Duplicate subtitle id '{}'", subtitle.id);
        }
    }

    if !config.video.iter().any(|v| v.enabled) && !config.audio.iter().any(|a| a.enabled) {
        tracing::warn!("No enabled renditions configured");
    }

    Ok(())
}
