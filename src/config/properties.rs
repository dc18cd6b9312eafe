//! Legacy `key=value` configuration.
//!
//! A properties file and the `key=value` arguments given on the command line
//! form one flat map. Numbered families (`video.1`, `video.2`, ...) are read
//! once into the typed lists of [`Config`]; nothing downstream sees raw keys.
//!
//! Gap handling differs per family. `video`, `subib` and `subob` probe
//! indices `1..=5` before stopping at the first missing index, so `video.1`
//! and `video.4` alone are both read. `audio`, `input` and `image` stop at
//! the first gap.

use super::types::{AudioConfig, Config, ImageSize, SubtitleConfig, VideoConfig};
use dasher_common::{Bitrate, FrameSize, SubtitleMode, VideoCodec};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Indices always probed for window families before a gap ends the list.
pub const PROBE_WINDOW: usize = 5;

/// Value suffix that disables a numbered entry.
pub const DISABLE_SUFFIX: &str = "disable";

/// Flat property map, sorted by key.
pub type Properties = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("{key}: missing {field} in '{value}'")]
    MissingField {
        key: String,
        field: &'static str,
        value: String,
    },

    #[error("{key}: invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("expected key=value, got '{0}'")]
    Malformed(String),
}

impl PropertyError {
    fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GapPolicy {
    ProbeWindow,
    StopAtGap,
}

/// Parse properties text: `key=value` lines, `#`/`!` comments, blank lines.
///
/// Later keys win. Values may be wrapped in double quotes.
pub fn parse_properties(text: &str) -> Properties {
    let mut props = Properties::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }
    props
}

/// Parse one command-line `key=value` override.
pub fn parse_override(arg: &str) -> Result<(String, String), PropertyError> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), unquote(value.trim()).to_string()))
        }
        _ => Err(PropertyError::Malformed(arg.to_string())),
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Numbered entries `family.N` with their index, in index order.
fn indexed<'a>(props: &'a Properties, family: &str, policy: GapPolicy) -> Vec<(String, &'a str)> {
    let mut entries = Vec::new();
    for idx in 1.. {
        let key = format!("{}.{}", family, idx);
        match props.get(&key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            Some(value) => entries.push((key, value)),
            None if policy == GapPolicy::ProbeWindow && idx <= PROBE_WINDOW => continue,
            None => break,
        }
    }
    entries
}

/// Split a trailing `disable` off a value.
fn split_disabled(value: &str) -> (&str, bool) {
    match value.strip_suffix(DISABLE_SUFFIX) {
        Some(rest) => (rest.trim_end(), true),
        None => (value, false),
    }
}

fn field<'a>(key: &str, value: &str, parts: &[&'a str], idx: usize, name: &'static str) -> Result<&'a str, PropertyError> {
    parts.get(idx).copied().ok_or_else(|| PropertyError::MissingField {
        key: key.to_string(),
        field: name,
        value: value.to_string(),
    })
}

fn parse_field<T>(key: &str, value: &str, raw: &str) -> Result<T, PropertyError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| PropertyError::invalid(key, value, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, PropertyError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PropertyError::invalid(key, value, "expected 1 or 0")),
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `video.N="name WxH bitrate"`, with `video.N.profile` / `video.N.level`
/// falling back to `video.profile` / `video.level`.
fn parse_video(props: &Properties) -> Result<Vec<VideoConfig>, PropertyError> {
    let default_profile = props.get("video.profile").and_then(|v| optional(v));
    let default_level = props.get("video.level").and_then(|v| optional(v));

    indexed(props, "video", GapPolicy::ProbeWindow)
        .into_iter()
        .map(|(key, value)| {
            let (body, disabled) = split_disabled(value);
            let parts: Vec<&str> = body.split_whitespace().collect();
            let name = field(&key, value, &parts, 0, "name")?;
            let size: FrameSize = parse_field(&key, value, field(&key, value, &parts, 1, "size")?)?;
            let bitrate: Bitrate = parse_field(&key, value, field(&key, value, &parts, 2, "bitrate")?)?;

            let profile = props
                .get(&format!("{}.profile", key))
                .and_then(|v| optional(v))
                .or_else(|| default_profile.clone());
            let level = props
                .get(&format!("{}.level", key))
                .and_then(|v| optional(v))
                .or_else(|| default_level.clone());

            Ok(VideoConfig {
                name: name.to_string(),
                size,
                bitrate,
                profile,
                level,
                enabled: !disabled,
            })
        })
        .collect()
}

/// `audio.N="name samplerate bitrate channels"`.
fn parse_audio(props: &Properties) -> Result<Vec<AudioConfig>, PropertyError> {
    indexed(props, "audio", GapPolicy::StopAtGap)
        .into_iter()
        .map(|(key, value)| {
            let (body, disabled) = split_disabled(value);
            let parts: Vec<&str> = body.split_whitespace().collect();
            let name = field(&key, value, &parts, 0, "name")?;
            let sample_rate: u32 = parse_field(&key, value, field(&key, value, &parts, 1, "sample rate")?)?;
            let bitrate: Bitrate = parse_field(&key, value, field(&key, value, &parts, 2, "bitrate")?)?;
            let channels: u32 = parse_field(&key, value, field(&key, value, &parts, 3, "channels")?)?;
            Ok(AudioConfig {
                name: name.to_string(),
                sample_rate,
                bitrate,
                channels,
                enabled: !disabled,
            })
        })
        .collect()
}

fn parse_images(props: &Properties) -> Result<Vec<ImageSize>, PropertyError> {
    indexed(props, "image", GapPolicy::StopAtGap)
        .into_iter()
        .map(|(key, value)| {
            let (body, disabled) = split_disabled(value);
            let size: FrameSize = parse_field(&key, value, body.trim())?;
            Ok(ImageSize {
                size,
                enabled: !disabled,
            })
        })
        .collect()
}

/// `subib.N` / `subob.N` = `"repId lang path"`.
fn parse_subtitles(props: &Properties, mode: SubtitleMode) -> Result<Vec<SubtitleConfig>, PropertyError> {
    indexed(props, mode.manifest_suffix(), GapPolicy::ProbeWindow)
        .into_iter()
        .map(|(key, value)| {
            let (body, disabled) = split_disabled(value);
            let parts: Vec<&str> = body.split_whitespace().collect();
            Ok(SubtitleConfig {
                id: field(&key, value, &parts, 0, "representation id")?.to_string(),
                lang: field(&key, value, &parts, 1, "language")?.to_string(),
                path: PathBuf::from(field(&key, value, &parts, 2, "path")?),
                mode,
                enabled: !disabled,
            })
        })
        .collect()
}

/// Apply a property map on top of `config`.
///
/// Scalar keys overwrite single fields. A numbered family replaces the
/// corresponding list only when at least one of its entries is present.
pub fn apply_properties(config: &mut Config, props: &Properties) -> Result<(), PropertyError> {
    for (key, value) in props {
        let key = key.as_str();
        let value = value.as_str();
        match key {
            "input" => config.input = optional(value).map(PathBuf::from),
            "output" => config.output = optional(value).map(PathBuf::from),
            "logfile" => config.log_file = optional(value).map(PathBuf::from),
            "mode" => config.mode = parse_field::<VideoCodec>(key, value, value)?,
            "segdur" => config.segment_duration = parse_field(key, value, value.trim())?,
            "gopdur" => config.gop_duration = parse_field(key, value, value.trim())?,
            "overlay" => config.overlay = parse_bool(key, value)?,
            "deleteoldfiles" => config.delete_old_files = parse_bool(key, value)?,
            "deletetempfiles" => config.delete_temp_files = parse_bool(key, value)?,
            "image.seconds" => {
                let seconds: i64 = parse_field(key, value, value.trim())?;
                config.image.seconds = u32::try_from(seconds).ok();
            }
            "drm.kid" => config.drm.kid = optional(value),
            "drm.key" => config.drm.key = optional(value),
            "drm.iv" => config.drm.iv = optional(value),
            "drm.playready.laurl" => config.drm.playready_laurl = optional(value),
            "drm.clearkey.laurl" => config.drm.clearkey_laurl = optional(value),
            "drm.playready" => config.drm.playready = parse_bool(key, value)?,
            "drm.widevine" => config.drm.widevine = parse_bool(key, value)?,
            "drm.marlin" => config.drm.marlin = parse_bool(key, value)?,
            "drm.clearkey" => config.drm.clearkey = parse_bool(key, value)?,
            "drm.cenc" => config.drm.cenc = parse_bool(key, value)?,
            "tool.ffmpeg" => config.tools.ffmpeg_path = optional(value).map(PathBuf::from),
            "tool.ffprobe" => config.tools.ffprobe_path = optional(value).map(PathBuf::from),
            "tool.mp4box" => config.tools.mp4box_path = optional(value).map(PathBuf::from),
            _ => {}
        }
    }

    let video = parse_video(props)?;
    if !video.is_empty() {
        config.video = video;
    }
    let audio = parse_audio(props)?;
    if !audio.is_empty() {
        config.audio = audio;
    }
    let inputs: Vec<PathBuf> = indexed(props, "input", GapPolicy::StopAtGap)
        .into_iter()
        .map(|(_, value)| PathBuf::from(value))
        .collect();
    if !inputs.is_empty() {
        config.inputs = inputs;
    }
    let images = parse_images(props)?;
    if !images.is_empty() {
        config.image.sizes = images;
    }

    let inband = parse_subtitles(props, SubtitleMode::Inband)?;
    let outband = parse_subtitles(props, SubtitleMode::Outband)?;
    for (mode, list) in [(SubtitleMode::Inband, inband), (SubtitleMode::Outband, outband)] {
        if !list.is_empty() {
            config.subtitles.retain(|s| s.mode != mode);
            config.subtitles.extend(list);
        }
    }

    Ok(())
}

/// Build a config from properties alone.
pub fn from_properties(props: &Properties) -> Result<Config, PropertyError> {
    let mut config = Config::default();
    apply_properties(&mut config, props)?;
    Ok(config)
}

/// Render a config as properties, for the parameter log.
///
/// The content key is masked.
pub fn to_properties(config: &Config) -> Properties {
    let mut props = Properties::new();
    let mut set = |key: String, value: String| {
        props.insert(key, value);
    };
    let path = |p: &PathBuf| p.display().to_string();
    let flag = |b: bool| if b { "1" } else { "0" }.to_string();
    let suffix = |enabled: bool| if enabled { "" } else { " disable" };

    if let Some(input) = &config.input {
        set("input".into(), path(input));
    }
    if let Some(output) = &config.output {
        set("output".into(), path(output));
    }
    if let Some(log_file) = &config.log_file {
        set("logfile".into(), path(log_file));
    }
    set("mode".into(), config.mode.to_string());
    set("segdur".into(), config.segment_duration.to_string());
    set("gopdur".into(), config.gop_duration.to_string());
    set("overlay".into(), flag(config.overlay));
    set("deleteoldfiles".into(), flag(config.delete_old_files));
    set("deletetempfiles".into(), flag(config.delete_temp_files));

    for (i, v) in config.video.iter().enumerate() {
        let key = format!("video.{}", i + 1);
        if let Some(profile) = &v.profile {
            set(format!("{}.profile", key), profile.clone());
        }
        if let Some(level) = &v.level {
            set(format!("{}.level", key), level.clone());
        }
        set(key, format!("{} {} {}{}", v.name, v.size, v.bitrate, suffix(v.enabled)));
    }
    for (i, a) in config.audio.iter().enumerate() {
        set(
            format!("audio.{}", i + 1),
            format!("{} {} {} {}{}", a.name, a.sample_rate, a.bitrate, a.channels, suffix(a.enabled)),
        );
    }
    for (i, input) in config.inputs.iter().enumerate() {
        set(format!("input.{}", i + 1), path(input));
    }

    set(
        "image.seconds".into(),
        config.image.seconds.map(|s| s.to_string()).unwrap_or_else(|| "-1".into()),
    );
    for (i, image) in config.image.sizes.iter().enumerate() {
        set(format!("image.{}", i + 1), format!("{}{}", image.size, suffix(image.enabled)));
    }

    let drm = &config.drm;
    if let Some(kid) = &drm.kid {
        set("drm.kid".into(), kid.clone());
    }
    if drm.key.is_some() {
        set("drm.key".into(), "********".into());
    }
    if let Some(iv) = &drm.iv {
        set("drm.iv".into(), iv.clone());
    }
    if let Some(url) = &drm.playready_laurl {
        set("drm.playready.laurl".into(), url.clone());
    }
    if let Some(url) = &drm.clearkey_laurl {
        set("drm.clearkey.laurl".into(), url.clone());
    }
    set("drm.playready".into(), flag(drm.playready));
    set("drm.widevine".into(), flag(drm.widevine));
    set("drm.marlin".into(), flag(drm.marlin));
    set("drm.clearkey".into(), flag(drm.clearkey));
    set("drm.cenc".into(), flag(drm.cenc));

    for mode in [SubtitleMode::Inband, SubtitleMode::Outband] {
        let family = mode.manifest_suffix();
        for (i, s) in config.subtitles.iter().filter(|s| s.mode == mode).enumerate() {
            set(
                format!("{}.{}", family, i + 1),
                format!("{} {} {}{}", s.id, s.lang, path(&s.path), suffix(s.enabled)),
            );
        }
    }

    if let Some(p) = &config.tools.ffmpeg_path {
        set("tool.ffmpeg".into(), path(p));
    }
    if let Some(p) = &config.tools.ffprobe_path {
        set("tool.ffprobe".into(), path(p));
    }
    if let Some(p) = &config.tools.mp4box_path {
        set("tool.mp4box".into(), path(p));
    }

    props
}
