//! Core type definitions for renditions and subtitle tracks.
//!
//! Records in this module are created by configuration parsing and consumed
//! read-only by the transcoder, muxer, and post-processing stages. Enums are
//! serialized in lowercase so they can be named directly in config files.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Video codec used for every video rendition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 / AVC.
    #[default]
    H264,
    /// H.265 / HEVC.
    H265,
}

impl VideoCodec {
    /// Codec prefix used in the manifest `codecs` attribute.
    pub fn codecs_prefix(&self) -> &'static str {
        match self {
            Self::H264 => "avc1",
            Self::H265 => "hvc1",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "h264"),
            Self::H265 => write!(f, "h265"),
        }
    }
}

impl FromStr for VideoCodec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "h264" | "avc" => Ok(Self::H264),
            "h265" | "hevc" => Ok(Self::H265),
            other => Err(Error::invalid_input(format!("unknown video mode: {}", other))),
        }
    }
}

/// Video frame size in pixels, written `WxH` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (w, h) = lower
            .split_once('x')
            .ok_or_else(|| Error::invalid_input(format!("frame size must be WxH: {}", s)))?;
        let width = w
            .parse()
            .map_err(|_| Error::invalid_input(format!("invalid frame width: {}", s)))?;
        let height = h
            .parse()
            .map_err(|_| Error::invalid_input(format!("invalid frame height: {}", s)))?;
        Ok(Self { width, height })
    }
}

impl Serialize for FrameSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FrameSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Target bitrate in bits per second.
///
/// Parses the `512k` / `2M` notation used by ffmpeg and renders it back the
/// same way, so the value written to a command line matches the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bitrate(pub u64);

impl Bitrate {
    pub fn bits_per_second(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000 && self.0 % 1_000_000 == 0 {
            write!(f, "{}M", self.0 / 1_000_000)
        } else if self.0 >= 1000 && self.0 % 1000 == 0 {
            write!(f, "{}k", self.0 / 1000)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Bitrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (digits, multiplier) = match s.chars().last() {
            Some('k') | Some('K') => (&s[..s.len() - 1], 1000),
            Some('m') | Some('M') => (&s[..s.len() - 1], 1_000_000),
            _ => (s, 1),
        };
        digits
            .parse::<u64>()
            .map(|v| Self(v * multiplier))
            .map_err(|_| Error::invalid_input(format!("invalid bitrate: {}", s)))
    }
}

impl Serialize for Bitrate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bitrate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind-specific parameters of a rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionKind {
    Video {
        codec: VideoCodec,
        size: FrameSize,
        profile: Option<String>,
        level: Option<String>,
    },
    Audio {
        sample_rate: u32,
        channels: u32,
    },
}

/// One output rendition.
///
/// A disabled rendition is logged but never produces output files or
/// manifest entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSpec {
    /// Unique identifier, used in file names and Representation ids.
    pub name: String,
    pub kind: RenditionKind,
    pub bitrate: Bitrate,
    pub enabled: bool,
}

impl RenditionSpec {
    /// Create an enabled H.264 video rendition.
    pub fn h264(name: impl Into<String>, size: FrameSize, bitrate: Bitrate) -> Self {
        Self::video(name, VideoCodec::H264, size, bitrate)
    }

    /// Create an enabled video rendition.
    pub fn video(
        name: impl Into<String>,
        codec: VideoCodec,
        size: FrameSize,
        bitrate: Bitrate,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RenditionKind::Video {
                codec,
                size,
                profile: None,
                level: None,
            },
            bitrate,
            enabled: true,
        }
    }

    /// Create an enabled AAC audio rendition.
    pub fn aac(name: impl Into<String>, sample_rate: u32, bitrate: Bitrate, channels: u32) -> Self {
        Self {
            name: name.into(),
            kind: RenditionKind::Audio {
                sample_rate,
                channels,
            },
            bitrate,
            enabled: true,
        }
    }

    /// Set the encoder profile and level (video only).
    pub fn with_profile_level(mut self, new_profile: Option<String>, new_level: Option<String>) -> Self {
        if let RenditionKind::Video { profile, level, .. } = &mut self.kind {
            *profile = new_profile.filter(|p| !p.is_empty());
            *level = new_level.filter(|l| !l.is_empty());
        }
        self
    }

    /// Mark the rendition as disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_video(&self) -> bool {
        matches!(self.kind, RenditionKind::Video { .. })
    }

    pub fn is_audio(&self) -> bool {
        matches!(self.kind, RenditionKind::Audio { .. })
    }

    /// Content type name used by the muxer track selector and the manifest.
    pub fn content_type(&self) -> &'static str {
        if self.is_video() {
            "video"
        } else {
            "audio"
        }
    }

    /// Clone this rendition for a secondary input source.
    ///
    /// Every field is preserved except the name, which gets a `-<index>`
    /// suffix so file names stay unique.
    pub fn duplicate_for_input(&self, input_index: usize) -> Self {
        let mut spec = self.clone();
        spec.name = format!("{}-{}", self.name, input_index);
        spec
    }
}

/// How a subtitle document is attached to the presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleMode {
    /// Segmented and delivered as a timed track on the DASH timeline.
    Inband,
    /// Referenced as a single external file.
    Outband,
}

impl SubtitleMode {
    /// Manifest variant suffix (`manifest_subib.mpd`, `manifest_subob.mpd`).
    pub fn manifest_suffix(&self) -> &'static str {
        match self {
            Self::Inband => "subib",
            Self::Outband => "subob",
        }
    }
}

impl fmt::Display for SubtitleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inband => write!(f, "inband"),
            Self::Outband => write!(f, "outband"),
        }
    }
}

/// One configured subtitle track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleSpec {
    /// Representation id, also used as the segment directory name.
    pub id: String,
    /// Language tag (e.g. `fin`).
    pub lang: String,
    /// Path of the timed-text document.
    pub path: PathBuf,
    pub mode: SubtitleMode,
    pub enabled: bool,
}

impl SubtitleSpec {
    pub fn new(
        id: impl Into<String>,
        lang: impl Into<String>,
        path: impl Into<PathBuf>,
        mode: SubtitleMode,
    ) -> Self {
        Self {
            id: id.into(),
            lang: lang.into(),
            path: path.into(),
            mode,
            enabled: true,
        }
    }
}
