use dasher_common::{Bitrate, FrameSize, RenditionSpec, SubtitleMode, SubtitleSpec, VideoCodec};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Source media file.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Output folder (required, must not be `/`).
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Additional plain-text log of the whole run.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Video codec for every video rendition.
    #[serde(default)]
    pub mode: VideoCodec,

    /// Segment duration in seconds.
    #[serde(default = "default_segment_duration")]
    pub segment_duration: u32,

    /// Seconds between key frames.
    #[serde(default = "default_gop_duration")]
    pub gop_duration: u32,

    /// Burn rendition labels into the video.
    #[serde(default)]
    pub overlay: bool,

    /// Remove old `.m4s/.mp4/.mpd/.jpg` files before packaging.
    #[serde(default = "default_true")]
    pub delete_old_files: bool,

    /// Remove `temp-*.mp4` intermediates after packaging.
    #[serde(default = "default_true")]
    pub delete_temp_files: bool,

    #[serde(default)]
    pub video: Vec<VideoConfig>,

    #[serde(default)]
    pub audio: Vec<AudioConfig>,

    /// Secondary audio sources; every enabled audio rendition is repeated
    /// for each of them.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub drm: DrmConfig,

    #[serde(default)]
    pub subtitles: Vec<SubtitleConfig>,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_segment_duration() -> u32 {
    6
}

fn default_gop_duration() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            log_file: None,
            mode: VideoCodec::default(),
            segment_duration: default_segment_duration(),
            gop_duration: default_gop_duration(),
            overlay: false,
            delete_old_files: true,
            delete_temp_files: true,
            video: Vec::new(),
            audio: Vec::new(),
            inputs: Vec::new(),
            image: ImageConfig::default(),
            drm: DrmConfig::default(),
            subtitles: Vec::new(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Video renditions (in `mode`) followed by audio renditions.
    pub fn rendition_specs(&self) -> Vec<RenditionSpec> {
        let video = self.video.iter().map(|v| {
            let spec = RenditionSpec::video(&v.name, self.mode, v.size, v.bitrate)
                .with_profile_level(v.profile.clone(), v.level.clone());
            if v.enabled {
                spec
            } else {
                spec.disabled()
            }
        });
        let audio = self.audio.iter().map(|a| {
            let spec = RenditionSpec::aac(&a.name, a.sample_rate, a.bitrate, a.channels);
            if a.enabled {
                spec
            } else {
                spec.disabled()
            }
        });
        video.chain(audio).collect()
    }

    /// Subtitle tracks of one mode, in declaration order.
    pub fn subtitle_specs(&self, mode: SubtitleMode) -> Vec<SubtitleSpec> {
        self.subtitles
            .iter()
            .filter(|s| s.mode == mode)
            .map(|s| {
                let mut spec = SubtitleSpec::new(&s.id, &s.lang, &s.path, s.mode);
                spec.enabled = s.enabled;
                spec
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VideoConfig {
    pub name: String,

    pub size: FrameSize,

    pub bitrate: Bitrate,

    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AudioConfig {
    pub name: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    pub bitrate: Bitrate,

    #[serde(default = "default_channels")]
    pub channels: u32,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_channels() -> u32 {
    2
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ImageConfig {
    /// Position of the grabbed frame; no images when unset.
    #[serde(default)]
    pub seconds: Option<u32>,

    #[serde(default)]
    pub sizes: Vec<ImageSize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ImageSize {
    pub size: FrameSize,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DrmConfig {
    /// Key id as hex (dashes allowed) or `rng`.
    #[serde(default)]
    pub kid: Option<String>,

    /// Content key as hex or `rng`.
    #[serde(default)]
    pub key: Option<String>,

    /// IV as hex (8 or 16 bytes) or `rng`; random when unset.
    #[serde(default)]
    pub iv: Option<String>,

    #[serde(default)]
    pub playready_laurl: Option<String>,

    #[serde(default)]
    pub clearkey_laurl: Option<String>,

    #[serde(default = "default_true")]
    pub playready: bool,

    #[serde(default = "default_true")]
    pub widevine: bool,

    #[serde(default = "default_true")]
    pub marlin: bool,

    #[serde(default = "default_true")]
    pub clearkey: bool,

    /// Keep the generic MPEG-CENC ContentProtection element.
    #[serde(default)]
    pub cenc: bool,
}

impl Default for DrmConfig {
    fn default() -> Self {
        Self {
            kid: None,
            key: None,
            iv: None,
            playready_laurl: None,
            clearkey_laurl: None,
            playready: true,
            widevine: true,
            marlin: true,
            clearkey: true,
            cenc: false,
        }
    }
}

impl DrmConfig {
    /// Any key material configured at all.
    pub fn requested(&self) -> bool {
        non_empty(&self.kid) || non_empty(&self.key)
    }

    /// Both kid and key are present.
    pub fn check_key_material(&self) -> dasher_common::Result<()> {
        match (non_empty(&self.kid), non_empty(&self.key)) {
            (true, true) => Ok(()),
            (false, _) => Err(dasher_common::Error::missing_key_material("drm.kid")),
            (_, false) => Err(dasher_common::Error::missing_key_material("drm.key")),
        }
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SubtitleConfig {
    /// Representation id (also the segment folder name).
    pub id: String,

    pub lang: String,

    pub path: PathBuf,

    pub mode: SubtitleMode,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default)]
    pub mp4box_path: Option<PathBuf>,
}
