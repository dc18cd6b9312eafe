//! Input metadata via ffprobe.

use crate::command::ToolCommand;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Frame rate assumed when the input reports none.
pub const DEFAULT_FPS: u32 = 25;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
}

/// Metadata of the first video and first audio stream of an input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub container: Option<String>,
    pub duration: Option<Duration>,
    pub bitrate: Option<u64>,
    pub video_codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_fps: Option<f64>,
    pub audio_codec: Option<String>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
}

impl MediaMetadata {
    /// Whole frames per second used for GOP sizing, [`DEFAULT_FPS`] if unknown.
    pub fn fps_or_default(&self) -> u32 {
        self.video_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| fps.round() as u32)
            .unwrap_or(DEFAULT_FPS)
    }

    /// Key/value view for logging, in a fixed order. Unknown values are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key, value));
            }
        };
        push("container", self.container.clone());
        push("duration", self.duration.map(|d| format!("{:.3}", d.as_secs_f64())));
        push("bitrate", self.bitrate.map(|b| b.to_string()));
        push("videoCodec", self.video_codec.clone());
        push("videoWidth", self.width.map(|w| w.to_string()));
        push("videoHeight", self.height.map(|h| h.to_string()));
        push("videoFPS", self.video_fps.map(|f| format!("{:.3}", f)));
        push("audioCodec", self.audio_codec.clone());
        push("audioSampleRate", self.audio_sample_rate.map(|r| r.to_string()));
        push("audioChannels", self.audio_channels.map(|c| c.to_string()));
        pairs
    }
}

/// Build the ffprobe invocation for `input`.
pub fn probe_command(ffprobe: &Path, input: &Path) -> ToolCommand {
    ToolCommand::new("ffprobe", ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .path_arg(input)
}

/// Probe a media file using ffprobe.
pub fn probe(ffprobe: &Path, input: &Path) -> Result<MediaMetadata> {
    if !input.exists() {
        return Err(Error::file_not_found(input));
    }

    let output = probe_command(ffprobe, input).run()?;
    let json = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    parse_ffprobe_json(&json)
}

/// Parse ffprobe `-print_format json` output.
pub fn parse_ffprobe_json(json: &str) -> Result<MediaMetadata> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    let mut meta = MediaMetadata::default();

    if let Some(format) = output.format {
        meta.container = format.format_name;
        meta.duration = format
            .duration
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64);
        meta.bitrate = format.bit_rate.and_then(|s| s.parse().ok());
    }

    if let Some(video) = output.streams.iter().find(|s| s.codec_type == "video") {
        meta.video_codec = video.codec_name.clone();
        meta.width = video.width;
        meta.height = video.height;
        meta.video_fps = video
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate));
    }

    if let Some(audio) = output.streams.iter().find(|s| s.codec_type == "audio") {
        meta.audio_codec = audio.codec_name.clone();
        meta.audio_sample_rate = audio.sample_rate.as_deref().and_then(|s| s.parse().ok());
        meta.audio_channels = audio.channels;
    }

    Ok(meta)
}

/// Parse a `num/den` rational (`30000/1001`) or a plain number.
///
/// Zero denominators and zero rates (`0/0`) yield `None`.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate > 0.0 && rate.is_finite()).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "r_frame_rate": "50/1", "avg_frame_rate": "25/1"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "channels": 2, "sample_rate": "48000"}
        ],
        "format": {"filename": "in.mp4", "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                   "duration": "60.040000", "bit_rate": "4500000"}
    }"#;

    #[test]
    fn test_parse_sample() {
        let meta = parse_ffprobe_json(SAMPLE).unwrap();
        assert_eq!(meta.video_codec.as_deref(), Some("h264"));
        assert_eq!(meta.width, Some(1920));
        assert_eq!(meta.video_fps, Some(25.0));
        assert_eq!(meta.fps_or_default(), 25);
        assert_eq!(meta.audio_sample_rate, Some(48000));
        assert_eq!(meta.audio_channels, Some(2));
        assert_eq!(meta.bitrate, Some(4_500_000));
        assert!((meta.duration.unwrap().as_secs_f64() - 60.04).abs() < 1e-6);
    }

    #[test]
    fn test_default_fps_without_video() {
        let meta = parse_ffprobe_json(r#"{"streams": [{"codec_type": "audio"}]}"#).unwrap();
        assert_eq!(meta.video_fps, None);
        assert_eq!(meta.fps_or_default(), DEFAULT_FPS);
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("x/1"), None);
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert_eq!(ntsc.round() as u32, 30);
    }

    #[test]
    fn test_to_pairs_order() {
        let meta = parse_ffprobe_json(SAMPLE).unwrap();
        let keys: Vec<_> = meta.to_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.first(), Some(&"container"));
        assert!(keys.contains(&"videoFPS"));
    }

    #[test]
    fn test_probe_missing_file() {
        let err = probe(Path::new("ffprobe"), Path::new("/nonexistent/input.mp4")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
