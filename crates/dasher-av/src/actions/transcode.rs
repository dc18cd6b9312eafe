//! Transcoder (ffmpeg) invocations: one intermediate MP4 per rendition.

use crate::command::{Runner, ToolCommand};
use crate::{Error, Result};
use dasher_common::paths::temp_rendition_name;
use dasher_common::{Bitrate, RenditionKind, RenditionSpec, VideoCodec};
use std::path::Path;

/// GOP and overlay settings shared by every video rendition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// Input frames per second.
    pub fps: u32,
    /// Seconds between forced key frames.
    pub gop_secs: u32,
    /// Burn a rendition label and timecode into the picture.
    pub overlay: bool,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            fps: crate::probe::DEFAULT_FPS,
            gop_secs: 3,
            overlay: false,
        }
    }
}

impl TranscodeOptions {
    /// GOP length in frames, never zero.
    pub fn gop_frames(&self) -> u32 {
        (self.fps * self.gop_secs).max(1)
    }
}

/// Transcode one video rendition into `temp-<name>.mp4` (audio dropped).
///
/// The command runs inside the output folder, so `input` should be absolute.
pub fn video_command(
    ffmpeg: &Path,
    input: &Path,
    spec: &RenditionSpec,
    options: &TranscodeOptions,
) -> Result<ToolCommand> {
    let RenditionKind::Video {
        codec,
        size,
        profile,
        level,
    } = &spec.kind
    else {
        return Err(Error::invalid_input(format!("{} is not a video rendition", spec.name)));
    };

    let gop_frames = options.gop_frames().to_string();
    let gop = gop_frames.as_str();
    let mut cmd = ToolCommand::new("ffmpeg", ffmpeg)
        .args(["-hide_banner", "-nostats", "-y"])
        .arg("-i")
        .path_arg(input)
        .args(["-threads", "4", "-preset", "fast"]);

    cmd = match codec {
        VideoCodec::H264 => cmd
            .args(["-c:v", "libx264"])
            .args(["-g", gop, "-keyint_min", gop, "-sc_threshold", "0"])
            .args(["-flags", "+cgop"]),
        VideoCodec::H265 => cmd.args(["-c:v", "libx265"]).args([
            "-x265-params".to_string(),
            format!("keyint={gop}:min-keyint={gop}:scenecut=0:open-gop=0"),
        ]),
    };

    if let Some(profile) = profile {
        cmd = cmd.args(["-profile:v", profile.as_str()]);
    }
    if let Some(level) = level {
        cmd = cmd.args(["-level:v", level.as_str()]);
    }

    let bufsize = Bitrate(spec.bitrate.bits_per_second() * 2);
    cmd = cmd
        .args(["-pix_fmt", "yuv420p"])
        .args(["-s".to_string(), size.to_string()])
        .args(["-b:v".to_string(), spec.bitrate.to_string()])
        .args(["-maxrate".to_string(), spec.bitrate.to_string()])
        .args(["-bufsize".to_string(), bufsize.to_string()]);

    if options.overlay {
        cmd = cmd.args(["-vf".to_string(), overlay_filter(spec)]);
    }

    Ok(cmd.args(["-an", "-movflags", "+faststart"]).arg(temp_rendition_name(&spec.name)))
}

/// Transcode one audio rendition into `temp-<name>.mp4` (video dropped).
pub fn audio_command(ffmpeg: &Path, input: &Path, spec: &RenditionSpec) -> Result<ToolCommand> {
    let RenditionKind::Audio {
        sample_rate,
        channels,
    } = &spec.kind
    else {
        return Err(Error::invalid_input(format!("{} is not an audio rendition", spec.name)));
    };

    Ok(ToolCommand::new("ffmpeg", ffmpeg)
        .args(["-hide_banner", "-nostats", "-y"])
        .arg("-i")
        .path_arg(input)
        .args(["-vn", "-c:a", "aac"])
        .args(["-b:a".to_string(), spec.bitrate.to_string()])
        .args(["-ar".to_string(), sample_rate.to_string()])
        .args(["-ac".to_string(), channels.to_string()])
        .args(["-movflags", "+faststart"])
        .arg(temp_rendition_name(&spec.name)))
}

/// Transcode any rendition kind.
pub fn transcode_command(
    ffmpeg: &Path,
    input: &Path,
    spec: &RenditionSpec,
    options: &TranscodeOptions,
) -> Result<ToolCommand> {
    if spec.is_video() {
        video_command(ffmpeg, input, spec, options)
    } else {
        audio_command(ffmpeg, input, spec)
    }
}

/// Label and running timecode, top-left.
fn overlay_filter(spec: &RenditionSpec) -> String {
    let label = match &spec.kind {
        RenditionKind::Video { size, .. } => format!("{} {} {}", spec.name, size, spec.bitrate),
        RenditionKind::Audio { .. } => spec.name.clone(),
    };
    format!(
        "drawtext=text='{}':x=20:y=20:fontsize=32:fontcolor=white:box=1:boxcolor=black@0.5,\
         drawtext=text='%{{pts\\:hms}}':x=20:y=60:fontsize=32:fontcolor=white:box=1:boxcolor=black@0.5",
        label
    )
}

/// Stream-copy `temp-<name>.mp4` into `scratch` with its HEVC sample entry
/// retagged to `hvc1`.
pub fn hvc1_retag_command(ffmpeg: &Path, name: &str, scratch: &str) -> ToolCommand {
    ToolCommand::new("ffmpeg", ffmpeg)
        .args(["-hide_banner", "-nostats", "-y"])
        .arg("-i")
        .arg(temp_rendition_name(name))
        .args(["-c", "copy", "-tag:v", "hvc1", "-f", "mp4"])
        .arg(scratch)
}

/// Retag `folder/temp-<name>.mp4` from `hev1` to `hvc1` in place.
///
/// The copy goes to a scratch file in the same folder which then replaces
/// the original atomically. In dry-run mode only the command is logged.
pub fn retag_hvc1(runner: &Runner, ffmpeg: &Path, folder: &Path, name: &str) -> Result<()> {
    let scratch = tempfile::Builder::new()
        .prefix("temp-hvc1-")
        .suffix(".mp4")
        .tempfile_in(folder)?;
    let scratch_name = scratch
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::invalid_input("scratch file has no name"))?;

    let cmd = hvc1_retag_command(ffmpeg, name, &scratch_name).current_dir(folder);
    if !runner.run(&cmd)? {
        return Ok(());
    }

    let target = folder.join(temp_rendition_name(name));
    scratch.persist(&target).map_err(|e| e.error)?;

    #[cfg(feature = "tracing")]
    tracing::info!("Retagged {} as hvc1", target.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dasher_common::FrameSize;

    fn v1() -> RenditionSpec {
        RenditionSpec::h264("v1", FrameSize::new(640, 360), Bitrate(512_000))
    }

    #[test]
    fn test_h264_gop_and_output() {
        let options = TranscodeOptions {
            fps: 25,
            gop_secs: 3,
            overlay: false,
        };
        let cmd = video_command(Path::new("ffmpeg"), Path::new("/in/src.mp4"), &v1(), &options).unwrap();
        assert_eq!(cmd.value_of("-i"), Some("/in/src.mp4"));
        assert_eq!(cmd.value_of("-c:v"), Some("libx264"));
        assert_eq!(cmd.value_of("-g"), Some("75"));
        assert_eq!(cmd.value_of("-s"), Some("640x360"));
        assert_eq!(cmd.value_of("-b:v"), Some("512k"));
        assert_eq!(cmd.value_of("-bufsize"), Some("1024k"));
        assert_eq!(cmd.get_args().last().map(String::as_str), Some("temp-v1.mp4"));
        assert!(cmd.position("-vf").is_none());
        assert!(cmd.position("-profile:v").is_none());
    }

    #[test]
    fn test_h265_profile_level_overlay() {
        let spec = RenditionSpec::video("v2", VideoCodec::H265, FrameSize::new(1280, 720), Bitrate(2_000_000))
            .with_profile_level(Some("main".into()), Some("4.0".into()));
        let options = TranscodeOptions {
            fps: 30,
            gop_secs: 2,
            overlay: true,
        };
        let cmd = video_command(Path::new("ffmpeg"), Path::new("src.mp4"), &spec, &options).unwrap();
        assert_eq!(cmd.value_of("-c:v"), Some("libx265"));
        assert_eq!(
            cmd.value_of("-x265-params"),
            Some("keyint=60:min-keyint=60:scenecut=0:open-gop=0")
        );
        assert_eq!(cmd.value_of("-profile:v"), Some("main"));
        assert_eq!(cmd.value_of("-level:v"), Some("4.0"));
        assert!(cmd.value_of("-vf").unwrap().contains("v2 1280x720 2M"));
    }

    #[test]
    fn test_audio_command() {
        let spec = RenditionSpec::aac("a1", 48000, Bitrate(128_000), 2);
        let cmd = audio_command(Path::new("ffmpeg"), Path::new("src.mp4"), &spec).unwrap();
        assert_eq!(cmd.value_of("-c:a"), Some("aac"));
        assert_eq!(cmd.value_of("-b:a"), Some("128k"));
        assert_eq!(cmd.value_of("-ar"), Some("48000"));
        assert_eq!(cmd.value_of("-ac"), Some("2"));
        assert!(cmd.position("-vn").is_some());
        assert_eq!(cmd.get_args().last().map(String::as_str), Some("temp-a1.mp4"));
    }

    #[test]
    fn test_kind_mismatch() {
        let audio = RenditionSpec::aac("a1", 48000, Bitrate(128_000), 2);
        assert!(video_command(Path::new("ffmpeg"), Path::new("x"), &audio, &TranscodeOptions::default()).is_err());
        assert!(audio_command(Path::new("ffmpeg"), Path::new("x"), &v1()).is_err());
    }

    #[test]
    fn test_hvc1_retag_command() {
        let cmd = hvc1_retag_command(Path::new("ffmpeg"), "v1", "scratch.mp4");
        assert_eq!(cmd.value_of("-i"), Some("temp-v1.mp4"));
        assert_eq!(cmd.value_of("-tag:v"), Some("hvc1"));
        assert_eq!(cmd.value_of("-c"), Some("copy"));
    }

    #[test]
    fn test_retag_dry_run_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("temp-v1.mp4"), b"hev1").unwrap();
        retag_hvc1(&Runner::dry_run(), Path::new("ffmpeg"), dir.path(), "v1").unwrap();
        assert_eq!(std::fs::read(dir.path().join("temp-v1.mp4")).unwrap(), b"hev1");
        // the scratch file is dropped again
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }
}
