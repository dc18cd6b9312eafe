//! Configuration loading from TOML and `.properties` files.

use dasher::config::{self, properties, Config};
use dasher_common::{SubtitleMode, VideoCodec};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const TOML_CONFIG: &str = r#"
input = "/media/clip.mp4"
output = "/var/dash/clip"
mode = "h265"
segment_duration = 4

[[video]]
name = "v1"
size = "1280x720"
bitrate = "3M"
profile = "main"

[[video]]
name = "v2"
size = "640x360"
bitrate = "800k"
enabled = false

[[audio]]
name = "a1"
bitrate = "128k"

[drm]
kid = "rng"
key = "rng"
marlin = false

[[subtitles]]
id = "sub_fin"
lang = "fin"
path = "/media/sub_fin.xml"
mode = "inband"
"#;

const PROPERTIES_CONFIG: &str = r#"
# clip packaging
input=/media/clip.mp4
output=/var/dash/clip
mode=h264
segdur=6
gopdur=2
video.profile=high
video.level=4.0
video.1="v1 1920x1080 5M"
video.2=v2 1280x720 3M
video.2.level=3.1
video.4=v4 640x360 800k disable
audio.1=a1 48000 128k 2
audio.3=a3 44100 96k 1
input.1=/media/commentary.mp4
image.seconds=4
image.1=1280x720
image.2=640x360 disable
subib.2=sub_fin fin /media/sub_fin.xml
subob.1=sub_swe swe /media/sub_swe.xml disable
drm.kid=43215678-1234-1234-1234-123412341234
drm.key=12341234123412341234123412341234
drm.cenc=1
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_toml_config() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "dasher.toml", TOML_CONFIG);

    let config = config::load_config(&path, &Default::default()).unwrap();
    assert_eq!(config.mode, VideoCodec::H265);
    assert_eq!(config.segment_duration, 4);
    assert_eq!(config.gop_duration, 3);
    assert!(config.delete_old_files);

    assert_eq!(config.video.len(), 2);
    assert_eq!(config.video[0].profile.as_deref(), Some("main"));
    assert!(!config.video[1].enabled);
    assert_eq!(config.audio[0].sample_rate, 48000);
    assert_eq!(config.audio[0].channels, 2);

    assert!(config.drm.requested());
    assert!(!config.drm.marlin);
    assert!(config.drm.playready);
    assert_eq!(config.subtitle_specs(SubtitleMode::Inband).len(), 1);
    assert!(config.subtitle_specs(SubtitleMode::Outband).is_empty());
}

#[test]
fn test_rendition_specs_order_video_then_audio() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "dasher.toml", TOML_CONFIG);
    let config = config::load_config(&path, &Default::default()).unwrap();

    let specs = config.rendition_specs();
    let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["v1", "v2", "a1"]);
    assert!(specs[0].is_video());
    assert!(!specs[1].enabled);
    assert!(specs[2].is_audio());
}

#[test]
fn test_load_properties_config() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "dasher.properties", PROPERTIES_CONFIG);

    let config = config::load_config(&path, &Default::default()).unwrap();
    assert_eq!(config.mode, VideoCodec::H264);
    assert_eq!(config.gop_duration, 2);

    // video.3 is missing but video.4 is still inside the probe window
    let names: Vec<_> = config.video.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["v1", "v2", "v4"]);
    assert_eq!(config.video[0].profile.as_deref(), Some("high"));
    assert_eq!(config.video[0].level.as_deref(), Some("4.0"));
    assert_eq!(config.video[1].level.as_deref(), Some("3.1"));
    assert!(!config.video[2].enabled);

    // audio stops at the first gap
    assert_eq!(config.audio.len(), 1);
    assert_eq!(config.inputs, vec![PathBuf::from("/media/commentary.mp4")]);

    assert_eq!(config.image.seconds, Some(4));
    assert_eq!(config.image.sizes.len(), 2);
    assert!(!config.image.sizes[1].enabled);

    let inband = config.subtitle_specs(SubtitleMode::Inband);
    assert_eq!(inband.len(), 1);
    assert_eq!(inband[0].id, "sub_fin");
    let outband = config.subtitle_specs(SubtitleMode::Outband);
    assert_eq!(outband.len(), 1);
    assert!(!outband[0].enabled);

    assert!(config.drm.cenc);
    assert!(config.drm.check_key_material().is_ok());
}

#[test]
fn test_overrides_win_over_file() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "dasher.toml", TOML_CONFIG);

    let overrides: properties::Properties = [
        ("mode", "h264"),
        ("output", "/var/dash/other"),
        ("audio.1", "a9 44100 64k 1"),
        ("subob.1", "sub_eng eng /media/sub_eng.xml"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let config = config::load_config(&path, &overrides).unwrap();
    assert_eq!(config.mode, VideoCodec::H264);
    assert_eq!(config.output, Some(PathBuf::from("/var/dash/other")));
    // video list untouched, audio list replaced
    assert_eq!(config.video.len(), 2);
    assert_eq!(config.audio.len(), 1);
    assert_eq!(config.audio[0].name, "a9");
    // only the outband entries were replaced
    assert_eq!(config.subtitle_specs(SubtitleMode::Inband).len(), 1);
    assert_eq!(config.subtitle_specs(SubtitleMode::Outband).len(), 1);
}

#[test]
fn test_invalid_output_rejected() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "dasher.properties", "input=/media/clip.mp4\noutput=/\n");
    assert!(config::load_config(&path, &Default::default()).is_err());

    let path = write(dir.path(), "empty.properties", "input=/media/clip.mp4\n");
    assert!(config::load_config(&path, &Default::default()).is_err());
}

#[test]
fn test_malformed_video_entry_rejected() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "dasher.properties",
        "input=/media/clip.mp4\noutput=/tmp/out\nvideo.1=v1 1280x720\n",
    );
    let err = config::load_config(&path, &Default::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("video.1"));
}

#[test]
fn test_invalid_toml_rejected() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "dasher.toml", "segment_duration = \"six\"");
    assert!(config::load_config(&path, &Default::default()).is_err());
}

#[test]
fn test_parameter_log_masks_key() {
    let config = Config {
        input: Some("/media/clip.mp4".into()),
        output: Some("/var/dash/clip".into()),
        drm: config::DrmConfig {
            kid: Some("rng".into()),
            key: Some("12341234123412341234123412341234".into()),
            ..Default::default()
        },
        ..Config::default()
    };
    let props = properties::to_properties(&config);
    assert_eq!(props.get("drm.key").map(String::as_str), Some("********"));
    assert_eq!(props.get("drm.kid").map(String::as_str), Some("rng"));
    assert_eq!(props.get("segdur").map(String::as_str), Some("6"));
}
