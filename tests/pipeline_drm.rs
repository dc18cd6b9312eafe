//! Post-processing of a packaged DRM presentation: init segment stripping,
//! manifest variants and subtitle attachment.

use bytes::{BufMut, BytesMut};
use dasher::config::{Config, DrmConfig, SubtitleConfig};
use dasher::pipeline::{attach_subtitles, drm_descriptor, strip_init_segments, write_drm_manifests};
use dasher_common::{Bitrate, FrameSize, RenditionSpec, SubtitleMode, VideoCodec};
use dasher_media::mp4::{locate, BoxTree};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PACKAGED: &str = r#"<?xml version="1.0"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" minBufferTime="PT1.500S" type="static" mediaPresentationDuration="PT0H0M12.000S" profiles="urn:mpeg:dash:profile:isoff-live:2011">
  <Period duration="PT0H0M12.000S">
    <AdaptationSet segmentAlignment="true" maxWidth="640" maxHeight="360" par="16:9" lang="und">
      <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc" cenc:default_KID="43215678-1234-1234-1234-123412341234"/>
      <SegmentTemplate media="$RepresentationID$_$Number$.m4s" initialization="$RepresentationID$_i.mp4" timescale="1000" startNumber="1" duration="6000"/>
      <Representation id="v1" mimeType="video/mp4" codecs="avc3.42C01E" width="640" height="360" frameRate="25" sar="1:1" startWithSAP="1" bandwidth="512000"/>
    </AdaptationSet>
    <AdaptationSet segmentAlignment="true" lang="und">
      <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc" cenc:default_KID="43215678-1234-1234-1234-123412341234"/>
      <SegmentTemplate media="$RepresentationID$_$Number$.m4s" initialization="$RepresentationID$_i.mp4" timescale="48000" startNumber="1" duration="288000"/>
      <Representation id="a1" mimeType="audio/mp4" codecs="mp4a.40.2" audioSamplingRate="48000" startWithSAP="1" bandwidth="128000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

const TTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tt xmlns="http://www.w3.org/ns/ttml" xml:lang="fi">
  <body><div>
    <p begin="00:00:01.000" end="00:00:03.000">Hei</p>
    <p begin="00:00:07.000" end="00:00:09.500">Moi</p>
  </div></body>
</tt>
"#;

fn leaf(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32(8 + payload.len() as u32);
    buf.put_slice(kind);
    buf.put_slice(payload);
    buf.to_vec()
}

fn container(kind: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let body = children.concat();
    let mut buf = BytesMut::new();
    buf.put_u32(8 + body.len() as u32);
    buf.put_slice(kind);
    buf.put_slice(&body);
    buf.to_vec()
}

/// ftyp + moov { mvhd, trak { tkhd, senc }, pssh, pssh }
fn encrypted_init() -> Vec<u8> {
    let trak = container(b"trak", &[leaf(b"tkhd", &[1; 12]), leaf(b"senc", &[0xE1; 10])]);
    let moov = container(
        b"moov",
        &[
            leaf(b"mvhd", &[0; 20]),
            trak,
            leaf(b"pssh", &[0xAA; 40]),
            leaf(b"pssh", &[0xBB; 24]),
        ],
    );
    [leaf(b"ftyp", b"iso6dash"), moov].concat()
}

fn count(file: &Path, path: &str) -> usize {
    let data = fs::read(file).unwrap();
    let tree = BoxTree::parse(&data).unwrap();
    locate(&tree, &path.parse().unwrap()).len()
}

fn drm_config() -> DrmConfig {
    DrmConfig {
        kid: Some("43215678-1234-1234-1234-123412341234".into()),
        key: Some("12341234123412341234123412341234".into()),
        iv: Some("22bdb0063805260307ee5045c0f3835a".into()),
        playready_laurl: Some("https://lic.example/rightsmanager.asmx".into()),
        ..DrmConfig::default()
    }
}

fn specs() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec::h264("v1", FrameSize::new(640, 360), Bitrate(512_000)),
        RenditionSpec::aac("a1", 48000, Bitrate(128_000), 2),
        RenditionSpec::aac("a2", 48000, Bitrate(64_000), 2).disabled(),
    ]
}

#[test]
fn test_strip_init_segments() {
    let dir = tempdir().unwrap();
    for name in ["v1", "a1"] {
        fs::write(dir.path().join(format!("{}_i.mp4", name)), encrypted_init()).unwrap();
    }

    assert_eq!(strip_init_segments(dir.path(), &specs()), 2);

    let init = dir.path().join("v1_i.mp4");
    let nopssh = dir.path().join("v1_i_nopssh.mp4");
    assert_eq!(count(&init, "moov/trak/senc"), 0);
    assert_eq!(count(&init, "moov/pssh[*]"), 2);
    assert_eq!(count(&nopssh, "moov/pssh[*]"), 0);
    assert_eq!(count(&nopssh, "moov/trak/tkhd"), 1);
    // the disabled rendition is not touched
    assert!(!dir.path().join("a2_i_nopssh.mp4").exists());
}

#[test]
fn test_strip_continues_after_broken_segment() {
    let dir = tempdir().unwrap();
    // truncated box header
    fs::write(dir.path().join("v1_i.mp4"), [0u8, 0, 0, 64, b'm', b'o']).unwrap();
    fs::write(dir.path().join("a1_i.mp4"), encrypted_init()).unwrap();

    assert_eq!(strip_init_segments(dir.path(), &specs()), 1);
    assert!(dir.path().join("a1_i_nopssh.mp4").exists());
}

#[test]
fn test_strip_skips_missing_init_segment() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a1_i.mp4"), encrypted_init()).unwrap();

    assert_eq!(strip_init_segments(dir.path(), &specs()), 1);
    assert!(!dir.path().join("v1_i_nopssh.mp4").exists());
    assert!(dir.path().join("a1_i_nopssh.mp4").exists());
}

#[test]
fn test_drm_manifest_variants() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("manifest.mpd"), PACKAGED).unwrap();

    let descriptor = drm_descriptor(&drm_config()).unwrap().unwrap();
    let written = write_drm_manifests(dir.path(), &descriptor, VideoCodec::H264).unwrap();
    let names: Vec<_> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["manifest.mpd", "manifest_clearkey.mpd", "manifest_nopssh.mpd"]);

    let main = fs::read_to_string(dir.path().join("manifest.mpd")).unwrap();
    assert!(main.contains("MSPR 2.0"));
    assert!(main.contains("edef8ba9-79d6-4ace-a3c8-27dcd51d21ed"));
    assert!(main.contains("5E629AF5-38DA-4063-8977-97FFBD9902D4"));
    assert!(!main.contains("urn:mpeg:dash:mp4protection:2011"));
    assert!(!main.contains("avc3"));
    // PlayReady precedes Widevine
    let pr = main.find("9a04f079-9840-4286-ab92-e65be0885f95").unwrap();
    let wv = main.find("edef8ba9-79d6-4ace-a3c8-27dcd51d21ed").unwrap();
    assert!(pr < wv);

    let clearkey = fs::read_to_string(dir.path().join("manifest_clearkey.mpd")).unwrap();
    assert!(clearkey.contains("e2719d58-a985-b3c9-781a-b030af78d30e"));
    assert!(!clearkey.contains("MSPR 2.0"));
    assert!(!clearkey.contains("edef8ba9-79d6-4ace-a3c8-27dcd51d21ed"));

    let nopssh = fs::read_to_string(dir.path().join("manifest_nopssh.mpd")).unwrap();
    assert!(nopssh.contains("$RepresentationID$_i_nopssh.mp4"));
    assert!(nopssh.contains("MSPR 2.0"));
    assert!(!nopssh.contains("e2719d58-a985-b3c9-781a-b030af78d30e"));
}

#[test]
fn test_cenc_kept_when_requested() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("manifest.mpd"), PACKAGED).unwrap();

    let config = DrmConfig {
        cenc: true,
        clearkey: false,
        ..drm_config()
    };
    let descriptor = drm_descriptor(&config).unwrap().unwrap();
    let written = write_drm_manifests(dir.path(), &descriptor, VideoCodec::H264).unwrap();
    assert_eq!(written.len(), 2);
    assert!(!dir.path().join("manifest_clearkey.mpd").exists());

    let main = fs::read_to_string(dir.path().join("manifest.mpd")).unwrap();
    assert!(main.contains("urn:mpeg:dash:mp4protection:2011"));
}

#[test]
fn test_missing_drm_manifest_is_an_error() {
    let dir = tempdir().unwrap();
    let descriptor = drm_descriptor(&drm_config()).unwrap().unwrap();
    assert!(write_drm_manifests(dir.path(), &descriptor, VideoCodec::H264).is_err());
}

#[test]
fn test_inband_subtitles_shared_with_drm_manifest() {
    let dir = tempdir().unwrap();
    let drm_dir = dir.path().join("drm");
    fs::create_dir_all(&drm_dir).unwrap();
    fs::write(dir.path().join("manifest.mpd"), PACKAGED).unwrap();
    fs::write(drm_dir.join("manifest.mpd"), PACKAGED).unwrap();
    fs::write(dir.path().join("sub_fin.xml"), TTML).unwrap();

    let config = Config {
        subtitles: vec![SubtitleConfig {
            id: "sub_fin".into(),
            lang: "fin".into(),
            path: dir.path().join("sub_fin.xml"),
            mode: SubtitleMode::Inband,
            enabled: true,
        }],
        ..Config::default()
    };

    let written = attach_subtitles(&config, dir.path(), true);
    assert_eq!(
        written,
        vec![dir.path().join("manifest_subib.mpd"), drm_dir.join("manifest_subib.mpd")]
    );

    // 9.5s of cues on a 6s cadence
    assert!(dir.path().join("sub_fin/i.mp4").exists());
    assert!(dir.path().join("sub_fin/1.m4s").exists());
    assert!(dir.path().join("sub_fin/2.m4s").exists());
    assert!(!dir.path().join("sub_fin/3.m4s").exists());
    assert!(!drm_dir.join("sub_fin").exists());

    let clear = fs::read_to_string(dir.path().join("manifest_subib.mpd")).unwrap();
    assert!(clear.contains("$RepresentationID$/i.mp4"));
    assert!(!clear.contains("../$RepresentationID$"));
    let protected = fs::read_to_string(drm_dir.join("manifest_subib.mpd")).unwrap();
    assert!(protected.contains("../$RepresentationID$/i.mp4"));
}
