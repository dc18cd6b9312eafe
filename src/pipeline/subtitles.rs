use super::executor::PipelineExecutor;
use crate::config::Config;
use dasher_common::paths::{self, MANIFEST};
use dasher_common::SubtitleMode;
use dasher_media::SubtitleSegmenter;
use std::path::{Path, PathBuf};

/// One manifest family that subtitles are attached to.
struct Variant {
    dir: PathBuf,
    segmenter: SubtitleSegmenter,
}

/// Attach the configured subtitle tracks to the clear manifest and, when
/// DRM ran, to `drm/manifest.mpd`.
///
/// Segment files are written once, next to the clear manifest; the DRM
/// manifests refer to them through `../`. Each mode produces its own
/// `manifest_<suffix>.mpd`. A failing variant is logged and skipped.
pub fn attach_subtitles(config: &Config, output: &Path, drm_created: bool) -> Vec<PathBuf> {
    let mut variants = vec![Variant {
        dir: output.to_path_buf(),
        segmenter: SubtitleSegmenter::new(),
    }];
    if drm_created {
        variants.push(Variant {
            dir: paths::drm_dir(output),
            segmenter: SubtitleSegmenter::new().url_prefix("../").write_files(false),
        });
    }

    let mut written = Vec::new();
    for variant in &variants {
        for mode in [SubtitleMode::Inband, SubtitleMode::Outband] {
            let specs = config.subtitle_specs(mode);
            if specs.is_empty() {
                continue;
            }

            let input = variant.dir.join(MANIFEST);
            let target = variant.dir.join(paths::subtitle_manifest_name(mode.manifest_suffix()));
            match variant.segmenter.apply_chain(&input, &target, &specs, output) {
                Ok(0) => {}
                Ok(attached) => {
                    tracing::info!("Attached {} subtitle tracks to {}", attached, target.display());
                    written.push(target);
                }
                Err(e) => tracing::warn!("Failed to create {}: {}", target.display(), e),
            }
        }
    }
    written
}

impl PipelineExecutor {
    /// Stage 9.
    pub(super) fn attach_subtitles(&self, drm_created: bool) -> Vec<PathBuf> {
        if self.is_dry_run() {
            if !self.config.subtitles.is_empty() {
                tracing::info!("[DRY RUN] Would attach {} subtitle tracks", self.config.subtitles.len());
            }
            return Vec::new();
        }
        attach_subtitles(&self.config, &self.output, drm_created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubtitleConfig;

    const MANIFEST_XML: &str = r#"<?xml version="1.0"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" mediaPresentationDuration="PT12S">
  <Period id="p0">
    <AdaptationSet contentType="video" mimeType="video/mp4">
      <SegmentTemplate timescale="1000" duration="6000" startNumber="1" media="$RepresentationID$_$Number$.m4s" initialization="$RepresentationID$_i.mp4"/>
      <Representation id="v1" codecs="avc1.640028" bandwidth="512000"/>
    </AdaptationSet>
  </Period>
</MPD>
"#;

    const TTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tt xmlns="http://www.w3.org/ns/ttml" xml:lang="fi">
  <body><div>
    <p begin="00:00:01.000" end="00:00:03.000">Hei</p>
    <p begin="00:00:07.000" end="00:00:09.500">Moi</p>
  </div></body>
</tt>
"#;

    fn setup(dir: &Path) -> Config {
        std::fs::write(dir.join(MANIFEST), MANIFEST_XML).unwrap();
        std::fs::write(dir.join("sub_fin.xml"), TTML).unwrap();
        Config {
            subtitles: vec![SubtitleConfig {
                id: "sub_fin".into(),
                lang: "fin".into(),
                path: dir.join("sub_fin.xml"),
                mode: SubtitleMode::Outband,
                enabled: true,
            }],
            ..Config::default()
        }
    }

    #[test]
    fn test_no_subtitles_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST), MANIFEST_XML).unwrap();
        assert!(attach_subtitles(&Config::default(), dir.path(), false).is_empty());
        assert!(!dir.path().join("manifest_subob.mpd").exists());
    }

    #[test]
    fn test_outband_clear_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let written = attach_subtitles(&config, dir.path(), false);
        assert_eq!(written, vec![dir.path().join("manifest_subob.mpd")]);

        let xml = std::fs::read_to_string(&written[0]).unwrap();
        assert!(xml.contains("sub_fin"));
        // the clear manifest is left as it was
        let clear = std::fs::read_to_string(dir.path().join(MANIFEST)).unwrap();
        assert!(!clear.contains("sub_fin"));
    }

    #[test]
    fn test_drm_variant_failure_keeps_clear_variant() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        // no drm/manifest.mpd exists
        let written = attach_subtitles(&config, dir.path(), true);
        assert_eq!(written, vec![dir.path().join("manifest_subob.mpd")]);
    }
}
