//! Attaching subtitle tracks to a manifest.

use std::path::{Path, PathBuf};

use dasher_common::{SubtitleMode, SubtitleSpec};
use tracing::{debug, info};

use super::ttml::SubtitleDocument;
use crate::error::{Error, Result};
use crate::fmp4::{SubtitleFragmentBuilder, SubtitleInitBuilder};
use crate::fsutil::write_atomic;
use crate::mpd::{Element, ManifestDocument, SegmentTiming};

const ROLE_SCHEME: &str = "urn:mpeg:dash:role:2011";
const SUBTITLE_BANDWIDTH: &str = "3000";
const SUBTITLE_TRACK_ID: u32 = 1;

/// One inband subtitle segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleSegment {
    /// Segment number, starting at 1.
    pub number: u64,
    /// Start in seconds.
    pub start: f64,
    /// Covered duration in seconds.
    pub duration: f64,
    /// File path relative to the output folder.
    pub path: PathBuf,
}

/// Split `[0, end)` into windows of `timing`'s duration. The last window
/// may be shorter.
pub fn plan_segments(id: &str, end: f64, timing: &SegmentTiming) -> Vec<SubtitleSegment> {
    let seg = timing.duration_secs();
    if end <= 0.0 || seg <= 0.0 {
        return Vec::new();
    }
    // Tolerate float noise at an exact multiple of the segment duration.
    let count = ((end / seg) - 1e-9).ceil().max(1.0) as u64;
    (0..count)
        .map(|i| {
            let start = i as f64 * seg;
            SubtitleSegment {
                number: i + 1,
                start,
                duration: (end - start).min(seg),
                path: Path::new(id).join(format!("{}.m4s", i + 1)),
            }
        })
        .collect()
}

/// Inserts subtitle tracks into manifests.
#[derive(Debug, Clone)]
pub struct SubtitleSegmenter {
    url_prefix: String,
    write_files: bool,
}

impl Default for SubtitleSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SubtitleSegmenter {
    pub fn new() -> Self {
        Self {
            url_prefix: String::new(),
            write_files: true,
        }
    }

    /// Prefix for every URL written into the manifest (e.g. `../`).
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Whether segment files are written (inband) or the document copied
    /// (outband). Disable when a second manifest reuses existing files.
    pub fn write_files(mut self, write: bool) -> Self {
        self.write_files = write;
        self
    }

    /// Attach one subtitle track according to its mode.
    pub fn insert(
        &self,
        manifest: &mut ManifestDocument,
        spec: &SubtitleSpec,
        output_dir: &Path,
    ) -> Result<Vec<SubtitleSegment>> {
        let removed = manifest.remove_adaptation_sets_with_representation(&spec.id);
        if removed > 0 {
            debug!("Replacing existing subtitle AdaptationSet for {}", spec.id);
        }
        match spec.mode {
            SubtitleMode::Inband => self.insert_inband(manifest, spec, output_dir),
            SubtitleMode::Outband => self.insert_outband(manifest, spec, output_dir).map(|_| Vec::new()),
        }
    }

    /// Segment the document on the manifest's cadence and register an
    /// `stpp` AdaptationSet.
    pub fn insert_inband(
        &self,
        manifest: &mut ManifestDocument,
        spec: &SubtitleSpec,
        output_dir: &Path,
    ) -> Result<Vec<SubtitleSegment>> {
        let timing = manifest
            .segment_timing()
            .ok_or_else(|| Error::invalid_subtitle("manifest has no SegmentTemplate duration"))?;
        let document = SubtitleDocument::open(&spec.path)?;
        if document.cues().is_empty() {
            return Err(Error::invalid_subtitle(format!("{} has no timed cues", spec.path.display())));
        }

        let segments = plan_segments(&spec.id, document.end_time(), &timing);
        if self.write_files {
            write_segments(&document, spec, &timing, &segments, output_dir)?;
        }

        let prefix = &self.url_prefix;
        let set = Element::new("AdaptationSet")
            .with_attr("contentType", "text")
            .with_attr("mimeType", "application/mp4")
            .with_attr("lang", &spec.lang)
            .with_attr("segmentAlignment", "true")
            .with_attr("startWithSAP", "1")
            .with_child(
                Element::new("Role")
                    .with_attr("schemeIdUri", ROLE_SCHEME)
                    .with_attr("value", "subtitle"),
            )
            .with_child(
                Element::new("SegmentTemplate")
                    .with_attr("timescale", timing.timescale.to_string())
                    .with_attr("duration", timing.duration.to_string())
                    .with_attr("startNumber", "1")
                    .with_attr("media", format!("{}$RepresentationID$/$Number$.m4s", prefix))
                    .with_attr("initialization", format!("{}$RepresentationID$/i.mp4", prefix)),
            )
            .with_child(
                Element::new("Representation")
                    .with_attr("id", &spec.id)
                    .with_attr("codecs", "stpp")
                    .with_attr("bandwidth", SUBTITLE_BANDWIDTH)
                    .with_attr("startWithSAP", "1"),
            );
        manifest.add_adaptation_set(set)?;

        info!(
            "Inband subtitle {} ({}): {} segments of {}s",
            spec.id,
            spec.lang,
            segments.len(),
            timing.duration_secs()
        );
        Ok(segments)
    }

    /// Register the document as a single referenced file.
    pub fn insert_outband(&self, manifest: &mut ManifestDocument, spec: &SubtitleSpec, output_dir: &Path) -> Result<()> {
        let file_name = spec
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::invalid_subtitle(format!("{} has no file name", spec.path.display())))?;

        if self.write_files {
            let target = output_dir.join(file_name);
            if is_same_file(&spec.path, &target) {
                debug!("{} is already in the output folder", spec.path.display());
            } else {
                let data = std::fs::read(&spec.path)?;
                write_atomic(&target, &data)?;
                debug!("Copied {} -> {}", spec.path.display(), target.display());
            }
        }

        let set = Element::new("AdaptationSet")
            .with_attr("contentType", "text")
            .with_attr("mimeType", "application/ttml+xml")
            .with_attr("lang", &spec.lang)
            .with_child(
                Element::new("Role")
                    .with_attr("schemeIdUri", ROLE_SCHEME)
                    .with_attr("value", "subtitle"),
            )
            .with_child(
                Element::new("Representation")
                    .with_attr("id", &spec.id)
                    .with_attr("bandwidth", SUBTITLE_BANDWIDTH)
                    .with_child(
                        Element::new("BaseURL").with_text(format!("{}{}", self.url_prefix, file_name)),
                    ),
            );
        manifest.add_adaptation_set(set)?;

        info!("Outband subtitle {} ({}): {}{}", spec.id, spec.lang, self.url_prefix, file_name);
        Ok(())
    }

    /// Apply `specs` in order. The first reads `input`, each later one
    /// reads the previous result; everything is saved to `output`.
    ///
    /// Returns the number of tracks attached. Disabled specs are skipped.
    pub fn apply_chain(&self, input: &Path, output: &Path, specs: &[SubtitleSpec], output_dir: &Path) -> Result<usize> {
        let mut attached = 0;
        for spec in specs {
            if !spec.enabled {
                info!("Subtitle {} disabled, skipping", spec.id);
                continue;
            }
            let source = if attached == 0 { input } else { output };
            let mut manifest = ManifestDocument::open(source)?;
            self.insert(&mut manifest, spec, output_dir)?;
            manifest.save(output)?;
            attached += 1;
        }
        Ok(attached)
    }
}

/// Whether both paths resolve to one existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn write_segments(
    document: &SubtitleDocument,
    spec: &SubtitleSpec,
    timing: &SegmentTiming,
    segments: &[SubtitleSegment],
    output_dir: &Path,
) -> Result<()> {
    let track_dir = output_dir.join(&spec.id);
    std::fs::create_dir_all(&track_dir)?;

    let init = SubtitleInitBuilder::new(timing.timescale as u32)
        .track_id(SUBTITLE_TRACK_ID)
        .language(&spec.lang)
        .build();
    write_atomic(&track_dir.join("i.mp4"), &init)?;

    for segment in segments {
        let ttml = document.window(segment.start, segment.start + segment.duration)?;
        let start_ticks = (segment.number - 1) * timing.duration;
        let ticks = (segment.duration * timing.timescale as f64).round() as u32;
        let data = SubtitleFragmentBuilder::new(segment.number as u32, SUBTITLE_TRACK_ID)
            .base_media_decode_time(start_ticks)
            .duration(ticks)
            .build(ttml.as_bytes());
        write_atomic(&output_dir.join(&segment.path), &data)?;
    }
    debug!("Wrote {} subtitle segments to {}", segments.len(), track_dir.display());
    Ok(())
}
