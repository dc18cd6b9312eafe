//! Muxer/segmenter (MP4Box) DASH invocation.

use crate::command::ToolCommand;
use dasher_common::paths::{temp_rendition_name, MANIFEST};
use dasher_common::RenditionSpec;
use std::path::Path;

/// Segment naming: `<id>_<n>.m4s` media, `<id>_i.mp4` init.
pub const SEGMENT_NAME: &str = "$RepresentationID$_$Number$$Init=i$";

/// DASH profile written into the manifest by the muxer.
pub const DASH_PROFILE: &str = "dashavc264:live";

/// Segment every enabled rendition's `temp-<name>.mp4` into `manifest.mpd`.
///
/// Runs in the folder holding the intermediate files; disabled renditions
/// are left out.
pub fn dash_command(mp4box: &Path, specs: &[RenditionSpec], segment_secs: u32) -> ToolCommand {
    let segment_ms = (segment_secs.max(1) * 1000).to_string();

    let mut cmd = ToolCommand::new("MP4Box", mp4box)
        .args(["-dash", segment_ms.as_str(), "-frag", segment_ms.as_str(), "-rap"])
        .args(["-profile", DASH_PROFILE])
        .args(["-bs-switching", "no"])
        .args(["-segment-name", SEGMENT_NAME])
        .args(["-segment-ext", "m4s"])
        .arg("-url-template")
        .args(["-out", MANIFEST]);

    for spec in specs.iter().filter(|s| s.enabled) {
        cmd = cmd.arg(format!(
            "{}#{}:id={}",
            temp_rendition_name(&spec.name),
            spec.content_type(),
            spec.name
        ));
    }
    cmd
}
