//! Output tree naming conventions.
//!
//! The transcoder, muxer, and post-processing stages only agree on file
//! names, so every name is built here.

use std::path::{Path, PathBuf};

/// Subfolder holding the encrypted presentation.
pub const DRM_DIR: &str = "drm";

/// Canonical manifest name.
pub const MANIFEST: &str = "manifest.mpd";

/// DRM manifest carrying only ClearKey/CENC signalling.
pub const MANIFEST_CLEARKEY: &str = "manifest_clearkey.mpd";

/// DRM manifest whose init URLs point at PSSH-free init segments.
pub const MANIFEST_NOPSSH: &str = "manifest_nopssh.mpd";

/// Encryption spec handed to the muxer's crypt pass.
pub const ENCRYPTION_SPEC: &str = "temp-gpacdrm.xml";

/// Init-segment template the muxer writes into SegmentTemplate.
pub const INIT_TEMPLATE: &str = "$RepresentationID$_i.mp4";

/// Init-segment template of the PSSH-free variant.
pub const INIT_TEMPLATE_NOPSSH: &str = "$RepresentationID$_i_nopssh.mp4";

/// Extensions removed when cleaning an output folder.
const OUTPUT_EXTENSIONS: &[&str] = &["m4s", "mp4", "mpd", "jpg"];

/// Intermediate rendition file written by the transcoder.
pub fn temp_rendition_name(name: &str) -> String {
    format!("temp-{}.mp4", name)
}

/// Init segment written by the muxer.
pub fn init_segment_name(name: &str) -> String {
    format!("{}_i.mp4", name)
}

/// Init segment with every PSSH box removed.
pub fn nopssh_init_segment_name(name: &str) -> String {
    format!("{}_i_nopssh.mp4", name)
}

/// Manifest variant with subtitles attached (`manifest_subib.mpd`).
pub fn subtitle_manifest_name(suffix: &str) -> String {
    format!("manifest_{}.mpd", suffix)
}

/// Preview image written for a frame size.
pub fn preview_image_name(size: &str) -> String {
    format!("image_{}.jpg", size)
}

/// DRM subfolder of an output folder.
pub fn drm_dir(output: &Path) -> PathBuf {
    output.join(DRM_DIR)
}

/// Check if a path is a packaging artifact that may be cleaned up.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use dasher_common::paths::is_output_artifact;
///
/// assert!(is_output_artifact(Path::new("v1_1.m4s")));
/// assert!(is_output_artifact(Path::new("manifest.mpd")));
/// assert!(!is_output_artifact(Path::new("sub_fin.xml")));
/// ```
pub fn is_output_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| OUTPUT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Delete packaging artifacts from a folder (not recursive).
///
/// Returns the number of files removed. A missing folder removes nothing.
pub fn delete_output_artifacts(folder: &Path) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut count = 0;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_output_artifact(&path) {
            std::fs::remove_file(&path)?;
            count += 1;
        }
    }
    Ok(count)
}
