//! Common-encryption pass of the muxer.

use crate::command::ToolCommand;
use dasher_common::paths::{temp_rendition_name, DRM_DIR};
use dasher_common::RenditionSpec;
use std::path::Path;

/// Encrypt `temp-<name>.mp4` into `drm/temp-<name>.mp4` using the
/// encryption spec document `spec_file` (relative to the working folder).
pub fn crypt_command(mp4box: &Path, spec_file: &str, spec: &RenditionSpec) -> ToolCommand {
    let name = temp_rendition_name(&spec.name);
    ToolCommand::new("MP4Box", mp4box)
        .args(["-crypt", spec_file])
        .args(["-out".to_string(), format!("{}/{}", DRM_DIR, name)])
        .arg(name)
}
