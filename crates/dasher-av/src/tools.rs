//! External tool detection and management.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Transcoder executable name.
pub const FFMPEG: &str = "ffmpeg";
/// Metadata reader executable name.
pub const FFPROBE: &str = "ffprobe";
/// Muxer/segmenter executable name.
pub const MP4BOX: &str = "MP4Box";

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use dasher_av::check_tool;
///
/// let info = check_tool("ffprobe");
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "-version")
}

/// Check if a tool is available using a custom version argument.
///
/// MP4Box prints its banner on stderr, so both streams are searched for
/// the first non-empty line.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let result = Command::new(name).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let version = stdout
                .lines()
                .chain(stderr.lines())
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|s| s.to_string());

            let path = which::which(name).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool the packaging pipeline invokes.
pub fn check_tools(tools: &Toolset) -> Vec<ToolInfo> {
    let mut infos = vec![
        check_tool(&tools.ffmpeg.to_string_lossy()),
        check_tool(&tools.ffprobe.to_string_lossy()),
        check_tool(&tools.mp4box.to_string_lossy()),
    ];
    for (info, name) in infos.iter_mut().zip([FFMPEG, FFPROBE, MP4BOX]) {
        info.name = name.to_string();
    }
    infos
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
///
/// A configured value that is not an existing file is itself looked up on
/// PATH (so `ffmpeg7` works as well as `/opt/ffmpeg/bin/ffmpeg`).
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        if let Ok(found) = which::which(path) {
            return Ok(found);
        }
    }

    require_tool(name)
}

/// Resolved executables for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolset {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub mp4box: PathBuf,
}

impl Default for Toolset {
    /// Bare executable names, resolved by the OS at spawn time.
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from(FFMPEG),
            ffprobe: PathBuf::from(FFPROBE),
            mp4box: PathBuf::from(MP4BOX),
        }
    }
}

impl Toolset {
    /// Resolve every tool, honouring configured overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] for the first tool that cannot be found.
    pub fn resolve(ffmpeg: Option<&Path>, ffprobe: Option<&Path>, mp4box: Option<&Path>) -> Result<Self> {
        let tools = Self {
            ffmpeg: get_tool_path(FFMPEG, ffmpeg)?,
            ffprobe: get_tool_path(FFPROBE, ffprobe)?,
            mp4box: get_tool_path(MP4BOX, mp4box)?,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Resolved tools: {:?}", tools);

        Ok(tools)
    }

    /// Use configured values (or the default names) without any lookup.
    pub fn unresolved(ffmpeg: Option<&Path>, ffprobe: Option<&Path>, mp4box: Option<&Path>) -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg: ffmpeg.map(Path::to_path_buf).unwrap_or(defaults.ffmpeg),
            ffprobe: ffprobe.map(Path::to_path_buf).unwrap_or(defaults.ffprobe),
            mp4box: mp4box.map(Path::to_path_buf).unwrap_or(defaults.mp4box),
        }
    }
}
