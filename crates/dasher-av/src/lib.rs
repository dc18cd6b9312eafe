//! # dasher-av
//!
//! External-process collaborators of the dasher packaging pipeline.
//!
//! This crate provides:
//! - Detection of the transcoder (`ffmpeg`), metadata reader (`ffprobe`)
//!   and muxer/segmenter (`MP4Box`), with configured path overrides
//! - Input metadata (frame rate, duration) read through ffprobe
//! - Command builders for transcoding, DASH segmenting, common encryption
//!   and preview images
//! - A blocking [`Runner`] that logs every command line and maps a non-zero
//!   exit to [`Error::ToolFailed`]
//!
//! ## Features
//!
//! - `tracing` - Log command lines and results through `tracing`
//!
//! ## Example
//!
//! ```no_run
//! use dasher_av::{actions, Runner, Toolset};
//!
//! let tools = Toolset::resolve(None, None, None)?;
//! let cmd = actions::dash_command(&tools.mp4box, &[], 6).current_dir("/var/dash/out");
//! Runner::new().run(&cmd)?;
//! # Ok::<(), dasher_av::Error>(())
//! ```

pub mod actions;
pub mod command;
mod error;
pub mod probe;
pub mod tools;

// Re-exports
pub use command::{Runner, ToolCommand};
pub use error::{Error, Result};
pub use probe::{probe, MediaMetadata, DEFAULT_FPS};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo, Toolset};
