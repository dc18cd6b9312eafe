//! Dasher-Common: Shared types, naming conventions, and errors.
//!
//! This crate provides the data model consumed read-only by every stage of
//! the packaging pipeline:
//!
//! - **Rendition specs**: one typed record per output rendition (video or audio)
//! - **Subtitle specs**: one typed record per configured subtitle track
//! - **Path conventions**: the file names the transcoder and muxer agree on
//! - **Error handling**: common error type and result alias
//!
//! # Examples
//!
//! ```
//! use dasher_common::{RenditionSpec, FrameSize};
//! use dasher_common::paths::init_segment_name;
//!
//! let spec = RenditionSpec::h264("v1", FrameSize::new(640, 360), "512k".parse().unwrap());
//! assert_eq!(init_segment_name(&spec.name), "v1_i.mp4");
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
