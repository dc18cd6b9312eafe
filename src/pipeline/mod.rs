//! Packaging pipeline: transcode, segment, protect and subtitle one input.

pub mod drm;
pub mod executor;
pub mod subtitles;

pub use drm::{drm_descriptor, strip_init_segments, write_drm_manifests};
pub use executor::{PipelineExecutor, RunSummary};
pub use subtitles::attach_subtitles;
