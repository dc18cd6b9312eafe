//! Dasher-Media: post-processing of packaged DASH presentations
//!
//! Everything here runs after the muxer has produced segments and a first
//! manifest. It operates on files and in-memory documents only and never
//! spawns processes.
//!
//! # Modules
//!
//! - `mp4` - ISO-BMFF box tree parsing and path-addressed box removal
//! - `mpd` - MPD manifest corrections and ContentProtection editing
//! - `drm` - key material, PSSH/PlayReady headers, per-system signalling
//! - `subtitle` - TTML parsing, segmenting and manifest insertion
//! - `fmp4` - init/media segment writers for `stpp` subtitle tracks
//!
//! # Manifest variants
//!
//! A DRM run produces several manifests from one packaged manifest. They
//! are derived in a fixed order so that they stay consistent:
//!
//! 1. `fix_content` on the packaged manifest
//! 2. namespaces, then PlayReady, Widevine and Marlin signalling
//! 3. the ClearKey-only variant from the result of step 2
//! 4. the nopssh variant by rewriting init segment URLs
//! 5. subtitle tracks on each variant

pub mod drm;
pub mod error;
pub mod fmp4;
mod fsutil;
pub mod mp4;
pub mod mpd;
pub mod subtitle;

pub use drm::{DrmDescriptor, DrmDescriptorBuilder, DrmSystem};
pub use error::{Error, Result};
pub use fsutil::write_atomic;
pub use mp4::{BoxPath, BoxTree};
pub use mpd::ManifestDocument;
pub use subtitle::SubtitleSegmenter;
