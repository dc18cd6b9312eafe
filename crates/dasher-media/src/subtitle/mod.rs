//! Timed-text subtitles: parsing, segmenting and manifest insertion.

mod segmenter;
mod ttml;

pub use segmenter::{plan_segments, SubtitleSegment, SubtitleSegmenter};
pub use ttml::{Cue, SubtitleDocument};
