//! Command builders for the transcoder and the muxer.
//!
//! Every builder returns a [`ToolCommand`](crate::ToolCommand) whose
//! relative file names assume the output folder as working directory.

mod crypt;
mod dash;
mod image;
mod transcode;

pub use crypt::crypt_command;
pub use dash::{dash_command, DASH_PROFILE, SEGMENT_NAME};
pub use image::image_command;
pub use transcode::{
    audio_command, hvc1_retag_command, retag_hvc1, transcode_command, video_command, TranscodeOptions,
};
