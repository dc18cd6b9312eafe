//! Preview image extraction.

use crate::command::ToolCommand;
use dasher_common::paths::preview_image_name;
use dasher_common::FrameSize;
use std::path::Path;

/// Grab one frame at `seconds` into `image_<WxH>.jpg`.
pub fn image_command(ffmpeg: &Path, input: &Path, seconds: u32, size: FrameSize) -> ToolCommand {
    ToolCommand::new("ffmpeg", ffmpeg)
        .args(["-hide_banner", "-nostats", "-y"])
        .args(["-ss".to_string(), seconds.to_string()])
        .arg("-i")
        .path_arg(input)
        .args(["-frames:v", "1", "-q:v", "2"])
        .args(["-s".to_string(), size.to_string()])
        .arg(preview_image_name(&size.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_command() {
        let cmd = image_command(Path::new("ffmpeg"), Path::new("/in/src.mp4"), 10, FrameSize::new(640, 360));
        assert_eq!(cmd.value_of("-ss"), Some("10"));
        assert_eq!(cmd.value_of("-s"), Some("640x360"));
        assert_eq!(cmd.get_args().last().map(String::as_str), Some("image_640x360.jpg"));
        // seek before -i for a fast input seek
        assert!(cmd.position("-ss") < cmd.position("-i"));
    }
}
