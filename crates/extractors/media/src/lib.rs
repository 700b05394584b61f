//! Metadata from media files.
//!
//! - Images: dimensions, resolution and EXIF (JPEG, PNG, GIF, BMP, TIFF, WebP;
//!   HEIC and RAW through their EXIF block)
//! - Audio: duration, bitrate, sample rate, channels and tags (MP3, FLAC, OGG,
//!   WAV, M4A)
//! - Video: frame count, frame rate, duration and frame size (MP4/MOV, AVI,
//!   MKV/WebM)

use std::path::Path;

pub mod audio;
pub mod image;
pub mod video;

pub use audio::is_audio_ext;
pub use image::is_image_ext;
pub use video::is_video_ext;

/// Check if a file is a media file based on extension.
pub fn accepts(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    is_image_ext(&ext) || is_audio_ext(&ext) || is_video_ext(&ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts() {
        assert!(accepts(Path::new("photo.JPG")));
        assert!(accepts(Path::new("song.flac")));
        assert!(accepts(Path::new("clip.mkv")));
        assert!(!accepts(Path::new("notes.txt")));
        assert!(!accepts(Path::new("Makefile")));
    }
}
