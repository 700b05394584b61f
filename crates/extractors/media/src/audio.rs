use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use symphonia::core::codecs::CodecParameters;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision};
use symphonia::core::probe::Hint;

use spacexp_common::api::AudioInfo;

/// Stream parameters and tags of an audio file.
///
/// Only the container is probed; no packets are decoded.  The bitrate is the
/// file's average (size over duration), which is what players report for
/// VBR files too.
pub fn extract(path: &Path) -> Result<AudioInfo> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let file_size = file.metadata()?.len();
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| anyhow!("unrecognised audio stream: {e}"))?;

    let mut tags = Vec::new();
    // Tags ahead of the container (ID3v2 before MP3 frames) come with the probe.
    if let Some(meta) = probed.metadata.get() {
        if let Some(rev) = meta.current() {
            collect_tags(rev, &mut tags);
        }
    }
    let mut format = probed.format;
    if let Some(rev) = format.metadata().current() {
        collect_tags(rev, &mut tags);
    }

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no audio track"))?;
    let params = &track.codec_params;
    let duration_secs = duration_of(params);

    Ok(AudioInfo {
        duration_secs,
        bitrate: duration_secs
            .filter(|d| *d > 0.0)
            .map(|d| (file_size as f64 * 8.0 / d).round() as u32),
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count() as u16),
        tags,
    })
}

fn duration_of(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    if let Some(tb) = params.time_base {
        let t = tb.calc_time(frames);
        return Some(t.seconds as f64 + t.frac);
    }
    params
        .sample_rate
        .filter(|sr| *sr > 0)
        .map(|sr| frames as f64 / sr as f64)
}

/// Append raw `(frame id / comment key, value)` pairs; first value per key wins.
fn collect_tags(rev: &MetadataRevision, out: &mut Vec<(String, String)>) {
    for tag in rev.tags() {
        let key = tag.key.clone();
        let value = tag.value.to_string();
        if value.trim().is_empty() || out.iter().any(|(k, _)| *k == key) {
            continue;
        }
        out.push((key, value));
    }
}

pub fn is_audio_ext(ext: &str) -> bool {
    matches!(
        ext,
        "mp3" | "flac" | "ogg" | "m4a" | "aac" | "opus" | "wav" | "oga"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mono 16-bit PCM WAV of silence.
    fn wav_bytes(sample_rate: u32, samples: u32) -> Vec<u8> {
        let data_len = samples * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // channels
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    #[test]
    fn test_wav_stream_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, wav_bytes(8000, 16000)).unwrap();

        let info = extract(&path).unwrap();
        assert_eq!(info.sample_rate, Some(8000));
        assert_eq!(info.channels, Some(1));
        let duration = info.duration_secs.unwrap();
        assert!((duration - 2.0).abs() < 1e-6, "duration {duration}");
        // 16 kB/s of samples plus a 44-byte header
        let bitrate = info.bitrate.unwrap();
        assert!((128_000..=128_400).contains(&bitrate), "bitrate {bitrate}");
        assert!(info.tags.is_empty());
    }

    #[test]
    fn test_non_audio_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"plain text, not audio").unwrap();
        assert!(extract(&path).is_err());
    }

    #[test]
    fn test_is_audio_ext() {
        assert!(is_audio_ext("flac"));
        assert!(!is_audio_ext("mp4"));
    }
}
