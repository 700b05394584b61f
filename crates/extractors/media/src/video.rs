//! Container-level video metadata.
//!
//! Nothing is decoded: the stream headers of ISO-BMFF (MP4, MOV, M4V, 3GP),
//! AVI and Matroska (MKV, WebM) carry frame count, duration and frame size.
//! Other containers are reported as unsupported.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use spacexp_common::api::VideoInfo;

/// Largest `moov` box we are willing to load.
const MAX_MOOV_BYTES: u64 = 64 * 1024 * 1024;
/// AVI and Matroska keep their headers near the start of the file.
const HEADER_SCAN_BYTES: u64 = 1024 * 1024;

pub fn extract(path: &Path) -> Result<VideoInfo> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut head = Vec::with_capacity(12);
    file.by_ref().take(12).read_to_end(&mut head)?;
    file.seek(SeekFrom::Start(0))?;

    if head.len() == 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"AVI " {
        return avi(&read_head(&mut file)?);
    }
    if head.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return matroska(&read_head(&mut file)?);
    }
    if head.len() >= 8 && is_bmff_box(&head[4..8]) {
        return mp4(&mut file);
    }
    bail!("unsupported video container")
}

pub fn is_video_ext(ext: &str) -> bool {
    matches!(
        ext,
        "mp4" | "m4v" | "mkv" | "webm" | "ogv" | "avi" | "mov" | "wmv" | "flv" | "mpg" | "mpeg" | "3gp"
    )
}

fn read_head(file: &mut File) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.take(HEADER_SCAN_BYTES).read_to_end(&mut buf)?;
    Ok(buf)
}

fn be_u32(d: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(d.get(at..at + 4)?.try_into().ok()?))
}

fn be_u64(d: &[u8], at: usize) -> Option<u64> {
    Some(u64::from_be_bytes(d.get(at..at + 8)?.try_into().ok()?))
}

fn le_u32(d: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(d.get(at..at + 4)?.try_into().ok()?))
}

fn rate(frames: Option<u64>, secs: Option<f64>) -> Option<f64> {
    match (frames, secs) {
        (Some(n), Some(d)) if d > 0.0 => Some(n as f64 / d),
        _ => None,
    }
}

// ── ISO base media (MP4 / MOV) ────────────────────────────────────────────────

fn is_bmff_box(kind: &[u8]) -> bool {
    matches!(kind, b"ftyp" | b"moov" | b"mdat" | b"wide" | b"free" | b"skip" | b"pnot")
}

/// Walk the top-level boxes with seeks until `moov`, which may sit after a
/// multi-gigabyte `mdat`.
fn mp4(file: &mut File) -> Result<VideoInfo> {
    let len = file.metadata()?.len();
    let mut pos = 0u64;
    while pos.checked_add(8).is_some_and(|end| end <= len) {
        file.seek(SeekFrom::Start(pos))?;
        let mut hdr = [0u8; 16];
        file.read_exact(&mut hdr[..8])?;
        let (size, header) = match be_u32(&hdr, 0).unwrap_or(0) {
            1 => {
                file.read_exact(&mut hdr[8..16])?;
                (be_u64(&hdr, 8).unwrap_or(0), 16)
            }
            0 => (len - pos, 8),
            n => (n as u64, 8),
        };
        if size < header {
            bail!("corrupt box header at offset {pos}");
        }
        if &hdr[4..8] == b"moov" {
            let body = size - header;
            if body > MAX_MOOV_BYTES {
                bail!("moov box too large ({body} bytes)");
            }
            let mut buf = vec![0u8; body as usize];
            file.read_exact(&mut buf).context("truncated moov box")?;
            return parse_moov(&buf);
        }
        pos = match pos.checked_add(size) {
            Some(next) => next,
            None => {
                debug!("mp4: box at offset {pos} claims {size} bytes, stopping");
                break;
            }
        };
    }
    bail!("no moov box")
}

struct Boxes<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for Boxes<'a> {
    /// `(type, body)`
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let d = self.data;
        let (size, header) = match be_u32(d, 0)? {
            1 => (be_u64(d, 8)?, 16),
            0 => (d.len() as u64, 8),
            n => (n as u64, 8),
        };
        if size < header as u64 || size > d.len() as u64 {
            self.data = &[];
            return None;
        }
        let size = size as usize;
        self.data = &d[size..];
        Some((&d[4..8], &d[header..size]))
    }
}

fn boxes(data: &[u8]) -> Boxes<'_> {
    Boxes { data }
}

fn child<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    boxes(data).find(|(k, _)| k == kind).map(|(_, body)| body)
}

fn parse_moov(moov: &[u8]) -> Result<VideoInfo> {
    let movie_duration = child(moov, b"mvhd").and_then(header_duration);

    let trak = boxes(moov)
        .filter(|(k, _)| k == b"trak")
        .map(|(_, body)| body)
        .find(|t| handler_type(t) == Some(&b"vide"[..]))
        .ok_or_else(|| anyhow!("no video track"))?;

    let (width, height) = child(trak, b"tkhd").and_then(track_dimensions).unzip();
    let mdia = child(trak, b"mdia");
    let duration_secs = mdia
        .and_then(|m| child(m, b"mdhd"))
        .and_then(header_duration)
        .or(movie_duration);
    let frame_count = mdia
        .and_then(|m| child(m, b"minf"))
        .and_then(|m| child(m, b"stbl"))
        .and_then(sample_count);

    Ok(VideoInfo {
        frame_count,
        fps: rate(frame_count, duration_secs),
        duration_secs,
        width,
        height,
    })
}

fn handler_type(trak: &[u8]) -> Option<&[u8]> {
    let hdlr = child(child(trak, b"mdia")?, b"hdlr")?;
    hdlr.get(8..12)
}

/// Seconds from an `mvhd` or `mdhd` body; both share the leading layout.
fn header_duration(body: &[u8]) -> Option<f64> {
    let (timescale, duration) = match *body.first()? {
        1 => (be_u32(body, 20)?, be_u64(body, 24)?),
        _ => (be_u32(body, 12)?, be_u32(body, 16)? as u64),
    };
    // all-ones marks an unknown duration
    if timescale == 0 || duration == u64::MAX || duration == u32::MAX as u64 {
        return None;
    }
    Some(duration as f64 / timescale as f64)
}

/// Presentation size from `tkhd` (16.16 fixed point).
fn track_dimensions(body: &[u8]) -> Option<(u32, u32)> {
    let at = if *body.first()? == 1 { 88 } else { 76 };
    let (w, h) = (be_u32(body, at)? >> 16, be_u32(body, at + 4)? >> 16);
    (w > 0 && h > 0).then_some((w, h))
}

/// One sample per frame: `stsz`/`stz2` count, else the sum of `stts` runs.
fn sample_count(stbl: &[u8]) -> Option<u64> {
    if let Some(stsz) = child(stbl, b"stsz").or_else(|| child(stbl, b"stz2")) {
        return be_u32(stsz, 8).map(u64::from);
    }
    let stts = child(stbl, b"stts")?;
    let entries = be_u32(stts, 4)? as usize;
    (0..entries).try_fold(0u64, |acc, i| Some(acc + be_u32(stts, 8 + i * 8)? as u64))
}

// ── AVI ───────────────────────────────────────────────────────────────────────

fn avi(head: &[u8]) -> Result<VideoInfo> {
    let at = head
        .windows(4)
        .position(|w| w == b"avih")
        .ok_or_else(|| anyhow!("AVI without main header"))?;
    let avih = head.get(at + 8..).ok_or_else(|| anyhow!("truncated AVI header"))?;
    let field = |off| le_u32(avih, off).ok_or_else(|| anyhow!("truncated AVI header"));

    let us_per_frame = field(0)?;
    let frames = field(16)? as u64;
    let (width, height) = (field(32)?, field(36)?);

    let duration_secs = (us_per_frame > 0).then(|| frames as f64 * us_per_frame as f64 / 1e6);
    Ok(VideoInfo {
        frame_count: Some(frames),
        fps: (us_per_frame > 0).then(|| 1e6 / us_per_frame as f64),
        duration_secs,
        width: (width > 0).then_some(width),
        height: (height > 0).then_some(height),
    })
}

// ── Matroska / WebM ───────────────────────────────────────────────────────────

const EBML_SEGMENT: u64 = 0x1853_8067;
const EBML_INFO: u64 = 0x1549_A966;
const EBML_TIMECODE_SCALE: u64 = 0x2A_D7B1;
const EBML_DURATION: u64 = 0x4489;
const EBML_TRACKS: u64 = 0x1654_AE6B;
const EBML_TRACK_ENTRY: u64 = 0xAE;
const EBML_TRACK_TYPE: u64 = 0x83;
const EBML_DEFAULT_DURATION: u64 = 0x23_E383;
const EBML_VIDEO: u64 = 0xE0;
const EBML_PIXEL_WIDTH: u64 = 0xB0;
const EBML_PIXEL_HEIGHT: u64 = 0xBA;
const EBML_CLUSTER: u64 = 0x1F43_B675;

/// Variable-length integer: `(value, encoded length, all value bits set)`.
/// IDs keep their length marker; sizes do not.
fn read_vint(d: &[u8], at: usize, keep_marker: bool) -> Option<(u64, usize, bool)> {
    let first = *d.get(at)?;
    let len = first.leading_zeros() as usize + 1;
    if len > 8 {
        return None;
    }
    let bytes = d.get(at..at + len)?;
    let mask = (1u64 << (8 - len)) - 1;
    let mut value = if keep_marker { first as u64 } else { first as u64 & mask };
    for b in &bytes[1..] {
        value = (value << 8) | *b as u64;
    }
    let all_ones = value == (1u64 << (7 * len)) - 1;
    Some((value, len, all_ones))
}

/// Elements of an EBML master body; bodies running past the buffer (unknown
/// sizes, or a header scan that stopped early) are clamped.
struct Elements<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for Elements<'a> {
    type Item = (u64, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let d = self.data;
        let parsed = read_vint(d, 0, true).and_then(|(id, id_len, _)| {
            let (size, size_len, unknown) = read_vint(d, id_len, false)?;
            Some((id, id_len + size_len, size, unknown))
        });
        let Some((id, start, size, unknown)) = parsed else {
            self.data = &[];
            return None;
        };
        let end = if unknown {
            d.len()
        } else {
            (start as u64).saturating_add(size).min(d.len() as u64) as usize
        };
        self.data = &d[end..];
        Some((id, &d[start..end]))
    }
}

fn elements(data: &[u8]) -> Elements<'_> {
    Elements { data }
}

fn ebml_uint(body: &[u8]) -> Option<u64> {
    if body.is_empty() || body.len() > 8 {
        return None;
    }
    Some(body.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

fn ebml_float(body: &[u8]) -> Option<f64> {
    match body.len() {
        4 => Some(f32::from_be_bytes(body.try_into().ok()?) as f64),
        8 => Some(f64::from_be_bytes(body.try_into().ok()?)),
        _ => None,
    }
}

fn matroska(head: &[u8]) -> Result<VideoInfo> {
    let segment = elements(head)
        .find(|(id, _)| *id == EBML_SEGMENT)
        .map(|(_, body)| body)
        .ok_or_else(|| anyhow!("Matroska file without a segment"))?;

    let mut timecode_scale = 1_000_000u64;
    let mut raw_duration = None;
    let mut video_track = None;

    for (id, body) in elements(segment) {
        match id {
            EBML_INFO => {
                for (id, body) in elements(body) {
                    match id {
                        EBML_TIMECODE_SCALE => timecode_scale = ebml_uint(body).unwrap_or(timecode_scale),
                        EBML_DURATION => raw_duration = ebml_float(body),
                        _ => {}
                    }
                }
            }
            EBML_TRACKS => {
                video_track = elements(body)
                    .filter(|(id, _)| *id == EBML_TRACK_ENTRY)
                    .map(|(_, entry)| entry)
                    .find(|entry| {
                        elements(entry).any(|(id, b)| id == EBML_TRACK_TYPE && ebml_uint(b) == Some(1))
                    });
            }
            EBML_CLUSTER => break,
            _ => {}
        }
    }

    let track = video_track.ok_or_else(|| anyhow!("no video track"))?;
    let mut width = None;
    let mut height = None;
    let mut frame_ns = None;
    for (id, body) in elements(track) {
        match id {
            EBML_DEFAULT_DURATION => frame_ns = ebml_uint(body).filter(|ns| *ns > 0),
            EBML_VIDEO => {
                for (id, body) in elements(body) {
                    match id {
                        EBML_PIXEL_WIDTH => width = ebml_uint(body).map(|v| v as u32),
                        EBML_PIXEL_HEIGHT => height = ebml_uint(body).map(|v| v as u32),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let duration_secs = raw_duration.map(|d| d * timecode_scale as f64 / 1e9);
    let fps = frame_ns.map(|ns| 1e9 / ns as f64);
    let frame_count = match (duration_secs, fps) {
        (Some(d), Some(f)) => Some((d * f).round() as u64),
        _ => None,
    };

    Ok(VideoInfo { frame_count, fps, duration_secs, width, height })
}
