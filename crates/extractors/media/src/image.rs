use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use exif::{In, Tag, Value};
use tracing::debug;

use spacexp_common::api::ImageInfo;

/// Dimensions, resolution and EXIF fields of an image.
///
/// Dimensions come from the image header; for formats the decoder does not
/// know (HEIC, camera RAW) the EXIF pixel dimensions are used instead.
pub fn extract(path: &Path) -> Result<ImageInfo> {
    let exif = read_exif(path);

    let dims = ::image::ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .with_guessed_format()?
        .into_dimensions();

    let (width, height) = match dims {
        Ok(d) => d,
        Err(e) => match exif.as_ref().and_then(exif_dimensions) {
            Some(d) => d,
            None => bail!("unreadable image header: {e}"),
        },
    };

    let (dpi_x, dpi_y) = match exif.as_ref().and_then(exif_dpi) {
        Some((x, y)) => (Some(x), Some(y)),
        None => header_dpi(path).map_or((None, None), |(x, y)| (Some(x), Some(y))),
    };

    let fields = exif.as_ref().map(exif_fields).unwrap_or_default();

    Ok(ImageInfo { width, height, dpi_x, dpi_y, exif: fields })
}

pub fn is_image_ext(ext: &str) -> bool {
    matches!(
        ext,
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp"
        | "heic" | "heif" | "cr2" | "nef" | "arw" | "orf" | "rw2"
    )
}

// ── EXIF ──────────────────────────────────────────────────────────────────────

fn read_exif(path: &Path) -> Option<exif::Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Some(exif),
        // Most images carry no EXIF at all.
        Err(exif::Error::NotFound(_)) => None,
        Err(e) => {
            debug!("exif: skipping unreadable block in '{}': {e}", path.display());
            None
        }
    }
}

/// Primary-IFD fields as `(tag, display value)`, skipping binary blobs.
fn exif_fields(exif: &exif::Exif) -> Vec<(String, String)> {
    exif.fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .filter_map(|f| {
            let value = f.display_value().with_unit(exif).to_string();
            if value.is_empty() || value.starts_with('[') {
                return None;
            }
            Some((f.tag.to_string(), value))
        })
        .collect()
}

fn exif_dimensions(exif: &exif::Exif) -> Option<(u32, u32)> {
    let get = |tag| exif.get_field(tag, In::PRIMARY)?.value.get_uint(0);
    Some((get(Tag::PixelXDimension)?, get(Tag::PixelYDimension)?))
}

fn exif_dpi(exif: &exif::Exif) -> Option<(f64, f64)> {
    let rational = |tag| match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().map(|r| r.to_f64()),
        _ => None,
    };
    let x = rational(Tag::XResolution)?;
    let y = rational(Tag::YResolution)?;
    // ResolutionUnit: 2 = inch (default), 3 = centimetre
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(2);
    match unit {
        3 => Some((x * 2.54, y * 2.54)),
        1 => None,
        _ => Some((x, y)),
    }
}

// ── Header resolution (JFIF / PNG pHYs) ───────────────────────────────────────

const HEADER_SCAN_BYTES: u64 = 64 * 1024;

fn header_dpi(path: &Path) -> Option<(f64, f64)> {
    let mut buf = Vec::new();
    File::open(path).ok()?.take(HEADER_SCAN_BYTES).read_to_end(&mut buf).ok()?;
    jfif_dpi(&buf).or_else(|| png_dpi(&buf))
}

/// Density from a JFIF APP0 segment directly after SOI.
fn jfif_dpi(buf: &[u8]) -> Option<(f64, f64)> {
    if buf.len() < 18 || buf[0..4] != [0xFF, 0xD8, 0xFF, 0xE0] || &buf[6..11] != b"JFIF\0" {
        return None;
    }
    let units = buf[13];
    let x = u16::from_be_bytes([buf[14], buf[15]]) as f64;
    let y = u16::from_be_bytes([buf[16], buf[17]]) as f64;
    match units {
        1 => Some((x, y)),
        2 => Some((x * 2.54, y * 2.54)),
        // 0 = aspect ratio only
        _ => None,
    }
}

/// Density from a PNG `pHYs` chunk (pixels per metre).
fn png_dpi(buf: &[u8]) -> Option<(f64, f64)> {
    if !buf.starts_with(b"\x89PNG\r\n\x1a\n") {
        return None;
    }
    let mut pos = 8;
    while pos + 8 <= buf.len() {
        let len = u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]) as usize;
        let kind = &buf[pos + 4..pos + 8];
        let data = buf.get(pos + 8..pos + 8 + len)?;
        match kind {
            b"pHYs" if len >= 9 => {
                let x = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as f64;
                let y = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as f64;
                // unit 1 = metre; 0 = aspect ratio only
                return (data[8] == 1).then(|| ((x * 0.0254).round(), (y * 0.0254).round()));
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }
        pos += 12 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(phys: Option<(u32, u32, u8)>) -> Vec<u8> {
        let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
        let mut chunk = |kind: &[u8; 4], data: &[u8]| {
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            out.extend_from_slice(kind);
            out.extend_from_slice(data);
            out.extend_from_slice(&[0, 0, 0, 0]);
        };
        chunk(b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]);
        if let Some((x, y, unit)) = phys {
            let mut p = Vec::new();
            p.extend_from_slice(&x.to_be_bytes());
            p.extend_from_slice(&y.to_be_bytes());
            p.push(unit);
            chunk(b"pHYs", &p);
        }
        chunk(b"IDAT", &[]);
        out
    }

    #[test]
    fn test_png_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        ::image::RgbImage::new(64, 48).save(&path).unwrap();
        let info = extract(&path).unwrap();
        assert_eq!((info.width, info.height), (64, 48));
        assert!(info.exif.is_empty());
    }

    #[test]
    fn test_bmp_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.bmp");
        ::image::RgbImage::new(3, 7).save(&path).unwrap();
        let info = extract(&path).unwrap();
        assert_eq!((info.width, info.height), (3, 7));
    }

    #[test]
    fn test_corrupt_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(extract(&path).is_err());
    }

    #[test]
    fn test_png_phys_density() {
        // 3780 px/m is 96 dpi
        assert_eq!(png_dpi(&png_header(Some((3780, 11811, 1)))), Some((96.0, 300.0)));
        assert_eq!(png_dpi(&png_header(Some((3780, 3780, 0)))), None);
        assert_eq!(png_dpi(&png_header(None)), None);
        assert_eq!(png_dpi(b"GIF89a"), None);
    }

    #[test]
    fn test_jfif_density() {
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        jpeg.extend_from_slice(b"JFIF\0");
        jpeg.extend_from_slice(&[1, 1, 1]);
        jpeg.extend_from_slice(&300u16.to_be_bytes());
        jpeg.extend_from_slice(&150u16.to_be_bytes());
        assert_eq!(jfif_dpi(&jpeg), Some((300.0, 150.0)));

        jpeg[13] = 0;
        assert_eq!(jfif_dpi(&jpeg), None);
    }

    #[test]
    fn test_is_image_ext() {
        assert!(is_image_ext("jpg"));
        assert!(is_image_ext("heic"));
        assert!(!is_image_ext("mp4"));
    }
}
