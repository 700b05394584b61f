use std::path::Path;

use anyhow::Result;

use spacexp_common::api::{Details, FileKind};
use spacexp_common::config::ExtractorConfig;
use spacexp_extract_media::{audio, image, video};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const ODS_MIME: &str = "application/vnd.oasis.opendocument.spreadsheet";

pub type ExtractFn = fn(&Path, &ExtractorConfig) -> Result<Details>;

/// One row of the handler table.
pub struct Handler {
    /// Matched as a prefix of the file's MIME type.
    pub key: &'static str,
    pub kind: FileKind,
    /// Used in progress logs: "<label> processed: ...".
    pub label: &'static str,
    /// `None` for formats we classify but cannot read (legacy `.doc`).
    pub extract: Option<ExtractFn>,
}

/// First match wins, so specific keys must precede broader ones.
pub static HANDLERS: &[Handler] = &[
    Handler { key: "application/pdf", kind: FileKind::Document, label: "PDF", extract: Some(pdf) },
    Handler { key: "image", kind: FileKind::Image, label: "Image", extract: Some(picture) },
    Handler { key: DOCX_MIME, kind: FileKind::Document, label: "DOCX", extract: Some(docx) },
    Handler { key: XLSX_MIME, kind: FileKind::Spreadsheet, label: "Excel", extract: Some(spreadsheet) },
    Handler { key: "application/vnd.ms-excel", kind: FileKind::Spreadsheet, label: "Excel", extract: Some(spreadsheet) },
    Handler { key: ODS_MIME, kind: FileKind::Spreadsheet, label: "Spreadsheet", extract: Some(spreadsheet) },
    Handler { key: PPTX_MIME, kind: FileKind::Document, label: "PPTX", extract: Some(pptx) },
    Handler { key: "application/msword", kind: FileKind::Document, label: "DOC", extract: None },
    Handler { key: "audio", kind: FileKind::Audio, label: "Audio", extract: Some(sound) },
    Handler { key: "video", kind: FileKind::Video, label: "Video", extract: Some(movie) },
];

pub fn handler_for(mime: &str) -> Option<&'static Handler> {
    HANDLERS.iter().find(|h| mime.starts_with(h.key))
}

fn pdf(path: &Path, cfg: &ExtractorConfig) -> Result<Details> {
    Ok(Details::Pdf(spacexp_extract_pdf::extract(path, cfg)?))
}

fn picture(path: &Path, _cfg: &ExtractorConfig) -> Result<Details> {
    Ok(Details::Image(image::extract(path)?))
}

fn docx(path: &Path, cfg: &ExtractorConfig) -> Result<Details> {
    Ok(Details::Document(spacexp_extract_office::extract_docx(path, cfg)?))
}

fn pptx(path: &Path, cfg: &ExtractorConfig) -> Result<Details> {
    Ok(Details::Document(spacexp_extract_office::extract_pptx(path, cfg)?))
}

fn spreadsheet(path: &Path, _cfg: &ExtractorConfig) -> Result<Details> {
    Ok(Details::Spreadsheet(spacexp_extract_office::extract_spreadsheet(path)?))
}

fn sound(path: &Path, _cfg: &ExtractorConfig) -> Result<Details> {
    Ok(Details::Audio(audio::extract(path)?))
}

fn movie(path: &Path, _cfg: &ExtractorConfig) -> Result<Details> {
    Ok(Details::Video(video::extract(path)?))
}
