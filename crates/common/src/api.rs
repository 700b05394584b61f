use serde::{Deserialize, Serialize};

/// Broad category a file is reported under in statistics.
///
/// PDFs, word-processing files and presentations are all `Document` so that
/// "documents by page count" can rank them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Document,
    Spreadsheet,
    Image,
    Audio,
    Video,
    #[default]
    Unknown,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Document    => "document",
            FileKind::Spreadsheet => "spreadsheet",
            FileKind::Image       => "image",
            FileKind::Audio       => "audio",
            FileKind::Video       => "video",
            FileKind::Unknown     => "unknown",
        }
    }

    /// Parse a stored kind string.  Anything unrecognised maps to `Unknown`
    /// so that hand-edited CSV files still load.
    pub fn parse(s: &str) -> FileKind {
        match s.trim().to_ascii_lowercase().as_str() {
            "document"    => FileKind::Document,
            "spreadsheet" => FileKind::Spreadsheet,
            "image"       => FileKind::Image,
            "audio"       => FileKind::Audio,
            "video"       => FileKind::Video,
            _             => FileKind::Unknown,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PDF page count and document information dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfInfo {
    pub num_pages: u32,
    pub author: String,
    pub title: String,
    /// `YYYY-MM-DD HH:MM:SS`, or the raw value when it is not a PDF date.
    pub creation_date: String,
    pub modification_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub dpi_x: Option<f64>,
    pub dpi_y: Option<f64>,
    /// EXIF fields in file order, `(tag name, display value)`.
    #[serde(default)]
    pub exif: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AudioInfo {
    pub duration_secs: Option<f64>,
    /// Bits per second.
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// Tags in container order, `(raw key, value)`.
    #[serde(default)]
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VideoInfo {
    pub frame_count: Option<u64>,
    pub fps: Option<f64>,
    pub duration_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Word-processing documents and presentations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub author: String,
    pub title: String,
    /// Pages for DOCX, slides for PPTX.  Absent when the producer did not
    /// record document statistics.
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpreadsheetInfo {
    pub num_sheets: u32,
    pub sheet_names: Vec<String>,
}

/// Format-specific metadata attached to a [`FileRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum Details {
    #[default]
    None,
    Pdf(PdfInfo),
    Image(ImageInfo),
    Audio(AudioInfo),
    Video(VideoInfo),
    Document(DocumentInfo),
    Spreadsheet(SpreadsheetInfo),
}

/// One row of an indexing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub creation_time: String,
    pub modification_time: String,
    /// Lowercased, without the leading dot.  Empty when the name has none.
    pub extension: String,
    pub mime: Option<String>,
    pub kind: FileKind,
    #[serde(default)]
    pub details: Details,
    /// Set when the format handler failed; generic attributes are still valid.
    #[serde(default)]
    pub error: Option<String>,
    /// Milliseconds spent in the format handler.
    #[serde(default)]
    pub extract_ms: Option<u64>,
}

impl FileRecord {
    /// Pages of a PDF, DOCX or PPTX.
    pub fn page_count(&self) -> Option<u32> {
        match &self.details {
            Details::Pdf(p) => Some(p.num_pages),
            Details::Document(d) => d.page_count,
            _ => None,
        }
    }

    /// Pixel dimensions of an image or video frame.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match &self.details {
            Details::Image(i) => Some((i.width, i.height)),
            Details::Video(v) => v.width.zip(v.height),
            _ => None,
        }
    }

    pub fn sheet_names(&self) -> &[String] {
        match &self.details {
            Details::Spreadsheet(s) => &s.sheet_names,
            _ => &[],
        }
    }
}
