//! User story documents.
//!
//! Plain text and Word (`.docx`) documents both come back as their
//! non-blank paragraphs joined by `\n`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

/// Extensions read as plain UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Main part of a Word package.
const DOCX_BODY_PART: &str = "word/document.xml";

/// Document read errors.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unsupported document format '{extension}': {path}")]
    Unsupported { path: String, extension: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid Word document {path}: {reason}")]
    Docx { path: String, reason: String },

    #[error("Document has no text: {0}")]
    Empty(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Docx,
}

/// Read a document's non-blank paragraphs, joined by `\n`.
///
/// `.txt`, `.md`, `.markdown` and extensionless files are read as text,
/// `.docx` as a Word package. Any other extension is rejected before the
/// file is opened.
pub fn read_document(path: &Path) -> Result<String, ReadError> {
    let display = path.display().to_string();

    let format = match path.extension().and_then(|e| e.to_str()) {
        None => Format::Text,
        Some(extension) => {
            let lower = extension.to_ascii_lowercase();
            if lower == "docx" {
                Format::Docx
            } else if TEXT_EXTENSIONS.contains(&lower.as_str()) {
                Format::Text
            } else {
                return Err(ReadError::Unsupported {
                    path: display,
                    extension: lower,
                });
            }
        }
    };

    let paragraphs: Vec<String> = match format {
        Format::Text => std::fs::read_to_string(path)
            .map_err(|source| io_error(&display, source))?
            .lines()
            .map(str::to_string)
            .collect(),
        Format::Docx => docx_paragraphs(path, &display)?,
    };

    let text = paragraphs
        .iter()
        .map(|p| p.trim_end())
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        return Err(ReadError::Empty(display));
    }
    Ok(text)
}

fn io_error(display: &str, source: std::io::Error) -> ReadError {
    if source.kind() == std::io::ErrorKind::NotFound {
        ReadError::NotFound(display.to_string())
    } else {
        ReadError::Io {
            path: display.to_string(),
            source,
        }
    }
}

fn docx_paragraphs(path: &Path, display: &str) -> Result<Vec<String>, ReadError> {
    let invalid = |reason: String| ReadError::Docx {
        path: display.to_string(),
        reason,
    };

    let file = File::open(path).map_err(|source| io_error(display, source))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;
    let mut part = archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| invalid(format!("{DOCX_BODY_PART}: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|source| io_error(display, source))?;

    body_paragraphs(&xml).map_err(invalid)
}

/// Text of each `<w:p>` in a WordprocessingML body.
///
/// A paragraph's text is its `<w:t>` runs concatenated; `<w:tab/>` inside a
/// run becomes a tab. Everything else (properties, drawings, fields) is
/// skipped.
fn body_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"r" => in_run = true,
                b"t" => in_text = in_run,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => current.push('\t'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
