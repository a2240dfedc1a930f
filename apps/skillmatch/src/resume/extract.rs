//! Resume text extraction — plain text and the text layer of PDFs.
//!
//! Scanned (image-only) PDFs have no text layer and are rejected explicitly rather than
//! being sent to the model as an empty document.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use pdf_extract::{Document, PlainTextOutput};
use tracing::{info, warn};

use crate::errors::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    PlainText,
    Pdf,
}

impl ResumeFormat {
    /// Detects the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("txt") => Ok(ResumeFormat::PlainText),
            Some("pdf") => Ok(ResumeFormat::Pdf),
            _ => Err(AnalysisError::UnsupportedFormat(display_name(path))),
        }
    }
}

/// Checks the file exists and has a supported extension, without reading it.
pub fn check_resume_path(path: &Path) -> Result<ResumeFormat, AnalysisError> {
    if !path.is_file() {
        return Err(AnalysisError::InputNotFound(format!(
            "CV file not found: {}",
            path.display()
        )));
    }
    ResumeFormat::from_path(path)
}

/// Reads the resume and returns its text with whitespace runs collapsed to single spaces.
pub fn extract_resume_text(path: &Path) -> Result<String, AnalysisError> {
    let format = check_resume_path(path)?;
    info!("Extracting text from {} ({:?})", path.display(), format);

    let bytes = std::fs::read(path).map_err(|e| {
        AnalysisError::ExtractionFailure(format!("could not read {}: {e}", display_name(path)))
    })?;

    let raw = match format {
        ResumeFormat::PlainText => decode_text(&bytes),
        ResumeFormat::Pdf => extract_pdf_text(&bytes, path)?,
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        let reason = match format {
            ResumeFormat::Pdf => "no extractable text (scanned or image-only PDF?)",
            ResumeFormat::PlainText => "file is empty",
        };
        return Err(AnalysisError::ExtractionFailure(format!(
            "{}: {reason}",
            display_name(path)
        )));
    }

    info!("Extracted {} characters from {}", text.chars().count(), display_name(path));
    Ok(text)
}

/// UTF-8 decode that drops invalid sequences instead of failing.
fn decode_text(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    if decoded.contains(char::REPLACEMENT_CHARACTER) {
        warn!("Resume contains invalid UTF-8; undecodable bytes were dropped");
        decoded.replace(char::REPLACEMENT_CHARACTER, "")
    } else {
        decoded.into_owned()
    }
}

/// Extracts the text layer page by page. A page the parser cannot handle is logged and
/// skipped; the document only fails when it cannot be opened at all.
fn extract_pdf_text(bytes: &[u8], path: &Path) -> Result<String, AnalysisError> {
    let name = display_name(path);
    let mut doc = load_pdf(bytes).map_err(|reason| {
        AnalysisError::ExtractionFailure(format!(
            "file is empty or not a valid PDF: {name} ({reason})"
        ))
    })?;

    if doc.is_encrypted() {
        doc.decrypt("").map_err(|e| {
            AnalysisError::ExtractionFailure(format!("{name} is encrypted ({e})"))
        })?;
    }

    let pages = doc.get_pages();
    let mut text = String::new();
    let mut skipped = 0usize;
    for &page_num in pages.keys() {
        match extract_pdf_page(&doc, page_num) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(reason) => {
                skipped += 1;
                warn!("Skipping page {page_num} of {name}: {reason}");
            }
        }
    }

    if skipped > 0 {
        warn!("{skipped} of {} pages in {name} could not be read", pages.len());
    }
    Ok(text)
}

// pdf-extract panics on some malformed documents; contain it so the run still ends in JSON.
fn load_pdf(bytes: &[u8]) -> Result<Document, String> {
    match panic::catch_unwind(|| Document::load_mem(bytes)) {
        Ok(Ok(doc)) => Ok(doc),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("parser crashed".to_string()),
    }
}

fn extract_pdf_page(doc: &Document, page_num: u32) -> Result<String, String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut page_text = String::new();
        {
            let mut output = PlainTextOutput::new(&mut page_text);
            pdf_extract::output_doc_page(doc, &mut output, page_num)?;
        }
        Ok::<_, pdf_extract::OutputError>(page_text)
    }));

    match outcome {
        Ok(Ok(page_text)) => Ok(page_text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("parser crashed".to_string()),
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pdf_extract::content::{Content, Operation};
    use pdf_extract::{Dictionary, Object, Stream};
    use tempfile::NamedTempFile;

    use super::*;

    /// One page per entry; every page can use a Helvetica font named `F1`.
    fn build_pdf(pages: Vec<Vec<Operation>>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", "Font");
        font.set("Subtype", "Type1");
        font.set("BaseFont", "Helvetica");
        let font_id = doc.add_object(font);
        let mut fonts = Dictionary::new();
        fonts.set("F1", font_id);
        let mut resources = Dictionary::new();
        resources.set("Font", fonts);

        let mut kids = Vec::new();
        for operations in pages {
            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
            let mut page = Dictionary::new();
            page.set("Type", "Page");
            page.set("Parent", pages_id);
            page.set("Contents", content_id);
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut page_tree = Dictionary::new();
        page_tree.set("Type", "Pages");
        page_tree.set("Count", kids.len() as i64);
        page_tree.set("Kids", kids);
        page_tree.set("Resources", resources);
        page_tree.set(
            "MediaBox",
            vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        );
        doc.set_object(pages_id, page_tree);

        let mut catalog = Dictionary::new();
        catalog.set("Type", "Catalog");
        catalog.set("Pages", pages_id);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn text_page(font: &str, text: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), Object::Integer(12)]),
            Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    /// A stroked line and nothing else, like a scanned page without OCR.
    fn drawing_page() -> Vec<Operation> {
        vec![
            Operation::new("m", vec![Object::Integer(72), Object::Integer(72)]),
            Operation::new("l", vec![Object::Integer(300), Object::Integer(300)]),
            Operation::new("S", vec![]),
        ]
    }

    fn temp_with(suffix: &str, contents: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_format_detection_is_case_insensitive() {
        assert_eq!(
            ResumeFormat::from_path(Path::new("CV.PDF")).unwrap(),
            ResumeFormat::Pdf
        );
        assert_eq!(
            ResumeFormat::from_path(Path::new("cv.Txt")).unwrap(),
            ResumeFormat::PlainText
        );
    }

    #[test]
    fn test_docx_is_unsupported_and_named() {
        let err = ResumeFormat::from_path(Path::new("/tmp/resume.docx")).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("resume.docx"));
    }

    #[test]
    fn test_missing_extension_is_unsupported() {
        assert!(ResumeFormat::from_path(Path::new("resume")).is_err());
    }

    #[test]
    fn test_missing_file_is_input_not_found() {
        let err = extract_resume_text(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, AnalysisError::InputNotFound(_)));
    }

    #[test]
    fn test_text_file_is_whitespace_normalized() {
        let file = temp_with(".txt", b"Jane Doe\n\n  Rust   engineer\t\tGo\n");
        assert_eq!(
            extract_resume_text(file.path()).unwrap(),
            "Jane Doe Rust engineer Go"
        );
    }

    #[test]
    fn test_invalid_utf8_bytes_are_dropped() {
        let file = temp_with(".txt", b"Python \xff\xfe developer");
        assert_eq!(extract_resume_text(file.path()).unwrap(), "Python developer");
    }

    #[test]
    fn test_blank_text_file_is_extraction_failure() {
        let file = temp_with(".txt", b"   \n\t ");
        let err = extract_resume_text(file.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailure(_)));
    }

    #[test]
    fn test_garbage_pdf_is_extraction_failure() {
        let file = temp_with(".pdf", b"this is not a pdf");
        let err = extract_resume_text(file.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailure(_)));
    }

    #[test]
    fn test_pdf_text_layer_is_extracted() {
        let pdf = build_pdf(vec![text_page("F1", "Python developer")]);
        let file = temp_with(".pdf", &pdf);
        let text = extract_resume_text(file.path()).unwrap();
        assert!(text.contains("Python developer"), "got {text:?}");
    }

    #[test]
    fn test_pdf_without_text_is_extraction_failure() {
        let pdf = build_pdf(vec![drawing_page()]);
        let file = temp_with(".pdf", &pdf);
        let err = extract_resume_text(file.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailure(_)));
        assert!(err.to_string().contains("no extractable text"));
    }

    #[test]
    fn test_unreadable_pdf_page_is_skipped() {
        // F9 is not in the page resources; the parser panics on that page.
        let pdf = build_pdf(vec![
            text_page("F1", "Python developer"),
            text_page("F9", "Lost page"),
        ]);
        let file = temp_with(".pdf", &pdf);
        let text = extract_resume_text(file.path()).unwrap();
        assert!(text.contains("Python developer"), "got {text:?}");
        assert!(!text.contains("Lost page"));
    }

    #[test]
    fn test_pdf_with_only_unreadable_pages_is_extraction_failure() {
        let pdf = build_pdf(vec![text_page("F9", "Lost page")]);
        let file = temp_with(".pdf", &pdf);
        let err = extract_resume_text(file.path()).unwrap_err();
        assert!(err.to_string().contains("no extractable text"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\r\n\tc  "), "a b c");
        assert_eq!(normalize_whitespace(" \n "), "");
    }
}
