//! Multi-format text extraction for uploaded documents.
//!
//! Dispatch is by file extension, not content sniffing: the upload request
//! already declares what it is sending. Extraction returns plain UTF-8 text;
//! the ingestion pipeline decides what to do with blank output.
//!
//! Unsupported extensions (images and other informational attachments)
//! yield an empty string rather than an error — they must never abort the
//! upload flow. A *recognized* format that fails to parse (corrupt PDF,
//! truncated ZIP) is an error, which the pipeline downgrades to a
//! per-document status.

use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction error for recognized formats. Unsupported extensions are not
/// an error — they extract to an empty string.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain text from an uploaded file's bytes.
///
/// `file_name` supplies the dispatch hint; its extension is lowercased and
/// matched against the supported formats (pdf, docx, txt, html/htm).
pub fn extract_text(bytes: &[u8], file_name: &str) -> Result<String, ExtractError> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => extract_pdf(bytes),
        "docx" => extract_docx(bytes),
        "txt" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "html" | "htm" => Ok(extract_html(&String::from_utf8_lossy(bytes))),
        _ => Ok(String::new()),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Strip HTML down to its visible text.
///
/// Script and style blocks go first, content included (non-greedy,
/// case-insensitive, across newlines). Remaining tags become spaces so
/// adjacent text nodes don't fuse, then whitespace runs collapse to a
/// single space and the ends are trimmed.
fn extract_html(html: &str) -> String {
    static SCRIPT_RE: OnceLock<Regex> = OnceLock::new();
    static STYLE_RE: OnceLock<Regex> = OnceLock::new();
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    static WS_RE: OnceLock<Regex> = OnceLock::new();

    let script_re =
        SCRIPT_RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
    let style_re = STYLE_RE.get_or_init(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let ws_re = WS_RE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let text = script_re.replace_all(html, "");
    let text = style_re.replace_all(&text, "");
    let text = tag_re.replace_all(&text, " ");
    ws_re.replace_all(&text, " ").trim().to_string()
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut doc_xml = Vec::new();
    let mut found = false;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
        if entry.name() == "word/document.xml" {
            entry
                .take(MAX_XML_ENTRY_BYTES)
                .read_to_end(&mut doc_xml)
                .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
            if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
                return Err(ExtractError::Ooxml(
                    "word/document.xml exceeds size limit".to_string(),
                ));
            }
            found = true;
            break;
        }
    }
    if !found {
        return Err(ExtractError::Ooxml(
            "word/document.xml not found".to_string(),
        ));
    }
    extract_paragraph_text(&doc_xml)
}

/// Collect `<w:t>` runs from the document XML, one line per `<w:p>` paragraph.
fn extract_paragraph_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn html_strips_scripts_and_tags() {
        let html = "<script>bad()</script><p>Hello <b>World</b></p>";
        assert_eq!(extract_text(html.as_bytes(), "note.html").unwrap(), "Hello World");
    }

    #[test]
    fn html_strip_is_case_insensitive_and_multiline() {
        let html = "<SCRIPT type=\"text/javascript\">\nalert(1);\n</SCRIPT>\
                    <STYLE>\nbody { color: red }\n</STYLE>\n<div>kept   text</div>";
        assert_eq!(extract_text(html.as_bytes(), "page.HTM").unwrap(), "kept text");
    }

    #[test]
    fn txt_decodes_verbatim() {
        let text = "line one\nline two";
        assert_eq!(extract_text(text.as_bytes(), "notes.txt").unwrap(), text);
    }

    #[test]
    fn unsupported_extension_yields_empty_string() {
        assert_eq!(extract_text(b"a,b,c", "data.csv").unwrap(), "");
        assert_eq!(extract_text(b"\x89PNG", "scan.png").unwrap(), "");
        assert_eq!(extract_text(b"no extension", "README").unwrap(), "");
    }

    #[test]
    fn docx_extracts_paragraph_text() {
        let bytes = docx_with_paragraphs(&["first paragraph", "second paragraph"]);
        let text = extract_text(&bytes, "report.docx").unwrap();
        assert_eq!(text, "first paragraph\nsecond paragraph\n");
    }

    #[test]
    fn corrupt_docx_returns_error() {
        let err = extract_text(b"not a zip", "report.docx").unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[test]
    fn corrupt_pdf_returns_error() {
        let err = extract_text(b"not a pdf", "scan.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
