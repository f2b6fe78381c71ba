//! PDF page extraction over `lopdf`.
//!
//! Parsing is CPU-bound and blocking, so every public operation reloads the
//! document inside `tokio::task::spawn_blocking`; concurrent extractions
//! each open their own read handle and share no mutable state.

use crate::errors::MemoryError;

use lopdf::{Document, Object};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Content and labeling of one extracted page.
#[derive(Clone, Debug, PartialEq)]
pub struct PdfPage {
    pub content: String,
    /// 0-based position in the document.
    pub physical_index: u32,
    /// Human-facing label ("iv", "45", "Appendix A"), `Page N` fallback.
    pub label: String,
}

/// Asynchronous PDF page extraction.
pub struct PdfPageExtractor {
    path: PathBuf,
}

impl PdfPageExtractor {
    /// Fails fast when the file does not exist; parse errors surface later,
    /// per operation.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(MemoryError::Pdf(format!(
                "PDF file not found: {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    /// Formats a page label for display, falling back to 1-based `Page N`.
    pub fn format_page_label(label: &str, physical_index: u32) -> String {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return format!("Page {}", physical_index + 1);
        }
        trimmed.to_string()
    }

    /// Total number of pages in the PDF.
    pub async fn page_count(&self) -> Result<u32, MemoryError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let doc = load_document(&path)?;
            Ok(doc.get_pages().len() as u32)
        })
        .await
        .map_err(|e| MemoryError::Pdf(e.to_string()))?
    }

    /// Extracts text content from one page (0-based index). A failed page
    /// yields empty text rather than an error.
    pub async fn extract_page(&self, page_index: u32) -> Result<String, MemoryError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let doc = load_document(&path)?;
            let pages: Vec<_> = doc.get_pages().into_values().collect();
            let Some(page_id) = pages.get(page_index as usize).copied() else {
                return Ok(String::new());
            };
            Ok(page_text(&doc, page_id).unwrap_or_else(|e| {
                error!(
                    "Failed to extract text from page {} of {}: {}",
                    page_index,
                    path.display(),
                    e
                );
                String::new()
            }))
        })
        .await
        .map_err(|e| MemoryError::Pdf(e.to_string()))?
    }

    /// Extracts the label of one page, `Page N` when labels are absent.
    pub async fn extract_page_label(&self, page_index: u32) -> Result<String, MemoryError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let doc = load_document(&path)?;
            let ranges = label_ranges(&doc);
            Ok(label_from_ranges(&ranges, page_index))
        })
        .await
        .map_err(|e| MemoryError::Pdf(e.to_string()))?
    }

    /// Extracts content and labels for all pages in document order.
    ///
    /// A failure on a single page is logged and produces an empty-content
    /// page; the rest of the document is still extracted.
    pub async fn extract_all_pages(&self) -> Result<Vec<PdfPage>, MemoryError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let doc = load_document(&path)?;
            let ranges = label_ranges(&doc);
            let mut out = Vec::new();
            for (i, page_id) in doc.get_pages().into_values().enumerate() {
                let i = i as u32;
                let content = page_text(&doc, page_id).unwrap_or_else(|e| {
                    error!("Error processing page {} of {}: {}", i, path.display(), e);
                    String::new()
                });
                out.push(PdfPage {
                    content,
                    physical_index: i,
                    label: label_from_ranges(&ranges, i),
                });
            }
            debug!("Extracted {} pages from {}", out.len(), path.display());
            Ok(out)
        })
        .await
        .map_err(|e| MemoryError::Pdf(e.to_string()))?
    }
}

fn load_document(path: &Path) -> Result<Document, MemoryError> {
    Document::load(path).map_err(|e| MemoryError::Pdf(format!("{}: {e}", path.display())))
}

/// Harvests text-showing operators (`Tj`, `TJ`) from a page's content
/// streams.
fn page_text(doc: &Document, page_id: lopdf::ObjectId) -> Result<String, lopdf::Error> {
    let raw = doc.get_page_content(page_id)?;
    let content = lopdf::content::Content::decode(&raw)?;

    let mut out = String::new();
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tj" => {
                for operand in operation.operands {
                    push_text_object(&mut out, &operand);
                }
            }
            "TJ" => {
                for operand in operation.operands {
                    if let Object::Array(parts) = operand {
                        for part in parts {
                            push_text_object(&mut out, &part);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

fn push_text_object(out: &mut String, obj: &Object) {
    if let Object::String(bytes, _) = obj {
        out.push_str(&String::from_utf8_lossy(bytes));
        out.push('\n');
    }
}

/// One `/PageLabels` number-tree range: labels apply from `start_index` on.
#[derive(Clone, Debug, PartialEq)]
struct LabelRange {
    start_index: u32,
    style: Option<u8>,
    prefix: String,
    start_number: u32,
}

/// Reads the catalog's `/PageLabels` number tree; empty when absent or
/// malformed (label derivation then falls back to `Page N`).
fn label_ranges(doc: &Document) -> Vec<LabelRange> {
    let mut ranges = Vec::new();

    let Ok(catalog) = doc.catalog() else {
        return ranges;
    };
    let Ok(labels) = catalog
        .get(b"PageLabels")
        .and_then(|o| doc.dereference(o).map(|(_, obj)| obj))
        .and_then(|o| o.as_dict())
    else {
        return ranges;
    };
    let Ok(nums) = labels
        .get(b"Nums")
        .and_then(|o| doc.dereference(o).map(|(_, obj)| obj))
        .and_then(|o| o.as_array())
    else {
        return ranges;
    };

    for pair in nums.chunks(2) {
        let [index, dict] = pair else { continue };
        let Ok(start_index) = index.as_i64() else {
            continue;
        };
        let Ok(dict) = doc
            .dereference(dict)
            .map(|(_, obj)| obj)
            .and_then(|o| o.as_dict())
        else {
            continue;
        };

        let style = dict
            .get(b"S")
            .ok()
            .and_then(|o| o.as_name().ok())
            .and_then(|n| n.first().copied());
        let prefix = dict
            .get(b"P")
            .ok()
            .and_then(|o| match o {
                Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .unwrap_or_default();
        let start_number = dict
            .get(b"St")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(1)
            .max(1) as u32;

        ranges.push(LabelRange {
            start_index: start_index.max(0) as u32,
            style,
            prefix,
            start_number,
        });
    }

    ranges.sort_by_key(|r| r.start_index);
    ranges
}

/// Derives the label of `page_index` from the applicable range.
fn label_from_ranges(ranges: &[LabelRange], page_index: u32) -> String {
    let range = ranges.iter().rev().find(|r| r.start_index <= page_index);
    let Some(range) = range else {
        return PdfPageExtractor::format_page_label("", page_index);
    };

    let n = range.start_number + (page_index - range.start_index);
    let numbering = match range.style {
        Some(b'D') => n.to_string(),
        Some(b'R') => to_roman(n),
        Some(b'r') => to_roman(n).to_lowercase(),
        Some(b'A') => to_letters(n),
        Some(b'a') => to_letters(n).to_lowercase(),
        _ => String::new(),
    };

    let label = format!("{}{}", range.prefix, numbering);
    PdfPageExtractor::format_page_label(&label, page_index)
}

fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, glyph) in TABLE {
        while n >= value {
            out.push_str(glyph);
            n -= value;
        }
    }
    out
}

/// Spreadsheet-free letter numbering: A..Z, then AA..ZZ, and so on.
fn to_letters(n: u32) -> String {
    let letter = (b'A' + ((n - 1) % 26) as u8) as char;
    let repeats = ((n - 1) / 26) + 1;
    std::iter::repeat_n(letter, repeats as usize).collect()
}
