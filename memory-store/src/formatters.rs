//! Entry formatting strategies for different output formats.
//!
//! Entries that carry PDF page metadata get a page-aware rendering; plain
//! entries render content-only.

use crate::entry::{Entry, Metadata, metadata_keys};

use serde_json::{Value, json};

/// Formatting strategy for search results.
pub trait EntryFormatter: Send + Sync {
    fn format(&self, entry: &Entry) -> String;
}

fn is_pdf_entry(metadata: Option<&Metadata>) -> bool {
    metadata.is_some_and(|m| {
        m.contains_key(metadata_keys::DOCUMENT_ID) && m.contains_key(metadata_keys::PAGE_LABEL)
    })
}

/// `Document: <id>, Page: <label> (physical page N)` header parts shared by
/// the human-readable formatters.
fn page_header(metadata: &Metadata) -> String {
    let document_id = metadata
        .get(metadata_keys::DOCUMENT_ID)
        .and_then(|v| v.as_str())
        .unwrap_or("?");
    let page_label = metadata
        .get(metadata_keys::PAGE_LABEL)
        .and_then(|v| v.as_str())
        .unwrap_or("?");
    let physical = metadata
        .get(metadata_keys::PHYSICAL_PAGE_INDEX)
        .and_then(|v| v.as_u64())
        .map(|i| format!(" (physical page {})", i + 1))
        .unwrap_or_default();
    format!("Document: {document_id}, Page: {page_label}{physical}")
}

/// Format entries as an XML-like structure.
pub struct XmlEntryFormatter;

impl EntryFormatter for XmlEntryFormatter {
    fn format(&self, entry: &Entry) -> String {
        let metadata_json = entry
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m).unwrap_or_default())
            .unwrap_or_default();

        if is_pdf_entry(entry.metadata.as_ref()) {
            let meta = entry.metadata.as_ref().unwrap();
            return format!(
                "<entry><content>{}</content><page>{}</page><metadata>{}</metadata></entry>",
                entry.content,
                page_header(meta),
                metadata_json
            );
        }

        format!(
            "<entry><content>{}</content><metadata>{}</metadata></entry>",
            entry.content, metadata_json
        )
    }
}

/// Format entries as JSON objects.
pub struct JsonEntryFormatter;

impl EntryFormatter for JsonEntryFormatter {
    fn format(&self, entry: &Entry) -> String {
        let metadata = entry.metadata.clone().unwrap_or_default();
        let mut result = json!({
            "content": entry.content,
            "metadata": metadata,
        });

        if is_pdf_entry(entry.metadata.as_ref()) {
            let meta = entry.metadata.as_ref().unwrap();
            result["page_info"] = json!({
                "document_id": meta.get(metadata_keys::DOCUMENT_ID).cloned().unwrap_or(Value::Null),
                "page_label": meta.get(metadata_keys::PAGE_LABEL).cloned().unwrap_or(Value::Null),
                "physical_page_index": meta
                    .get(metadata_keys::PHYSICAL_PAGE_INDEX)
                    .cloned()
                    .unwrap_or(Value::Null),
            });
        }

        serde_json::to_string_pretty(&result).unwrap_or_else(|_| entry.content.clone())
    }
}

/// Format entries as plain text with minimal markers.
pub struct PlainTextEntryFormatter;

impl EntryFormatter for PlainTextEntryFormatter {
    fn format(&self, entry: &Entry) -> String {
        if is_pdf_entry(entry.metadata.as_ref()) {
            let meta = entry.metadata.as_ref().unwrap();
            return format!(
                "--- Entry from {} ---\n{}\n--- End Entry ---",
                page_header(meta),
                entry.content
            );
        }
        format!("--- Entry ---\n{}\n--- End Entry ---", entry.content)
    }
}

/// Format entries as Markdown sections.
pub struct MarkdownEntryFormatter;

impl EntryFormatter for MarkdownEntryFormatter {
    fn format(&self, entry: &Entry) -> String {
        if is_pdf_entry(entry.metadata.as_ref()) {
            let meta = entry.metadata.as_ref().unwrap();
            return format!("## Entry: {}\n\n{}\n\n---\n", page_header(meta), entry.content);
        }
        format!("## Entry\n\n{}\n\n---\n", entry.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pdf_entry() -> Entry {
        let mut meta = Metadata::new();
        meta.insert("document_id".into(), json!("doc1"));
        meta.insert("page_label".into(), json!("45"));
        meta.insert("physical_page_index".into(), json!(4));
        Entry::new("Page content.", Some(meta))
    }

    #[test]
    fn xml_formatter_renders_page_section_for_pdf_entries() {
        let out = XmlEntryFormatter.format(&pdf_entry());
        assert!(out.starts_with("<entry><content>Page content.</content>"));
        assert!(out.contains("<page>Document: doc1, Page: 45 (physical page 5)</page>"));
    }

    #[test]
    fn xml_formatter_plain_entry_has_no_page_section() {
        let out = XmlEntryFormatter.format(&Entry::new("plain", None));
        assert_eq!(out, "<entry><content>plain</content><metadata></metadata></entry>");
    }

    #[test]
    fn json_formatter_adds_page_info() {
        let out = JsonEntryFormatter.format(&pdf_entry());
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["page_info"]["document_id"], json!("doc1"));
        assert_eq!(v["page_info"]["physical_page_index"], json!(4));
    }

    #[test]
    fn plain_text_formatter_mentions_document_and_page() {
        let out = PlainTextEntryFormatter.format(&pdf_entry());
        assert!(out.starts_with("--- Entry from Document: doc1, Page: 45"));
        assert!(out.ends_with("--- End Entry ---"));
    }

    #[test]
    fn markdown_formatter_plain_entry() {
        let out = MarkdownEntryFormatter.format(&Entry::new("body", None));
        assert_eq!(out, "## Entry\n\nbody\n\n---\n");
    }
}
