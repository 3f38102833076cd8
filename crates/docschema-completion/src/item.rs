//! Completion items and lists

use std::collections::HashSet;

use serde::Serialize;

/// What inserting an item produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionItemKind {
    /// A property name, possibly with a value template
    Property,
    /// A value for the property at the cursor
    Value,
    /// Multi-line structure with tab stops
    Snippet,
}

/// Suggested insertion at the cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: String,
    pub kind: CompletionItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub sort_text: String,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, insert_text: impl Into<String>, kind: CompletionItemKind) -> Self {
        Self {
            label: label.into(),
            insert_text: insert_text.into(),
            kind,
            detail: None,
            documentation: None,
            sort_text: String::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_documentation(mut self, documentation: Option<&str>) -> Self {
        self.documentation = documentation.map(str::to_string);
        self
    }

    /// Zero-padded so editors keep declaration order
    #[must_use]
    pub fn with_sort_index(mut self, index: usize) -> Self {
        self.sort_text = format!("{index:04}");
        self
    }
}

/// Result of one completion request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionList {
    pub items: Vec<CompletionItem>,
    pub is_incomplete: bool,
}

impl CompletionList {
    pub fn new(items: Vec<CompletionItem>) -> Self {
        Self {
            items,
            is_incomplete: false,
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.label.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Deduplicate on `(label, insert_text)`, keeping the first of each pair.
/// A label that comes back with a different insertion is folded into the
/// first item carrying it, so the list never shows one label twice; its
/// documentation is appended to that item.
pub fn dedupe(items: Vec<CompletionItem>) -> Vec<CompletionItem> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(items.len());
    let mut out: Vec<CompletionItem> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.insert((item.label.clone(), item.insert_text.clone())) {
            continue;
        }
        let Some(existing) = out.iter_mut().find(|e| e.label == item.label) else {
            out.push(item);
            continue;
        };
        match (&mut existing.documentation, item.documentation) {
            (Some(doc), Some(other)) if !doc.contains(&other) => {
                doc.push_str("\n\n");
                doc.push_str(&other);
            }
            (slot @ None, Some(other)) => *slot = Some(other),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(label: &str, insert: &str, doc: Option<&str>) -> CompletionItem {
        CompletionItem::new(label, insert, CompletionItemKind::Value).with_documentation(doc)
    }

    #[test]
    fn test_dedupe_identical() {
        let items = dedupe(vec![value("a", "a", None), value("a", "a", Some("x")), value("b", "b", None)]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].documentation, None);
    }

    #[test]
    fn test_dedupe_merges_documentation() {
        let items = dedupe(vec![
            value("tool", "tool", Some("From A")),
            value("tool", "\"tool\"", Some("From B")),
            value("tool", "'tool'", Some("From A")),
        ]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].documentation.as_deref(), Some("From A\n\nFrom B"));
        assert_eq!(items[0].insert_text, "tool");
    }

    #[test]
    fn test_dedupe_keys_on_label_and_insertion() {
        let items = dedupe(vec![
            value("tool", "tool", None),
            value("other", "other", None),
            value("tool", "tool", Some("ignored")),
            value("tool", "\"tool\"", Some("From B")),
        ]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].insert_text, "tool");
        assert_eq!(items[0].documentation.as_deref(), Some("From B"));
        assert_eq!(items[1].label, "other");
    }

    #[test]
    fn test_sort_index_is_padded() {
        let item = value("a", "a", None).with_sort_index(7);
        assert_eq!(item.sort_text, "0007");
    }

    #[test]
    fn test_serialized_names() {
        let list = CompletionList::new(vec![value("a", "b", None)]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["isIncomplete"], false);
        assert_eq!(json["items"][0]["insertText"], "b");
        assert_eq!(json["items"][0]["kind"], "value");
        assert!(json["items"][0].get("documentation").is_none());
    }
}
