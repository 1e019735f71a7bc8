//! Core domain types for the SiteChat pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ---------------------------------------------------------------------------
// PageCatalog
// ---------------------------------------------------------------------------

/// One `page-name → URL` pair from the catalog service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Logical page name (the catalog key).
    pub name: String,
    /// Page URL, as supplied by the catalog. Not validated here.
    pub url: String,
}

/// Ordered mapping of page name to URL, resolved per request.
///
/// Order is the order the catalog service returned the keys in. A repeated
/// key keeps its first position and its last URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCatalog {
    entries: Vec<CatalogEntry>,
}

impl PageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        let name = name.into();
        let url = url.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.url = url,
            None => self.entries.push(CatalogEntry { name, url }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    /// Page names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

impl<N: Into<String>, U: Into<String>> FromIterator<(N, U)> for PageCatalog {
    fn from_iter<I: IntoIterator<Item = (N, U)>>(iter: I) -> Self {
        let mut catalog = PageCatalog::new();
        for (name, url) in iter {
            catalog.insert(name, url);
        }
        catalog
    }
}

impl<'a> IntoIterator for &'a PageCatalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// ContentDocument
// ---------------------------------------------------------------------------

/// Structured text extracted from one page: headings by level, then paragraphs.
///
/// Every string is trimmed and non-empty; elements with no text are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub h4: Vec<String>,
    pub h5: Vec<String>,
    pub h6: Vec<String>,
    pub p: Vec<String>,
}

impl ContentDocument {
    /// Tag names collected per page, in serialization order.
    pub const TAGS: [&'static str; 7] = ["h1", "h2", "h3", "h4", "h5", "h6", "p"];

    /// Mutable access to the sequence for a tag name. `None` for unknown tags.
    pub fn section_mut(&mut self, tag: &str) -> Option<&mut Vec<String>> {
        match tag {
            "h1" => Some(&mut self.h1),
            "h2" => Some(&mut self.h2),
            "h3" => Some(&mut self.h3),
            "h4" => Some(&mut self.h4),
            "h5" => Some(&mut self.h5),
            "h6" => Some(&mut self.h6),
            "p" => Some(&mut self.p),
            _ => None,
        }
    }

    /// Headings for level 1..=6. Out-of-range levels yield an empty slice.
    pub fn headings(&self, level: u8) -> &[String] {
        match level {
            1 => &self.h1,
            2 => &self.h2,
            3 => &self.h3,
            4 => &self.h4,
            5 => &self.h5,
            6 => &self.h6,
            _ => &[],
        }
    }

    /// True when the page yielded no headings and no paragraphs.
    pub fn is_empty(&self) -> bool {
        (1..=6).all(|level| self.headings(level).is_empty()) && self.p.is_empty()
    }

    pub fn to_value(&self) -> Value {
        json!({
            "h1": self.h1,
            "h2": self.h2,
            "h3": self.h3,
            "h4": self.h4,
            "h5": self.h5,
            "h6": self.h6,
            "p": self.p,
        })
    }

    /// Compact JSON form, as embedded in prompts.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

// ---------------------------------------------------------------------------
// ContentBundle
// ---------------------------------------------------------------------------

/// Page name → extracted document, in catalog order.
///
/// Only ever built from a fully successful aggregation, so its key set always
/// equals the catalog's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentBundle {
    pages: Vec<(String, ContentDocument)>,
}

impl ContentBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, doc: ContentDocument) {
        self.pages.push((name.into(), doc));
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ContentDocument> {
        self.pages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, doc)| doc)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentDocument)> {
        self.pages.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Compact JSON object keyed by page name, preserving bundle order.
    pub fn to_json(&self) -> String {
        let map: Map<String, Value> = self
            .pages
            .iter()
            .map(|(name, doc)| (name.clone(), doc.to_value()))
            .collect();
        Value::Object(map).to_string()
    }
}

impl FromIterator<(String, ContentDocument)> for ContentBundle {
    fn from_iter<I: IntoIterator<Item = (String, ContentDocument)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationParams
// ---------------------------------------------------------------------------

/// Fixed generation settings, built once from config and never varied per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum output length in tokens.
    pub max_length: u32,
    /// Number of candidate sequences. Always 1; only the first is used.
    pub num_return_sequences: u32,
    /// No n-gram of this size may repeat in the output (0 disables).
    pub no_repeat_ngram_size: u32,
    /// Token id used for padding, normally the model's end-of-sequence token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_token_id: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            num_return_sequences: 1,
            no_repeat_ngram_size: 2,
            pad_token_id: Some(50256),
        }
    }
}
