//! Static keyword table checked before any network call.

use sitechat_shared::KeywordEntry;

/// Ordered phrase → canned response table.
///
/// Phrases are lowercased once at construction. Lookup is a case-insensitive
/// substring test; the first matching phrase in table order wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordRouter {
    table: Vec<(String, String)>,
}

impl KeywordRouter {
    /// Build from configured entries, keeping their order. Blank phrases
    /// would match every message and are skipped.
    pub fn new(entries: &[KeywordEntry]) -> Self {
        let table = entries
            .iter()
            .filter(|e| !e.phrase.trim().is_empty())
            .map(|e| (e.phrase.to_lowercase(), e.response.clone()))
            .collect();
        Self { table }
    }

    /// Canned response for `input`, if any phrase occurs in it.
    pub fn lookup(&self, input: &str) -> Option<&str> {
        let input = input.to_lowercase();
        self.table
            .iter()
            .find(|(phrase, _)| input.contains(phrase.as_str()))
            .map(|(_, response)| response.as_str())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
