//! Annotation graph: all annotations one identity holds over a document text.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Annotation type-system version understood by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// A single span annotation.
///
/// `id` is the graph-internal identifier. It must stay stable across reads
/// because other annotations and client state refer to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    /// Layer (annotation type) name, e.g. `Sentence` or `NamedEntity`.
    pub layer: String,
    /// Byte offset of the first character.
    pub begin: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, serde_json::Value>,
}

impl Annotation {
    pub fn new(id: u64, layer: impl Into<String>, begin: usize, end: usize) -> Self {
        Self {
            id,
            layer: layer.into(),
            begin,
            end,
            features: BTreeMap::new(),
        }
    }

    /// Covered text, if the offsets fall on character boundaries of `text`.
    pub fn covered_text<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.begin..self.end)
    }
}

/// Serialized content a user (or the baseline) holds for a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationGraph {
    pub schema_version: u32,
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl AnnotationGraph {
    /// An empty graph over `text` at the current schema version.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            text: text.into(),
            annotations: Vec::new(),
        }
    }

    /// Next free annotation id: one past the highest id, or the lowest
    /// unused id once the highest is `u64::MAX`.
    pub fn next_id(&self) -> u64 {
        let max = self.annotations.iter().map(|a| a.id).max().unwrap_or(0);
        max.checked_add(1).unwrap_or_else(|| self.lowest_free_id())
    }

    fn lowest_free_id(&self) -> u64 {
        let used: BTreeSet<u64> = self.annotations.iter().map(|a| a.id).collect();
        (1..u64::MAX).find(|id| !used.contains(id)).unwrap_or(0)
    }

    /// Append an annotation with a freshly allocated id and return that id.
    pub fn add(&mut self, layer: impl Into<String>, begin: usize, end: usize) -> u64 {
        let id = self.next_id();
        self.annotations.push(Annotation::new(id, layer, begin, end));
        id
    }

    /// Annotations on the given layer, in stored order.
    pub fn layer<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations.iter().filter(move |a| a.layer == layer)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_allocates_increasing_ids() {
        let mut graph = AnnotationGraph::new("Hello world");
        assert_eq!(graph.add("Token", 0, 5), 1);
        assert_eq!(graph.add("Token", 6, 11), 2);
        assert_eq!(graph.layer("Token").count(), 2);
    }

    #[test]
    fn next_id_skips_gaps() {
        let mut graph = AnnotationGraph::new("abc");
        graph.annotations.push(Annotation::new(7, "Token", 0, 1));
        assert_eq!(graph.next_id(), 8);
    }

    #[test]
    fn next_id_after_max_id_reuses_lowest_free() {
        let mut graph = AnnotationGraph::new("abc");
        graph.annotations.push(Annotation::new(u64::MAX, "Token", 0, 1));
        graph.annotations.push(Annotation::new(1, "Token", 1, 2));
        assert_eq!(graph.next_id(), 2);
        assert_eq!(graph.add("Token", 2, 3), 2);
        assert_eq!(graph.next_id(), 3);
    }

    #[test]
    fn covered_text_respects_bounds() {
        let ann = Annotation::new(1, "Token", 6, 11);
        assert_eq!(ann.covered_text("Hello world"), Some("world"));
        assert_eq!(ann.covered_text("Hello"), None);
    }

    #[test]
    fn missing_annotations_field_defaults_to_empty() {
        let graph =
            AnnotationGraph::from_json_bytes(br#"{"schema_version":1,"text":"x"}"#).unwrap();
        assert!(graph.annotations.is_empty());
        assert_eq!(graph.schema_version, 1);
    }
}
