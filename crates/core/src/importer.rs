//! Format importers convert raw uploaded bytes into an annotation graph.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::graph::AnnotationGraph;

/// Format tag for UTF-8 plain text.
pub const FORMAT_PLAIN_TEXT: &str = "text";

/// Format tag for tab-separated training data.
pub const FORMAT_TAB_SEP: &str = "tab-sep";

/// Formats that hold training data only and are never listed for annotation.
pub const TRAINING_FORMATS: &[&str] = &[FORMAT_TAB_SEP];

/// Layer name the plain-text importer uses for line-level sentences.
pub const SENTENCE_LAYER: &str = "Sentence";

/// Whether documents of `format` are excluded from annotation listings.
pub fn is_training_format(format: &str) -> bool {
    TRAINING_FORMATS.contains(&format)
}

/// Converts a document's native format into an [`AnnotationGraph`].
///
/// Conversion is expected to be deterministic: the same bytes and format
/// always produce the same graph.
#[async_trait]
pub trait FormatImporter: Send + Sync {
    async fn import(&self, raw: &[u8], format: &str) -> Result<AnnotationGraph, CoreError>;
}

/// Importer for [`FORMAT_PLAIN_TEXT`].
///
/// Every non-blank line becomes one `Sentence` annotation; ids run from 1
/// in document order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextImporter;

#[async_trait]
impl FormatImporter for PlainTextImporter {
    async fn import(&self, raw: &[u8], format: &str) -> Result<AnnotationGraph, CoreError> {
        if format != FORMAT_PLAIN_TEXT {
            return Err(CoreError::conversion(format, "unsupported format"));
        }
        let text = std::str::from_utf8(raw)
            .map_err(|e| CoreError::conversion(format, format!("invalid UTF-8: {e}")))?;

        let mut graph = AnnotationGraph::new(text);
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);
            let leading = content.len() - content.trim_start().len();
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                let begin = offset + leading;
                graph.add(SENTENCE_LAYER, begin, begin + trimmed.len());
            }
            offset += line.len();
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn one_sentence_per_line() {
        let graph = PlainTextImporter
            .import(b"First line.\n\n  Second line.  \r\nThird", FORMAT_PLAIN_TEXT)
            .await
            .unwrap();

        let sentences: Vec<_> = graph
            .layer(SENTENCE_LAYER)
            .map(|a| a.covered_text(&graph.text).unwrap())
            .collect();
        assert_eq!(sentences, ["First line.", "Second line.", "Third"]);
        let ids: Vec<_> = graph.annotations.iter().map(|a| a.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_input_gives_empty_graph() {
        let graph = PlainTextImporter.import(b"", FORMAT_PLAIN_TEXT).await.unwrap();
        assert!(graph.annotations.is_empty());
        assert_eq!(graph.text, "");
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_conversion_failure() {
        let result = PlainTextImporter.import(&[0xff, 0xfe], FORMAT_PLAIN_TEXT).await;
        assert_matches!(result, Err(CoreError::Conversion { format, .. }) if format == "text");
    }

    #[tokio::test]
    async fn foreign_format_rejected() {
        let result = PlainTextImporter.import(b"a", "conll2002").await;
        assert_matches!(result, Err(CoreError::Conversion { .. }));
    }

    #[test]
    fn tab_sep_is_training_only() {
        assert!(is_training_format(FORMAT_TAB_SEP));
        assert!(!is_training_format(FORMAT_PLAIN_TEXT));
    }
}
