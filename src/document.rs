use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::EdgeProps;

/// A set of connections to render together. Node placement has already
/// happened upstream; each edge carries its own handle coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default)]
    pub edges: Vec<EdgeProps>,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid flow document: {0}")]
    Parse(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentShape {
    Document(FlowDocument),
    Edges(Vec<EdgeProps>),
}

impl From<DocumentShape> for FlowDocument {
    fn from(shape: DocumentShape) -> Self {
        match shape {
            DocumentShape::Document(doc) => doc,
            DocumentShape::Edges(edges) => FlowDocument {
                edges,
                ..Default::default()
            },
        }
    }
}

/// Parses a document from JSON, falling back to JSON5 for hand-written
/// input. A bare array of edges is accepted as well. Later edges reusing an
/// id are skipped; the first one wins.
pub fn parse_document(input: &str) -> Result<FlowDocument, DocumentError> {
    let shape = match serde_json::from_str::<DocumentShape>(input) {
        Ok(shape) => shape,
        Err(json_err) => {
            tracing::debug!(error = %json_err, "strict JSON parse failed; retrying as JSON5");
            json5::from_str::<DocumentShape>(input)
                .map_err(|err| DocumentError::Parse(format!("{json_err}; as JSON5: {err}")))?
        }
    };
    let mut document = FlowDocument::from(shape);
    let mut seen = HashSet::new();
    document.edges.retain(|edge| {
        let fresh = seen.insert(edge.id.clone());
        if !fresh {
            tracing::warn!(id = %edge.id, "duplicate edge id; skipping later occurrence");
        }
        fresh
    });
    tracing::debug!(edges = document.edges.len(), "parsed flow document");
    Ok(document)
}

pub fn load_document(path: &Path) -> Result<FlowDocument, DocumentError> {
    let input = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let raw = r#"{
            "width": 640,
            "edges": [
                {"id": "e1", "source": "a", "target": "b",
                 "sourceX": 0, "sourceY": 0, "targetX": 0, "targetY": 100}
            ]
        }"#;
        let doc = parse_document(raw).expect("document");
        assert_eq!(doc.width, Some(640.0));
        assert_eq!(doc.height, None);
        assert_eq!(doc.edges.len(), 1);
        assert!(doc.edges[0].data.messages.is_empty());
    }

    #[test]
    fn accepts_bare_edge_array() {
        let raw = r#"[{"id": "e1", "source": "a", "target": "a",
                       "sourceX": 10, "sourceY": 60, "targetX": 10, "targetY": 20}]"#;
        let doc = parse_document(raw).expect("document");
        assert_eq!(doc.edges[0].source, doc.edges[0].target);
    }

    #[test]
    fn falls_back_to_json5() {
        let raw = r#"{
            // hand-written
            edges: [
                {id: 'e1', source: 'a', target: 'b', sourceX: 0, sourceY: 0, targetX: 5, targetY: 5,},
            ],
        }"#;
        let doc = parse_document(raw).expect("json5 document");
        assert_eq!(doc.edges[0].id, "e1");
    }

    #[test]
    fn duplicate_ids_keep_first_edge() {
        let raw = r#"[
            {"id": "e", "source": "a", "target": "b", "sourceX": 0, "sourceY": 0, "targetX": 1, "targetY": 1},
            {"id": "e", "source": "b", "target": "c", "sourceX": 0, "sourceY": 0, "targetX": 1, "targetY": 1},
            {"id": "f", "source": "c", "target": "d", "sourceX": 0, "sourceY": 0, "targetX": 1, "targetY": 1}
        ]"#;
        let doc = parse_document(raw).expect("document");
        let ids: Vec<&str> = doc.edges.iter().map(|edge| edge.id.as_str()).collect();
        assert_eq!(ids, ["e", "f"]);
        assert_eq!(doc.edges[0].target, "b");
    }

    #[test]
    fn one_malformed_edge_does_not_sink_the_document() {
        let raw = r#"{"edges": [
            {"id": "ok", "source": "a", "target": "b",
             "sourceX": 0, "sourceY": 0, "targetX": 0, "targetY": 100},
            {"id": "bad", "source": "b", "target": "c", "sourceX": 5, "targetX": 5},
            {"id": "quiet", "source": "c", "target": "c",
             "sourceX": 10, "sourceY": 60, "targetX": 10, "targetY": 20,
             "data": {"label": "idle", "messages": null}}
        ]}"#;
        let doc = parse_document(raw).expect("document");
        assert_eq!(doc.edges.len(), 3);
        assert!(doc.edges[0].endpoints().source_point.is_finite());
        assert!(doc.edges[1].source_y.is_nan());
        assert!(doc.edges[2].data.messages.is_empty());
    }

    #[test]
    fn reports_garbage_as_parse_error() {
        assert!(matches!(parse_document("not a document"), Err(DocumentError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_document(Path::new("/nonexistent/flow.json")).expect_err("missing file");
        assert!(matches!(err, DocumentError::Io { .. }));
    }
}
