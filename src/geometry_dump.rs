use crate::config::EdgeConfig;
use crate::document::FlowDocument;
use crate::edge::{ConnectionKind, EdgeRouter};
use crate::render::{RenderContext, render_edge};
use crate::tooltip::{MessageRenderer, TooltipModel, build_tooltip};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GeometryDump {
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: ConnectionKind,
    /// SVG path data; absent when the connection could not be routed.
    pub d: Option<String>,
    pub stroke_width: Option<f32>,
    pub label_anchor: Option<[f32; 2]>,
    pub label: Option<String>,
    pub tooltip: Option<TooltipModel>,
}

impl GeometryDump {
    pub fn from_document(
        document: &FlowDocument,
        config: &EdgeConfig,
        router: &dyn EdgeRouter,
        renderer: &dyn MessageRenderer,
    ) -> Self {
        let ctx = RenderContext::new(router, config);
        let edges = document
            .edges
            .iter()
            .map(|props| {
                let output = render_edge(props, &ctx);
                EdgeDump {
                    id: props.id.clone(),
                    source: props.source.clone(),
                    target: props.target.clone(),
                    kind: output.kind,
                    d: output.path.as_ref().map(|p| p.d()),
                    stroke_width: output.path.as_ref().and_then(|p| p.stroke_width),
                    label_anchor: output.overlay.map(|o| [o.anchor.x, o.anchor.y]),
                    label: output.overlay.map(|o| o.label.to_string()),
                    tooltip: output
                        .overlay
                        .and_then(|o| build_tooltip(o.messages, renderer)),
                }
            })
            .collect();
        GeometryDump { edges }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when `None`.
pub fn write_geometry_dump(path: Option<&Path>, dump: &GeometryDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, dump)?;
            lock.write_all(b"\n")?;
        }
    }
    Ok(())
}
