#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod edge;
pub mod geometry_dump;
pub mod ir;
pub mod path;
pub mod render;
pub mod text_metrics;
pub mod theme;
pub mod tooltip;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, EdgeConfig, load_config};
pub use document::{DocumentError, FlowDocument, parse_document};
pub use edge::{ConnectionKind, EdgeRouter, RoutedEdge, SmoothStepRouter, classify};
pub use ir::{ConnectionData, EdgeProps, Message, Point, TokenUsage};
pub use render::{EdgeRenderOutput, RenderContext, TooltipContent, render_document_svg, render_edge};
pub use theme::Theme;
pub use tooltip::{MessageRenderer, PlainTextRenderer, TooltipModel, build_tooltip};

/// Parses a flow document and renders it with the default router and
/// message renderer.
pub fn render_flow_svg(input: &str, config: &Config) -> Result<String, DocumentError> {
    let document = parse_document(input)?;
    let router = SmoothStepRouter::new(config.edge.smooth_step.clone());
    Ok(render_document_svg(&document, config, &router, &PlainTextRenderer))
}
