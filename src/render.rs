use crate::config::{Config, EdgeConfig, RenderConfig, TooltipConfig};
use crate::document::FlowDocument;
use crate::edge::{ConnectionKind, EdgeRouter, resolve_geometry};
use crate::ir::{EdgeProps, EdgeStyle, Message, Point};
use crate::path::{Path, fmt_num};
use crate::text_metrics::label_width;
use crate::theme::Theme;
use crate::tooltip::{MessageRenderer, TooltipModel, build_tooltip};
use anyhow::Result;
use std::fmt::Write as _;

/// Collaborators and settings shared by every connection in a render pass.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub router: &'a dyn EdgeRouter,
    pub config: &'a EdgeConfig,
}

impl<'a> RenderContext<'a> {
    pub fn new(router: &'a dyn EdgeRouter, config: &'a EdgeConfig) -> Self {
        Self { router, config }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathPrimitive {
    pub path: Path,
    /// Effective stroke width; `None` leaves the host default in place.
    pub stroke_width: Option<f32>,
    pub style: EdgeStyle,
    pub marker_end: Option<String>,
}

impl PathPrimitive {
    pub fn d(&self) -> String {
        self.path.to_svg_d()
    }
}

/// What hovering or focusing a connection label reveals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TooltipContent {
    Tabs(TooltipModel),
    /// No messages: the label text itself.
    Text(String),
}

/// Floating label centered on the connection's label anchor. The tooltip is
/// only aggregated when [`LabelOverlay::tooltip`] is called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelOverlay<'a> {
    pub anchor: Point,
    pub label: &'a str,
    pub messages: &'a [Message],
}

impl LabelOverlay<'_> {
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn tooltip(&self, renderer: &dyn MessageRenderer) -> TooltipContent {
        match build_tooltip(self.messages, renderer) {
            Some(model) => TooltipContent::Tabs(model),
            None => TooltipContent::Text(self.label.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRenderOutput<'a> {
    pub id: &'a str,
    pub kind: ConnectionKind,
    pub path: Option<PathPrimitive>,
    pub overlay: Option<LabelOverlay<'a>>,
}

/// Resolves one connection into its drawable parts. Pure: identical props
/// and context always give identical output.
pub fn render_edge<'a>(props: &'a EdgeProps, ctx: &RenderContext<'_>) -> EdgeRenderOutput<'a> {
    let endpoints = props.endpoints();
    let geometry = resolve_geometry(&endpoints, ctx.router, ctx.config);
    let kind = geometry.kind;

    let stroke_width = effective_stroke_width(kind, props.style.stroke_width, ctx.config);
    let (path, anchor) = match geometry.route {
        Some(routed) => (
            Some(PathPrimitive {
                path: routed.path,
                stroke_width,
                style: props.style.clone(),
                marker_end: props.marker_end.clone(),
            }),
            Some(routed.label),
        ),
        None => (None, None),
    };

    let overlay = match (props.data.label.as_deref(), anchor) {
        (Some(label), Some(anchor)) => Some(LabelOverlay {
            anchor,
            label,
            messages: &props.data.messages,
        }),
        _ => None,
    };

    EdgeRenderOutput {
        id: &props.id,
        kind,
        path,
        overlay,
    }
}

/// Width a self-loop starts from before widening when its style sets none.
const UNSET_SELF_LOOP_WIDTH: f32 = 1.0;

/// Self-loops are widened so they stay visible next to their node; other
/// connections keep whatever the style asked for.
pub fn effective_stroke_width(
    kind: ConnectionKind,
    requested: Option<f32>,
    config: &EdgeConfig,
) -> Option<f32> {
    match kind {
        ConnectionKind::SelfLoop => Some(
            requested
                .filter(|width| *width > 0.0)
                .unwrap_or(UNSET_SELF_LOOP_WIDTH)
                .max(config.self_loop_min_stroke_width),
        ),
        ConnectionKind::Distinct => requested,
    }
}

/// Emits one connection as SVG: the stroked path, then the label group with
/// the aggregated tooltip as its `<title>`.
pub fn edge_svg(
    output: &EdgeRenderOutput<'_>,
    theme: &Theme,
    config: &Config,
    renderer: &dyn MessageRenderer,
) -> String {
    let mut svg = String::new();
    if let Some(primitive) = &output.path {
        push_path_svg(&mut svg, output, primitive, theme, &config.edge);
    }
    if let Some(overlay) = &output.overlay {
        push_label_svg(&mut svg, overlay, theme, &config.edge, &config.tooltip, renderer);
    }
    svg
}

fn push_path_svg(
    svg: &mut String,
    output: &EdgeRenderOutput<'_>,
    primitive: &PathPrimitive,
    theme: &Theme,
    config: &EdgeConfig,
) {
    let default_color = match output.kind {
        ConnectionKind::SelfLoop => theme.self_loop_color.as_str(),
        ConnectionKind::Distinct => theme.line_color.as_str(),
    };
    let stroke = primitive.style.stroke.as_deref().unwrap_or(default_color);
    let width = primitive.stroke_width.unwrap_or(config.default_stroke_width);
    let _ = write!(
        svg,
        "<path id=\"{}\" class=\"edge-path\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"",
        escape_xml(output.id),
        primitive.d(),
        escape_xml(stroke),
        fmt_num(width)
    );
    if let Some(dash) = primitive.style.stroke_dasharray.as_deref() {
        let _ = write!(svg, " stroke-dasharray=\"{}\"", escape_xml(dash));
    }
    if let Some(opacity) = primitive.style.opacity {
        let _ = write!(svg, " opacity=\"{}\"", fmt_num(opacity));
    }
    if let Some(marker) = primitive.marker_end.as_deref() {
        let _ = write!(svg, " marker-end=\"{}\"", escape_xml(&marker_reference(marker)));
    }
    svg.push_str("/>");
}

fn push_label_svg(
    svg: &mut String,
    overlay: &LabelOverlay<'_>,
    theme: &Theme,
    edge: &EdgeConfig,
    tooltip: &TooltipConfig,
    renderer: &dyn MessageRenderer,
) {
    let (rect_w, rect_h) = label_box(overlay.label, theme, edge);
    let x = overlay.anchor.x;
    let y = overlay.anchor.y;
    let _ = write!(
        svg,
        "<g class=\"edge-label\" transform=\"translate({},{})\" tabindex=\"0\">",
        fmt_num(x),
        fmt_num(y)
    );
    let title = match overlay.tooltip(renderer) {
        TooltipContent::Tabs(model) => model.to_plain_text(tooltip.max_chars_per_message),
        TooltipContent::Text(text) => text,
    };
    let _ = write!(svg, "<title>{}</title>", escape_xml(&title));
    let _ = write!(
        svg,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{r}\" ry=\"{r}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
        fmt_num(-rect_w / 2.0),
        fmt_num(-rect_h / 2.0),
        fmt_num(rect_w),
        fmt_num(rect_h),
        escape_xml(&theme.edge_label_background),
        escape_xml(&theme.edge_label_border),
        r = fmt_num(edge.label_corner_radius),
    );
    let _ = write!(
        svg,
        "<text x=\"0\" y=\"0\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        fmt_num(theme.font_size),
        escape_xml(&theme.edge_label_text_color),
        escape_xml(overlay.label)
    );
    svg.push_str("</g>");
}

/// Width and height of the label background, padding included.
pub fn label_box(label: &str, theme: &Theme, edge: &EdgeConfig) -> (f32, f32) {
    let text_w = label_width(label, theme.font_size, &theme.font_family);
    (
        text_w + edge.label_padding_x * 2.0,
        theme.font_size * 1.4 + edge.label_padding_y * 2.0,
    )
}

/// Accepts either a bare marker id or a ready `url(#id)` reference.
fn marker_reference(marker: &str) -> String {
    let trimmed = marker.trim();
    if trimmed.starts_with("url(") {
        trimmed.to_string()
    } else {
        format!("url(#{})", trimmed.trim_start_matches('#'))
    }
}

const MIN_CANVAS_EXTENT: f32 = 200.0;

/// Renders every connection of a document into one standalone SVG.
pub fn render_document_svg(
    document: &FlowDocument,
    config: &Config,
    router: &dyn EdgeRouter,
    renderer: &dyn MessageRenderer,
) -> String {
    let theme = &config.theme;
    let ctx = RenderContext::new(router, &config.edge);
    let outputs: Vec<EdgeRenderOutput<'_>> = document
        .edges
        .iter()
        .map(|props| render_edge(props, &ctx))
        .collect();

    let (min, max) = canvas_bounds(&outputs, theme, &config.edge, &config.render);
    // An explicit dimension pins that axis to the canvas origin; the other
    // axis still frames the drawn geometry.
    let (origin_x, width) = canvas_axis(document.width, min.x, max.x);
    let (origin_y, height) = canvas_axis(document.height, min.y, max.y);

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"{} {} {w} {h}\">",
        fmt_num(origin_x),
        fmt_num(origin_y),
        w = fmt_num(width),
        h = fmt_num(height),
    );
    let _ = write!(
        svg,
        "<rect x=\"{}\" y=\"{}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        fmt_num(origin_x),
        fmt_num(origin_y),
        escape_xml(&config.render.background)
    );
    svg.push_str("<defs>");
    let _ = write!(
        svg,
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        escape_xml(&theme.line_color)
    );
    svg.push_str("</defs>");

    // Paths first so every label floats above all connections.
    for output in &outputs {
        if let Some(primitive) = &output.path {
            push_path_svg(&mut svg, output, primitive, theme, &config.edge);
        }
    }
    for output in &outputs {
        if let Some(overlay) = &output.overlay {
            push_label_svg(&mut svg, overlay, theme, &config.edge, &config.tooltip, renderer);
        }
    }

    svg.push_str("</svg>");
    svg
}

fn canvas_axis(explicit: Option<f32>, min: f32, max: f32) -> (f32, f32) {
    match explicit {
        Some(extent) => (0.0, extent.max(MIN_CANVAS_EXTENT)),
        None => (min, (max - min).max(MIN_CANVAS_EXTENT)),
    }
}

fn canvas_bounds(
    outputs: &[EdgeRenderOutput<'_>],
    theme: &Theme,
    edge: &EdgeConfig,
    render: &RenderConfig,
) -> (Point, Point) {
    let mut min = Point::new(f32::INFINITY, f32::INFINITY);
    let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    let mut include = |p: Point| {
        if p.is_finite() {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
    };
    for output in outputs {
        if let Some((lo, hi)) = output.path.as_ref().and_then(|p| p.path.bounds()) {
            include(lo);
            include(hi);
        }
        if let Some(overlay) = &output.overlay {
            let (w, h) = label_box(overlay.label, theme, edge);
            include(Point::new(overlay.anchor.x - w / 2.0, overlay.anchor.y - h / 2.0));
            include(Point::new(overlay.anchor.x + w / 2.0, overlay.anchor.y + h / 2.0));
        }
    }
    if !min.is_finite() || !max.is_finite() {
        return (Point::new(0.0, 0.0), Point::new(0.0, 0.0));
    }
    let pad = render.padding;
    (
        Point::new(min.x - pad, min.y - pad),
        Point::new(max.x + pad, max.y + pad),
    )
}

pub fn write_output_svg(svg: &str, output: Option<&std::path::Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(
    svg: &str,
    output: &std::path::Path,
    render_cfg: &RenderConfig,
    theme: &Theme,
) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = primary_font_family(&theme.font_family);
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(feature = "png")]
fn primary_font_family(families: &str) -> String {
    families
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .find(|part| !part.is_empty())
        .unwrap_or("sans-serif")
        .to_string()
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{RouteRequest, RoutedEdge, SmoothStepRouter};
    use crate::tooltip::PlainTextRenderer;

    fn self_loop_props(stroke_width: Option<f32>) -> EdgeProps {
        let mut props = EdgeProps::new(
            "loop",
            "planner",
            "planner",
            Point::new(100.0, 200.0),
            Point::new(100.0, 150.0),
        );
        props.style.stroke_width = stroke_width;
        props
    }

    fn render_with<'a>(props: &'a EdgeProps, router: &dyn EdgeRouter) -> EdgeRenderOutput<'a> {
        let config = EdgeConfig::default();
        render_edge(props, &RenderContext::new(router, &config))
    }

    #[test]
    fn self_loop_stroke_is_widened() {
        let router = SmoothStepRouter::default();
        for (requested, expected) in [(Some(1.0), 2.0), (Some(5.0), 5.0), (None, 2.0), (Some(0.0), 2.0)] {
            let props = self_loop_props(requested);
            let output = render_with(&props, &router);
            let primitive = output.path.expect("self-loop path");
            assert_eq!(primitive.stroke_width, Some(expected), "requested {requested:?}");
        }
    }

    #[test]
    fn unset_self_loop_width_ignores_configured_default() {
        let router = SmoothStepRouter::default();
        let config = EdgeConfig {
            default_stroke_width: 3.0,
            ..Default::default()
        };
        let props = self_loop_props(None);
        let output = render_edge(&props, &RenderContext::new(&router, &config));
        assert_eq!(output.path.expect("self-loop path").stroke_width, Some(2.0));
    }

    #[test]
    fn distinct_stroke_is_untouched() {
        let router = SmoothStepRouter::default();
        let mut props = EdgeProps::new("e", "a", "b", Point::new(0.0, 0.0), Point::new(0.0, 100.0));
        assert_eq!(render_with(&props, &router).path.expect("path").stroke_width, None);
        props.style.stroke_width = Some(1.0);
        assert_eq!(render_with(&props, &router).path.expect("path").stroke_width, Some(1.0));
    }

    #[test]
    fn overlay_only_with_label() {
        let router = SmoothStepRouter::default();
        let mut props = self_loop_props(None);
        assert!(render_with(&props, &router).overlay.is_none());

        props.data.label = Some("loop".to_string());
        let output = render_with(&props, &router);
        let overlay = output.overlay.expect("overlay");
        assert_eq!(overlay.anchor, Point::new(230.0, 175.0));
        assert_eq!(overlay.tooltip(&PlainTextRenderer), TooltipContent::Text("loop".to_string()));
    }

    #[test]
    fn overlay_tooltip_aggregates_messages() {
        let router = SmoothStepRouter::default();
        let mut props = self_loop_props(None);
        props.data.label = Some("2 messages".to_string());
        props.data.messages = vec![
            Message::text("first").with_usage(10, 5),
            Message::text("second"),
        ];
        let output = render_with(&props, &router);
        let overlay = output.overlay.expect("overlay");
        assert!(overlay.has_messages());
        let TooltipContent::Tabs(model) = overlay.tooltip(&PlainTextRenderer) else {
            panic!("expected tabs");
        };
        assert_eq!(model.tabs[0].title, "Message 1");
        assert_eq!(model.tabs[0].footer().as_deref(), Some("Tokens: 15"));
        assert_eq!(model.tabs[1].footer(), None);
    }

    #[test]
    fn failed_route_renders_nothing() {
        let refuse = |_: &RouteRequest| -> Option<RoutedEdge> { None };
        let mut props = EdgeProps::new("e", "a", "b", Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        props.data.label = Some("lost".to_string());
        let output = render_with(&props, &refuse);
        assert_eq!(output.kind, ConnectionKind::Distinct);
        assert!(output.path.is_none());
        assert!(output.overlay.is_none());
    }

    #[test]
    fn rendering_twice_is_identical() {
        let router = SmoothStepRouter::default();
        let mut props = self_loop_props(Some(1.0));
        props.data.label = Some("x".to_string());
        let first = render_with(&props, &router);
        let second = render_with(&props, &router);
        assert_eq!(first, second);
        assert_eq!(
            first.path.as_ref().map(PathPrimitive::d),
            second.path.as_ref().map(PathPrimitive::d)
        );

        let config = Config::default();
        let a = edge_svg(&first, &config.theme, &config, &PlainTextRenderer);
        let b = edge_svg(&second, &config.theme, &config, &PlainTextRenderer);
        assert_eq!(a, b);
    }

    #[test]
    fn edge_svg_carries_marker_and_title() {
        let router = SmoothStepRouter::default();
        let mut props = EdgeProps::new("e1", "a", "b", Point::new(0.0, 0.0), Point::new(0.0, 100.0));
        props.marker_end = Some("arrow".to_string());
        props.data.label = Some("a <to> b".to_string());
        props.data.messages = vec![Message::text("hello & bye").with_usage(1, 2)];
        let output = render_with(&props, &router);
        let config = Config::default();
        let svg = edge_svg(&output, &config.theme, &config, &PlainTextRenderer);
        assert!(svg.contains("marker-end=\"url(#arrow)\""));
        assert!(svg.contains("d=\"M 0 0 L 0 100\""));
        assert!(svg.contains("<title>Message 1\nhello &amp; bye\nTokens: 3</title>"));
        assert!(svg.contains("a &lt;to&gt; b"));
    }

    #[test]
    fn marker_reference_accepts_both_forms() {
        assert_eq!(marker_reference("arrow"), "url(#arrow)");
        assert_eq!(marker_reference("#arrow"), "url(#arrow)");
        assert_eq!(marker_reference("url(#m)"), "url(#m)");
    }

    #[test]
    fn render_svg_document() {
        let mut looped = self_loop_props(Some(1.0));
        looped.data.label = Some("self".to_string());
        let straight = EdgeProps::new("e2", "a", "b", Point::new(0.0, 0.0), Point::new(0.0, 80.0));
        let document = FlowDocument {
            width: None,
            height: None,
            edges: vec![looped, straight],
        };
        let svg = render_document_svg(
            &document,
            &Config::default(),
            &SmoothStepRouter::default(),
            &PlainTextRenderer,
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("class=\"edge-path\"").count(), 2);
        assert_eq!(svg.matches("class=\"edge-label\"").count(), 1);
    }
}
