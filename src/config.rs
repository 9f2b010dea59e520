use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of the loop drawn for a connection from a node to itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfLoopConfig {
    /// How far right of the handles the loop extends.
    pub right_offset: f32,
    /// Clearance above the upper handle and below the lower one.
    pub vertical_padding: f32,
    pub radius: f32,
    /// Horizontal gap between the loop's right edge and its label anchor.
    pub label_gap: f32,
}

impl Default for SelfLoopConfig {
    fn default() -> Self {
        Self {
            right_offset: 120.0,
            vertical_padding: 6.0,
            radius: 8.0,
            label_gap: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothStepConfig {
    pub border_radius: f32,
    /// Length of the straight stub leaving each handle.
    pub offset: f32,
}

impl Default for SmoothStepConfig {
    fn default() -> Self {
        Self {
            border_radius: 5.0,
            offset: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub self_loop: SelfLoopConfig,
    pub smooth_step: SmoothStepConfig,
    /// Stroke width used when the style does not request one.
    pub default_stroke_width: f32,
    /// Self-loops are never drawn thinner than this.
    pub self_loop_min_stroke_width: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
    pub label_corner_radius: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            self_loop: SelfLoopConfig::default(),
            smooth_step: SmoothStepConfig::default(),
            default_stroke_width: 1.0,
            self_loop_min_stroke_width: 2.0,
            label_padding_x: 8.0,
            label_padding_y: 4.0,
            label_corner_radius: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TooltipConfig {
    /// Longest message body carried into flat (SVG title) tooltips.
    pub max_chars_per_message: usize,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            max_chars_per_message: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    /// Margin kept around the drawn geometry when sizing the canvas.
    pub padding: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
            padding: 24.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub edge: EdgeConfig,
    pub tooltip: TooltipConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            edge: EdgeConfig::default(),
            tooltip: TooltipConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<NumberOrString>,
    line_color: Option<String>,
    self_loop_color: Option<String>,
    edge_label_background: Option<String>,
    edge_label_border: Option<String>,
    edge_label_text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SelfLoopConfigFile {
    right_offset: Option<f32>,
    vertical_padding: Option<f32>,
    radius: Option<f32>,
    label_gap: Option<f32>,
    min_stroke_width: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SmoothStepConfigFile {
    border_radius: Option<f32>,
    offset: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TooltipConfigFile {
    max_chars_per_message: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    self_loop: Option<SelfLoopConfigFile>,
    smooth_step: Option<SmoothStepConfigFile>,
    tooltip: Option<TooltipConfigFile>,
    default_stroke_width: Option<f32>,
    padding: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlays a JSON config document onto the defaults. Absent keys keep their
/// default values.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme; keeping default"),
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size.as_ref().and_then(NumberOrString::as_f32) {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.self_loop_color {
            config.theme.self_loop_color = v;
        }
        if let Some(v) = vars.edge_label_background {
            config.theme.edge_label_background = v;
        }
        if let Some(v) = vars.edge_label_border {
            config.theme.edge_label_border = v;
        }
        if let Some(v) = vars.edge_label_text_color {
            config.theme.edge_label_text_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(self_loop) = parsed.self_loop {
        if let Some(v) = self_loop.right_offset {
            config.edge.self_loop.right_offset = v;
        }
        if let Some(v) = self_loop.vertical_padding {
            config.edge.self_loop.vertical_padding = v;
        }
        if let Some(v) = self_loop.radius {
            config.edge.self_loop.radius = v.max(0.0);
        }
        if let Some(v) = self_loop.label_gap {
            config.edge.self_loop.label_gap = v;
        }
        if let Some(v) = self_loop.min_stroke_width {
            config.edge.self_loop_min_stroke_width = v.max(0.0);
        }
    }

    if let Some(smooth_step) = parsed.smooth_step {
        if let Some(v) = smooth_step.border_radius {
            config.edge.smooth_step.border_radius = v.max(0.0);
        }
        if let Some(v) = smooth_step.offset {
            config.edge.smooth_step.offset = v.max(0.0);
        }
    }

    if let Some(v) = parsed.tooltip.and_then(|tooltip| tooltip.max_chars_per_message) {
        config.tooltip.max_chars_per_message = v;
    }

    if let Some(v) = parsed.default_stroke_width {
        config.edge.default_stroke_width = v;
    }
    if let Some(v) = parsed.padding {
        config.render.padding = v.max(0.0);
    }

    Ok(config)
}
