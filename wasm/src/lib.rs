use agentflow_edge::{Config, Theme, render_flow_svg};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    self_loop_min_stroke_width: Option<f32>,
    max_chars_per_message: Option<usize>,
}

fn build_config(options: EdgeRenderOptions) -> Config {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("default") {
        config.theme = Theme::mermaid_default();
        config.render.background = config.theme.background.clone();
    }

    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(width) = options.self_loop_min_stroke_width {
        config.edge.self_loop_min_stroke_width = width;
    }
    if let Some(max_chars) = options.max_chars_per_message {
        config.tooltip.max_chars_per_message = max_chars;
    }

    config
}

#[wasm_bindgen]
pub fn render_flow_edges_svg(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<EdgeRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        EdgeRenderOptions::default()
    };

    let config = build_config(options);
    render_flow_svg(document, &config).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use agentflow_edge::render_flow_svg;

    use crate::{EdgeRenderOptions, build_config};

    #[test]
    fn renders_self_loop_and_labelled_edge() {
        let document = r#"{"edges": [
            {"id": "loop", "source": "coder", "target": "coder",
             "sourceX": 100, "sourceY": 200, "targetX": 100, "targetY": 150,
             "data": {"label": "retry", "messages": [{"content": "again"}]}},
            {"id": "hand-off", "source": "planner", "target": "coder",
             "sourceX": 40, "sourceY": 0, "targetX": 100, "targetY": 150,
             "data": {"label": "plan", "messages": []}}
        ]}"#;

        let svg = render_flow_svg(document, &build_config(EdgeRenderOptions::default()))
            .expect("flow document should render");

        assert!(svg.contains("<svg"));
        assert!(svg.contains("M 100 144"));
        assert!(svg.contains("retry"));
        assert!(svg.contains("<title>plan</title>"));
    }

    #[test]
    fn options_override_defaults() {
        let options: EdgeRenderOptions =
            serde_json::from_str(r#"{"theme": "default", "selfLoopMinStrokeWidth": 4}"#)
                .expect("options");
        let config = build_config(options);
        assert_eq!(config.edge.self_loop_min_stroke_width, 4.0);
        assert_eq!(config.theme.line_color, "#333333");
    }
}
