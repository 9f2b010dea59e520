use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub line_color: String,
    pub self_loop_color: String,
    pub edge_label_background: String,
    pub edge_label_border: String,
    pub edge_label_text_color: String,
    pub background: String,
}

impl Theme {
    pub fn mermaid_default() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            line_color: "#333333".to_string(),
            self_loop_color: "#333333".to_string(),
            edge_label_background: "#E8E8E8".to_string(),
            edge_label_border: "#9370DB".to_string(),
            edge_label_text_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            line_color: "#7A8AA6".to_string(),
            self_loop_color: "#5B6B8C".to_string(),
            edge_label_background: "rgba(238, 242, 248, 0.5)".to_string(),
            edge_label_border: "#C7D2E5".to_string(),
            edge_label_text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "base" | "default" | "mermaid" => Some(Self::mermaid_default()),
            _ => None,
        }
    }
}
