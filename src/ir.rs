use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Side of a node a connection handle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    Top,
    Right,
    Bottom,
    Left,
}

impl HandlePosition {
    /// Unit vector pointing away from the node.
    pub fn outward(self) -> (f32, f32) {
        match self {
            Self::Top => (0.0, -1.0),
            Self::Right => (1.0, 0.0),
            Self::Bottom => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEndpoints {
    pub source_id: String,
    pub target_id: String,
    pub source_point: Point,
    pub target_point: Point,
    pub source_position: Option<HandlePosition>,
    pub target_position: Option<HandlePosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(alias = "promptTokens")]
    pub prompt_tokens: u64,
    #[serde(alias = "completionTokens")]
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// One exchanged chat message. Only `content` and the usage block are read;
/// everything else the producer attaches is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default, alias = "tokenUsage", skip_serializing_if = "Option::is_none")]
    pub models_usage: Option<TokenUsage>,
}

impl Message {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: serde_json::Value::String(content.into()),
            models_usage: None,
        }
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.models_usage = Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
        });
        self
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.models_usage.as_ref().map(TokenUsage::total)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

/// Props for one connection instance, in the shape the flow canvas hands them
/// to an edge component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeProps {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub source_x: f32,
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub source_y: f32,
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub target_x: f32,
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub target_y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandlePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandlePosition>,
    #[serde(default)]
    pub style: EdgeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<String>,
    #[serde(default)]
    pub data: ConnectionData,
}

impl EdgeProps {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        source_point: Point,
        target_point: Point,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_x: source_point.x,
            source_y: source_point.y,
            target_x: target_point.x,
            target_y: target_point.y,
            source_position: None,
            target_position: None,
            style: EdgeStyle::default(),
            marker_end: None,
            data: ConnectionData::default(),
        }
    }

    pub fn endpoints(&self) -> ConnectionEndpoints {
        ConnectionEndpoints {
            source_id: self.source.clone(),
            target_id: self.target.clone(),
            source_point: Point::new(self.source_x, self.source_y),
            target_point: Point::new(self.target_x, self.target_y),
            source_position: self.source_position,
            target_position: self.target_position,
        }
    }
}

/// Absent or `null` coordinates become NaN; the connection then degrades
/// instead of failing the whole document.
fn missing_coordinate() -> f32 {
    f32::NAN
}

fn coordinate<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::NAN))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Message>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Message>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_tokens_distinguishes_missing_from_zero() {
        assert_eq!(Message::text("hi").total_tokens(), None);
        assert_eq!(Message::text("hi").with_usage(0, 0).total_tokens(), Some(0));
        assert_eq!(Message::text("hi").with_usage(10, 5).total_tokens(), Some(15));
    }

    #[test]
    fn edge_props_deserialize_from_canvas_json() {
        let raw = r#"{
            "id": "e1",
            "source": "planner",
            "target": "planner",
            "sourceX": 100, "sourceY": 200, "targetX": 100, "targetY": 150,
            "sourcePosition": "bottom",
            "style": {"strokeWidth": 1},
            "markerEnd": "arrow",
            "data": {
                "label": "2 messages",
                "messages": [
                    {"content": "hello", "source": "user"},
                    {"content": "done", "models_usage": {"prompt_tokens": 3, "completion_tokens": 4}}
                ]
            }
        }"#;
        let props: EdgeProps = serde_json::from_str(raw).expect("props parse");
        assert_eq!(props.source_position, Some(HandlePosition::Bottom));
        assert_eq!(props.target_position, None);
        assert_eq!(props.style.stroke_width, Some(1.0));
        assert_eq!(props.data.messages.len(), 2);
        assert_eq!(props.data.messages[1].total_tokens(), Some(7));
        let endpoints = props.endpoints();
        assert_eq!(endpoints.source_point, Point::new(100.0, 200.0));
        assert_eq!(endpoints.target_id, "planner");
    }

    #[test]
    fn camel_case_token_usage_is_accepted() {
        let raw = r#"{"content": "x", "tokenUsage": {"promptTokens": 1, "completionTokens": 2}}"#;
        let message: Message = serde_json::from_str(raw).expect("message parse");
        assert_eq!(message.total_tokens(), Some(3));
    }

    #[test]
    fn missing_coordinates_and_null_messages_are_tolerated() {
        let raw = r#"{
            "id": "bad", "source": "a", "target": "b",
            "sourceX": 0, "sourceY": null, "targetX": 5,
            "data": {"label": "x", "messages": null}
        }"#;
        let props: EdgeProps = serde_json::from_str(raw).expect("props parse");
        assert_eq!(props.source_x, 0.0);
        assert!(props.source_y.is_nan());
        assert!(props.target_y.is_nan());
        assert!(props.data.messages.is_empty());
        assert!(!props.endpoints().source_point.is_finite());
    }
}
