//! Per-connection message summary shown when hovering an edge label.
//!
//! A connection carries every message that travelled along it, in the order
//! they were sent. [`build_tooltip`] turns that sequence into one tab per
//! message, each titled `Message <n>` (1-based) with the rendered body and,
//! when the producer reported usage, a `Tokens: <prompt + completion>` footer.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::ir::Message;

/// Turns one message into displayable text.
pub trait MessageRenderer {
    fn render(&self, message: &Message) -> String;
}

impl<F> MessageRenderer for F
where
    F: Fn(&Message) -> String,
{
    fn render(&self, message: &Message) -> String {
        self(message)
    }
}

/// Renders chat content as plain text: strings verbatim, `{source, content}`
/// objects as `source: content`, function calls as `name(arguments)`, lists
/// one item per line, and anything else as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl MessageRenderer for PlainTextRenderer {
    fn render(&self, message: &Message) -> String {
        render_value(&message.content)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => {
            if let Some(content) = map.get("content").and_then(Value::as_str) {
                return match map.get("source").and_then(Value::as_str) {
                    Some(source) => format!("{source}: {content}"),
                    None => content.to_string(),
                };
            }
            if let (Some(name), Some(arguments)) = (
                map.get("name").and_then(Value::as_str),
                map.get("arguments").and_then(Value::as_str),
            ) {
                return format!("{name}({arguments})");
            }
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipTab {
    /// Position of the message in the connection's sequence, 0-based.
    pub index: usize,
    pub title: String,
    pub rendered_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl TooltipTab {
    pub fn footer(&self) -> Option<String> {
        self.total_tokens.map(|total| format!("Tokens: {total}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipModel {
    pub tabs: Vec<TooltipTab>,
}

impl TooltipModel {
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Sum over tabs that reported usage; `None` when none did.
    pub fn total_tokens(&self) -> Option<u64> {
        self.tabs
            .iter()
            .filter_map(|tab| tab.total_tokens)
            .reduce(|a, b| a.saturating_add(b))
    }

    /// Flattens the tabs for hosts that can only show text, clipping each
    /// body to `max_chars` characters.
    pub fn to_plain_text(&self, max_chars: usize) -> String {
        let mut out = String::new();
        for (idx, tab) in self.tabs.iter().enumerate() {
            if idx > 0 {
                out.push_str("\n\n");
            }
            out.push_str(&tab.title);
            out.push('\n');
            out.push_str(&clip_chars(&tab.rendered_content, max_chars));
            if let Some(footer) = tab.footer() {
                out.push('\n');
                out.push_str(&footer);
            }
        }
        out
    }
}

fn clip_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// One tab per message, in order. Returns `None` for an empty sequence so
/// the caller can fall back to the bare label.
pub fn build_tooltip(messages: &[Message], renderer: &dyn MessageRenderer) -> Option<TooltipModel> {
    if messages.is_empty() {
        return None;
    }
    let tabs = messages
        .iter()
        .enumerate()
        .map(|(index, message)| TooltipTab {
            index,
            title: format!("Message {}", index + 1),
            rendered_content: renderer.render(message),
            total_tokens: message.total_tokens(),
        })
        .collect();
    Some(TooltipModel { tabs })
}

/// Memoizes tooltip models per connection. Entries are keyed by connection id
/// and message count, so a connection that gains messages is rebuilt.
#[derive(Debug, Default)]
pub struct TooltipCache {
    entries: HashMap<(String, usize), TooltipModel>,
}

impl TooltipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &mut self,
        connection_id: &str,
        messages: &[Message],
        renderer: &dyn MessageRenderer,
    ) -> Option<&TooltipModel> {
        if messages.is_empty() {
            return None;
        }
        let key = (connection_id.to_string(), messages.len());
        if !self.entries.contains_key(&key) {
            self.entries
                .retain(|(id, _), _| id.as_str() != connection_id);
            let model = build_tooltip(messages, renderer)?;
            self.entries.insert(key.clone(), model);
        }
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
