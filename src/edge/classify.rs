use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    SelfLoop,
    Distinct,
}

/// Self-loop iff both ends name the same node. Coordinates play no part.
pub fn classify(source_id: &str, target_id: &str) -> ConnectionKind {
    if source_id == target_id {
        ConnectionKind::SelfLoop
    } else {
        ConnectionKind::Distinct
    }
}
