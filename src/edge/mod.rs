//! Connection geometry: classification, the self-loop resolver and the
//! routing adapter for connections between distinct nodes.

mod classify;
mod routing;
mod self_loop;

pub use classify::{ConnectionKind, classify};
pub use routing::{EdgeRouter, RouteRequest, SmoothStepRouter, resolve_distinct};
pub use self_loop::resolve_self_loop;

use crate::config::EdgeConfig;
use crate::ir::{ConnectionEndpoints, Point};
use crate::path::Path;

/// A path together with the point its label overlay is centered on.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub path: Path,
    pub label: Point,
}

/// Geometry of one connection after strategy selection. `route` is `None`
/// when the router could not produce a usable path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    pub kind: ConnectionKind,
    pub route: Option<RoutedEdge>,
}

pub fn resolve_geometry(
    endpoints: &ConnectionEndpoints,
    router: &dyn EdgeRouter,
    config: &EdgeConfig,
) -> ResolvedGeometry {
    let kind = classify(&endpoints.source_id, &endpoints.target_id);
    let route = match kind {
        ConnectionKind::SelfLoop => {
            let routed = resolve_self_loop(
                endpoints.source_point,
                endpoints.target_point,
                &config.self_loop,
            );
            if routed.path.is_finite() && routed.label.is_finite() {
                Some(routed)
            } else {
                tracing::warn!(
                    node = %endpoints.source_id,
                    "self-loop endpoints are not finite; connection left undrawn"
                );
                None
            }
        }
        ConnectionKind::Distinct => resolve_distinct(router, endpoints),
    };
    ResolvedGeometry { kind, route }
}
