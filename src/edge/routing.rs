use tracing::{debug, warn};

use crate::config::SmoothStepConfig;
use crate::ir::{ConnectionEndpoints, HandlePosition, Point};
use crate::path::Path;

use super::RoutedEdge;

/// Positions assumed when the canvas leaves a handle's side unspecified.
const DEFAULT_SOURCE_POSITION: HandlePosition = HandlePosition::Bottom;
const DEFAULT_TARGET_POSITION: HandlePosition = HandlePosition::Top;

/// Tolerance below which two coordinates are considered equal.
const EPS: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub source: Point,
    pub target: Point,
    pub source_position: Option<HandlePosition>,
    pub target_position: Option<HandlePosition>,
}

impl From<&ConnectionEndpoints> for RouteRequest {
    fn from(endpoints: &ConnectionEndpoints) -> Self {
        Self {
            source: endpoints.source_point,
            target: endpoints.target_point,
            source_position: endpoints.source_position,
            target_position: endpoints.target_position,
        }
    }
}

/// Routing for connections between two different nodes.
///
/// Implementations may return `None` when they cannot produce a path; the
/// renderer then draws nothing for that connection.
pub trait EdgeRouter {
    fn route(&self, request: &RouteRequest) -> Option<RoutedEdge>;
}

impl<F> EdgeRouter for F
where
    F: Fn(&RouteRequest) -> Option<RoutedEdge>,
{
    fn route(&self, request: &RouteRequest) -> Option<RoutedEdge> {
        self(request)
    }
}

/// Runs `router` and drops anything that cannot be drawn.
pub fn resolve_distinct(
    router: &dyn EdgeRouter,
    endpoints: &ConnectionEndpoints,
) -> Option<RoutedEdge> {
    let request = RouteRequest::from(endpoints);
    let Some(routed) = router.route(&request) else {
        warn!(
            source = %endpoints.source_id,
            target = %endpoints.target_id,
            "router returned no path; connection left undrawn"
        );
        return None;
    };
    if routed.path.is_empty() || !routed.path.is_finite() || !routed.label.is_finite() {
        warn!(
            source = %endpoints.source_id,
            target = %endpoints.target_id,
            "router returned non-drawable geometry; connection left undrawn"
        );
        return None;
    }
    Some(routed)
}

/// Orthogonal router with rounded bends: leaves each handle straight out by
/// `offset`, joins the two stubs through a shared channel, and rounds every
/// bend with a quadratic curve of at most `border_radius`.
#[derive(Debug, Clone, Default)]
pub struct SmoothStepRouter {
    config: SmoothStepConfig,
}

impl SmoothStepRouter {
    pub fn new(config: SmoothStepConfig) -> Self {
        Self { config }
    }

    pub fn waypoints(&self, request: &RouteRequest) -> Vec<Point> {
        let source_pos = request.source_position.unwrap_or(DEFAULT_SOURCE_POSITION);
        let target_pos = request.target_position.unwrap_or(DEFAULT_TARGET_POSITION);
        let offset = self.config.offset.max(0.0);
        let source = request.source;
        let target = request.target;
        let source_gap = stub_point(source, source_pos, offset);
        let target_gap = stub_point(target, target_pos, offset);

        let (source_dx, source_dy) = source_pos.outward();
        let (target_dx, target_dy) = target_pos.outward();

        let points = match (source_pos.is_horizontal(), target_pos.is_horizontal()) {
            (true, true) => {
                if source_dx == target_dx {
                    let channel_x = beyond(source_gap.x, target_gap.x, source_dx);
                    vec![
                        source,
                        source_gap,
                        Point::new(channel_x, source_gap.y),
                        Point::new(channel_x, target_gap.y),
                        target_gap,
                        target,
                    ]
                } else if (target_gap.x - source_gap.x) * source_dx >= 0.0 {
                    let channel_x = (source_gap.x + target_gap.x) / 2.0;
                    vec![
                        source,
                        source_gap,
                        Point::new(channel_x, source_gap.y),
                        Point::new(channel_x, target_gap.y),
                        target_gap,
                        target,
                    ]
                } else {
                    // Target sits behind the source: pass beside both nodes.
                    let channel_y = side_channel(source_gap.y, target_gap.y, offset);
                    vec![
                        source,
                        source_gap,
                        Point::new(source_gap.x, channel_y),
                        Point::new(target_gap.x, channel_y),
                        target_gap,
                        target,
                    ]
                }
            }
            (false, false) => {
                if source_dy == target_dy {
                    let channel_y = beyond(source_gap.y, target_gap.y, source_dy);
                    vec![
                        source,
                        source_gap,
                        Point::new(source_gap.x, channel_y),
                        Point::new(target_gap.x, channel_y),
                        target_gap,
                        target,
                    ]
                } else if (target_gap.y - source_gap.y) * source_dy >= 0.0 {
                    let channel_y = (source_gap.y + target_gap.y) / 2.0;
                    vec![
                        source,
                        source_gap,
                        Point::new(source_gap.x, channel_y),
                        Point::new(target_gap.x, channel_y),
                        target_gap,
                        target,
                    ]
                } else {
                    let channel_x = side_channel(source_gap.x, target_gap.x, offset);
                    vec![
                        source,
                        source_gap,
                        Point::new(channel_x, source_gap.y),
                        Point::new(channel_x, target_gap.y),
                        target_gap,
                        target,
                    ]
                }
            }
            (true, false) => vec![
                source,
                source_gap,
                Point::new(target_gap.x, source_gap.y),
                target_gap,
                target,
            ],
            (false, true) => vec![
                source,
                source_gap,
                Point::new(source_gap.x, target_gap.y),
                target_gap,
                target,
            ],
        };
        compress_path(&points)
    }
}

impl EdgeRouter for SmoothStepRouter {
    fn route(&self, request: &RouteRequest) -> Option<RoutedEdge> {
        let points = self.waypoints(request);
        let label = label_anchor_from_points(&points)?;
        let path = rounded_path(&points, self.config.border_radius)?;
        debug!(points = points.len(), "smooth-step route");
        Some(RoutedEdge { path, label })
    }
}

fn stub_point(point: Point, side: HandlePosition, length: f32) -> Point {
    let (dx, dy) = side.outward();
    Point::new(point.x + dx * length, point.y + dy * length)
}

/// Farthest of two stub coordinates along `direction`.
fn beyond(a: f32, b: f32, direction: f32) -> f32 {
    if direction > 0.0 { a.max(b) } else { a.min(b) }
}

/// Channel between two stubs across the main axis, or past both when they
/// are too close for a channel to clear either node.
fn side_channel(a: f32, b: f32, offset: f32) -> f32 {
    if (a - b).abs() >= offset * 2.0 {
        (a + b) / 2.0
    } else {
        a.max(b) + offset
    }
}

fn same_point(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() <= EPS && (a.y - b.y).abs() <= EPS
}

/// Drops repeated points and interior points that continue straight on in the
/// same direction. Reversals are kept.
fn compress_path(points: &[Point]) -> Vec<Point> {
    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if deduped.last().is_some_and(|last| same_point(*last, *p)) {
            continue;
        }
        deduped.push(*p);
    }
    if deduped.len() <= 2 {
        return deduped;
    }
    let mut out: Vec<Point> = Vec::with_capacity(deduped.len());
    out.push(deduped[0]);
    for idx in 1..deduped.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = deduped[idx];
        let next = deduped[idx + 1];
        let (dx1, dy1) = (curr.x - prev.x, curr.y - prev.y);
        let (dx2, dy2) = (next.x - curr.x, next.y - curr.y);
        let cross = dx1 * dy2 - dy1 * dx2;
        let dot = dx1 * dx2 + dy1 * dy2;
        if cross.abs() <= EPS && dot > 0.0 {
            continue;
        }
        out.push(curr);
    }
    out.push(deduped[deduped.len() - 1]);
    out
}

fn rounded_path(points: &[Point], border_radius: f32) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let (last, interior) = rest.split_last()?;
    let mut builder = Path::builder(*first);
    let mut prev = *first;
    for (idx, corner) in interior.iter().enumerate() {
        let next = rest[idx + 1];
        let len_in = distance(prev, *corner);
        let len_out = distance(*corner, next);
        let radius = border_radius.min(len_in / 2.0).min(len_out / 2.0);
        if radius <= EPS {
            builder = builder.line_to(*corner);
        } else {
            let before = toward(*corner, prev, radius, len_in);
            let after = toward(*corner, next, radius, len_out);
            builder = builder.line_to(before).quad_to(*corner, after);
        }
        prev = *corner;
    }
    Some(builder.line_to(*last).build())
}

fn distance(a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Point at `amount` along the segment from `from` toward `to`.
fn toward(from: Point, to: Point, amount: f32, length: f32) -> Point {
    if length <= EPS {
        return from;
    }
    let t = amount / length;
    Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
}

/// Midpoint of the longest segment, preferring segments away from the stubs.
fn label_anchor_from_points(points: &[Point]) -> Option<Point> {
    if points.len() < 2 {
        return None;
    }
    let segment_count = points.len() - 1;
    let (start_idx, end_idx) = if segment_count >= 3 {
        (1, segment_count - 1)
    } else {
        (0, segment_count)
    };
    let mut best_idx = start_idx;
    let mut best_len = -1.0f32;
    for idx in start_idx..end_idx {
        let len = distance(points[idx], points[idx + 1]);
        if len > best_len {
            best_len = len;
            best_idx = idx;
        }
    }
    let p1 = points[best_idx];
    let p2 = points[best_idx + 1];
    Some(Point::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0))
}
