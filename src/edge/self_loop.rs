use crate::config::SelfLoopConfig;
use crate::ir::Point;
use crate::path::Path;

use super::RoutedEdge;

/// Loop for a connection whose ends sit on the same node.
///
/// `source` is the lower handle and `target` the upper one. The loop leaves
/// just above the target, runs right, turns down through two rounded corners
/// and comes back in just below the source. The left side stays open since
/// the outline is stroked, not filled. Equal handle heights give a flat loop.
pub fn resolve_self_loop(source: Point, target: Point, config: &SelfLoopConfig) -> RoutedEdge {
    let pad = config.vertical_padding;
    let radius = config.radius;
    let right = source.x + config.right_offset;
    let top = target.y - pad;
    let bottom = source.y + pad;

    let path = Path::builder(Point::new(source.x, top))
        .line_to(Point::new(right - radius, top))
        .quad_to(Point::new(right, top), Point::new(right, top + radius))
        .line_to(Point::new(right, bottom - radius))
        .quad_to(Point::new(right, bottom), Point::new(right - radius, bottom))
        .line_to(Point::new(source.x, bottom))
        .build();

    let label = Point::new(
        right + config.label_gap,
        target.y + (source.y - target.y) / 2.0,
    );
    RoutedEdge { path, label }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCommand;

    fn resolve(sx: f32, sy: f32, ty: f32) -> RoutedEdge {
        resolve_self_loop(
            Point::new(sx, sy),
            Point::new(sx, ty),
            &SelfLoopConfig::default(),
        )
    }

    #[test]
    fn starts_above_target_handle() {
        let routed = resolve(100.0, 200.0, 150.0);
        assert_eq!(routed.path.first_point(), Some(Point::new(100.0, 144.0)));
        assert_eq!(routed.path.last_point(), Some(Point::new(100.0, 206.0)));
    }

    #[test]
    fn label_sits_past_the_loop_at_mid_height() {
        let routed = resolve(100.0, 200.0, 150.0);
        assert_eq!(routed.label, Point::new(230.0, 175.0));
    }

    #[test]
    fn path_matches_rounded_loop_outline() {
        let routed = resolve(100.0, 200.0, 150.0);
        assert_eq!(
            routed.path.to_svg_d(),
            "M 100 144 L 212 144 Q 220 144 220 152 L 220 198 Q 220 206 212 206 L 100 206"
        );
        let commands = routed.path.commands();
        assert_eq!(commands.len(), 6);
        assert!(matches!(commands[0], PathCommand::MoveTo(_)));
        assert!(matches!(commands[2], PathCommand::QuadTo(_, _)));
        assert!(matches!(commands[4], PathCommand::QuadTo(_, _)));
    }

    #[test]
    fn equal_handle_heights_give_flat_loop() {
        let routed = resolve(10.0, 50.0, 50.0);
        assert_eq!(routed.label, Point::new(140.0, 50.0));
        assert_eq!(routed.path.first_point(), Some(Point::new(10.0, 44.0)));
        assert_eq!(routed.path.last_point(), Some(Point::new(10.0, 56.0)));
        assert!(routed.path.is_finite());
    }

    #[test]
    fn non_finite_input_degrades_without_panicking() {
        let routed = resolve(f32::NAN, 0.0, 0.0);
        assert!(!routed.path.is_finite());
    }
}
