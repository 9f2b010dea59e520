use std::fmt::Write as _;

use crate::ir::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Quadratic curve: control point, then end point.
    QuadTo(Point, Point),
}

impl PathCommand {
    pub fn end_point(&self) -> Point {
        match *self {
            Self::MoveTo(p) | Self::LineTo(p) => p,
            Self::QuadTo(_, p) => p,
        }
    }

    fn points(&self) -> impl Iterator<Item = Point> {
        let (first, second) = match *self {
            Self::MoveTo(p) | Self::LineTo(p) => (p, None),
            Self::QuadTo(c, p) => (c, Some(p)),
        };
        std::iter::once(first).chain(second)
    }
}

/// A single stroked outline. Built once through [`PathBuilder`], never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    pub fn builder(start: Point) -> PathBuilder {
        PathBuilder {
            commands: vec![PathCommand::MoveTo(start)],
        }
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn first_point(&self) -> Option<Point> {
        self.commands.first().map(PathCommand::end_point)
    }

    pub fn last_point(&self) -> Option<Point> {
        self.commands.last().map(PathCommand::end_point)
    }

    pub fn is_finite(&self) -> bool {
        self.commands
            .iter()
            .all(|cmd| cmd.points().all(|p| p.is_finite()))
    }

    /// Axis-aligned bounds over every point, control points included.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut iter = self.commands.iter().flat_map(|cmd| cmd.points());
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some((min, max))
    }

    pub fn to_svg_d(&self) -> String {
        let mut d = String::new();
        for (idx, cmd) in self.commands.iter().enumerate() {
            if idx > 0 {
                d.push(' ');
            }
            let _ = match *cmd {
                PathCommand::MoveTo(p) => write!(d, "M {} {}", fmt_num(p.x), fmt_num(p.y)),
                PathCommand::LineTo(p) => write!(d, "L {} {}", fmt_num(p.x), fmt_num(p.y)),
                PathCommand::QuadTo(c, p) => write!(
                    d,
                    "Q {} {} {} {}",
                    fmt_num(c.x),
                    fmt_num(c.y),
                    fmt_num(p.x),
                    fmt_num(p.y)
                ),
            };
        }
        d
    }

    /// Builds a straight polyline, or `None` for fewer than two points.
    pub fn polyline(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let mut builder = Self::builder(*first);
        for p in rest {
            builder = builder.line_to(*p);
        }
        Some(builder.build())
    }
}

pub struct PathBuilder {
    commands: Vec<PathCommand>,
}

impl PathBuilder {
    pub fn line_to(mut self, p: Point) -> Self {
        self.commands.push(PathCommand::LineTo(p));
        self
    }

    pub fn quad_to(mut self, control: Point, end: Point) -> Self {
        self.commands.push(PathCommand::QuadTo(control, end));
        self
    }

    pub fn build(self) -> Path {
        Path {
            commands: self.commands,
        }
    }
}

/// Formats a coordinate with at most two decimals and no trailing zeros, so
/// identical geometry always produces identical attribute text.
pub fn fmt_num(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let mut out = format!("{value:.2}");
    if out.contains('.') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    if out == "-0" {
        out = "0".to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(fmt_num(144.0), "144");
        assert_eq!(fmt_num(12.5), "12.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.33");
        assert_eq!(fmt_num(-0.001), "0");
        assert_eq!(fmt_num(f32::NAN), "0");
    }

    #[test]
    fn svg_d_lists_commands_in_order() {
        let path = Path::builder(Point::new(0.0, 0.0))
            .line_to(Point::new(10.0, 0.0))
            .quad_to(Point::new(20.0, 0.0), Point::new(20.0, 10.0))
            .build();
        assert_eq!(path.to_svg_d(), "M 0 0 L 10 0 Q 20 0 20 10");
        assert_eq!(path.first_point(), Some(Point::new(0.0, 0.0)));
        assert_eq!(path.last_point(), Some(Point::new(20.0, 10.0)));
    }

    #[test]
    fn non_finite_points_are_detected() {
        let path = Path::builder(Point::new(0.0, f32::NAN))
            .line_to(Point::new(1.0, 1.0))
            .build();
        assert!(!path.is_finite());
    }

    #[test]
    fn polyline_needs_two_points() {
        assert!(Path::polyline(&[Point::new(1.0, 1.0)]).is_none());
        let path = Path::polyline(&[Point::new(0.0, 0.0), Point::new(0.0, 5.0)]).expect("path");
        assert_eq!(path.commands().len(), 2);
        let (min, max) = path.bounds().expect("bounds");
        assert_eq!(min, Point::new(0.0, 0.0));
        assert_eq!(max, Point::new(0.0, 5.0));
    }
}
