//! Integer geometry shared by the frame tree and the window backends.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Rectangle for frame and window placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Orientation of the dividing line of a split.
///
/// A `Vertical` split has a vertical divider and yields left/right children;
/// a `Horizontal` split yields top/bottom children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// Direction for navigation and window movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// The split axis along which this direction moves
    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Vertical,
            Direction::Up | Direction::Down => Axis::Horizontal,
        }
    }

    /// Whether moving this way goes toward the first child of a split
    pub fn toward_first(self) -> bool {
        matches!(self, Direction::Left | Direction::Up)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Some(Direction::Left),
            "right" | "r" => Some(Direction::Right),
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Edge of a frame that carries the decoration (tab bar) region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecorationEdge {
    #[default]
    Top,
    Bottom,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Whether every edge of the rect is representable in `i32` coordinates
    pub fn is_addressable(&self) -> bool {
        self.right() <= i32::MAX as i64 && self.bottom() <= i32::MAX as i64
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center(&self) -> (i64, i64) {
        (
            self.x as i64 + self.width as i64 / 2,
            self.y as i64 + self.height as i64 / 2,
        )
    }

    /// Split into two rectangles that exactly cover `self` along `axis`.
    /// Odd remainders go to the second half.
    pub fn halve(&self, axis: Axis) -> (Rect, Rect) {
        match axis {
            Axis::Vertical => {
                let first = self.width / 2;
                (
                    Rect::new(self.x, self.y, first, self.height),
                    Rect::new(
                        self.x.saturating_add(first as i32),
                        self.y,
                        self.width - first,
                        self.height,
                    ),
                )
            }
            Axis::Horizontal => {
                let first = self.height / 2;
                (
                    Rect::new(self.x, self.y, self.width, first),
                    Rect::new(
                        self.x,
                        self.y.saturating_add(first as i32),
                        self.width,
                        self.height - first,
                    ),
                )
            }
        }
    }

    /// Decompose into `(content, decoration)`. The decoration strip is clamped
    /// to the rect's height so a tiny frame yields an empty content area
    /// rather than a negative one.
    pub fn decompose(&self, thickness: u32, edge: DecorationEdge) -> (Rect, Rect) {
        let strip = thickness.min(self.height);
        let rest = self.height - strip;
        match edge {
            DecorationEdge::Top => (
                Rect::new(self.x, self.y.saturating_add(strip as i32), self.width, rest),
                Rect::new(self.x, self.y, self.width, strip),
            ),
            DecorationEdge::Bottom => (
                Rect::new(self.x, self.y, self.width, rest),
                Rect::new(self.x, self.y.saturating_add(rest as i32), self.width, strip),
            ),
        }
    }

    /// Area of the overlap between two rectangles
    pub fn intersection_area(&self, other: &Rect) -> u64 {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            0
        } else {
            ((right - left) * (bottom - top)) as u64
        }
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Span of this rect along the axis perpendicular to `axis` movement,
    /// as `(start, end)`. Used to pick children that face an origin.
    pub(crate) fn cross_span(&self, direction: Direction) -> (i64, i64) {
        match direction.axis() {
            Axis::Vertical => (self.y as i64, self.bottom()),
            Axis::Horizontal => (self.x as i64, self.right()),
        }
    }
}

/// Check that `tiles` exactly cover `outer`: every tile lies inside it, no two
/// tiles overlap with positive area, and the areas sum to the outer area.
pub fn tiles_exactly(outer: &Rect, tiles: &[Rect]) -> bool {
    if !tiles.iter().all(|t| outer.contains_rect(t)) {
        return false;
    }
    for (i, a) in tiles.iter().enumerate() {
        for b in &tiles[i + 1..] {
            if a.intersection_area(b) != 0 {
                return false;
            }
        }
    }
    tiles.iter().map(Rect::area).sum::<u64>() == outer.area()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halving_covers_parent() {
        let root = Rect::new(0, 0, 1920, 1080);
        let (left, right) = root.halve(Axis::Vertical);
        assert_eq!(left, Rect::new(0, 0, 960, 1080));
        assert_eq!(right, Rect::new(960, 0, 960, 1080));

        let (top, bottom) = left.halve(Axis::Horizontal);
        assert_eq!(top, Rect::new(0, 0, 960, 540));
        assert_eq!(bottom, Rect::new(0, 540, 960, 540));
    }

    #[test]
    fn odd_sizes_still_tile() {
        let rect = Rect::new(5, 7, 101, 33);
        let (a, b) = rect.halve(Axis::Vertical);
        assert_eq!(a.width + b.width, 101);
        assert!(tiles_exactly(&rect, &[a, b]));
        let (c, d) = rect.halve(Axis::Horizontal);
        assert!(tiles_exactly(&rect, &[c, d]));
    }

    #[test]
    fn decoration_strip_is_clamped() {
        let rect = Rect::new(0, 0, 200, 10);
        let (content, deco) = rect.decompose(24, DecorationEdge::Top);
        assert_eq!(deco.height, 10);
        assert_eq!(content.height, 0);

        let rect = Rect::new(0, 0, 200, 100);
        let (content, deco) = rect.decompose(24, DecorationEdge::Bottom);
        assert_eq!(content, Rect::new(0, 0, 200, 76));
        assert_eq!(deco, Rect::new(0, 76, 200, 24));
    }

    #[test]
    fn halving_near_the_coordinate_limit_saturates() {
        let rect = Rect::new(i32::MAX - 100, i32::MAX - 100, 1000, 1000);
        assert!(!rect.is_addressable());
        let (_, right) = rect.halve(Axis::Vertical);
        assert_eq!(right.x, i32::MAX);
        let (_, bottom) = rect.halve(Axis::Horizontal);
        assert_eq!(bottom.y, i32::MAX);
        let (content, _) = rect.decompose(24, DecorationEdge::Top);
        assert_eq!(content.y, i32::MAX - 76);

        assert!(Rect::new(i32::MAX - 1000, 0, 1000, 10).is_addressable());
    }

    #[test]
    fn overlapping_tiles_are_rejected() {
        let outer = Rect::new(0, 0, 10, 10);
        let a = Rect::new(0, 0, 6, 10);
        let b = Rect::new(5, 0, 5, 10);
        assert!(!tiles_exactly(&outer, &[a, b]));
    }
}
