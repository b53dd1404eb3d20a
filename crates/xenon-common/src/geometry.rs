use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A cell position on the screen, zero-based, origin at the top left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add<Offset> for Position {
    type Output = Position;

    fn add(self, rhs: Offset) -> Position {
        Position::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

impl AddAssign<Offset> for Position {
    fn add_assign(&mut self, rhs: Offset) {
        self.x += rhs.dx;
        self.y += rhs.dy;
    }
}

impl Sub<Offset> for Position {
    type Output = Position;

    fn sub(self, rhs: Offset) -> Position {
        Position::new(self.x - rhs.dx, self.y - rhs.dy)
    }
}

impl Sub for Position {
    type Output = Offset;

    fn sub(self, rhs: Position) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A displacement between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    /// Unit vector along the x axis.
    pub const E1: Offset = Offset { dx: 1, dy: 0 };
    /// Unit vector along the y axis.
    pub const E2: Offset = Offset { dx: 0, dy: 1 };

    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

impl Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.dx - rhs.dx, self.dy - rhs.dy)
    }
}

impl Mul<i32> for Offset {
    type Output = Offset;

    fn mul(self, rhs: i32) -> Offset {
        Offset::new(self.dx * rhs, self.dy * rhs)
    }
}

impl Neg for Offset {
    type Output = Offset;

    fn neg(self) -> Offset {
        Offset::new(-self.dx, -self.dy)
    }
}

/// Screen dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Whether `pos` lies inside a screen of this size.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    /// The full-screen rectangle, or `None` for a degenerate size.
    pub fn to_rect(&self) -> Option<Rect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(Rect::new(0, self.width as i32 - 1, 0, self.height as i32 - 1))
    }
}

/// An axis-aligned rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub x2: i32,
    pub y1: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, x2: i32, y1: i32, y2: i32) -> Self {
        debug_assert!(x1 <= x2 && y1 <= y2, "inverted rect bounds");
        Self { x1, x2, y1, y2 }
    }

    /// Rectangle spanning `origin` and `origin + size - 1`.
    pub fn from_origin(origin: Position, size: Size) -> Option<Self> {
        if size.width == 0 || size.height == 0 {
            return None;
        }
        Some(Self::new(
            origin.x,
            origin.x + size.width as i32 - 1,
            origin.y,
            origin.y + size.height as i32 - 1,
        ))
    }

    /// Rectangle spanning two arbitrary corner positions.
    pub fn from_corners(a: Position, b: Position) -> Self {
        Self::new(a.x.min(b.x), a.x.max(b.x), a.y.min(b.y), a.y.max(b.y))
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1 + 1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1 + 1
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x1 && pos.x <= self.x2 && pos.y >= self.y1 && pos.y <= self.y2
    }

    pub fn contains_rect(&self, other: Rect) -> bool {
        other.x1 >= self.x1 && other.x2 <= self.x2 && other.y1 >= self.y1 && other.y2 <= self.y2
    }

    /// Intersection with `other`, or `None` when they do not overlap.
    pub fn clip(&self, other: Rect) -> Option<Rect> {
        let x1 = self.x1.max(other.x1);
        let x2 = self.x2.min(other.x2);
        let y1 = self.y1.max(other.y1);
        let y2 = self.y2.min(other.y2);
        if x1 > x2 || y1 > y2 {
            return None;
        }
        Some(Rect::new(x1, x2, y1, y2))
    }
}
