//! Native-pixel geometry shared by the detector, renderer and compositor.
//!
//! Every coordinate here is in the unmirrored frame space of the source
//! video. Mirroring is a presentation concern and never appears in these
//! values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn scaled(&self, factor: f32) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box of the given size centered on `center`
    pub fn centered(center: Point, width: f32, height: f32) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Point at fractional coordinates inside the box (0,0 = top-left)
    pub fn at(&self, fx: f32, fy: f32) -> Point {
        Point::new(self.x + self.width * fx, self.y + self.height * fy)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn scaled(&self, factor: f32) -> BoundingBox {
        BoundingBox::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_helpers() {
        let bbox = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(bbox.center(), Point::new(60.0, 45.0));
        assert_eq!(bbox.right(), 110.0);
        assert_eq!(bbox.bottom(), 70.0);
        assert_eq!(bbox.at(0.5, 0.0), Point::new(60.0, 20.0));
        assert_eq!(bbox.area(), 5000.0);
        assert_eq!(bbox.scaled(2.0), BoundingBox::new(20.0, 40.0, 200.0, 100.0));
    }

    #[test]
    fn test_centered_box() {
        let bbox = BoundingBox::centered(Point::new(50.0, 50.0), 20.0, 40.0);
        assert_eq!(bbox, BoundingBox::new(40.0, 30.0, 20.0, 40.0));
        assert_eq!(
            Point::new(0.0, 0.0).midpoint(&Point::new(4.0, 2.0)),
            Point::new(2.0, 1.0)
        );
    }
}
