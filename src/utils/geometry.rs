//! # Geometry
//!
//! Plain-data 2D primitives: vectors, circles and line segments, with the
//! intersection tests the graph generator and road carver rely on.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2D vector or point with floating point coordinates.
///
/// # Examples
///
/// ```
/// use grotto::Vec2;
///
/// let v = Vec2::new(3.0, 4.0);
/// assert_eq!(v.length(), 5.0);
/// assert!((v.normalize().length() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `angle` radians.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Returns the unit vector with the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            self
        }
    }

    /// Perpendicular obtained by rotating a quarter turn counter-clockwise in
    /// screen coordinates (y pointing down).
    pub fn left_hand(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Rounds both coordinates to the nearest integer.
    pub fn round(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A circle with an integer center and radius, as used for room sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Circle {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl Circle {
    pub fn new(x: i32, y: i32, radius: i32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x as f64, self.y as f64)
    }

    /// Leftmost column of the bounding square.
    pub fn left(&self) -> i32 {
        self.x - self.radius
    }

    /// Topmost row of the bounding square.
    pub fn top(&self) -> i32 {
        self.y - self.radius
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let r = self.radius as f64;
        point.distance(self.center()) <= r
    }

    /// Circles intersect when their centers are no further apart than the sum of radii.
    pub fn intersects(&self, other: &Circle) -> bool {
        let reach = (self.radius + other.radius) as f64;
        self.center().distance(other.center()) <= reach
    }

    /// Whether the circle touches or crosses the edge of a `width` x `height` map.
    ///
    /// # Examples
    ///
    /// ```
    /// use grotto::Circle;
    ///
    /// assert!(!Circle::new(50, 50, 10).crosses_border(100, 100));
    /// assert!(Circle::new(5, 50, 10).crosses_border(100, 100));
    /// ```
    pub fn crosses_border(&self, width: u32, height: u32) -> bool {
        self.left() <= 0
            || self.top() <= 0
            || self.x + self.radius >= width as i32
            || self.y + self.radius >= height as i32
    }

    /// Distance from `point` to the circle outline, negative inside the circle.
    pub fn boundary_distance(&self, point: Vec2) -> f64 {
        point.distance(self.center()) - self.radius as f64
    }
}

/// A straight line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Point of the segment nearest to `point`.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let d = self.end - self.start;
        let len2 = d.length_squared();
        if len2 == 0.0 {
            return self.start;
        }
        let t = ((point - self.start).dot(d) / len2).clamp(0.0, 1.0);
        self.start + d * t
    }

    /// Whether any point of the segment lies inside or on the circle.
    pub fn intersects_circle(&self, circle: &Circle) -> bool {
        circle.contains(self.closest_point(circle.center()))
    }

    /// Points where the segment crosses the circle outline, ordered from `start`.
    pub fn circle_crossings(&self, circle: &Circle) -> Vec<Vec2> {
        let d = self.end - self.start;
        let f = self.start - circle.center();
        let r = circle.radius as f64;
        let a = d.length_squared();
        if a == 0.0 {
            return Vec::new();
        }
        let b = 2.0 * f.dot(d);
        let c = f.length_squared() - r * r;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return Vec::new();
        }
        let root = discriminant.sqrt();
        let mut crossings = Vec::with_capacity(2);
        for t in [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)] {
            if (0.0..=1.0).contains(&t) {
                crossings.push(self.start + d * t);
            }
        }
        if crossings.len() == 2 && crossings[0] == crossings[1] {
            crossings.pop();
        }
        crossings
    }

    /// Segment/segment intersection test. Parallel segments never intersect.
    pub fn intersects(&self, other: &Segment) -> bool {
        let (x1, y1, x2, y2) = (self.start.x, self.start.y, self.end.x, self.end.y);
        let (x3, y3, x4, y4) = (other.start.x, other.start.y, other.end.x, other.end.y);
        let denom = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
        if denom == 0.0 {
            return false;
        }
        let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denom;
        let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denom;
        (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_math() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(v + Vec2::new(1.0, 1.0), Vec2::new(4.0, 5.0));
        assert_eq!(v - Vec2::new(1.0, 1.0), Vec2::new(2.0, 3.0));
        assert_eq!(v * 2.0, Vec2::new(6.0, 8.0));
        assert_eq!(-v, Vec2::new(-3.0, -4.0));
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
        assert_eq!(Vec2::new(1.0, 0.0).left_hand(), Vec2::new(0.0, -1.0));
        assert_eq!(Vec2::new(1.4, -2.6).round(), (1, -3));
    }

    #[test]
    fn test_circle_intersection() {
        let a = Circle::new(0, 0, 10);
        let b = Circle::new(15, 0, 5);
        let c = Circle::new(16, 0, 5);

        assert!(a.intersects(&b)); // touching
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_circle_border() {
        let circle = Circle::new(20, 20, 10);
        assert!(!circle.crosses_border(100, 100));
        assert!(circle.crosses_border(30, 100)); // touches right edge
        assert!(Circle::new(10, 20, 10).crosses_border(100, 100)); // touches left edge
        assert!(Circle::new(20, 95, 10).crosses_border(100, 100));
    }

    #[test]
    fn test_segment_circle() {
        let circle = Circle::new(10, 10, 5);
        let through = Segment::new(Vec2::new(0.0, 10.0), Vec2::new(20.0, 10.0));
        let beside = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0));
        let short = Segment::new(Vec2::new(0.0, 10.0), Vec2::new(4.0, 10.0));

        assert!(through.intersects_circle(&circle));
        assert!(!beside.intersects_circle(&circle));
        assert!(!short.intersects_circle(&circle));

        let crossings = through.circle_crossings(&circle);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].x - 5.0).abs() < 1e-9);
        assert!((crossings[1].x - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_exits_circle_once() {
        let circle = Circle::new(0, 0, 10);
        let outward = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(30.0, 40.0));
        let crossings = outward.circle_crossings(&circle);
        assert_eq!(crossings.len(), 1);
        assert!((crossings[0].distance(circle.center()) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_intersection() {
        let a = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let b = Segment::new(Vec2::new(0.0, 10.0), Vec2::new(10.0, 0.0));
        let c = Segment::new(Vec2::new(20.0, 0.0), Vec2::new(30.0, 10.0));
        let parallel = Segment::new(Vec2::new(1.0, 0.0), Vec2::new(11.0, 10.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&parallel));
    }

    #[test]
    fn test_closest_point() {
        let segment = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        assert_eq!(segment.closest_point(Vec2::new(5.0, 3.0)), Vec2::new(5.0, 0.0));
        assert_eq!(segment.closest_point(Vec2::new(-5.0, 3.0)), Vec2::new(0.0, 0.0));
        assert_eq!(segment.closest_point(Vec2::new(15.0, 3.0)), Vec2::new(10.0, 0.0));
    }
}
