//! Mathematical types and helpers.

use cgmath::{Point2, Vector2};

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// The displacement of one step of length `speed` along `heading`.
///
/// Headings are measured clockwise from north in screen space, so north is `-y`.
pub fn heading_step(heading: f64, speed: f64) -> Vector2d {
    Vector2d::new(speed * heading.sin(), -speed * heading.cos())
}
