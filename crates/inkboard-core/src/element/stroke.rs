//! Brush stroke outline generation.
//!
//! Turns the raw pointer samples of a brush stroke into a closed polygon
//! whose width varies with a pressure value simulated from pointer speed.
//! The result depends only on the samples and the options, so it can be
//! rebuilt at any time from persisted data.

use kurbo::{BezPath, Point, Vec2};

/// How fast the simulated pressure follows the target pressure.
const RATE_OF_PRESSURE_CHANGE: f64 = 0.275;

/// Initial simulated pressure.
const START_PRESSURE: f64 = 0.5;

/// Segments used for each round end cap.
const CAP_STEPS: usize = 8;

/// Segments used for a single-sample dot.
const DOT_STEPS: usize = 16;

/// Radius floor, as a fraction of the stroke size.
const MIN_RADIUS_FRACTION: f64 = 0.05;

/// Shape parameters for [`outline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeOptions {
    /// Base diameter of the stroke.
    pub size: f64,
    /// How much pressure affects width. 0 is constant width.
    pub thinning: f64,
    /// Minimum spacing between outline points, as a fraction of `size`.
    pub smoothing: f64,
    /// How strongly each sample is pulled toward the previous one.
    pub streamline: f64,
}

impl StrokeOptions {
    /// Options used for every brush element.
    pub fn with_size(size: f64) -> Self {
        Self {
            size,
            thinning: 0.5,
            smoothing: 0.5,
            streamline: 0.5,
        }
    }
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self::with_size(2.0)
    }
}

/// A streamlined sample with its stroke radius.
#[derive(Debug, Clone, Copy)]
struct Sample {
    point: Point,
    radius: f64,
}

/// Rotate a vector clockwise in screen space by `angle` radians.
fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = (-angle).sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

fn stroke_radius(options: &StrokeOptions, pressure: f64) -> f64 {
    let r = options.size * (0.5 - options.thinning * (0.5 - pressure));
    r.max(options.size * MIN_RADIUS_FRACTION)
}

/// Streamline the input and attach a simulated-pressure radius to each sample.
fn samples(points: &[Point], options: &StrokeOptions) -> Vec<Sample> {
    let t = 0.15 + (1.0 - options.streamline.clamp(0.0, 1.0)) * 0.85;
    let mut pressure = START_PRESSURE;
    let mut out = Vec::with_capacity(points.len());

    let first = points[0];
    out.push(Sample {
        point: first,
        radius: stroke_radius(options, pressure),
    });

    let mut prev = first;
    for &input in &points[1..] {
        let point = prev.lerp(input, t);
        let distance = point.distance(prev);
        if distance < f64::EPSILON {
            continue;
        }
        // Fast movement lowers pressure, slow movement raises it.
        let speed = (distance / options.size).min(1.0);
        let target = 1.0 - speed;
        pressure = (pressure + (target - pressure) * (speed * RATE_OF_PRESSURE_CHANGE)).min(1.0);
        out.push(Sample {
            point,
            radius: stroke_radius(options, pressure),
        });
        prev = point;
    }
    out
}

/// Points of a half circle around `center`, starting just after `from`.
fn cap(center: Point, from: Vec2, out: &mut Vec<Point>) {
    for step in 1..CAP_STEPS {
        let angle = std::f64::consts::PI * step as f64 / CAP_STEPS as f64;
        out.push(center + rotate(from, angle));
    }
}

/// Compute the closed outline polygon of a brush stroke.
///
/// Returns an empty polygon for no samples and a round dot for one.
pub fn outline(points: &[Point], options: &StrokeOptions) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }
    let samples = samples(points, options);

    if samples.len() == 1 {
        let Sample { point, radius } = samples[0];
        return (0..DOT_STEPS)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / DOT_STEPS as f64;
                point + Vec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();
    }

    let min_spacing = (options.size * options.smoothing).powi(2);
    let last = samples.len() - 1;
    let mut left: Vec<Point> = Vec::with_capacity(samples.len());
    let mut right: Vec<Point> = Vec::with_capacity(samples.len());
    let mut normals: Vec<Vec2> = Vec::with_capacity(samples.len());

    for (i, sample) in samples.iter().enumerate() {
        let direction = if i < last {
            samples[i + 1].point - sample.point
        } else {
            sample.point - samples[i - 1].point
        };
        let len = direction.hypot();
        let unit = if len < f64::EPSILON {
            Vec2::new(1.0, 0.0)
        } else {
            direction / len
        };
        let normal = Vec2::new(-unit.y, unit.x) * sample.radius;
        normals.push(normal);

        let l = sample.point + normal;
        let r = sample.point - normal;
        let far_enough = |pts: &Vec<Point>, p: Point| {
            pts.last()
                .is_none_or(|q| (p - *q).hypot2() > min_spacing)
        };
        if i == 0 || i == last || far_enough(&left, l) {
            left.push(l);
        }
        if i == 0 || i == last || far_enough(&right, r) {
            right.push(r);
        }
    }

    let mut polygon = Vec::with_capacity(left.len() + right.len() + 2 * CAP_STEPS);
    polygon.extend_from_slice(&left);
    cap(samples[last].point, normals[last], &mut polygon);
    polygon.extend(right.iter().rev());
    cap(samples[0].point, -normals[0], &mut polygon);
    polygon
}

/// Smooth closed path through an outline polygon, using quadratic curves
/// between segment midpoints.
pub fn outline_to_path(polygon: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = polygon.first() else {
        return path;
    };
    if polygon.len() < 3 {
        path.move_to(first);
        for &p in &polygon[1..] {
            path.line_to(p);
        }
        path.close_path();
        return path;
    }
    let n = polygon.len();
    path.move_to(first.midpoint(polygon[1]));
    for i in 1..=n {
        let control = polygon[i % n];
        let next = polygon[(i + 1) % n];
        path.quad_to(control, control.midpoint(next));
    }
    path.close_path();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(i as f64 * 10.0, 0.0)).collect()
    }

    #[test]
    fn test_empty_stroke_has_no_outline() {
        assert!(outline(&[], &StrokeOptions::default()).is_empty());
    }

    #[test]
    fn test_single_point_is_a_dot() {
        let options = StrokeOptions::with_size(8.0);
        let dot = outline(&[Point::new(5.0, 5.0)], &options);
        assert_eq!(dot.len(), DOT_STEPS);
        for p in &dot {
            assert!((p.distance(Point::new(5.0, 5.0)) - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_outline_surrounds_stroke() {
        let options = StrokeOptions::with_size(6.0);
        let polygon = outline(&horizontal(12), &options);
        assert!(polygon.iter().any(|p| p.y > 0.5));
        assert!(polygon.iter().any(|p| p.y < -0.5));
        assert!(polygon.iter().all(|p| p.y.abs() <= options.size));
    }

    #[test]
    fn test_outline_is_deterministic() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 7.0),
            Point::new(9.0, 4.0),
            Point::new(15.0, 12.0),
        ];
        let options = StrokeOptions::with_size(4.0);
        assert_eq!(outline(&points, &options), outline(&points, &options));
    }

    #[test]
    fn test_duplicate_samples_are_skipped() {
        let options = StrokeOptions::with_size(4.0);
        let once = outline(&[Point::new(1.0, 1.0)], &options);
        let repeated = outline(&[Point::new(1.0, 1.0); 5], &options);
        assert_eq!(once, repeated);
    }

    #[test]
    fn test_path_is_closed() {
        let polygon = outline(&horizontal(5), &StrokeOptions::with_size(4.0));
        let path = outline_to_path(&polygon);
        assert!(matches!(
            path.elements().last(),
            Some(kurbo::PathEl::ClosePath)
        ));
        assert!(outline_to_path(&[]).elements().is_empty());
    }
}
