//! SVG-style transform lists used by `geometry-transform` and
//! `image-transform`.
//!
//! Supported functions: `matrix(a b c d e f)`, `translate(tx [ty])`,
//! `scale(sx [sy])`, `rotate(angle [cx cy])`, `skewX(angle)`, `skewY(angle)`.
//! Arguments may be separated by commas and/or whitespace. Angles are in
//! degrees.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{MarkerError, MarkerResult};
use crate::style::float_key;

/// One transform function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    Matrix([f64; 6]),
    Translate(f64, f64),
    Scale(f64, f64),
    Rotate { angle: f64, cx: f64, cy: f64 },
    SkewX(f64),
    SkewY(f64),
}

impl TransformOp {
    fn values(&self) -> Vec<f64> {
        match *self {
            TransformOp::Matrix(m) => m.to_vec(),
            TransformOp::Translate(x, y) | TransformOp::Scale(x, y) => vec![x, y],
            TransformOp::Rotate { angle, cx, cy } => vec![angle, cx, cy],
            TransformOp::SkewX(a) | TransformOp::SkewY(a) => vec![a],
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            TransformOp::Matrix(_) => 0,
            TransformOp::Translate(..) => 1,
            TransformOp::Scale(..) => 2,
            TransformOp::Rotate { .. } => 3,
            TransformOp::SkewX(_) => 4,
            TransformOp::SkewY(_) => 5,
        }
    }

    /// Evaluate into an affine transform. Translation components are in
    /// pixels and get multiplied by `scale_factor`.
    fn to_skia(self, scale_factor: f64) -> tiny_skia::Transform {
        let s = scale_factor;
        match self {
            TransformOp::Matrix([a, b, c, d, e, f]) => tiny_skia::Transform::from_row(
                a as f32,
                b as f32,
                c as f32,
                d as f32,
                (e * s) as f32,
                (f * s) as f32,
            ),
            TransformOp::Translate(tx, ty) => {
                tiny_skia::Transform::from_translate((tx * s) as f32, (ty * s) as f32)
            }
            TransformOp::Scale(sx, sy) => tiny_skia::Transform::from_scale(sx as f32, sy as f32),
            TransformOp::Rotate { angle, cx, cy } => tiny_skia::Transform::from_rotate_at(
                angle as f32,
                (cx * s) as f32,
                (cy * s) as f32,
            ),
            TransformOp::SkewX(a) => {
                tiny_skia::Transform::from_skew(a.to_radians().tan() as f32, 0.0)
            }
            TransformOp::SkewY(a) => {
                tiny_skia::Transform::from_skew(0.0, a.to_radians().tan() as f32)
            }
        }
    }
}

/// An ordered list of transform functions, applied right to left as in SVG.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformList {
    ops: Vec<TransformOp>,
}

impl Eq for TransformList {}

impl Hash for TransformList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ops.len().hash(state);
        for op in &self.ops {
            op.discriminant().hash(state);
            for v in op.values() {
                float_key(v).hash(state);
            }
        }
    }
}

impl TransformList {
    pub fn new(ops: Vec<TransformOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Parse an SVG transform attribute string.
    pub fn parse(input: &str) -> MarkerResult<Self> {
        let mut ops = Vec::new();
        let mut rest = input.trim();

        while !rest.is_empty() {
            let open = rest
                .find('(')
                .ok_or_else(|| MarkerError::InvalidTransform(input.to_string()))?;
            let close = rest[open..]
                .find(')')
                .map(|i| i + open)
                .ok_or_else(|| MarkerError::InvalidTransform(input.to_string()))?;

            let name = rest[..open].trim();
            let args = parse_args(&rest[open + 1..close])
                .ok_or_else(|| MarkerError::InvalidTransform(input.to_string()))?;
            ops.push(build_op(name, &args).ok_or_else(|| {
                MarkerError::InvalidTransform(format!("{} in '{}'", name, input))
            })?);

            rest = rest[close + 1..].trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        }

        Ok(Self { ops })
    }

    /// Compose the list into a single affine transform.
    pub fn to_transform(&self, scale_factor: f64) -> tiny_skia::Transform {
        self.ops
            .iter()
            .fold(tiny_skia::Transform::identity(), |acc, op| {
                acc.pre_concat(op.to_skia(scale_factor))
            })
    }
}

impl FromStr for TransformList {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformList::parse(s)
    }
}

impl fmt::Display for TransformList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ops
            .iter()
            .map(|op| match op {
                TransformOp::Matrix(m) => format!(
                    "matrix({} {} {} {} {} {})",
                    m[0], m[1], m[2], m[3], m[4], m[5]
                ),
                TransformOp::Translate(x, y) => format!("translate({} {})", x, y),
                TransformOp::Scale(x, y) => format!("scale({} {})", x, y),
                TransformOp::Rotate { angle, cx, cy } => {
                    format!("rotate({} {} {})", angle, cx, cy)
                }
                TransformOp::SkewX(a) => format!("skewX({})", a),
                TransformOp::SkewY(a) => format!("skewY({})", a),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

fn parse_args(args: &str) -> Option<Vec<f64>> {
    args.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

fn build_op(name: &str, args: &[f64]) -> Option<TransformOp> {
    let op = match (name, args) {
        ("matrix", [a, b, c, d, e, f]) => TransformOp::Matrix([*a, *b, *c, *d, *e, *f]),
        ("translate", [tx]) => TransformOp::Translate(*tx, 0.0),
        ("translate", [tx, ty]) => TransformOp::Translate(*tx, *ty),
        ("scale", [s]) => TransformOp::Scale(*s, *s),
        ("scale", [sx, sy]) => TransformOp::Scale(*sx, *sy),
        ("rotate", [angle]) => TransformOp::Rotate {
            angle: *angle,
            cx: 0.0,
            cy: 0.0,
        },
        ("rotate", [angle, cx, cy]) => TransformOp::Rotate {
            angle: *angle,
            cx: *cx,
            cy: *cy,
        },
        ("skewX", [a]) => TransformOp::SkewX(*a),
        ("skewY", [a]) => TransformOp::SkewY(*a),
        _ => return None,
    };
    Some(op)
}
