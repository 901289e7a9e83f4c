//! Marker symbolizer properties.
//!
//! A symbolizer is a set of [`PropertyKey`] → [`PropertyValue`] pairs. Each
//! value is either a literal or an [`Expression`] evaluated against the
//! feature being rendered. Property sets compare and hash by value so they
//! can be used directly as cache keys.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::color::Color;
use crate::error::{MarkerError, MarkerResult};
use crate::expression::Expression;
use crate::geometry::Feature;
use crate::transform::TransformList;

/// Bit pattern used to hash and compare floats; `-0.0` and `0.0` are equal.
pub(crate) fn float_key(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// Recognized marker symbolizer properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyKey {
    File,
    Clip,
    Offset,
    SimplifyTolerance,
    Smooth,
    Spacing,
    MaxError,
    AllowOverlap,
    AvoidEdges,
    Direction,
    #[serde(rename = "markers-placement-type")]
    PlacementType,
    IgnorePlacement,
    Opacity,
    GeometryTransform,
    ImageTransform,
    CompositeOperation,
    Gamma,
    GammaMethod,
    Width,
    Height,
    StrokeWidth,
    Fill,
    FillOpacity,
    Stroke,
    StrokeOpacity,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 25] = [
        PropertyKey::File,
        PropertyKey::Clip,
        PropertyKey::Offset,
        PropertyKey::SimplifyTolerance,
        PropertyKey::Smooth,
        PropertyKey::Spacing,
        PropertyKey::MaxError,
        PropertyKey::AllowOverlap,
        PropertyKey::AvoidEdges,
        PropertyKey::Direction,
        PropertyKey::PlacementType,
        PropertyKey::IgnorePlacement,
        PropertyKey::Opacity,
        PropertyKey::GeometryTransform,
        PropertyKey::ImageTransform,
        PropertyKey::CompositeOperation,
        PropertyKey::Gamma,
        PropertyKey::GammaMethod,
        PropertyKey::Width,
        PropertyKey::Height,
        PropertyKey::StrokeWidth,
        PropertyKey::Fill,
        PropertyKey::FillOpacity,
        PropertyKey::Stroke,
        PropertyKey::StrokeOpacity,
    ];

    /// The style-language name of the property.
    pub fn name(&self) -> &'static str {
        match self {
            PropertyKey::File => "file",
            PropertyKey::Clip => "clip",
            PropertyKey::Offset => "offset",
            PropertyKey::SimplifyTolerance => "simplify-tolerance",
            PropertyKey::Smooth => "smooth",
            PropertyKey::Spacing => "spacing",
            PropertyKey::MaxError => "max-error",
            PropertyKey::AllowOverlap => "allow-overlap",
            PropertyKey::AvoidEdges => "avoid-edges",
            PropertyKey::Direction => "direction",
            PropertyKey::PlacementType => "markers-placement-type",
            PropertyKey::IgnorePlacement => "ignore-placement",
            PropertyKey::Opacity => "opacity",
            PropertyKey::GeometryTransform => "geometry-transform",
            PropertyKey::ImageTransform => "image-transform",
            PropertyKey::CompositeOperation => "composite-operation",
            PropertyKey::Gamma => "gamma",
            PropertyKey::GammaMethod => "gamma-method",
            PropertyKey::Width => "width",
            PropertyKey::Height => "height",
            PropertyKey::StrokeWidth => "stroke-width",
            PropertyKey::Fill => "fill",
            PropertyKey::FillOpacity => "fill-opacity",
            PropertyKey::Stroke => "stroke",
            PropertyKey::StrokeOpacity => "stroke-opacity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PropertyKey::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal or evaluated property value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    #[serde(skip)]
    Color(Color),
    #[serde(skip)]
    Transform(TransformList),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => float_key(*a) == float_key(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Transform(a), Value::Transform(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Double(d) => float_key(*d).hash(state),
            Value::String(s) => s.hash(state),
            Value::Color(c) => c.hash(state),
            Value::Transform(t) => t.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::Color(c) => write!(f, "{}", c),
            Value::Transform(t) => write!(f, "{}", t),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<TransformList> for Value {
    fn from(v: TransformList) -> Self {
        Value::Transform(v)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_error(&self, key: PropertyKey, expected: &str) -> MarkerError {
        MarkerError::ExpressionEvaluation {
            expression: key.name().to_string(),
            message: format!("expected {}, got '{}'", expected, self),
        }
    }

    pub fn to_bool(&self, key: PropertyKey) -> MarkerResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::Double(d) => Ok(*d != 0.0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(self.type_error(key, "a boolean")),
            },
            _ => Err(self.type_error(key, "a boolean")),
        }
    }

    pub fn to_f64(&self, key: PropertyKey) -> MarkerResult<f64> {
        match self {
            Value::Integer(i) => Ok(*i as f64),
            Value::Double(d) => Ok(*d),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.type_error(key, "a number")),
            _ => Err(self.type_error(key, "a number")),
        }
    }

    pub fn to_color(&self, key: PropertyKey) -> MarkerResult<Color> {
        match self {
            Value::Color(c) => Ok(*c),
            Value::String(s) => Color::parse(s).map_err(|_| self.type_error(key, "a color")),
            _ => Err(self.type_error(key, "a color")),
        }
    }

    pub fn to_transform(&self, key: PropertyKey) -> MarkerResult<TransformList> {
        match self {
            Value::Transform(t) => Ok(t.clone()),
            Value::String(s) => {
                TransformList::parse(s).map_err(|_| self.type_error(key, "a transform"))
            }
            _ => Err(self.type_error(key, "a transform")),
        }
    }
}

/// Either a literal value or a feature-dependent expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    Literal(Value),
    Expression(Expression),
}

impl PropertyValue {
    pub fn is_expression(&self) -> bool {
        matches!(self, PropertyValue::Expression(_))
    }

    pub fn evaluate(&self, feature: &Feature) -> Value {
        match self {
            PropertyValue::Literal(v) => v.clone(),
            PropertyValue::Expression(e) => e.evaluate(feature),
        }
    }
}

/// The property set of one marker symbolizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "HashMap<String, Value>")]
pub struct StyleProperties {
    props: BTreeMap<PropertyKey, PropertyValue>,
}

impl StyleProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style literal setter.
    pub fn with(mut self, key: PropertyKey, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style expression setter.
    pub fn with_expression(mut self, key: PropertyKey, expression: &str) -> MarkerResult<Self> {
        self.set_expression(key, expression)?;
        Ok(self)
    }

    pub fn set(&mut self, key: PropertyKey, value: impl Into<Value>) {
        self.props.insert(key, PropertyValue::Literal(value.into()));
    }

    pub fn set_expression(&mut self, key: PropertyKey, expression: &str) -> MarkerResult<()> {
        let expr = Expression::parse(expression)?;
        self.props.insert(key, PropertyValue::Expression(expr));
        Ok(())
    }

    pub fn remove(&mut self, key: PropertyKey) -> Option<PropertyValue> {
        self.props.remove(&key)
    }

    pub fn has(&self, key: PropertyKey) -> bool {
        self.props.contains_key(&key)
    }

    pub fn get(&self, key: PropertyKey) -> Option<&PropertyValue> {
        self.props.get(&key)
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.props.iter()
    }

    /// True when no property depends on feature attributes.
    pub fn is_feature_independent(&self) -> bool {
        self.props.values().all(|v| !v.is_expression())
    }

    /// Evaluate a property; `None` when unset or evaluated to null.
    pub fn evaluate(&self, key: PropertyKey, feature: &Feature) -> Option<Value> {
        self.props
            .get(&key)
            .map(|v| v.evaluate(feature))
            .filter(|v| !v.is_null())
    }

    pub fn get_f64(&self, key: PropertyKey, feature: &Feature, default: f64) -> MarkerResult<f64> {
        self.evaluate(key, feature)
            .map_or(Ok(default), |v| v.to_f64(key))
    }

    pub fn get_optional_f64(&self, key: PropertyKey, feature: &Feature) -> MarkerResult<Option<f64>> {
        self.evaluate(key, feature).map(|v| v.to_f64(key)).transpose()
    }

    pub fn get_bool(&self, key: PropertyKey, feature: &Feature, default: bool) -> MarkerResult<bool> {
        self.evaluate(key, feature)
            .map_or(Ok(default), |v| v.to_bool(key))
    }

    pub fn get_string(&self, key: PropertyKey, feature: &Feature) -> Option<String> {
        self.evaluate(key, feature).map(|v| v.to_string())
    }

    pub fn get_color(&self, key: PropertyKey, feature: &Feature) -> MarkerResult<Option<Color>> {
        self.evaluate(key, feature).map(|v| v.to_color(key)).transpose()
    }

    pub fn get_transform(
        &self,
        key: PropertyKey,
        feature: &Feature,
    ) -> MarkerResult<Option<TransformList>> {
        self.evaluate(key, feature)
            .map(|v| v.to_transform(key))
            .transpose()
    }

    /// Evaluate an enumerated property, parsing its string form.
    pub fn get_enum<T>(&self, key: PropertyKey, feature: &Feature, default: T) -> MarkerResult<T>
    where
        T: FromStr,
    {
        match self.evaluate(key, feature) {
            None => Ok(default),
            Some(v) => {
                let text = v.to_string();
                text.parse::<T>().map_err(|_| MarkerError::InvalidProperty {
                    key: key.name().to_string(),
                    message: format!("unknown value '{}'", text),
                })
            }
        }
    }
}

impl TryFrom<HashMap<String, Value>> for StyleProperties {
    type Error = MarkerError;

    /// Build from a name → value map. String values containing attribute
    /// references become expressions.
    fn try_from(map: HashMap<String, Value>) -> Result<Self, Self::Error> {
        let mut props = StyleProperties::new();
        for (name, value) in map {
            let key = PropertyKey::from_name(&name).ok_or_else(|| MarkerError::InvalidProperty {
                key: name.clone(),
                message: "unknown property".to_string(),
            })?;
            match value {
                Value::String(s) if Expression::looks_like_expression(&s) => {
                    props.set_expression(key, &s)?;
                }
                other => props.set(key, other),
            }
        }
        Ok(props)
    }
}
