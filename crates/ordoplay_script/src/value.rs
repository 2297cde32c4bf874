// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dynamic values that flow through pins and execution slots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Value type tag carried by pins.
///
/// `Nil` doubles as the universal "any" tag: a pin typed `Nil` accepts
/// every value and links to every data pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VariantType {
    /// No value / any type
    #[default]
    Nil,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// String value
    String,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA)
    Color,
    /// Host object reference
    Object,
}

impl VariantType {
    /// Every tag in declaration order.
    pub const ALL: [VariantType; 10] = [
        Self::Nil,
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::String,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
        Self::Color,
        Self::Object,
    ];

    /// Get the lowercase type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nil => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "String",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::Color => "Color",
            Self::Object => "Object",
        }
    }

    /// Look up a tag by its ordinal.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i)).copied()
    }

    /// The ordinal of this tag.
    pub fn index(&self) -> i64 {
        Self::ALL.iter().position(|t| t == self).unwrap_or_default() as i64
    }

    /// Whether this is the universal "any" tag
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// The value a freshly created pin of this type holds.
    pub fn default_value(&self) -> Variant {
        match self {
            Self::Nil | Self::Object => Variant::Nil,
            Self::Bool => Variant::Bool(false),
            Self::Int => Variant::Int(0),
            Self::Float => Variant::Float(0.0),
            Self::String => Variant::String(String::new()),
            Self::Vector2 => Variant::Vector2([0.0; 2]),
            Self::Vector3 => Variant::Vector3([0.0; 3]),
            Self::Vector4 => Variant::Vector4([0.0; 4]),
            Self::Color => Variant::Color([0.0, 0.0, 0.0, 1.0]),
        }
    }

    /// Check if a value of this type can flow into a slot of `other`.
    pub fn can_connect_to(&self, other: &VariantType) -> bool {
        // Any type can connect to anything
        if self.is_any() || other.is_any() {
            return true;
        }

        if self == other {
            return true;
        }

        match (self, other) {
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            (Self::Bool, Self::Int) => true,
            (Self::Vector2, Self::Vector3 | Self::Vector4) => true,
            (Self::Vector3, Self::Vector4) => true,
            (Self::Color, Self::Vector4) | (Self::Vector4, Self::Color) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// A host object as seen by scripts: an identity plus its runtime class.
#[derive(Debug)]
pub struct ScriptObject {
    instance_id: u64,
    class_name: String,
}

/// Shared reference to a host object.
///
/// Equality is identity: two references are equal only if they point at the
/// same object.
#[derive(Debug, Clone)]
pub struct ObjectRef(Arc<ScriptObject>);

impl ObjectRef {
    /// Create a new object of the given runtime class
    pub fn new(class_name: impl Into<String>) -> Self {
        Self(Arc::new(ScriptObject {
            instance_id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            class_name: class_name.into(),
        }))
    }

    /// The object's runtime class name
    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    /// The object's unique instance id
    pub fn instance_id(&self) -> u64 {
        self.0.instance_id
    }

    /// Check whether both references point at the same object
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    /// No value (also a null object)
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color
    Color([f32; 4]),
    /// Object reference, runtime only
    #[serde(skip)]
    Object(ObjectRef),
}

impl Variant {
    /// Get the type tag for this value
    pub fn variant_type(&self) -> VariantType {
        match self {
            Self::Nil => VariantType::Nil,
            Self::Bool(_) => VariantType::Bool,
            Self::Int(_) => VariantType::Int,
            Self::Float(_) => VariantType::Float,
            Self::String(_) => VariantType::String,
            Self::Vector2(_) => VariantType::Vector2,
            Self::Vector3(_) => VariantType::Vector3,
            Self::Vector4(_) => VariantType::Vector4,
            Self::Color(_) => VariantType::Color,
            Self::Object(_) => VariantType::Object,
        }
    }

    /// Whether this is `Nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Check whether a slot typed `value_type` can hold this value.
    ///
    /// `Nil` is accepted everywhere, object slots included.
    pub fn is_assignable_to(&self, value_type: VariantType) -> bool {
        value_type.is_any() || self.is_nil() || self.variant_type() == value_type
    }

    /// Truthiness used by conditions.
    pub fn booleanize(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Vector2(v) => v.iter().any(|c| *c != 0.0),
            Self::Vector3(v) => v.iter().any(|c| *c != 0.0),
            Self::Vector4(v) | Self::Color(v) => v.iter().any(|c| *c != 0.0),
            Self::Object(_) => true,
        }
    }

    /// Get the object reference, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Get the string slice, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer, if this is an int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("<null>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Vector2([x, y]) => write!(f, "({x}, {y})"),
            Self::Vector3([x, y, z]) => write!(f, "({x}, {y}, {z})"),
            Self::Vector4([x, y, z, w]) | Self::Color([x, y, z, w]) => {
                write!(f, "({x}, {y}, {z}, {w})")
            }
            Self::Object(object) => write!(f, "<{}#{}>", object.class_name(), object.instance_id()),
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ObjectRef> for Variant {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}
