//! Type-erased parameter values
//!
//! `Value` is the closed set of types the task data provider stores, render
//! settings carry and render stats report. Typed extraction goes through
//! [`FromValue`].

use crate::core::ScenePath;
use crate::foundation::math::{Mat4, Vec4};
use crate::render::api::{RenderBufferDescriptor, RenderTaskParams, RprimCollection};
use crate::render::camera::WindowPolicy;
use crate::render::ParameterError;
use std::fmt;

/// Tagged parameter value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value
    #[default]
    Empty,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    String(String),
    /// Token list (render tags, purposes)
    Tokens(Vec<String>),
    /// 4x4 matrix
    Matrix(Mat4),
    /// 4-component vector (colors)
    Vec4(Vec4),
    /// Camera clip planes
    ClipPlanes(Vec<Vec4>),
    /// Camera window conform policy
    WindowPolicy(WindowPolicy),
    /// Render buffer allocation descriptor
    RenderBufferDescriptor(RenderBufferDescriptor),
    /// Render task parameter block
    RenderTaskParams(RenderTaskParams),
    /// Drawable collection
    Collection(RprimCollection),
}

impl Value {
    /// Name of the held type, used in error messages and widget selection
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Tokens(_) => "token[]",
            Self::Matrix(_) => "matrix4d",
            Self::Vec4(_) => "vec4d",
            Self::ClipPlanes(_) => "vec4d[]",
            Self::WindowPolicy(_) => "windowPolicy",
            Self::RenderBufferDescriptor(_) => "renderBufferDescriptor",
            Self::RenderTaskParams(_) => "renderTaskParams",
            Self::Collection(_) => "rprimCollection",
        }
    }

    /// Whether no value is held
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Typed extraction
    pub fn get<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }

    /// Typed extraction reporting the (path, key) the value was stored under
    pub fn extract<T: FromValue>(&self, path: &ScenePath, key: &str) -> Result<T, ParameterError> {
        T::from_value(self).ok_or_else(|| ParameterError::WrongType {
            path: path.clone(),
            key: key.to_string(),
            expected: T::TYPE_NAME,
            found: self.type_name(),
        })
    }

    /// Numeric view of int and float values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.3}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Tokens(v) => write!(f, "[{}]", v.join(", ")),
            Self::Vec4(v) => write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w),
            other => write!(f, "<{}>", other.type_name()),
        }
    }
}

/// Types that can be extracted from a [`Value`]
pub trait FromValue: Sized {
    /// Type name matching [`Value::type_name`]
    const TYPE_NAME: &'static str;

    /// Extract the typed payload, `None` when the variant differs
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_conversions! {
    bool => Bool, "bool";
    i64 => Int, "int";
    f64 => Float, "float";
    String => String, "string";
    Vec<String> => Tokens, "token[]";
    Mat4 => Matrix, "matrix4d";
    Vec4 => Vec4, "vec4d";
    Vec<Vec4> => ClipPlanes, "vec4d[]";
    WindowPolicy => WindowPolicy, "windowPolicy";
    RenderBufferDescriptor => RenderBufferDescriptor, "renderBufferDescriptor";
    RenderTaskParams => RenderTaskParams, "renderTaskParams";
    RprimCollection => Collection, "rprimCollection";
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4(Vec4::new(
            f64::from(v[0]),
            f64::from(v[1]),
            f64::from(v[2]),
            f64::from(v[3]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_extraction_is_strict() {
        let value = Value::from(64_i64);
        assert_eq!(value.get::<i64>(), Some(64));
        assert_eq!(value.get::<f64>(), None);
        assert_eq!(value.get::<bool>(), None);
        assert_eq!(value.as_f64(), Some(64.0));
    }

    #[test]
    fn test_type_names_match_from_value() {
        assert_eq!(Value::from(true).type_name(), bool::TYPE_NAME);
        assert_eq!(Value::from(Mat4::identity()).type_name(), Mat4::TYPE_NAME);
        assert_eq!(Value::from(Vec::<Vec4>::new()).type_name(), <Vec<Vec4>>::TYPE_NAME);
        assert_eq!(
            Value::from(vec!["geometry".to_string()]).type_name(),
            <Vec<String>>::TYPE_NAME
        );
    }

    #[test]
    fn test_color_conversion() {
        let value = Value::from([0.1_f32, 0.2, 0.3, 1.0]);
        let color = value.get::<Vec4>().unwrap();
        assert!((color.w - 1.0).abs() < 1e-6);
    }
}
