//! Render setting descriptors and their presentation kinds

use crate::render::value::Value;

/// A backend setting as advertised by its render delegate
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettingDescriptor {
    /// Human readable name
    pub name: String,
    /// Key used with the setting get/set calls
    pub key: String,
    /// Default value, which also fixes the setting's type
    pub default_value: Value,
}

impl RenderSettingDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, key: impl Into<String>, default_value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            default_value: default_value.into(),
        }
    }
}

/// Presentation kind chosen from a setting's default value type
#[derive(Debug, Clone, PartialEq)]
pub enum SettingWidget {
    /// Boolean toggle
    Checkbox(bool),
    /// Integer entry
    IntField(i64),
    /// Floating point entry
    FloatField(f64),
    /// Free text entry
    TextField(String),
    /// No widget exists for the named value type
    Unsupported(&'static str),
}

impl SettingWidget {
    /// Pick the widget for a default value
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(v) => Self::Checkbox(*v),
            Value::Int(v) => Self::IntField(*v),
            Value::Float(v) => Self::FloatField(*v),
            Value::String(v) => Self::TextField(v.clone()),
            other => Self::Unsupported(other.type_name()),
        }
    }

    /// Whether a widget can be shown
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

/// A setting descriptor paired with its widget kind
#[derive(Debug, Clone, PartialEq)]
pub struct SettingControl {
    /// Setting description
    pub descriptor: RenderSettingDescriptor,
    /// Widget kind
    pub widget: SettingWidget,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;

    #[test]
    fn test_widget_kinds() {
        assert_eq!(SettingWidget::from_value(&Value::Bool(true)), SettingWidget::Checkbox(true));
        assert_eq!(SettingWidget::from_value(&Value::Int(8)), SettingWidget::IntField(8));
        assert_eq!(SettingWidget::from_value(&Value::Float(0.5)), SettingWidget::FloatField(0.5));
        assert_eq!(
            SettingWidget::from_value(&Value::from("label")),
            SettingWidget::TextField("label".to_string())
        );
    }

    #[test]
    fn test_unsupported_kind_names_type() {
        let widget = SettingWidget::from_value(&Value::Vec4(Vec4::zeros()));
        assert_eq!(widget, SettingWidget::Unsupported("vec4d"));
        assert!(!widget.is_supported());
    }
}
