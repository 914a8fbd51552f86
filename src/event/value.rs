use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// An integer carried by an event, tagged with the width it was produced with.
///
/// The width matters to the encoder: only [`Integer::I64`] is accepted as a
/// timestamp override, while every width may be used as a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Integer {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
}

impl Integer {
    /// Returns the value if, and only if, this is a 64-bit signed integer.
    pub const fn as_i64(self) -> Option<i64> {
        match self {
            Integer::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Widens the value to `i64`, failing for unsigned values that do not fit.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Integer::I8(v) => Some(v.into()),
            Integer::I16(v) => Some(v.into()),
            Integer::I32(v) => Some(v.into()),
            Integer::I64(v) => Some(v),
            Integer::Isize(v) => i64::try_from(v).ok(),
            Integer::U8(v) => Some(v.into()),
            Integer::U16(v) => Some(v.into()),
            Integer::U32(v) => Some(v.into()),
            Integer::U64(v) => i64::try_from(v).ok(),
            Integer::Usize(v) => i64::try_from(v).ok(),
        }
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Integer::I8(v) => write!(f, "{}", v),
            Integer::I16(v) => write!(f, "{}", v),
            Integer::I32(v) => write!(f, "{}", v),
            Integer::I64(v) => write!(f, "{}", v),
            Integer::Isize(v) => write!(f, "{}", v),
            Integer::U8(v) => write!(f, "{}", v),
            Integer::U16(v) => write!(f, "{}", v),
            Integer::U32(v) => write!(f, "{}", v),
            Integer::U64(v) => write!(f, "{}", v),
            Integer::Usize(v) => write!(f, "{}", v),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Value {
    String(String),
    Integer(Integer),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Object(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Null,
}

impl Value {
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }

    pub const fn as_integer(&self) -> Option<Integer> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Renders the value as text: strings as-is, timestamps as RFC 3339 and
    /// composite values as JSON.
    pub fn to_string_lossy(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Value::Object(_) | Value::Array(_) => {
                serde_json::to_string(self).unwrap_or_else(|_| String::from("<invalid>"))
            }
            Value::Null => String::from("<null>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => match i {
                Integer::U64(v) => serializer.serialize_u64(*v),
                Integer::Usize(v) => serializer.serialize_u64(*v as u64),
                other => match other.to_i64() {
                    Some(v) => serializer.serialize_i64(v),
                    None => serializer.serialize_str(&other.to_string()),
                },
            },
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Timestamp(_) => serializer.serialize_str(&self.to_string_lossy()),
            Value::Object(m) => serializer.collect_map(m),
            Value::Array(a) => serializer.collect_seq(a),
            Value::Null => serializer.serialize_none(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(Integer::I64(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Integer(Integer::U64(u))
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Object(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Integer {
                fn from(value: $ty) -> Self {
                    Integer::$variant(value)
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Integer(Integer::$variant(value))
                }
            }
        )*
    };
}

impl_from_integer!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
);

impl From<Integer> for Value {
    fn from(value: Integer) -> Self {
        Value::Integer(value)
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Value::String(string)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Value::Timestamp(timestamp)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            None => Value::Null,
            Some(v) => v.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integer_widths_are_preserved() {
        assert_eq!(Value::from(7i8), Value::Integer(Integer::I8(7)));
        assert_eq!(Value::from(7u32), Value::Integer(Integer::U32(7)));
        assert_eq!(Value::from(7i64).as_integer().and_then(Integer::as_i64), Some(7));
        assert_eq!(Value::from(7i32).as_integer().and_then(Integer::as_i64), None);
    }

    #[test]
    fn integer_display_is_base_ten() {
        assert_eq!(Integer::I16(-12).to_string(), "-12");
        assert_eq!(Integer::U64(u64::MAX).to_string(), "18446744073709551615");
    }

    #[test]
    fn widening_rejects_values_out_of_range() {
        assert_eq!(Integer::U64(u64::MAX).to_i64(), None);
        assert_eq!(Integer::U8(3).to_i64(), Some(3));
    }

    #[test]
    fn json_numbers_become_i64_when_possible() {
        let value = Value::from(serde_json::json!({"a": 1, "b": 1.5, "c": u64::MAX}));
        let Value::Object(map) = value else {
            panic!("expected an object");
        };
        assert_eq!(map["a"], Value::Integer(Integer::I64(1)));
        assert_eq!(map["b"], Value::Float(1.5));
        assert_eq!(map["c"], Value::Integer(Integer::U64(u64::MAX)));
    }

    #[test]
    fn composite_values_render_as_json() {
        let value = Value::from(vec![Value::from(1i64), Value::from("x"), Value::Null]);
        assert_eq!(value.to_string_lossy(), r#"[1,"x",null]"#);
    }
}
