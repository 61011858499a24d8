//! The plain, language-neutral value tree produced by [`crate::deserialize`].

use indexmap::IndexMap;
use serde::Serialize;

/// A decoded and projected NRBF value.
///
/// Composite classes collapse to [`Value::Map`] (or to their sole payload
/// when the class is a collection/enum wrapper — see the module docs on
/// [`crate::project`]), binary arrays and primitive arrays collapse to
/// [`Value::Array`], and everything else is a scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Array(Vec<Value>),
    /// A projected class, keyed by member name in declaration order.
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
}
