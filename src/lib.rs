//! A decoder for the Microsoft .NET Remoting Binary Format (NRBF): the
//! wire format the .NET `BinaryFormatter` produces.
//!
//! [`deserialize`] reconstructs the object graph serialized into an NRBF
//! byte stream and projects it into a plain, language-neutral [`Value`]
//! tree — maps, arrays, scalars, strings, nulls — suitable for downstream
//! inspection (dumping, diffing, feeding to a generic viewer). This is a
//! decode-only library: there is no encoder, no base64 framing, and no
//! streaming/incremental API. Callers hand over a fully-buffered byte
//! slice and get back an owned tree or an [`Error`].
//!
//! Three pieces compose bottom-up:
//! - [`reader`]: a little-endian byte cursor with the handful of
//!   bit-level primitives the format actually needs.
//! - `graph` (private): the record-parser state machine that consumes the
//!   interleaved record stream and builds an id-keyed object table.
//! - [`project`]: the post-pass that turns that table into a [`Value`].

#[macro_use]
extern crate log;

pub mod error;
mod graph;
mod project;
pub mod reader;
pub mod record;
pub mod value;

pub use crate::error::{Error, Result};
pub use crate::value::Value;

use crate::reader::Reader;

/// Decodes a full NRBF byte stream and returns its projected value tree.
///
/// `bytes` must begin with the `0x00` `SerializationHeaderRecord` tag and
/// contain a well-formed record stream terminated by `MessageEnd`
/// (`0x0B`). Every error kind is fatal: there is no partial result.
pub fn deserialize(bytes: &[u8]) -> Result<Value> {
    let mut reader = Reader::new_validated(bytes)?;
    graph::Parser::new().run(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    /// Bytes for a minimal `SerializationHeaderRecord` immediately
    /// followed by whatever the test appends.
    fn header() -> Vec<u8> {
        vec![
            0x00, // tag
            0x01, 0x00, 0x00, 0x00, // rootId
            0xFF, 0xFF, 0xFF, 0xFF, // headerId
            0x01, 0x00, 0x00, 0x00, // majorVersion
            0x00, 0x00, 0x00, 0x00, // minorVersion
        ]
    }

    fn len_prefixed(s: &str) -> Vec<u8> {
        // Every fixture string here is short enough for a single 7-bit group.
        assert!(s.len() < 0x80);
        let mut out = vec![s.len() as u8];
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn scenario_no_root_is_an_error() {
        let mut bytes = header();
        bytes.push(0x0B); // MessageEnd with no object ever registered
        assert!(matches!(deserialize(&bytes), Err(Error::NoRoot)));
    }

    #[test]
    fn scenario_single_string_root() {
        let mut bytes = header();
        bytes.push(0x06); // BinaryObjectString
        bytes.extend_from_slice(&2u32.to_le_bytes()); // objectId
        bytes.extend(len_prefixed("hello"));
        bytes.push(0x0B);

        let value = deserialize(&bytes).unwrap();
        assert_eq!(value, Value::String("hello".to_string()));
    }

    #[test]
    fn scenario_class_with_two_primitive_members() {
        let mut bytes = header();
        bytes.push(0x04); // SystemClassWithMembersAndTypes
        bytes.extend_from_slice(&1u32.to_le_bytes()); // objectId
        bytes.extend(len_prefixed("Foo")); // class name
        bytes.extend_from_slice(&2u32.to_le_bytes()); // memberCount
        bytes.extend(len_prefixed("a"));
        bytes.extend(len_prefixed("b"));
        bytes.push(0); // member 0 BTC = Primitive
        bytes.push(0); // member 1 BTC = Primitive
        bytes.push(8); // member 0 PTC = Int32
        bytes.push(1); // member 1 PTC = Boolean
        bytes.extend_from_slice(&42i32.to_le_bytes()); // a = 42
        bytes.push(1); // b = true
        bytes.push(0x0B);

        let value = deserialize(&bytes).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&Value::I32(42)));
        assert_eq!(map.get("b"), Some(&Value::Bool(true)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn scenario_reference_fixup() {
        // Root is the class itself; its first String member is filled by a
        // literal BinaryObjectString, and its second by a MemberReference
        // back to that same string's id — the fix-up must resolve to an
        // equal value, not a leaked `{ref:10}` placeholder.
        let mut bytes = header();

        bytes.push(0x04); // SystemClassWithMembersAndTypes
        bytes.extend_from_slice(&1u32.to_le_bytes()); // objectId
        bytes.extend(len_prefixed("Holder"));
        bytes.extend_from_slice(&2u32.to_le_bytes()); // memberCount
        bytes.extend(len_prefixed("other"));
        bytes.extend(len_prefixed("inner"));
        bytes.push(1); // "other" BTC = String
        bytes.push(1); // "inner" BTC = String

        bytes.push(0x06); // BinaryObjectString id=10, fills "other"
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend(len_prefixed("ten"));

        bytes.push(0x09); // MemberReference, fills "inner"
        bytes.extend_from_slice(&10u32.to_le_bytes()); // -> id 10

        bytes.push(0x0B);

        let value = deserialize(&bytes).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("other"), Some(&Value::String("ten".to_string())));
        assert_eq!(map.get("inner"), Some(&Value::String("ten".to_string())));
    }

    #[test]
    fn scenario_value_dunder_enum_collapse() {
        let mut bytes = header();
        bytes.push(0x04);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend(len_prefixed("Color"));
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend(len_prefixed("value__"));
        bytes.push(0); // Primitive
        bytes.push(8); // Int32
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.push(0x0B);

        let value = deserialize(&bytes).unwrap();
        assert_eq!(value, Value::I32(7));
    }

    #[test]
    fn scenario_items_list_collapse() {
        // Root is the class; its "_items" member (BTC Object) is filled
        // inline by a nested BinaryArray record — the array is pushed and
        // popped while the class's member slot is still open, exactly as
        // the main loop's non-primitive branch expects. "_size" is then
        // read as a plain inline Int32 and discarded by projection.
        let mut bytes = header();

        bytes.push(0x04); // SystemClassWithMembersAndTypes
        bytes.extend_from_slice(&1u32.to_le_bytes()); // objectId
        bytes.extend(len_prefixed("List"));
        bytes.extend_from_slice(&2u32.to_le_bytes()); // memberCount
        bytes.extend(len_prefixed("_items"));
        bytes.extend(len_prefixed("_size"));
        bytes.push(2); // "_items" BTC = Object
        bytes.push(0); // "_size" BTC = Primitive
        bytes.push(8); // "_size" PTC = Int32

        bytes.push(0x07); // BinaryArray, fills "_items"
        bytes.extend_from_slice(&2u32.to_le_bytes()); // objectId
        bytes.push(0); // BinaryArrayKind::Single -> no lower bounds
        bytes.extend_from_slice(&1u32.to_le_bytes()); // rank
        bytes.extend_from_slice(&3u32.to_le_bytes()); // length
        bytes.push(0); // itemType BTC = Primitive
        bytes.push(8); // PTC = Int32
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&3i32.to_le_bytes());

        bytes.extend_from_slice(&3i32.to_le_bytes()); // "_size" = 3, read inline

        bytes.push(0x0B);

        let value = deserialize(&bytes).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::I32(1), Value::I32(2), Value::I32(3)])
        );
    }

    #[test]
    fn rejects_unknown_record_tag() {
        let mut bytes = header();
        bytes.push(0x10); // not implemented by design
        assert!(matches!(deserialize(&bytes), Err(Error::UnknownRecord(0x10))));
    }

    #[test]
    fn projected_value_round_trips_through_json() {
        let mut bytes = header();
        bytes.push(0x04); // SystemClassWithMembersAndTypes
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend(len_prefixed("Foo"));
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend(len_prefixed("a"));
        bytes.push(0); // Primitive
        bytes.push(8); // Int32
        bytes.extend_from_slice(&42i32.to_le_bytes());
        bytes.push(0x0B);

        let value = deserialize(&bytes).unwrap();
        let json = serde_json::to_string(&value).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!({"a": 42}));
    }

    #[test]
    fn rejects_dangling_reference() {
        let mut bytes = header();
        bytes.push(0x04);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend(len_prefixed("Holder"));
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend(len_prefixed("inner"));
        bytes.push(1); // BTC String
        bytes.push(0x09); // MemberReference
        bytes.extend_from_slice(&999u32.to_le_bytes()); // never registered
        bytes.push(0x0B);

        assert!(matches!(
            deserialize(&bytes),
            Err(Error::DanglingReference(999))
        ));
    }
}
