//! Projection / Member Mapper (§4.3): turns the parse-time tree into the
//! plain [`crate::Value`] tree callers see, resolving `Ref` placeholders
//! along the way.
//!
//! The source spec separates "apply queued reference fix-ups" from
//! "project the fixed-up tree" into two passes. Here they're the same
//! pass: every object a `Ref` can point to is already complete in the
//! object table by the time `MessageEnd` is reached (a composite always
//! finishes before its parent, by stack discipline), so resolving a `Ref`
//! is just looking its id up and projecting what's there. This avoids
//! building a second, fully-dereferenced copy of the parse-time tree
//! purely to throw it away after one more walk.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::graph::{ArrayObject, Composite, RawValue};
use crate::value::Value;

/// Names that collapse their owning composite to their own projected
/// value instead of becoming a map entry (§4.3 rule 3): `_items` unwraps
/// list/collection wrappers, `value__` unwraps enum boxes.
const COLLAPSING_MEMBER_NAMES: [&str; 2] = ["_items", "value__"];

pub(crate) fn project_root(root_id: u32, objects: &HashMap<u32, RawValue>) -> Result<Value> {
    project_ref(root_id, objects)
}

fn project_ref(id: u32, objects: &HashMap<u32, RawValue>) -> Result<Value> {
    let raw = objects.get(&id).ok_or(Error::DanglingReference(id))?;
    project_raw(raw, objects)
}

fn project_raw(raw: &RawValue, objects: &HashMap<u32, RawValue>) -> Result<Value> {
    Ok(match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::U8(v) => Value::U8(*v),
        RawValue::I8(v) => Value::I8(*v),
        RawValue::I16(v) => Value::I16(*v),
        RawValue::U16(v) => Value::U16(*v),
        RawValue::I32(v) => Value::I32(*v),
        RawValue::U32(v) => Value::U32(*v),
        RawValue::I64(v) => Value::I64(*v),
        RawValue::U64(v) => Value::U64(*v),
        RawValue::F32(v) => Value::F32(*v),
        RawValue::F64(v) => Value::F64(*v),
        RawValue::String(s) => Value::String(s.clone()),
        RawValue::Ref(id) => {
            trace!("resolving reference -> {}", id);
            project_ref(*id, objects)?
        }
        RawValue::PrimitiveSeq(items) => Value::Array(project_all(items, objects)?),
        RawValue::Array(array) => project_array(array, objects)?,
        RawValue::Composite(composite) => project_composite(composite, objects)?,
    })
}

fn project_all(values: &[RawValue], objects: &HashMap<u32, RawValue>) -> Result<Vec<Value>> {
    values.iter().map(|v| project_raw(v, objects)).collect()
}

fn project_array(array: &ArrayObject, objects: &HashMap<u32, RawValue>) -> Result<Value> {
    Ok(Value::Array(project_all(&array.member_values, objects)?))
}

fn project_composite(composite: &Composite, objects: &HashMap<u32, RawValue>) -> Result<Value> {
    let names = &composite.descriptor.member_names;

    if let Some(idx) = names.iter().position(|n| COLLAPSING_MEMBER_NAMES.contains(&n.as_str())) {
        return project_raw(&composite.member_values[idx], objects);
    }

    let mut map = IndexMap::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        map.insert(name.clone(), project_raw(&composite.member_values[idx], objects)?);
    }
    Ok(Value::Map(map))
}
