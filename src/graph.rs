//! Record parser & graph builder (§4.2): drives the main loop that
//! alternately fills the innermost open composite's primitive slots and
//! dispatches whole records, building an object table keyed by id.
//!
//! The parse-time tree (`RawValue`/`Composite`/`ArrayObject`) is distinct
//! from [`crate::Value`]: it still carries class descriptors and unresolved
//! `Ref` placeholders. [`crate::project`] turns it into the plain tree
//! callers see.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::record::{AdditionalInfo, Btc, ClassDescriptor, Library, Ptc, RecordTag};

/// A decoded scalar, composite, or placeholder, as produced while a stream
/// is still being parsed.
#[derive(Debug)]
pub(crate) enum RawValue {
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
    /// An unresolved `MemberReference`, or the slot left behind when a
    /// nested composite/array was pushed onto the stack. Both are
    /// resolved the same way: by looking the id up in the finished object
    /// table once it is known to be complete.
    Ref(u32),
    /// The flat scalar sequence produced by `ArraySinglePrimitive`.
    PrimitiveSeq(Vec<RawValue>),
    Array(ArrayObject),
    Composite(Composite),
}

/// A class instance: descriptor plus one value per declared member, in
/// declaration order.
#[derive(Debug)]
pub(crate) struct Composite {
    pub object_id: u32,
    pub descriptor: Rc<ClassDescriptor>,
    pub member_values: Vec<RawValue>,
}

/// A `BinaryArray`: homogeneously-typed members, filled as if it were a
/// class with `total_length` members all sharing one `itemType`.
#[derive(Debug)]
pub(crate) struct ArrayObject {
    pub object_id: u32,
    pub rank: u32,
    pub lengths: Vec<u32>,
    pub lower_bounds: Vec<u32>,
    pub item_type: Btc,
    pub item_info: AdditionalInfo,
    pub total_length: u32,
    pub member_values: Vec<RawValue>,
}

/// `BinaryArray`'s `binaryArrayType` byte: only the distinction "does the
/// wire also carry a lower-bounds vector" (the offset variants) matters
/// here, so the remaining kinds are not otherwise interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BinaryArrayKind {
    Single = 0,
    Jagged = 1,
    Rectangular = 2,
    SingleOffset = 3,
    JaggedOffset = 4,
    RectangularOffset = 5,
}

impl BinaryArrayKind {
    fn from_u8(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => BinaryArrayKind::Single,
            1 => BinaryArrayKind::Jagged,
            2 => BinaryArrayKind::Rectangular,
            3 => BinaryArrayKind::SingleOffset,
            4 => BinaryArrayKind::JaggedOffset,
            5 => BinaryArrayKind::RectangularOffset,
            other => return Err(Error::UnknownRecord(other)),
        })
    }

    fn has_lower_bounds(self) -> bool {
        (self as u8) > 2
    }
}

/// `totalLength == sum(lengths)`, matching the source's observed
/// behavior rather than .NET's own product-of-dimensions rule (§9 open
/// question, recorded in DESIGN.md). Kept as a named helper so the
/// divergence is easy to find and is never silently duplicated.
fn total_length_sum(lengths: &[u32]) -> u32 {
    lengths.iter().sum()
}

/// What the stack tip expects next for its current member slot.
enum MemberKind {
    Primitive(Ptc),
    NonPrimitive,
}

/// One entry of the explicit stack of "currently being filled" composites
/// (§9 design notes: kept explicit rather than host call-stack recursion,
/// since a large `BinaryArray` would otherwise blow the stack).
enum Frame {
    Composite(Composite),
    Array(ArrayObject),
}

impl Frame {
    fn object_id(&self) -> u32 {
        match self {
            Frame::Composite(c) => c.object_id,
            Frame::Array(a) => a.object_id,
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            Frame::Composite(c) => c.member_values.len() >= c.descriptor.member_types.len(),
            Frame::Array(a) => a.member_values.len() >= a.total_length as usize,
        }
    }

    fn next_member_kind(&self) -> MemberKind {
        match self {
            Frame::Composite(c) => {
                let idx = c.member_values.len();
                match c.descriptor.member_types[idx] {
                    Btc::Primitive => MemberKind::Primitive(
                        c.descriptor.additional_infos[idx]
                            .primitive_type()
                            .expect("Primitive BTC always carries a Ptc"),
                    ),
                    _ => MemberKind::NonPrimitive,
                }
            }
            Frame::Array(a) => match a.item_type {
                Btc::Primitive => MemberKind::Primitive(
                    a.item_info
                        .primitive_type()
                        .expect("Primitive BTC always carries a Ptc"),
                ),
                _ => MemberKind::NonPrimitive,
            },
        }
    }

    fn append(&mut self, value: RawValue) {
        match self {
            Frame::Composite(c) => c.member_values.push(value),
            Frame::Array(a) => a.member_values.push(value),
        }
    }

    fn into_raw(self) -> RawValue {
        match self {
            Frame::Composite(c) => RawValue::Composite(c),
            Frame::Array(a) => RawValue::Array(a),
        }
    }
}

fn read_primitive(reader: &mut Reader, ptc: Ptc) -> Result<RawValue> {
    let value = match ptc {
        Ptc::Boolean => RawValue::Bool(reader.read_u8()? != 0),
        Ptc::Byte => RawValue::U8(reader.read_u8()?),
        Ptc::Char => RawValue::U8(reader.read_u8()?),
        Ptc::Decimal => RawValue::String(reader.read_length_prefixed_string()?),
        Ptc::Double => RawValue::F64(reader.read_f64()?),
        Ptc::Int16 => RawValue::I16(reader.read_u16()? as i16),
        Ptc::Int32 => RawValue::I32(reader.read_u32()? as i32),
        Ptc::Int64 => RawValue::I64(reader.read_u64()? as i64),
        Ptc::SByte => RawValue::I8(reader.read_i8()?),
        Ptc::Single => RawValue::F32(reader.read_f32()?),
        // Raw 64-bit values by design (§9): no tick-to-calendar conversion.
        Ptc::TimeSpan => RawValue::U64(reader.read_u64()?),
        Ptc::DateTime => RawValue::U64(reader.read_u64()?),
        Ptc::UInt16 => RawValue::U16(reader.read_u16()?),
        Ptc::UInt32 => RawValue::U32(reader.read_u32()?),
        Ptc::UInt64 => RawValue::U64(reader.read_u64()?),
        Ptc::Null => RawValue::Null,
        Ptc::String => RawValue::String(reader.read_length_prefixed_string()?),
    };
    Ok(value)
}

/// Drives the record stream to completion and hands back the parse-time
/// object table plus the id of whichever object was registered first.
pub(crate) struct Parser {
    /// Scoped to one decode call (§3). Projection never surfaces it.
    #[allow(dead_code)]
    libraries: Vec<Library>,
    objects: HashMap<u32, RawValue>,
    class_descriptors: HashMap<u32, Rc<ClassDescriptor>>,
    stack: Vec<Frame>,
    first_id: Option<u32>,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            libraries: Vec::new(),
            objects: HashMap::new(),
            class_descriptors: HashMap::new(),
            stack: Vec::new(),
            first_id: None,
        }
    }

    fn note_first_id(&mut self, id: u32) {
        if self.first_id.is_none() {
            self.first_id = Some(id);
        }
    }

    fn append_to_top(&mut self, value: RawValue) {
        if let Some(top) = self.stack.last_mut() {
            top.append(value);
        }
    }

    /// Pushes a composite/array frame, recording the `Ref` placeholder in
    /// the current stack tip's member slot first (§4.2.D slot-append
    /// semantics). The placeholder is resolved later, during projection,
    /// once the pushed frame has completed and landed in `objects`.
    fn introduce(&mut self, frame: Frame) {
        let id = frame.object_id();
        self.append_to_top(RawValue::Ref(id));
        self.note_first_id(id);
        trace!("pushed frame id={} depth={}", id, self.stack.len() + 1);
        self.stack.push(frame);
    }

    fn pop_completed(&mut self) {
        let frame = self.stack.pop().expect("caller checked stack is non-empty");
        let id = frame.object_id();
        trace!("popped frame id={} depth={}", id, self.stack.len());
        self.objects.insert(id, frame.into_raw());
    }

    fn handle_class_with_members(&mut self, reader: &mut Reader, has_library_id: bool) -> Result<()> {
        let object_id = reader.read_u32()?;
        let descriptor = Rc::new(ClassDescriptor::read(reader, object_id, has_library_id)?);
        self.class_descriptors.insert(object_id, descriptor.clone());
        self.introduce(Frame::Composite(Composite {
            object_id,
            descriptor,
            member_values: Vec::new(),
        }));
        Ok(())
    }

    fn handle_class_with_id(&mut self, reader: &mut Reader) -> Result<()> {
        let object_id = reader.read_u32()?;
        let metadata_id = reader.read_u32()?;
        let template = self
            .class_descriptors
            .get(&metadata_id)
            .ok_or(Error::DanglingReference(metadata_id))?;
        let mut descriptor = (**template).clone();
        descriptor.object_id = object_id;
        let descriptor = Rc::new(descriptor);
        self.class_descriptors.insert(object_id, descriptor.clone());
        self.introduce(Frame::Composite(Composite {
            object_id,
            descriptor,
            member_values: Vec::new(),
        }));
        Ok(())
    }

    fn handle_binary_object_string(&mut self, reader: &mut Reader) -> Result<()> {
        let object_id = reader.read_u32()?;
        let value = reader.read_length_prefixed_string()?;
        self.note_first_id(object_id);
        self.objects.insert(object_id, RawValue::String(value.clone()));
        self.append_to_top(RawValue::String(value));
        Ok(())
    }

    fn handle_binary_array(&mut self, reader: &mut Reader) -> Result<()> {
        let object_id = reader.read_u32()?;
        let kind = BinaryArrayKind::from_u8(reader.read_u8()?)?;
        let rank = reader.read_u32()?;

        let mut lengths = Vec::with_capacity(rank as usize);
        for _ in 0..rank {
            lengths.push(reader.read_u32()?);
        }

        let lower_bounds = if kind.has_lower_bounds() {
            let mut bounds = Vec::with_capacity(rank as usize);
            for _ in 0..rank {
                bounds.push(reader.read_u32()?);
            }
            bounds
        } else {
            Vec::new()
        };

        let item_type = Btc::from_u8(reader.read_u8()?)?;
        let item_info = AdditionalInfo::read(reader, item_type)?;
        let total_length = total_length_sum(&lengths);

        debug!(
            "BinaryArray id={} rank={} total_length={}",
            object_id, rank, total_length
        );

        // Not appended to a parent: reached only via reference (§4.2.C).
        self.note_first_id(object_id);
        self.stack.push(Frame::Array(ArrayObject {
            object_id,
            rank,
            lengths,
            lower_bounds,
            item_type,
            item_info,
            total_length,
            member_values: Vec::new(),
        }));
        Ok(())
    }

    fn handle_array_single_primitive(&mut self, reader: &mut Reader) -> Result<()> {
        let object_id = reader.read_u32()?;
        let length = reader.read_u32()?;
        let ptc = Ptc::from_u8(reader.read_u8()?)?;

        let mut values = Vec::with_capacity(length as usize);
        for _ in 0..length {
            values.push(read_primitive(reader, ptc)?);
        }

        self.note_first_id(object_id);
        self.objects.insert(object_id, RawValue::PrimitiveSeq(values));
        Ok(())
    }

    /// Runs the main loop (§4.2.B) to completion and returns the project
    /// tree rooted at whichever object id was registered first.
    pub fn run(mut self, reader: &mut Reader) -> Result<crate::Value> {
        loop {
            if let Some(top) = self.stack.last() {
                if !top.is_complete() {
                    match top.next_member_kind() {
                        MemberKind::Primitive(ptc) => {
                            let value = read_primitive(reader, ptc)?;
                            self.stack.last_mut().unwrap().append(value);
                            continue;
                        }
                        MemberKind::NonPrimitive => {
                            // Fall through: the next record introduces this slot's value.
                        }
                    }
                } else {
                    self.pop_completed();
                    continue;
                }
            }

            let tag = RecordTag::from_u8(reader.read_u8()?)?;
            debug!("dispatched tag={:?} depth={}", tag, self.stack.len());
            match tag {
                RecordTag::SerializationHeader => {
                    let root_id = reader.read_u32()?;
                    let header_id = reader.read_u32()?;
                    let major = reader.read_u32()?;
                    let minor = reader.read_u32()?;
                    debug!(
                        "SerializationHeaderRecord root={} header={} version={}.{}",
                        root_id, header_id, major, minor
                    );
                }
                RecordTag::ClassWithId => self.handle_class_with_id(reader)?,
                RecordTag::SystemClassWithMembersAndTypes => {
                    self.handle_class_with_members(reader, false)?
                }
                RecordTag::ClassWithMembersAndTypes => self.handle_class_with_members(reader, true)?,
                RecordTag::BinaryObjectString => self.handle_binary_object_string(reader)?,
                RecordTag::BinaryArray => self.handle_binary_array(reader)?,
                RecordTag::MemberReference => {
                    let ref_id = reader.read_u32()?;
                    trace!("MemberReference -> {}", ref_id);
                    self.append_to_top(RawValue::Ref(ref_id));
                }
                RecordTag::ObjectNull => self.append_to_top(RawValue::Null),
                RecordTag::ObjectNull256 => {
                    let count = reader.read_u8()?;
                    for _ in 0..count {
                        self.append_to_top(RawValue::Null);
                    }
                }
                RecordTag::BinaryLibrary => {
                    let library = Library::read(reader)?;
                    debug!("BinaryLibraryRecord id={} name={}", library.library_id, library.name);
                    self.libraries.push(library);
                }
                RecordTag::ArraySinglePrimitive => self.handle_array_single_primitive(reader)?,
                RecordTag::MessageEnd => {
                    let root_id = self.first_id.ok_or(Error::NoRoot)?;
                    return crate::project::project_root(root_id, &self.objects);
                }
            }
        }
    }
}
