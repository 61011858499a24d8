//! Closed enumerations and small structs used by the record stream:
//! primitive type codes, binary type codes, the per-BTC "additional info"
//! payload, libraries, and class descriptors.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::error::{Error, Result};
use crate::reader::Reader;

/// Primitive Type Code (§3): identifies a scalar member or array element.
/// Codes 0 and 4 are reserved and never constructed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum Ptc {
    Boolean = 1,
    Byte = 2,
    Char = 3,
    Decimal = 5,
    Double = 6,
    Int16 = 7,
    Int32 = 8,
    Int64 = 9,
    SByte = 10,
    Single = 11,
    TimeSpan = 12,
    DateTime = 13,
    UInt16 = 14,
    UInt32 = 15,
    UInt64 = 16,
    Null = 17,
    String = 18,
}

impl Ptc {
    pub fn from_u8(byte: u8) -> Result<Self> {
        <Ptc as num_traits::FromPrimitive>::from_u8(byte)
            .ok_or(Error::UnsupportedPrimitive(byte))
    }
}

/// Binary Type Code (§3): classifies a class member's shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum Btc {
    Primitive = 0,
    String = 1,
    Object = 2,
    SystemClass = 3,
    Class = 4,
    ObjectArray = 5,
    StringArray = 6,
    PrimitiveArray = 7,
}

impl Btc {
    pub fn from_u8(byte: u8) -> Result<Self> {
        <Btc as num_traits::FromPrimitive>::from_u8(byte)
            .ok_or(Error::UnsupportedBinaryType(byte))
    }
}

/// The record tags dispatched by the main parse loop (§4.2.C). Any tag not
/// named here is rejected with [`Error::UnknownRecord`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordTag {
    SerializationHeader,
    ClassWithId,
    SystemClassWithMembersAndTypes,
    ClassWithMembersAndTypes,
    BinaryObjectString,
    BinaryArray,
    MemberReference,
    ObjectNull,
    MessageEnd,
    BinaryLibrary,
    ObjectNull256,
    ArraySinglePrimitive,
}

impl RecordTag {
    pub fn from_u8(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x00 => RecordTag::SerializationHeader,
            0x01 => RecordTag::ClassWithId,
            0x04 => RecordTag::SystemClassWithMembersAndTypes,
            0x05 => RecordTag::ClassWithMembersAndTypes,
            0x06 => RecordTag::BinaryObjectString,
            0x07 => RecordTag::BinaryArray,
            0x09 => RecordTag::MemberReference,
            0x0A => RecordTag::ObjectNull,
            0x0B => RecordTag::MessageEnd,
            0x0C => RecordTag::BinaryLibrary,
            0x0D => RecordTag::ObjectNull256,
            0x0F => RecordTag::ArraySinglePrimitive,
            // 0x02 ClassWithMembersRecord, 0x03 SystemClassWithMembers,
            // 0x08 MemberPrimitiveTyped, 0x10/0x11 MemberReference variants,
            // and anything else: unimplemented by design (§9 open list).
            other => return Err(Error::UnknownRecord(other)),
        })
    }
}

/// The additional-info payload that follows a member's [`Btc`] on the wire
/// (§4.2.A).
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalInfo {
    None,
    Primitive(Ptc),
    SystemClass(String),
    Class { class_name: String, library_id: u32 },
}

impl AdditionalInfo {
    pub fn read(reader: &mut Reader, btc: Btc) -> Result<Self> {
        Ok(match btc {
            Btc::Primitive | Btc::PrimitiveArray => {
                AdditionalInfo::Primitive(Ptc::from_u8(reader.read_u8()?)?)
            }
            Btc::SystemClass => AdditionalInfo::SystemClass(reader.read_length_prefixed_string()?),
            Btc::Class => AdditionalInfo::Class {
                class_name: reader.read_length_prefixed_string()?,
                library_id: reader.read_u32()?,
            },
            Btc::String | Btc::Object | Btc::ObjectArray | Btc::StringArray => AdditionalInfo::None,
        })
    }

    /// The [`Ptc`] this info carries, when the member is itself a
    /// primitive (used to decode inline primitive members, §4.2.B).
    pub fn primitive_type(&self) -> Option<Ptc> {
        match self {
            AdditionalInfo::Primitive(ptc) => Some(*ptc),
            _ => None,
        }
    }
}

/// A library reference scoped to one decode call (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    pub library_id: u32,
    pub name: String,
}

impl Library {
    pub fn read(reader: &mut Reader) -> Result<Self> {
        Ok(Library {
            library_id: reader.read_u32()?,
            name: reader.read_length_prefixed_string()?,
        })
    }
}

/// A class descriptor (§3): immutable once parsed, shared across
/// instances created via `ClassWithId`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub object_id: u32,
    pub name: String,
    pub member_names: Vec<String>,
    pub member_types: Vec<Btc>,
    pub additional_infos: Vec<AdditionalInfo>,
    /// `None` for SystemClassWithMembersAndTypes (`0x04`), `Some` for
    /// ClassWithMembersAndTypes (`0x05`).
    pub library_id: Option<u32>,
}

impl ClassDescriptor {
    /// Reads the common class-info + member-type-info shape shared by
    /// `0x04`/`0x05`. `has_library_id` selects which tag is being read.
    pub fn read(reader: &mut Reader, object_id: u32, has_library_id: bool) -> Result<Self> {
        let name = reader.read_length_prefixed_string()?;
        let member_count = reader.read_u32()?;

        let mut member_names = Vec::with_capacity(member_count as usize);
        for _ in 0..member_count {
            member_names.push(reader.read_length_prefixed_string()?);
        }

        let mut member_types = Vec::with_capacity(member_count as usize);
        for _ in 0..member_count {
            member_types.push(Btc::from_u8(reader.read_u8()?)?);
        }

        let mut additional_infos = Vec::with_capacity(member_count as usize);
        for btc in &member_types {
            additional_infos.push(AdditionalInfo::read(reader, *btc)?);
        }

        let library_id = if has_library_id {
            Some(reader.read_u32()?)
        } else {
            None
        };

        Ok(ClassDescriptor {
            object_id,
            name,
            member_names,
            member_types,
            additional_infos,
            library_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    #[test]
    fn ptc_rejects_reserved_codes() {
        assert!(matches!(Ptc::from_u8(0), Err(Error::UnsupportedPrimitive(0))));
        assert!(matches!(Ptc::from_u8(4), Err(Error::UnsupportedPrimitive(4))));
        assert_eq!(Ptc::from_u8(18).unwrap(), Ptc::String);
    }

    #[test]
    fn btc_rejects_out_of_range_codes() {
        assert!(matches!(Btc::from_u8(8), Err(Error::UnsupportedBinaryType(8))));
        assert_eq!(Btc::from_u8(0).unwrap(), Btc::Primitive);
    }

    #[test]
    fn record_tag_rejects_unimplemented_tags() {
        for tag in [0x02, 0x03, 0x08, 0x10, 0x11, 0xFF] {
            assert!(matches!(RecordTag::from_u8(tag), Err(Error::UnknownRecord(t)) if t == tag));
        }
        assert_eq!(RecordTag::from_u8(0x0B).unwrap(), RecordTag::MessageEnd);
    }

    #[test]
    fn additional_info_reads_class_payload() {
        // className="X" (1 byte, single varint group), libraryId=5
        let bytes = [1u8, b'X', 5, 0, 0, 0];
        let mut reader = Reader::new(&bytes);
        let info = AdditionalInfo::read(&mut reader, Btc::Class).unwrap();
        assert_eq!(
            info,
            AdditionalInfo::Class {
                class_name: "X".to_string(),
                library_id: 5,
            }
        );
    }

    #[test]
    fn additional_info_primitive_type_extracts_ptc() {
        let info = AdditionalInfo::Primitive(Ptc::Int32);
        assert_eq!(info.primitive_type(), Some(Ptc::Int32));
        assert_eq!(AdditionalInfo::None.primitive_type(), None);
    }

    #[test]
    fn class_descriptor_reads_member_table() {
        // name="Foo" (3 bytes), memberCount=1, memberName="a", memberType=Primitive, PTC=Boolean
        let mut bytes = vec![3u8, b'F', b'o', b'o'];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(1);
        bytes.push(b'a');
        bytes.push(0); // Btc::Primitive
        bytes.push(1); // Ptc::Boolean

        let mut reader = Reader::new(&bytes);
        let descriptor = ClassDescriptor::read(&mut reader, 7, false).unwrap();
        assert_eq!(descriptor.object_id, 7);
        assert_eq!(descriptor.name, "Foo");
        assert_eq!(descriptor.member_names, vec!["a".to_string()]);
        assert_eq!(descriptor.member_types, vec![Btc::Primitive]);
        assert_eq!(descriptor.library_id, None);
    }
}
