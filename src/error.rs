use thiserror::Error;

/// Everything that can go wrong while decoding an NRBF stream.
///
/// All variants are fatal: the decoder never attempts recovery and never
/// hands back a partial tree. A caller sees exactly one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The stream's first byte was not `0x00` (SerializationHeaderRecord).
    #[error("not a valid NRBF stream: expected header tag 0x00")]
    InvalidHeader,

    /// A record tag outside the set this decoder implements.
    #[error("unknown or unsupported record tag 0x{0:02X}")]
    UnknownRecord(u8),

    /// A primitive type code that is reserved (0, 4) or otherwise unmapped.
    #[error("unsupported primitive type code {0}")]
    UnsupportedPrimitive(u8),

    /// A binary type code outside 0..=7.
    #[error("unsupported binary type code {0}")]
    UnsupportedBinaryType(u8),

    /// The reader ran out of bytes before a field could be fully read.
    #[error("truncated input: expected more bytes")]
    TruncatedInput,

    /// A `MemberReference` (or array slot) pointed at an object id that
    /// never appeared in the stream.
    #[error("dangling reference to object id {0}")]
    DanglingReference(u32),

    /// The 7-bit length-prefix varint exceeded five groups or its decoded
    /// length ran past the remaining input.
    #[error("malformed length prefix")]
    MalformedLength,

    /// A length-prefixed string's bytes were not valid UTF-8.
    #[error("string was not valid UTF-8")]
    InvalidUtf8,

    /// No object was ever registered before `MessageEnd`, so there is no
    /// root to return.
    #[error("stream has no root object")]
    NoRoot,

    /// `read_bits` was asked for an out-of-range bit count, or a
    /// byte-aligned read was attempted while the cursor sat mid-byte.
    #[error("reader misuse: {0}")]
    ReaderMisuse(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
