//! Binary wire format primitives.
//!
//! The wire codec translates between the in-memory value domain and the
//! byte-level protocol buffer format: base-128 varints, zigzag transforms,
//! little-endian fixed-width values, tag composition and length-delimited
//! framing. [`CodedInput`] enforces nesting limits and a total-size limit so
//! attacker-controlled payloads stay bounded.

use snafu::Snafu;

mod input;
mod output;

pub use input::{CodedInput, DEFAULT_RECURSION_LIMIT, DEFAULT_SIZE_LIMIT};
pub use output::CodedOutput;

/// The 3-bit encoding shape carried in every field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType
{
    /// Base-128 varint.
    Varint = 0,

    /// Little-endian 64-bit value.
    Fixed64 = 1,

    /// Varint length prefix followed by that many bytes.
    LengthDelimited = 2,

    /// Group start marker (proto2 groups).
    StartGroup = 3,

    /// Group end marker.
    EndGroup = 4,

    /// Little-endian 32-bit value.
    Fixed32 = 5,
}

impl WireType
{
    /// Decode the wire type from its 3-bit tag representation.
    ///
    /// Returns `None` for the two undefined encodings (6 and 7).
    pub fn from_tag_bits(bits: u32) -> Option<WireType>
    {
        Some(match bits & 0x07 {
            0 => WireType::Varint,
            1 => WireType::Fixed64,
            2 => WireType::LengthDelimited,
            3 => WireType::StartGroup,
            4 => WireType::EndGroup,
            5 => WireType::Fixed32,
            _ => return None,
        })
    }
}

/// Compose a field tag from a field number and wire type.
pub fn make_tag(field_number: u32, wire_type: WireType) -> u32
{
    (field_number << 3) | wire_type as u32
}

/// Extract the field number from a tag.
pub fn tag_field_number(tag: u32) -> u32
{
    tag >> 3
}

/// Extract the wire type from a tag, if it is a defined one.
pub fn tag_wire_type(tag: u32) -> Option<WireType>
{
    WireType::from_tag_bits(tag)
}

/// Zigzag-encode a signed 32-bit value into an unsigned one.
pub fn encode_zigzag32(n: i32) -> u32
{
    ((n << 1) ^ (n >> 31)) as u32
}

/// Invert [`encode_zigzag32`].
pub fn decode_zigzag32(n: u32) -> i32
{
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Zigzag-encode a signed 64-bit value into an unsigned one.
pub fn encode_zigzag64(n: i64) -> u64
{
    ((n << 1) ^ (n >> 63)) as u64
}

/// Invert [`encode_zigzag64`].
pub fn decode_zigzag64(n: u64) -> i64
{
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Error raised while decoding wire-format data.
///
/// None of these are recoverable: once a parse fails, the input position is
/// undefined and the caller must not keep reading.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum WireError
{
    /// A varint ran past its maximum length without terminating.
    #[snafu(display("CodedInput encountered a malformed varint."))]
    MalformedVarint,

    /// The input ended in the middle of a field.
    #[snafu(display(
        "While parsing a protocol message, the input ended unexpectedly in the middle of a \
         field.  This could mean either that the input has been truncated or that an embedded \
         message misreported its own length."
    ))]
    TruncatedMessage,

    /// A length prefix did not fit a 32-bit signed size.
    #[snafu(display(
        "CodedInput encountered an embedded string or message which claimed to have negative \
         size."
    ))]
    NegativeSize,

    /// A tag with field number zero was read.
    #[snafu(display("Protocol message contained an invalid tag (zero)."))]
    InvalidTag,

    /// A group terminated with the wrong end-group tag.
    #[snafu(display("Protocol message end-group tag did not match expected tag."))]
    InvalidEndTag,

    /// Nested messages or groups exceeded the recursion limit.
    #[snafu(display(
        "Protocol message had too many levels of nesting.  May be malicious.  Use \
         CodedInput::set_recursion_limit to increase the depth limit."
    ))]
    RecursionLimitExceeded,

    /// More bytes were consumed than the configured size limit allows.
    #[snafu(display(
        "Protocol message was too large.  May be malicious.  Use CodedInput::set_size_limit \
         to increase the size limit."
    ))]
    SizeLimitExceeded,

    /// A validating parse finished with required fields absent.
    #[snafu(display("Message missing required fields: {}", fields))]
    Uninitialized
    {
        /// Comma-joined dotted paths of every missing required field.
        fields: String,
    },
}

#[cfg(test)]
mod test
{
    use super::*;

    #[test]
    fn tag_composition()
    {
        assert_eq!(make_tag(1, WireType::Varint), 0x08);
        assert_eq!(make_tag(1, WireType::LengthDelimited), 0x0a);
        assert_eq!(tag_field_number(0x0a), 1);
        assert_eq!(tag_wire_type(0x0a), Some(WireType::LengthDelimited));
        assert_eq!(tag_wire_type(0x0e), None);
        assert_eq!(tag_wire_type(0x0f), None);
    }

    #[test]
    fn zigzag_extremes()
    {
        for &v in &[0i32, -1, 1, i32::MIN, i32::MAX] {
            assert_eq!(decode_zigzag32(encode_zigzag32(v)), v);
        }
        for &v in &[0i64, -1, 1, i64::MIN, i64::MAX] {
            assert_eq!(decode_zigzag64(encode_zigzag64(v)), v);
        }
        assert_eq!(encode_zigzag32(0), 0);
        assert_eq!(encode_zigzag32(-1), 1);
        assert_eq!(encode_zigzag32(1), 2);
        assert_eq!(encode_zigzag32(i32::MIN), u32::MAX);
    }
}
