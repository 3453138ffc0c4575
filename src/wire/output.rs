use crate::byte_string::ByteString;
use crate::wire::{encode_zigzag32, encode_zigzag64, make_tag, WireType};

/// Writer for wire-format data.
///
/// Accumulates bytes into an owned buffer. Nested messages are framed by
/// encoding into a fresh `CodedOutput` and emitting the result as a
/// length-delimited blob.
#[derive(Default)]
pub struct CodedOutput
{
    buf: Vec<u8>,
}

impl CodedOutput
{
    /// Create an empty output.
    pub fn new() -> Self
    {
        CodedOutput { buf: vec![] }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize
    {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool
    {
        self.buf.is_empty()
    }

    /// Borrow the written bytes.
    pub fn as_slice(&self) -> &[u8]
    {
        &self.buf
    }

    /// Consume the output, returning the written bytes.
    pub fn into_vec(self) -> Vec<u8>
    {
        self.buf
    }

    /// Write a single raw byte.
    pub fn write_raw_byte(&mut self, b: u8)
    {
        self.buf.push(b);
    }

    /// Write raw bytes verbatim.
    pub fn write_raw_bytes(&mut self, bytes: &[u8])
    {
        self.buf.extend_from_slice(bytes);
    }

    /// Write an unsigned base-128 varint.
    pub fn write_raw_varint64(&mut self, mut value: u64)
    {
        loop {
            if value < 0x80 {
                self.buf.push(value as u8);
                return;
            }
            self.buf.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
    }

    /// Write a 32-bit varint.
    pub fn write_raw_varint32(&mut self, value: u32)
    {
        self.write_raw_varint64(u64::from(value));
    }

    /// Write a little-endian 32-bit value.
    pub fn write_raw_little_endian32(&mut self, value: u32)
    {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian 64-bit value.
    pub fn write_raw_little_endian64(&mut self, value: u64)
    {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a field tag.
    pub fn write_tag(&mut self, field_number: u32, wire_type: WireType)
    {
        self.write_raw_varint32(make_tag(field_number, wire_type));
    }

    /// Write a length prefix.
    pub fn write_length(&mut self, len: usize)
    {
        self.write_raw_varint32(len as u32);
    }

    /// Write an `int32` value without a tag.
    ///
    /// Negative values are sign-extended to ten bytes, matching the 64-bit
    /// varint representation every implementation emits for negative int32s.
    pub fn write_int32_no_tag(&mut self, value: i32)
    {
        self.write_raw_varint64(i64::from(value) as u64);
    }

    /// Write an `int64` value without a tag.
    pub fn write_int64_no_tag(&mut self, value: i64)
    {
        self.write_raw_varint64(value as u64);
    }

    /// Write a `uint32` value without a tag.
    pub fn write_uint32_no_tag(&mut self, value: u32)
    {
        self.write_raw_varint32(value);
    }

    /// Write a `uint64` value without a tag.
    pub fn write_uint64_no_tag(&mut self, value: u64)
    {
        self.write_raw_varint64(value);
    }

    /// Write a zigzag-encoded `sint32` value without a tag.
    pub fn write_sint32_no_tag(&mut self, value: i32)
    {
        self.write_raw_varint32(encode_zigzag32(value));
    }

    /// Write a zigzag-encoded `sint64` value without a tag.
    pub fn write_sint64_no_tag(&mut self, value: i64)
    {
        self.write_raw_varint64(encode_zigzag64(value));
    }

    /// Write a `fixed32` value without a tag.
    pub fn write_fixed32_no_tag(&mut self, value: u32)
    {
        self.write_raw_little_endian32(value);
    }

    /// Write a `fixed64` value without a tag.
    pub fn write_fixed64_no_tag(&mut self, value: u64)
    {
        self.write_raw_little_endian64(value);
    }

    /// Write an `sfixed32` value without a tag.
    pub fn write_sfixed32_no_tag(&mut self, value: i32)
    {
        self.write_raw_little_endian32(value as u32);
    }

    /// Write an `sfixed64` value without a tag.
    pub fn write_sfixed64_no_tag(&mut self, value: i64)
    {
        self.write_raw_little_endian64(value as u64);
    }

    /// Write a `float` value without a tag.
    pub fn write_float_no_tag(&mut self, value: f32)
    {
        self.write_raw_little_endian32(value.to_bits());
    }

    /// Write a `double` value without a tag.
    pub fn write_double_no_tag(&mut self, value: f64)
    {
        self.write_raw_little_endian64(value.to_bits());
    }

    /// Write a `bool` value without a tag.
    pub fn write_bool_no_tag(&mut self, value: bool)
    {
        self.buf.push(value as u8);
    }

    /// Write an enum number without a tag.
    pub fn write_enum_no_tag(&mut self, value: i32)
    {
        self.write_int32_no_tag(value);
    }

    /// Write a tagged length-delimited string field.
    pub fn write_string(&mut self, field_number: u32, value: &str)
    {
        self.write_tag(field_number, WireType::LengthDelimited);
        self.write_length(value.len());
        self.write_raw_bytes(value.as_bytes());
    }

    /// Write a tagged length-delimited bytes field.
    pub fn write_bytes(&mut self, field_number: u32, value: &ByteString)
    {
        self.write_tag(field_number, WireType::LengthDelimited);
        self.write_length(value.len());
        self.write_raw_bytes(value.as_slice());
    }

    /// Write pre-encoded message bytes as a tagged length-delimited field.
    pub fn write_message_bytes(&mut self, field_number: u32, encoded: &[u8])
    {
        self.write_tag(field_number, WireType::LengthDelimited);
        self.write_length(encoded.len());
        self.write_raw_bytes(encoded);
    }

    /// Write a whole message framed by a single leading varint length.
    pub fn write_delimited(&mut self, encoded: &[u8])
    {
        self.write_length(encoded.len());
        self.write_raw_bytes(encoded);
    }
}

#[cfg(test)]
mod test
{
    use super::*;
    use crate::wire::CodedInput;

    #[test]
    fn varint_rounds_through_input()
    {
        let values = [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX];
        for &v in &values {
            let mut out = CodedOutput::new();
            out.write_raw_varint64(v);
            let buf = out.into_vec();
            let mut input = CodedInput::new(&buf);
            assert_eq!(input.read_raw_varint64().unwrap(), v);
            assert!(input.is_at_end());
        }
    }

    #[test]
    fn negative_int32_is_ten_bytes()
    {
        let mut out = CodedOutput::new();
        out.write_int32_no_tag(-1);
        assert_eq!(out.len(), 10);
        let buf = out.into_vec();
        let mut input = CodedInput::new(&buf);
        assert_eq!(input.read_int32().unwrap(), -1);
    }

    #[test]
    fn fixed_width_little_endian()
    {
        let mut out = CodedOutput::new();
        out.write_fixed32_no_tag(0x0403_0201);
        assert_eq!(out.as_slice(), &[1, 2, 3, 4]);
    }
}
