use crate::byte_string::ByteString;
use crate::wire::{
    decode_zigzag32, decode_zigzag64, make_tag, tag_field_number, tag_wire_type, WireError,
    WireType,
};

/// Default recursion depth limit for nested messages and groups.
pub const DEFAULT_RECURSION_LIMIT: u32 = 64;

/// Default total-size limit, 64 MiB.
pub const DEFAULT_SIZE_LIMIT: usize = 64 << 20;

/// Reader for wire-format data.
///
/// Tracks the current position, a strictly nesting byte-limit stack for
/// length-delimited sub-messages, a recursion depth counter and a total-size
/// counter. All read methods consume from the front of the remaining input.
pub struct CodedInput<'a>
{
    buf: &'a [u8],
    pos: usize,

    /// Absolute position past which reads must not go. `buf.len()` when no
    /// limit is pushed.
    current_limit: usize,

    recursion_depth: u32,
    recursion_limit: u32,

    size_limit: usize,
    size_base: usize,

    last_tag: u32,
}

impl<'a> CodedInput<'a>
{
    /// Create an input reading the given bytes.
    pub fn new(buf: &'a [u8]) -> Self
    {
        CodedInput {
            buf,
            pos: 0,
            current_limit: buf.len(),
            recursion_depth: 0,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            size_limit: DEFAULT_SIZE_LIMIT,
            size_base: 0,
            last_tag: 0,
        }
    }

    /// Set the maximum nesting depth for embedded messages and groups.
    pub fn set_recursion_limit(&mut self, limit: u32)
    {
        self.recursion_limit = limit;
    }

    /// Set the maximum number of bytes this input will read in total.
    pub fn set_size_limit(&mut self, limit: usize)
    {
        self.size_limit = limit;
    }

    /// Reset the total-size counter.
    ///
    /// Useful when reading many delimited messages from one buffer without
    /// hitting the total-size limit.
    pub fn reset_size_counter(&mut self)
    {
        self.size_base = self.pos;
    }

    /// Current position within the underlying buffer.
    pub fn position(&self) -> usize
    {
        self.pos
    }

    /// True once the current limit (or the end of input) has been reached.
    pub fn is_at_end(&self) -> bool
    {
        self.pos >= self.current_limit
    }

    /// The last tag returned by [`CodedInput::read_tag`].
    pub fn last_tag(&self) -> u32
    {
        self.last_tag
    }

    fn read_raw_byte(&mut self) -> Result<u8, WireError>
    {
        if self.pos >= self.current_limit {
            return Err(WireError::TruncatedMessage);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        if self.pos - self.size_base > self.size_limit {
            return Err(WireError::SizeLimitExceeded);
        }
        Ok(b)
    }

    /// Read exactly `len` raw bytes.
    pub fn read_raw_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError>
    {
        if len > self.current_limit - self.pos {
            return Err(WireError::TruncatedMessage);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        if self.pos - self.size_base > self.size_limit {
            return Err(WireError::SizeLimitExceeded);
        }
        Ok(slice)
    }

    /// Read an unsigned base-128 varint of at most 64 payload bits.
    ///
    /// The encoding allows at most 10 bytes; a tenth byte with its
    /// continuation bit set is a malformed varint.
    pub fn read_raw_varint64(&mut self) -> Result<u64, WireError>
    {
        let mut result = 0u64;
        for i in 0..10 {
            let b = self.read_raw_byte()?;
            result |= u64::from(b & 0x7f) << (i * 7);
            if b & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(WireError::MalformedVarint)
    }

    /// Read a varint, truncating the result to 32 bits.
    pub fn read_raw_varint32(&mut self) -> Result<u32, WireError>
    {
        self.read_raw_varint64().map(|v| v as u32)
    }

    /// Read the next field tag.
    ///
    /// Returns 0 when the current limit has been reached, signalling the end
    /// of the message. A decoded tag with a zero field number is an error.
    pub fn read_tag(&mut self) -> Result<u32, WireError>
    {
        if self.is_at_end() {
            self.last_tag = 0;
            return Ok(0);
        }

        let tag = self.read_raw_varint32()?;
        if tag_field_number(tag) == 0 {
            return Err(WireError::InvalidTag);
        }
        self.last_tag = tag;
        Ok(tag)
    }

    /// Verify that the last read tag equals `tag`.
    ///
    /// Used after group parsing to ensure the matching end-group tag was the
    /// terminator.
    pub fn check_last_tag_was(&self, tag: u32) -> Result<(), WireError>
    {
        if self.last_tag != tag {
            return Err(WireError::InvalidEndTag);
        }
        Ok(())
    }

    /// Read an `int32` value.
    pub fn read_int32(&mut self) -> Result<i32, WireError>
    {
        self.read_raw_varint64().map(|v| v as i32)
    }

    /// Read an `int64` value.
    pub fn read_int64(&mut self) -> Result<i64, WireError>
    {
        self.read_raw_varint64().map(|v| v as i64)
    }

    /// Read a `uint32` value.
    pub fn read_uint32(&mut self) -> Result<u32, WireError>
    {
        self.read_raw_varint32()
    }

    /// Read a `uint64` value.
    pub fn read_uint64(&mut self) -> Result<u64, WireError>
    {
        self.read_raw_varint64()
    }

    /// Read a zigzag-encoded `sint32` value.
    pub fn read_sint32(&mut self) -> Result<i32, WireError>
    {
        self.read_raw_varint32().map(decode_zigzag32)
    }

    /// Read a zigzag-encoded `sint64` value.
    pub fn read_sint64(&mut self) -> Result<i64, WireError>
    {
        self.read_raw_varint64().map(decode_zigzag64)
    }

    /// Read a `bool` value.
    pub fn read_bool(&mut self) -> Result<bool, WireError>
    {
        self.read_raw_varint64().map(|v| v != 0)
    }

    /// Read an enum value as its raw number.
    pub fn read_enum(&mut self) -> Result<i32, WireError>
    {
        self.read_int32()
    }

    /// Read a little-endian `fixed32` value.
    pub fn read_fixed32(&mut self) -> Result<u32, WireError>
    {
        let bytes = self.read_raw_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian `fixed64` value.
    pub fn read_fixed64(&mut self) -> Result<u64, WireError>
    {
        let bytes = self.read_raw_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read an `sfixed32` value.
    pub fn read_sfixed32(&mut self) -> Result<i32, WireError>
    {
        self.read_fixed32().map(|v| v as i32)
    }

    /// Read an `sfixed64` value.
    pub fn read_sfixed64(&mut self) -> Result<i64, WireError>
    {
        self.read_fixed64().map(|v| v as i64)
    }

    /// Read a `float` value.
    pub fn read_float(&mut self) -> Result<f32, WireError>
    {
        self.read_fixed32().map(f32::from_bits)
    }

    /// Read a `double` value.
    pub fn read_double(&mut self) -> Result<f64, WireError>
    {
        self.read_fixed64().map(f64::from_bits)
    }

    /// Read a length prefix for a length-delimited value.
    ///
    /// Declared lengths that do not fit a 32-bit signed size are rejected.
    pub fn read_length(&mut self) -> Result<usize, WireError>
    {
        let raw = self.read_raw_varint64()? as i32;
        if raw < 0 {
            return Err(WireError::NegativeSize);
        }
        Ok(raw as usize)
    }

    /// Read a length-delimited byte field.
    pub fn read_bytes(&mut self) -> Result<ByteString, WireError>
    {
        let len = self.read_length()?;
        let bytes = self.read_raw_bytes(len)?;
        Ok(ByteString::copy_from(bytes))
    }

    /// Read a length-delimited string field.
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD rather than rejected.
    pub fn read_string(&mut self) -> Result<String, WireError>
    {
        let len = self.read_length()?;
        let bytes = self.read_raw_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Push a byte limit for a length-delimited sub-message.
    ///
    /// The current position plus `len` becomes the new limit; reads past it
    /// fail as truncation. Returns the previous limit, which must be handed
    /// back to [`CodedInput::pop_limit`]. Limits nest strictly: a declared
    /// length that exceeds the remaining pushed limit fails immediately.
    pub fn push_limit(&mut self, len: usize) -> Result<usize, WireError>
    {
        let new_limit = self.pos.checked_add(len).ok_or(WireError::TruncatedMessage)?;
        if new_limit > self.current_limit {
            return Err(WireError::TruncatedMessage);
        }
        let old_limit = self.current_limit;
        self.current_limit = new_limit;
        Ok(old_limit)
    }

    /// Restore the limit previously returned by [`CodedInput::push_limit`].
    pub fn pop_limit(&mut self, old_limit: usize)
    {
        self.current_limit = old_limit;
    }

    /// Enter one level of message/group nesting.
    pub fn increment_recursion_depth(&mut self) -> Result<(), WireError>
    {
        if self.recursion_depth >= self.recursion_limit {
            return Err(WireError::RecursionLimitExceeded);
        }
        self.recursion_depth += 1;
        Ok(())
    }

    /// Leave one level of message/group nesting.
    pub fn decrement_recursion_depth(&mut self)
    {
        self.recursion_depth -= 1;
    }

    /// Skip over the value implied by `tag`, consuming exactly its bytes.
    pub fn skip_field(&mut self, tag: u32) -> Result<(), WireError>
    {
        match tag_wire_type(tag) {
            Some(WireType::Varint) => {
                self.read_raw_varint64()?;
            }
            Some(WireType::Fixed64) => {
                self.read_raw_bytes(8)?;
            }
            Some(WireType::LengthDelimited) => {
                let len = self.read_length()?;
                self.read_raw_bytes(len)?;
            }
            Some(WireType::StartGroup) => {
                self.increment_recursion_depth()?;
                self.skip_message()?;
                self.decrement_recursion_depth();
                let end_tag = make_tag(tag_field_number(tag), WireType::EndGroup);
                self.check_last_tag_was(end_tag)?;
            }
            Some(WireType::EndGroup) => {}
            Some(WireType::Fixed32) => {
                self.read_raw_bytes(4)?;
            }
            None => return Err(WireError::InvalidTag),
        }
        Ok(())
    }

    /// Skip fields until end of input or a matching end-group tag.
    pub fn skip_message(&mut self) -> Result<(), WireError>
    {
        loop {
            let tag = self.read_tag()?;
            if tag == 0 || tag_wire_type(tag) == Some(WireType::EndGroup) {
                return Ok(());
            }
            self.skip_field(tag)?;
        }
    }
}

#[cfg(test)]
mod test
{
    use super::*;

    #[test]
    fn varint_boundaries()
    {
        let mut input = CodedInput::new(b"\x00");
        assert_eq!(input.read_raw_varint64().unwrap(), 0);

        let mut input = CodedInput::new(b"\xff\xff\xff\xff\xff\xff\xff\xff\xff\x01");
        assert_eq!(input.read_raw_varint64().unwrap(), u64::MAX);

        let mut input = CodedInput::new(b"\xa9\x46");
        assert_eq!(input.read_raw_varint32().unwrap(), 9001);
    }

    #[test]
    fn malformed_varint()
    {
        let mut input = CodedInput::new(&[0x80u8; 11]);
        assert_eq!(
            input.read_raw_varint64().unwrap_err(),
            WireError::MalformedVarint
        );
    }

    #[test]
    fn truncated_varint()
    {
        let mut input = CodedInput::new(b"\x80");
        assert_eq!(
            input.read_raw_varint64().unwrap_err(),
            WireError::TruncatedMessage
        );
    }

    #[test]
    fn limits_nest()
    {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut input = CodedInput::new(&data);
        let outer = input.push_limit(4).unwrap();
        let inner = input.push_limit(2).unwrap();
        assert_eq!(input.read_raw_bytes(2).unwrap(), &[1, 2]);
        assert!(input.is_at_end());
        input.pop_limit(inner);
        assert_eq!(input.read_raw_bytes(2).unwrap(), &[3, 4]);
        input.pop_limit(outer);
        assert_eq!(input.read_raw_bytes(2).unwrap(), &[5, 6]);
    }

    #[test]
    fn limit_exceeding_parent_is_truncation()
    {
        let data = [0u8; 4];
        let mut input = CodedInput::new(&data);
        let _outer = input.push_limit(2).unwrap();
        assert_eq!(input.push_limit(3).unwrap_err(), WireError::TruncatedMessage);
    }

    #[test]
    fn size_limit()
    {
        let data = [0u8; 32];
        let mut input = CodedInput::new(&data);
        input.set_size_limit(16);
        assert!(input.read_raw_bytes(16).is_ok());
        assert_eq!(
            input.read_raw_bytes(1).unwrap_err(),
            WireError::SizeLimitExceeded
        );
    }

    #[test]
    fn size_counter_reset()
    {
        let data = [0u8; 32];
        let mut input = CodedInput::new(&data);
        input.set_size_limit(16);
        assert!(input.read_raw_bytes(16).is_ok());
        input.reset_size_counter();
        assert!(input.read_raw_bytes(16).is_ok());
    }
}
