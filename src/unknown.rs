//! Lossless capture of wire data the current schema does not recognize.
//!
//! Fields whose numbers are not declared by the parsed message type, or whose
//! wire type does not match the declared one, are retained here and re-emitted
//! on serialization. Occurrences are grouped per field number (numbers in
//! first-seen order, values within a number in arrival order per wire shape),
//! so input whose occurrences of one number are contiguous round-trips byte
//! for byte. This is what keeps messages forward compatible across schema
//! evolution: wrong-typed data behaves exactly like unknown data, never like
//! an error.

use crate::byte_string::ByteString;
use crate::wire::{
    make_tag, tag_field_number, tag_wire_type, CodedInput, CodedOutput, WireError, WireType,
};

/// The accumulated values of one unknown field number, partitioned by wire
/// shape.
///
/// A field number may legitimately occur several times on the wire, and even
/// with different wire types across occurrences; every occurrence is kept.
/// Equality is structural over all the lists.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnknownField
{
    /// Values seen with the varint wire type.
    pub varints: Vec<u64>,

    /// Values seen with the fixed32 wire type.
    pub fixed32s: Vec<u32>,

    /// Values seen with the fixed64 wire type.
    pub fixed64s: Vec<u64>,

    /// Values seen as length-delimited blobs.
    pub length_delimited: Vec<ByteString>,

    /// Nested groups.
    pub groups: Vec<UnknownFieldSet>,
}

impl UnknownField
{
    fn merge_from(&mut self, other: &UnknownField)
    {
        self.varints.extend_from_slice(&other.varints);
        self.fixed32s.extend_from_slice(&other.fixed32s);
        self.fixed64s.extend_from_slice(&other.fixed64s);
        self.length_delimited
            .extend(other.length_delimited.iter().cloned());
        self.groups.extend(other.groups.iter().cloned());
    }

    fn write_to(&self, field_number: u32, output: &mut CodedOutput)
    {
        for &v in &self.varints {
            output.write_tag(field_number, WireType::Varint);
            output.write_raw_varint64(v);
        }
        for &v in &self.fixed32s {
            output.write_tag(field_number, WireType::Fixed32);
            output.write_raw_little_endian32(v);
        }
        for &v in &self.fixed64s {
            output.write_tag(field_number, WireType::Fixed64);
            output.write_raw_little_endian64(v);
        }
        for v in &self.length_delimited {
            output.write_bytes(field_number, v);
        }
        for group in &self.groups {
            output.write_tag(field_number, WireType::StartGroup);
            group.write_to(output);
            output.write_tag(field_number, WireType::EndGroup);
        }
    }
}

/// An ordered mapping from field number to [`UnknownField`].
///
/// Iteration order is insertion order: on re-serialization field numbers are
/// written in the order they were first encountered, which makes an
/// unknown-only round trip reproduce the original bytes exactly.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnknownFieldSet
{
    fields: Vec<(u32, UnknownField)>,
}

impl UnknownFieldSet
{
    /// Create an empty set.
    pub fn new() -> Self
    {
        UnknownFieldSet { fields: vec![] }
    }

    /// True if no unknown fields have been captured.
    pub fn is_empty(&self) -> bool
    {
        self.fields.is_empty()
    }

    /// Number of distinct field numbers in the set.
    pub fn len(&self) -> usize
    {
        self.fields.len()
    }

    /// Get the values captured for a field number.
    pub fn get(&self, field_number: u32) -> Option<&UnknownField>
    {
        self.fields
            .iter()
            .find(|(number, _)| *number == field_number)
            .map(|(_, field)| field)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &UnknownField)>
    {
        self.fields.iter().map(|(number, field)| (*number, field))
    }

    /// Record a varint value directly. Used for enum values the schema does
    /// not recognize.
    pub(crate) fn add_varint(&mut self, field_number: u32, value: u64)
    {
        self.field_mut(field_number).varints.push(value);
    }

    fn field_mut(&mut self, field_number: u32) -> &mut UnknownField
    {
        if let Some(idx) = self
            .fields
            .iter()
            .position(|(number, _)| *number == field_number)
        {
            return &mut self.fields[idx].1;
        }
        self.fields.push((field_number, UnknownField::default()));
        &mut self.fields.last_mut().unwrap().1
    }

    /// Capture one wire occurrence of a field, dispatching on the tag's wire
    /// type.
    ///
    /// Returns `false` when `tag` is an end-group tag, meaning the caller's
    /// group (or message-set scope) has ended and nothing was captured.
    pub fn merge_field_from(
        &mut self,
        tag: u32,
        input: &mut CodedInput<'_>,
    ) -> Result<bool, WireError>
    {
        let field_number = tag_field_number(tag);
        match tag_wire_type(tag) {
            Some(WireType::Varint) => {
                let value = input.read_raw_varint64()?;
                self.field_mut(field_number).varints.push(value);
            }
            Some(WireType::Fixed32) => {
                let value = input.read_fixed32()?;
                self.field_mut(field_number).fixed32s.push(value);
            }
            Some(WireType::Fixed64) => {
                let value = input.read_fixed64()?;
                self.field_mut(field_number).fixed64s.push(value);
            }
            Some(WireType::LengthDelimited) => {
                let value = input.read_bytes()?;
                self.field_mut(field_number).length_delimited.push(value);
            }
            Some(WireType::StartGroup) => {
                input.increment_recursion_depth()?;
                let mut group = UnknownFieldSet::new();
                group.merge_from_input(input)?;
                input.decrement_recursion_depth();
                input.check_last_tag_was(make_tag(field_number, WireType::EndGroup))?;
                self.field_mut(field_number).groups.push(group);
            }
            Some(WireType::EndGroup) => return Ok(false),
            None => return Err(WireError::InvalidTag),
        }
        Ok(true)
    }

    /// Capture every remaining field from the input.
    ///
    /// Stops at end of input or at an end-group tag, leaving that tag as the
    /// input's last tag.
    pub fn merge_from_input(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            if tag == 0 || !self.merge_field_from(tag, input)? {
                return Ok(());
            }
        }
    }

    /// Parse a whole message as if none of its fields were known.
    pub fn parse_from(data: &[u8]) -> Result<UnknownFieldSet, WireError>
    {
        let mut input = CodedInput::new(data);
        let mut set = UnknownFieldSet::new();
        set.merge_from_input(&mut input)?;
        Ok(set)
    }

    /// Union another set into this one.
    ///
    /// Per-field value lists are appended, not replaced, so both sides'
    /// occurrences survive in left-then-right order.
    pub fn merge_from(&mut self, other: &UnknownFieldSet)
    {
        for (number, field) in other.iter() {
            self.field_mut(number).merge_from(field);
        }
    }

    /// Re-emit every captured value in the wire type it was stored as.
    pub fn write_to(&self, output: &mut CodedOutput)
    {
        for (number, field) in self.iter() {
            field.write_to(number, output);
        }
    }

    /// Serialize the set on its own.
    pub fn encode(&self) -> Vec<u8>
    {
        let mut output = CodedOutput::new();
        self.write_to(&mut output);
        output.into_vec()
    }
}

#[cfg(test)]
mod test
{
    use super::*;

    #[test]
    fn roundtrip_preserves_bytes()
    {
        // Both field 1 occurrences are contiguous, so grouping by number
        // reproduces the input exactly.
        let mut output = CodedOutput::new();
        output.write_tag(1, WireType::Varint);
        output.write_raw_varint64(150);
        output.write_tag(1, WireType::Varint);
        output.write_raw_varint64(7);
        output.write_string(2, "testing");
        output.write_tag(3, WireType::Fixed32);
        output.write_raw_little_endian32(0xdeadbeef);
        let data = output.into_vec();

        let set = UnknownFieldSet::parse_from(&data).unwrap();
        assert_eq!(set.get(1).unwrap().varints, vec![150, 7]);
        assert_eq!(set.encode(), data);
    }

    #[test]
    fn interleaved_occurrences_serialize_grouped()
    {
        // Field 1 varint, field 2 string, field 1 again: the values survive,
        // but serialization gathers all of field 1 together.
        let mut input = CodedOutput::new();
        input.write_tag(1, WireType::Varint);
        input.write_raw_varint64(150);
        input.write_string(2, "testing");
        input.write_tag(1, WireType::Varint);
        input.write_raw_varint64(7);

        let set = UnknownFieldSet::parse_from(input.as_slice()).unwrap();
        assert_eq!(set.get(1).unwrap().varints, vec![150, 7]);

        let mut expected = CodedOutput::new();
        expected.write_tag(1, WireType::Varint);
        expected.write_raw_varint64(150);
        expected.write_tag(1, WireType::Varint);
        expected.write_raw_varint64(7);
        expected.write_string(2, "testing");
        assert_eq!(set.encode(), expected.into_vec());
    }

    #[test]
    fn group_capture()
    {
        let mut output = CodedOutput::new();
        output.write_tag(4, WireType::StartGroup);
        output.write_tag(1, WireType::Varint);
        output.write_raw_varint64(42);
        output.write_tag(4, WireType::EndGroup);
        let data = output.into_vec();

        let set = UnknownFieldSet::parse_from(&data).unwrap();
        let group = &set.get(4).unwrap().groups[0];
        assert_eq!(group.get(1).unwrap().varints, vec![42]);
        assert_eq!(set.encode(), data);
    }

    #[test]
    fn mismatched_end_group_tag()
    {
        let mut output = CodedOutput::new();
        output.write_tag(4, WireType::StartGroup);
        output.write_tag(5, WireType::EndGroup);
        let data = output.into_vec();

        assert_eq!(
            UnknownFieldSet::parse_from(&data).unwrap_err(),
            WireError::InvalidEndTag
        );
    }

    #[test]
    fn merge_appends_left_then_right()
    {
        let mut a = UnknownFieldSet::new();
        a.field_mut(1).varints.push(1);
        let mut b = UnknownFieldSet::new();
        b.field_mut(1).varints.push(2);
        b.field_mut(2).fixed64s.push(3);

        a.merge_from(&b);
        assert_eq!(a.get(1).unwrap().varints, vec![1, 2]);
        assert_eq!(a.get(2).unwrap().fixed64s, vec![3]);
    }
}
