//! Flat schema representation.
//!
//! These types mirror the subset of `descriptor.proto` the runtime consumes.
//! A schema arrives either assembled programmatically or parsed from the
//! serialized form emitted by a standard protobuf toolchain; the hand-written
//! `parse_from` implementations below read that serialized form with the
//! crate's own wire codec, keyed by the fixed field numbers of
//! `descriptor.proto`. Fields outside the consumed subset are skipped.

use crate::wire::{tag_field_number, tag_wire_type, CodedInput, WireError, WireType};

/// Field cardinality as declared in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel
{
    /// The field appears zero or one times.
    Optional,

    /// The field must appear exactly once.
    Required,

    /// The field appears zero or more times.
    Repeated,
}

impl Default for FieldLabel
{
    fn default() -> Self
    {
        FieldLabel::Optional
    }
}

impl FieldLabel
{
    fn from_number(n: i32) -> Option<FieldLabel>
    {
        Some(match n {
            1 => FieldLabel::Optional,
            2 => FieldLabel::Required,
            3 => FieldLabel::Repeated,
            _ => return None,
        })
    }
}

/// Declared field type, in `descriptor.proto` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoType
{
    /// `double`
    Double = 1,
    /// `float`
    Float = 2,
    /// `int64`
    Int64 = 3,
    /// `uint64`
    Uint64 = 4,
    /// `int32`
    Int32 = 5,
    /// `fixed64`
    Fixed64 = 6,
    /// `fixed32`
    Fixed32 = 7,
    /// `bool`
    Bool = 8,
    /// `string`
    String = 9,
    /// A proto2 group.
    Group = 10,
    /// A message type; `type_name` carries the reference.
    Message = 11,
    /// `bytes`
    Bytes = 12,
    /// `uint32`
    Uint32 = 13,
    /// An enum type; `type_name` carries the reference.
    Enum = 14,
    /// `sfixed32`
    Sfixed32 = 15,
    /// `sfixed64`
    Sfixed64 = 16,
    /// `sint32`
    Sint32 = 17,
    /// `sint64`
    Sint64 = 18,
}

impl ProtoType
{
    fn from_number(n: i32) -> Option<ProtoType>
    {
        Some(match n {
            1 => ProtoType::Double,
            2 => ProtoType::Float,
            3 => ProtoType::Int64,
            4 => ProtoType::Uint64,
            5 => ProtoType::Int32,
            6 => ProtoType::Fixed64,
            7 => ProtoType::Fixed32,
            8 => ProtoType::Bool,
            9 => ProtoType::String,
            10 => ProtoType::Group,
            11 => ProtoType::Message,
            12 => ProtoType::Bytes,
            13 => ProtoType::Uint32,
            14 => ProtoType::Enum,
            15 => ProtoType::Sfixed32,
            16 => ProtoType::Sfixed64,
            17 => ProtoType::Sint32,
            18 => ProtoType::Sint64,
            _ => return None,
        })
    }
}

/// Flat representation of a whole schema file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileDescriptorProto
{
    /// File name, e.g. `my/package/file.proto`.
    pub name: String,

    /// Dot-separated package, empty for the anonymous package.
    pub package: String,

    /// Names of the files this file depends on, in declaration order.
    pub dependency: Vec<String>,

    /// Top-level message types.
    pub message_type: Vec<DescriptorProto>,

    /// Top-level enum types.
    pub enum_type: Vec<EnumDescriptorProto>,

    /// Services.
    pub service: Vec<ServiceDescriptorProto>,

    /// Top-level extension fields.
    pub extension: Vec<FieldDescriptorProto>,
}

/// Flat representation of a message type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DescriptorProto
{
    /// Simple name.
    pub name: String,

    /// Declared fields, in declaration order.
    pub field: Vec<FieldDescriptorProto>,

    /// Nested message types.
    pub nested_type: Vec<DescriptorProto>,

    /// Nested enum types.
    pub enum_type: Vec<EnumDescriptorProto>,

    /// Extension number ranges this message reserves.
    pub extension_range: Vec<ExtensionRange>,

    /// Extension fields declared inside this message.
    pub extension: Vec<FieldDescriptorProto>,

    /// Message options.
    pub options: MessageOptions,
}

/// A half-open extension number range `[start, end)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionRange
{
    /// First number in the range.
    pub start: i32,

    /// One past the last number in the range.
    pub end: i32,
}

/// Flat representation of a field or extension.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldDescriptorProto
{
    /// Simple name.
    pub name: String,

    /// Field number.
    pub number: i32,

    /// Cardinality.
    pub label: FieldLabel,

    /// Declared type. May be absent when only `type_name` is known; the kind
    /// is then determined during linking.
    pub proto_type: Option<ProtoType>,

    /// Reference to a message or enum type, empty for scalars. A leading dot
    /// makes the reference absolute.
    pub type_name: String,

    /// For extensions, the message type being extended.
    pub extendee: String,

    /// Textual default value, if one was declared.
    pub default_value: Option<String>,

    /// The `packed` field option.
    pub packed: bool,
}

/// Flat representation of an enum type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnumDescriptorProto
{
    /// Simple name.
    pub name: String,

    /// Declared values, in declaration order.
    pub value: Vec<EnumValueDescriptorProto>,
}

/// Flat representation of one enum value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnumValueDescriptorProto
{
    /// Value name.
    pub name: String,

    /// Value number.
    pub number: i32,
}

/// Flat representation of a service.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ServiceDescriptorProto
{
    /// Simple name.
    pub name: String,

    /// Declared rpc methods.
    pub method: Vec<MethodDescriptorProto>,
}

/// Flat representation of one rpc method.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MethodDescriptorProto
{
    /// Method name.
    pub name: String,

    /// Input message type reference.
    pub input_type: String,

    /// Output message type reference.
    pub output_type: String,
}

/// The subset of message options the runtime interprets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MessageOptions
{
    /// Marks the message as a message-set container: no ordinary fields,
    /// only extension ranges.
    pub message_set_wire_format: bool,
}

impl FileDescriptorProto
{
    /// Create an empty file proto with the given name.
    pub fn new(name: &str) -> Self
    {
        FileDescriptorProto {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Parse a serialized `FileDescriptorProto`.
    pub fn parse_from(data: &[u8]) -> Result<Self, WireError>
    {
        let mut input = CodedInput::new(data);
        let mut proto = FileDescriptorProto::default();
        proto.merge_from(&mut input)?;
        Ok(proto)
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::LengthDelimited)) => self.name = input.read_string()?,
                (2, Some(WireType::LengthDelimited)) => self.package = input.read_string()?,
                (3, Some(WireType::LengthDelimited)) => {
                    self.dependency.push(input.read_string()?)
                }
                (4, Some(WireType::LengthDelimited)) => {
                    let mut nested = DescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.message_type.push(nested);
                }
                (5, Some(WireType::LengthDelimited)) => {
                    let mut nested = EnumDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.enum_type.push(nested);
                }
                (6, Some(WireType::LengthDelimited)) => {
                    let mut nested = ServiceDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.service.push(nested);
                }
                (7, Some(WireType::LengthDelimited)) => {
                    let mut nested = FieldDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.extension.push(nested);
                }
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl DescriptorProto
{
    /// Create an empty message proto with the given name.
    pub fn new(name: &str) -> Self
    {
        DescriptorProto {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::LengthDelimited)) => self.name = input.read_string()?,
                (2, Some(WireType::LengthDelimited)) => {
                    let mut nested = FieldDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.field.push(nested);
                }
                (3, Some(WireType::LengthDelimited)) => {
                    let mut nested = DescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.nested_type.push(nested);
                }
                (4, Some(WireType::LengthDelimited)) => {
                    let mut nested = EnumDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.enum_type.push(nested);
                }
                (5, Some(WireType::LengthDelimited)) => {
                    let mut range = ExtensionRange::default();
                    read_nested(input, |input| range.merge_from(input))?;
                    self.extension_range.push(range);
                }
                (6, Some(WireType::LengthDelimited)) => {
                    let mut nested = FieldDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.extension.push(nested);
                }
                (7, Some(WireType::LengthDelimited)) => {
                    let mut options = MessageOptions::default();
                    read_nested(input, |input| options.merge_from(input))?;
                    self.options = options;
                }
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl ExtensionRange
{
    /// Create a half-open range `[start, end)`.
    pub fn new(start: i32, end: i32) -> Self
    {
        ExtensionRange { start, end }
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::Varint)) => self.start = input.read_int32()?,
                (2, Some(WireType::Varint)) => self.end = input.read_int32()?,
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl FieldDescriptorProto
{
    /// Create a scalar field.
    pub fn scalar(name: &str, number: i32, label: FieldLabel, proto_type: ProtoType) -> Self
    {
        FieldDescriptorProto {
            name: name.to_string(),
            number,
            label,
            proto_type: Some(proto_type),
            ..Default::default()
        }
    }

    /// Create a message-typed field referencing `type_name`.
    pub fn message(name: &str, number: i32, label: FieldLabel, type_name: &str) -> Self
    {
        FieldDescriptorProto {
            name: name.to_string(),
            number,
            label,
            proto_type: Some(ProtoType::Message),
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    /// Create an enum-typed field referencing `type_name`.
    pub fn enumeration(name: &str, number: i32, label: FieldLabel, type_name: &str) -> Self
    {
        FieldDescriptorProto {
            name: name.to_string(),
            number,
            label,
            proto_type: Some(ProtoType::Enum),
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    /// Create an extension of `extendee`.
    pub fn extension(
        name: &str,
        number: i32,
        label: FieldLabel,
        proto_type: ProtoType,
        type_name: &str,
        extendee: &str,
    ) -> Self
    {
        FieldDescriptorProto {
            name: name.to_string(),
            number,
            label,
            proto_type: Some(proto_type),
            type_name: type_name.to_string(),
            extendee: extendee.to_string(),
            ..Default::default()
        }
    }

    /// Attach a textual default value.
    pub fn with_default(mut self, default_value: &str) -> Self
    {
        self.default_value = Some(default_value.to_string());
        self
    }

    /// Mark the field as packed.
    pub fn with_packed(mut self) -> Self
    {
        self.packed = true;
        self
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::LengthDelimited)) => self.name = input.read_string()?,
                (2, Some(WireType::LengthDelimited)) => self.extendee = input.read_string()?,
                (3, Some(WireType::Varint)) => self.number = input.read_int32()?,
                (4, Some(WireType::Varint)) => {
                    // Unrecognized labels are dropped rather than invented.
                    if let Some(label) = FieldLabel::from_number(input.read_enum()?) {
                        self.label = label;
                    }
                }
                (5, Some(WireType::Varint)) => {
                    self.proto_type = ProtoType::from_number(input.read_enum()?);
                }
                (6, Some(WireType::LengthDelimited)) => self.type_name = input.read_string()?,
                (7, Some(WireType::LengthDelimited)) => {
                    self.default_value = Some(input.read_string()?)
                }
                (8, Some(WireType::LengthDelimited)) => {
                    let mut packed = self.packed;
                    read_nested(input, |input| {
                        // FieldOptions: only `packed` (2) is interpreted.
                        loop {
                            let tag = input.read_tag()?;
                            match (tag_field_number(tag), tag_wire_type(tag)) {
                                (0, _) => return Ok(()),
                                (2, Some(WireType::Varint)) => packed = input.read_bool()?,
                                _ => input.skip_field(tag)?,
                            }
                        }
                    })?;
                    self.packed = packed;
                }
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl EnumDescriptorProto
{
    /// Create an empty enum proto with the given name.
    pub fn new(name: &str) -> Self
    {
        EnumDescriptorProto {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::LengthDelimited)) => self.name = input.read_string()?,
                (2, Some(WireType::LengthDelimited)) => {
                    let mut nested = EnumValueDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.value.push(nested);
                }
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl EnumValueDescriptorProto
{
    /// Create an enum value.
    pub fn new(name: &str, number: i32) -> Self
    {
        EnumValueDescriptorProto {
            name: name.to_string(),
            number,
        }
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::LengthDelimited)) => self.name = input.read_string()?,
                (2, Some(WireType::Varint)) => self.number = input.read_int32()?,
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl ServiceDescriptorProto
{
    /// Create an empty service proto with the given name.
    pub fn new(name: &str) -> Self
    {
        ServiceDescriptorProto {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::LengthDelimited)) => self.name = input.read_string()?,
                (2, Some(WireType::LengthDelimited)) => {
                    let mut nested = MethodDescriptorProto::default();
                    read_nested(input, |input| nested.merge_from(input))?;
                    self.method.push(nested);
                }
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl MethodDescriptorProto
{
    /// Create an rpc method.
    pub fn new(name: &str, input_type: &str, output_type: &str) -> Self
    {
        MethodDescriptorProto {
            name: name.to_string(),
            input_type: input_type.to_string(),
            output_type: output_type.to_string(),
        }
    }

    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::LengthDelimited)) => self.name = input.read_string()?,
                (2, Some(WireType::LengthDelimited)) => {
                    self.input_type = input.read_string()?
                }
                (3, Some(WireType::LengthDelimited)) => {
                    self.output_type = input.read_string()?
                }
                _ => input.skip_field(tag)?,
            }
        }
    }
}

impl MessageOptions
{
    fn merge_from(&mut self, input: &mut CodedInput<'_>) -> Result<(), WireError>
    {
        loop {
            let tag = input.read_tag()?;
            match (tag_field_number(tag), tag_wire_type(tag)) {
                (0, _) => return Ok(()),
                (1, Some(WireType::Varint)) => {
                    self.message_set_wire_format = input.read_bool()?
                }
                _ => input.skip_field(tag)?,
            }
        }
    }
}

/// Read a length-delimited nested message under a pushed limit.
fn read_nested<F>(input: &mut CodedInput<'_>, merge: F) -> Result<(), WireError>
where
    F: FnOnce(&mut CodedInput<'_>) -> Result<(), WireError>,
{
    let len = input.read_length()?;
    let old_limit = input.push_limit(len)?;
    input.increment_recursion_depth()?;
    merge(input)?;
    input.decrement_recursion_depth();
    input.pop_limit(old_limit);
    Ok(())
}

#[cfg(test)]
mod test
{
    use super::*;
    use crate::wire::CodedOutput;

    #[test]
    fn parse_serialized_file()
    {
        // A FileDescriptorProto assembled by hand on the wire:
        //   name: "test.proto", package: "unittest"
        //   message_type { name: "Msg", field { name: "a", number: 1,
        //                                       label: optional, type: int32 } }
        let mut field = CodedOutput::new();
        field.write_string(1, "a");
        field.write_tag(3, WireType::Varint);
        field.write_raw_varint32(1);
        field.write_tag(4, WireType::Varint);
        field.write_raw_varint32(1);
        field.write_tag(5, WireType::Varint);
        field.write_raw_varint32(5);

        let mut message = CodedOutput::new();
        message.write_string(1, "Msg");
        message.write_message_bytes(2, field.as_slice());

        let mut file = CodedOutput::new();
        file.write_string(1, "test.proto");
        file.write_string(2, "unittest");
        file.write_message_bytes(4, message.as_slice());

        let proto = FileDescriptorProto::parse_from(file.as_slice()).unwrap();
        assert_eq!(proto.name, "test.proto");
        assert_eq!(proto.package, "unittest");
        assert_eq!(proto.message_type.len(), 1);
        assert_eq!(proto.message_type[0].name, "Msg");
        assert_eq!(
            proto.message_type[0].field[0],
            FieldDescriptorProto::scalar("a", 1, FieldLabel::Optional, ProtoType::Int32),
        );
    }

    #[test]
    fn unknown_fields_are_skipped()
    {
        let mut file = CodedOutput::new();
        file.write_string(1, "test.proto");
        // FileDescriptorProto.syntax (12) is outside the consumed subset.
        file.write_string(12, "proto2");

        let proto = FileDescriptorProto::parse_from(file.as_slice()).unwrap();
        assert_eq!(proto.name, "test.proto");
    }
}
