//! Generic message reflection.
//!
//! A [`DynamicMessage`] holds field values keyed by field number against a
//! message descriptor, with no generated code involved. Messages are
//! immutable; they are produced either by parsing wire data or by a
//! [`DynamicBuilder`], which validates values against the descriptor as they
//! are set and transfers its storage into the message it builds.

use std::mem;

use snafu::Snafu;

use crate::byte_string::ByteString;
use crate::descriptor::{DescriptorPool, EnumRef, FieldDescriptor, FieldType, MessageRef};
use crate::unknown::UnknownFieldSet;
use crate::wire::{CodedInput, CodedOutput, WireError};

mod encode;
mod field_set;
mod parse;
mod text;

pub use self::field_set::FieldEntry;
use self::field_set::FieldSet;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value
{
    /// Value of a `double` field.
    Double(f64),
    /// Value of a `float` field.
    Float(f32),
    /// Value of an `int32`, `sint32` or `sfixed32` field.
    Int32(i32),
    /// Value of an `int64`, `sint64` or `sfixed64` field.
    Int64(i64),
    /// Value of a `uint32` or `fixed32` field.
    UInt32(u32),
    /// Value of a `uint64` or `fixed64` field.
    UInt64(u64),
    /// Value of a `bool` field.
    Bool(bool),
    /// Value of a `string` field.
    String(String),
    /// Value of a `bytes` field.
    Bytes(ByteString),
    /// Value of an enum field: the enum type and the value number.
    Enum(EnumRef, i32),
    /// Value of a message or group field.
    Message(Box<DynamicMessage>),
}

impl Value
{
    /// True if this value may be stored in a field of the given type.
    ///
    /// Enum and message values additionally require the value's own type
    /// reference to match the field's.
    pub fn is_valid_for(&self, field_type: FieldType) -> bool
    {
        match (self, field_type) {
            (Value::Double(..), FieldType::Double) => true,
            (Value::Float(..), FieldType::Float) => true,
            (
                Value::Int32(..),
                FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32,
            ) => true,
            (
                Value::Int64(..),
                FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64,
            ) => true,
            (Value::UInt32(..), FieldType::UInt32 | FieldType::Fixed32) => true,
            (Value::UInt64(..), FieldType::UInt64 | FieldType::Fixed64) => true,
            (Value::Bool(..), FieldType::Bool) => true,
            (Value::String(..), FieldType::String) => true,
            (Value::Bytes(..), FieldType::Bytes) => true,
            (Value::Enum(enum_ref, _), FieldType::Enum(expected)) => *enum_ref == expected,
            (
                Value::Message(message),
                FieldType::Message(expected) | FieldType::Group(expected),
            ) => message.msg_ref == expected,
            _ => false,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str
    {
        match self {
            Value::Double(..) => "double",
            Value::Float(..) => "float",
            Value::Int32(..) => "int32",
            Value::Int64(..) => "int64",
            Value::UInt32(..) => "uint32",
            Value::UInt64(..) => "uint64",
            Value::Bool(..) => "bool",
            Value::String(..) => "string",
            Value::Bytes(..) => "bytes",
            Value::Enum(..) => "enum",
            Value::Message(..) => "message",
        }
    }
}

/// Error reported by the reflection layer.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ReflectError
{
    /// A value did not match the field's declared type.
    #[snafu(display(
        "Wrong value type for field \"{}\": expected {}, got {}.",
        field, expected, actual
    ))]
    ValueTypeMismatch
    {
        /// Full name of the field.
        field: String,

        /// The field's declared type.
        expected: &'static str,

        /// Kind of the rejected value.
        actual: &'static str,
    },

    /// A repeated-field operation was applied to a singular field.
    #[snafu(display("Field \"{}\" is not a repeated field.", field))]
    NotRepeated
    {
        /// Full name of the field.
        field: String,
    },

    /// A singular-field operation was applied to a repeated field.
    #[snafu(display("Field \"{}\" is not a singular field.", field))]
    NotSingular
    {
        /// Full name of the field.
        field: String,
    },

    /// A repeated-field index was past the end.
    #[snafu(display(
        "Index {} out of range for field \"{}\" of length {}.",
        index, field, len
    ))]
    IndexOutOfRange
    {
        /// Full name of the field.
        field: String,

        /// The rejected index.
        index: usize,

        /// Current element count.
        len: usize,
    },

    /// The builder's storage was already transferred by a previous `build`.
    #[snafu(display("build() has already been called on this builder."))]
    AlreadyBuilt,

    /// Merge source and target describe different message types.
    #[snafu(display("Cannot merge messages of different types."))]
    MergeTypeMismatch,

    /// Required fields were missing when building.
    #[snafu(display("Message missing required fields: {}", fields))]
    Uninitialized
    {
        /// Comma-separated dotted paths of the missing fields.
        fields: String,
    },

    /// Wire data fed to the builder could not be decoded.
    #[snafu(display("{}", source))]
    Decode
    {
        /// The underlying wire error.
        source: WireError,
    },
}

/// An immutable message instance described by a [`MessageRef`].
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage
{
    msg_ref: MessageRef,
    fields: FieldSet,
    unknown: UnknownFieldSet,
}

impl DynamicMessage
{
    /// An empty instance of the given message type.
    pub fn empty(msg_ref: MessageRef) -> Self
    {
        DynamicMessage {
            msg_ref,
            fields: FieldSet::new(),
            unknown: UnknownFieldSet::new(),
        }
    }

    pub(crate) fn from_parts(
        msg_ref: MessageRef,
        fields: FieldSet,
        unknown: UnknownFieldSet,
    ) -> Self
    {
        DynamicMessage {
            msg_ref,
            fields,
            unknown,
        }
    }

    /// The message type this instance is described by.
    pub fn msg_ref(&self) -> MessageRef
    {
        self.msg_ref
    }

    /// True if the singular field has an explicit value.
    ///
    /// # Panics
    ///
    /// Will **panic** if the field is repeated; repeated fields have element
    /// counts, not presence.
    pub fn has_field(&self, field: &FieldDescriptor) -> bool
    {
        if field.is_repeated() {
            panic!("has_field called on repeated field {}", field.full_name());
        }
        matches!(self.fields.get(field.number()), Some(FieldEntry::Single(..)))
    }

    /// The value of a singular field, falling back to the field's default
    /// when unset. Unset message fields yield an empty instance.
    ///
    /// # Panics
    ///
    /// Will **panic** if the field is repeated.
    pub fn get(&self, field: &FieldDescriptor) -> Value
    {
        if field.is_repeated() {
            panic!("get called on repeated field {}", field.full_name());
        }
        match self.fields.get(field.number()) {
            Some(FieldEntry::Single(value)) => value.clone(),
            Some(FieldEntry::Repeated(..)) => unreachable!(),
            None => match field.default_value() {
                Some(value) => value.clone(),
                None => match field.field_type() {
                    FieldType::Message(target) | FieldType::Group(target) => {
                        Value::Message(Box::new(DynamicMessage::empty(target)))
                    }
                    _ => unreachable!("non-message fields carry a default"),
                },
            },
        }
    }

    /// Number of elements in a repeated field.
    ///
    /// # Panics
    ///
    /// Will **panic** if the field is singular.
    pub fn repeated_len(&self, field: &FieldDescriptor) -> usize
    {
        if !field.is_repeated() {
            panic!("repeated_len called on singular field {}", field.full_name());
        }
        match self.fields.get(field.number()) {
            Some(FieldEntry::Repeated(values)) => values.len(),
            Some(FieldEntry::Single(..)) => unreachable!(),
            None => 0,
        }
    }

    /// An element of a repeated field.
    ///
    /// # Panics
    ///
    /// Will **panic** if the field is singular or `index` is past the end.
    pub fn get_repeated(&self, field: &FieldDescriptor, index: usize) -> &Value
    {
        if !field.is_repeated() {
            panic!("get_repeated called on singular field {}", field.full_name());
        }
        match self.fields.get(field.number()) {
            Some(FieldEntry::Repeated(values)) => &values[index],
            _ => panic!(
                "index {} out of range for field {}",
                index,
                field.full_name()
            ),
        }
    }

    /// All fields with explicit values, paired with their descriptors, in
    /// ascending field number order. Extensions are included.
    pub fn all_fields<'a>(
        &'a self,
        pool: &'a DescriptorPool,
    ) -> Vec<(&'a FieldDescriptor, &'a FieldEntry)>
    {
        let message = pool.resolve_message(self.msg_ref);
        self.fields
            .iter()
            .filter_map(move |(&number, entry)| {
                message
                    .field_by_number(number)
                    .or_else(|| pool.find_extension(self.msg_ref, number))
                    .map(|field| (field, entry))
            })
            .collect()
    }

    /// Fields that arrived on the wire without a matching descriptor entry.
    pub fn unknown_fields(&self) -> &UnknownFieldSet
    {
        &self.unknown
    }

    /// True if every required field, transitively, has a value.
    pub fn is_initialized(&self, pool: &DescriptorPool) -> bool
    {
        self.missing_fields(pool).is_empty()
    }

    /// Dotted paths of every missing required field, in declaration order.
    /// Repeated message elements are reported as `name[index].sub`.
    pub fn missing_fields(&self, pool: &DescriptorPool) -> Vec<String>
    {
        let mut missing = Vec::new();
        collect_missing(pool, self.msg_ref, &self.fields, "", &mut missing);
        missing
    }

    /// Parse a message, requiring every required field to be present.
    pub fn parse_from(
        msg_ref: MessageRef,
        data: &[u8],
        pool: &DescriptorPool,
    ) -> Result<Self, WireError>
    {
        let message = Self::parse_partial_from(msg_ref, data, pool)?;
        message.check_initialized(pool)?;
        Ok(message)
    }

    /// Parse a message without checking required fields.
    pub fn parse_partial_from(
        msg_ref: MessageRef,
        data: &[u8],
        pool: &DescriptorPool,
    ) -> Result<Self, WireError>
    {
        let mut input = CodedInput::new(data);
        Self::parse_partial_from_input(msg_ref, &mut input, pool)
    }

    /// Parse a message from an existing input, consuming it to its current
    /// limit. The input's recursion and size limits apply.
    pub fn parse_from_input(
        msg_ref: MessageRef,
        input: &mut CodedInput<'_>,
        pool: &DescriptorPool,
    ) -> Result<Self, WireError>
    {
        let message = Self::parse_partial_from_input(msg_ref, input, pool)?;
        message.check_initialized(pool)?;
        Ok(message)
    }

    /// As [`Self::parse_from_input`] without the required-field check.
    pub fn parse_partial_from_input(
        msg_ref: MessageRef,
        input: &mut CodedInput<'_>,
        pool: &DescriptorPool,
    ) -> Result<Self, WireError>
    {
        let mut fields = FieldSet::new();
        let mut unknown = UnknownFieldSet::new();
        parse::merge_message_fields(&mut fields, &mut unknown, msg_ref, input, pool)?;
        Ok(DynamicMessage::from_parts(msg_ref, fields, unknown))
    }

    /// Read one length-prefixed message from a stream of concatenated
    /// delimited messages. Returns `None` at a clean end of input.
    pub fn parse_delimited_from(
        msg_ref: MessageRef,
        input: &mut CodedInput<'_>,
        pool: &DescriptorPool,
    ) -> Result<Option<Self>, WireError>
    {
        if input.is_at_end() {
            return Ok(None);
        }
        let len = input.read_length()?;
        let old_limit = input.push_limit(len)?;
        let message = Self::parse_from_input(msg_ref, input, pool)?;
        input.pop_limit(old_limit);
        Ok(Some(message))
    }

    fn check_initialized(&self, pool: &DescriptorPool) -> Result<(), WireError>
    {
        let missing = self.missing_fields(pool);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WireError::Uninitialized {
                fields: missing.join(", "),
            })
        }
    }

    /// Serialize into a fresh buffer, fields in ascending number order and
    /// unknown fields appended last.
    pub fn encode(&self, pool: &DescriptorPool) -> Vec<u8>
    {
        let mut output = CodedOutput::new();
        self.write_to(pool, &mut output);
        output.into_vec()
    }

    /// Serialize into an existing output.
    pub fn write_to(&self, pool: &DescriptorPool, output: &mut CodedOutput)
    {
        encode::write_fields(&self.fields, &self.unknown, self.msg_ref, pool, output);
    }

    /// Serialize with a leading varint length prefix.
    pub fn write_delimited_to(&self, pool: &DescriptorPool, output: &mut CodedOutput)
    {
        let mut inner = CodedOutput::new();
        self.write_to(pool, &mut inner);
        output.write_delimited(inner.as_slice());
    }

    /// Render the message in protobuf text format.
    pub fn to_text(&self, pool: &DescriptorPool) -> String
    {
        let mut out = String::new();
        text::print_fields(&self.fields, &self.unknown, self.msg_ref, pool, 0, &mut out);
        out
    }

    /// A builder pre-populated with this message's fields.
    pub fn to_builder(&self) -> DynamicBuilder
    {
        DynamicBuilder {
            msg_ref: self.msg_ref,
            fields: self.fields.clone(),
            unknown: self.unknown.clone(),
            built: false,
        }
    }

    pub(crate) fn merge_with(&mut self, other: &DynamicMessage)
    {
        self.fields.merge_from(&other.fields);
        self.unknown.merge_from(&other.unknown);
    }

    pub(crate) fn fields(&self) -> &FieldSet
    {
        &self.fields
    }
}

/// Mutable accumulator producing [`DynamicMessage`] values.
///
/// `build` transfers the accumulated storage into the produced message and
/// spends the builder; further mutation and repeated `build` calls report
/// [`ReflectError::AlreadyBuilt`].
#[derive(Debug)]
pub struct DynamicBuilder
{
    msg_ref: MessageRef,
    fields: FieldSet,
    unknown: UnknownFieldSet,
    built: bool,
}

impl DynamicBuilder
{
    /// An empty builder for the given message type.
    pub fn new(msg_ref: MessageRef) -> Self
    {
        DynamicBuilder {
            msg_ref,
            fields: FieldSet::new(),
            unknown: UnknownFieldSet::new(),
            built: false,
        }
    }

    /// The message type being built.
    pub fn msg_ref(&self) -> MessageRef
    {
        self.msg_ref
    }

    fn check_not_built(&self) -> Result<(), ReflectError>
    {
        if self.built {
            Err(ReflectError::AlreadyBuilt)
        } else {
            Ok(())
        }
    }

    fn check_value(field: &FieldDescriptor, value: &Value) -> Result<(), ReflectError>
    {
        let field_type = field.field_type();
        if value.is_valid_for(field_type) {
            Ok(())
        } else {
            Err(ReflectError::ValueTypeMismatch {
                field: field.full_name().to_string(),
                expected: field_type.name(),
                actual: value.kind_name(),
            })
        }
    }

    /// Set a singular field.
    pub fn set(
        &mut self,
        field: &FieldDescriptor,
        value: Value,
    ) -> Result<&mut Self, ReflectError>
    {
        self.check_not_built()?;
        if field.is_repeated() {
            return Err(ReflectError::NotSingular {
                field: field.full_name().to_string(),
            });
        }
        Self::check_value(field, &value)?;
        self.fields.set_single(field.number(), value);
        Ok(self)
    }

    /// Append an element to a repeated field.
    pub fn add_repeated(
        &mut self,
        field: &FieldDescriptor,
        value: Value,
    ) -> Result<&mut Self, ReflectError>
    {
        self.check_not_built()?;
        if !field.is_repeated() {
            return Err(ReflectError::NotRepeated {
                field: field.full_name().to_string(),
            });
        }
        Self::check_value(field, &value)?;
        self.fields.push_repeated(field.number(), value);
        Ok(self)
    }

    /// Replace an element of a repeated field.
    pub fn set_repeated(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: Value,
    ) -> Result<&mut Self, ReflectError>
    {
        self.check_not_built()?;
        if !field.is_repeated() {
            return Err(ReflectError::NotRepeated {
                field: field.full_name().to_string(),
            });
        }
        Self::check_value(field, &value)?;
        self.fields
            .set_repeated(field.number(), index, value)
            .map_err(|len| ReflectError::IndexOutOfRange {
                field: field.full_name().to_string(),
                index,
                len,
            })?;
        Ok(self)
    }

    /// Remove any value of the field.
    pub fn clear_field(&mut self, field: &FieldDescriptor) -> Result<&mut Self, ReflectError>
    {
        self.check_not_built()?;
        self.fields.clear(field.number());
        Ok(self)
    }

    /// Merge another message of the same type: singular scalars overwrite,
    /// singular messages merge recursively, repeated elements append.
    pub fn merge_from_message(
        &mut self,
        other: &DynamicMessage,
    ) -> Result<&mut Self, ReflectError>
    {
        self.check_not_built()?;
        if other.msg_ref != self.msg_ref {
            return Err(ReflectError::MergeTypeMismatch);
        }
        self.fields.merge_from(&other.fields);
        self.unknown.merge_from(&other.unknown);
        Ok(self)
    }

    /// Merge serialized wire data into the fields accumulated so far.
    pub fn merge_from_bytes(
        &mut self,
        data: &[u8],
        pool: &DescriptorPool,
    ) -> Result<&mut Self, ReflectError>
    {
        self.check_not_built()?;
        let mut input = CodedInput::new(data);
        parse::merge_message_fields(
            &mut self.fields,
            &mut self.unknown,
            self.msg_ref,
            &mut input,
            pool,
        )
        .map_err(|source| ReflectError::Decode { source })?;
        Ok(self)
    }

    /// Merge unknown fields into the set carried by the built message.
    pub fn merge_unknown_fields(
        &mut self,
        other: &UnknownFieldSet,
    ) -> Result<&mut Self, ReflectError>
    {
        self.check_not_built()?;
        self.unknown.merge_from(other);
        Ok(self)
    }

    /// True if the singular field has an explicit value.
    ///
    /// # Panics
    ///
    /// Will **panic** if the field is repeated.
    pub fn has_field(&self, field: &FieldDescriptor) -> bool
    {
        if field.is_repeated() {
            panic!("has_field called on repeated field {}", field.full_name());
        }
        matches!(self.fields.get(field.number()), Some(FieldEntry::Single(..)))
    }

    /// Number of accumulated elements in a repeated field.
    pub fn repeated_len(&self, field: &FieldDescriptor) -> usize
    {
        match self.fields.get(field.number()) {
            Some(FieldEntry::Repeated(values)) => values.len(),
            _ => 0,
        }
    }

    /// Consume the accumulated storage into a message, requiring every
    /// required field to be present. The builder is spent afterwards.
    pub fn build(&mut self, pool: &DescriptorPool) -> Result<DynamicMessage, ReflectError>
    {
        self.check_not_built()?;
        let mut missing = Vec::new();
        collect_missing(pool, self.msg_ref, &self.fields, "", &mut missing);
        if !missing.is_empty() {
            return Err(ReflectError::Uninitialized {
                fields: missing.join(", "),
            });
        }
        self.built = true;
        Ok(DynamicMessage::from_parts(
            self.msg_ref,
            mem::take(&mut self.fields),
            mem::take(&mut self.unknown),
        ))
    }

    /// Clone the accumulated storage into a message without checking
    /// required fields. The builder remains usable.
    pub fn build_partial(&self) -> DynamicMessage
    {
        DynamicMessage::from_parts(self.msg_ref, self.fields.clone(), self.unknown.clone())
    }
}

/// Walk declared fields in declaration order, collecting dotted paths of
/// missing required fields. Message values are entered only when their type
/// can transitively contain required fields.
fn collect_missing(
    pool: &DescriptorPool,
    msg_ref: MessageRef,
    fields: &FieldSet,
    prefix: &str,
    out: &mut Vec<String>,
)
{
    let message = pool.resolve_message(msg_ref);
    for field in message.fields() {
        let entry = fields.get(field.number());
        if field.is_required() && entry.is_none() {
            out.push(format!("{}{}", prefix, field.name()));
        }
        if let Some(entry) = entry {
            collect_missing_entry(pool, entry, &format!("{}{}", prefix, field.name()), out);
        }
    }
    for (&number, entry) in fields.iter() {
        if message.field_by_number(number).is_some() {
            continue;
        }
        if let Some(extension) = pool.find_extension(msg_ref, number) {
            let path = format!("{}({})", prefix, extension.full_name());
            collect_missing_entry(pool, entry, &path, out);
        }
    }
}

fn collect_missing_entry(
    pool: &DescriptorPool,
    entry: &FieldEntry,
    path: &str,
    out: &mut Vec<String>,
)
{
    match entry {
        FieldEntry::Single(Value::Message(message)) => {
            if pool.resolve_message(message.msg_ref).has_required_fields() {
                collect_missing(
                    pool,
                    message.msg_ref,
                    message.fields(),
                    &format!("{}.", path),
                    out,
                );
            }
        }
        FieldEntry::Repeated(values) => {
            for (index, value) in values.iter().enumerate() {
                if let Value::Message(message) = value {
                    if pool.resolve_message(message.msg_ref).has_required_fields() {
                        collect_missing(
                            pool,
                            message.msg_ref,
                            message.fields(),
                            &format!("{}[{}].", path, index),
                            out,
                        );
                    }
                }
            }
        }
        FieldEntry::Single(..) => {}
    }
}
