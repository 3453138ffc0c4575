//! Runtime descriptor model.
//!
//! A [`FileDescriptor`] is built from a flat [`proto::FileDescriptorProto`]
//! together with the already-built descriptors of its dependencies. Building
//! produces a [`DescriptorPool`] holding every type of the dependency closure
//! with all cross-references resolved.
//!
//! Descriptors reference each other through small `Copy` handles
//! ([`MessageRef`], [`EnumRef`], ...) that index into the pool. The handles
//! are only meaningful together with the pool that produced them; resolving a
//! handle through a different pool is a programming error and panics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use snafu::Snafu;

use crate::dynamic::Value;
use crate::wire::WireType;

mod api;
mod builder;
pub mod proto;

use self::proto::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FieldLabel, FileDescriptorProto,
    MethodDescriptorProto, ServiceDescriptorProto,
};

/// Largest valid field number: tags reserve 3 bits of a 32-bit value for the
/// wire type, leaving 29 bits for the number.
pub const MAX_FIELD_NUMBER: i32 = (1 << 29) - 1;

/// Error building descriptors from a schema.
///
/// The display form leads with the full name of the offending descriptor,
/// followed by a description of the problem.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum DescriptorError
{
    /// A full name occurs more than once in the pool.
    #[snafu(display("{}: \"{}\" is already defined.", name, name))]
    DuplicateName
    {
        /// Full name of the duplicate symbol.
        name: String,
    },

    /// An enum type declares no values.
    #[snafu(display("{}: Enums must contain at least one value.", name))]
    EmptyEnum
    {
        /// Full name of the enum.
        name: String,
    },

    /// A field number is zero or negative.
    #[snafu(display("{}: Field numbers must be positive integers.", name))]
    InvalidFieldNumber
    {
        /// Full name of the field.
        name: String,
    },

    /// A field number exceeds the wire format's 29-bit maximum.
    #[snafu(display(
        "{}: Field numbers cannot be greater than {}.",
        name, MAX_FIELD_NUMBER
    ))]
    FieldNumberTooLarge
    {
        /// Full name of the field.
        name: String,
    },

    /// Two fields of one message share a number.
    #[snafu(display("{}: Field number {} has already been used.", name, number))]
    DuplicateFieldNumber
    {
        /// Full name of the message or extended message.
        name: String,

        /// The duplicated field number.
        number: u32,
    },

    /// A type reference did not resolve to any known symbol.
    #[snafu(display("{}: \"{}\" is not defined.", referenced_by, name))]
    TypeNotFound
    {
        /// The unresolved reference as written in the schema.
        name: String,

        /// Full name of the descriptor holding the reference.
        referenced_by: String,
    },

    /// A reference resolved to a symbol of the wrong kind.
    #[snafu(display("{}: \"{}\" is not {} type.", referenced_by, name, expected))]
    WrongTypeKind
    {
        /// The reference as written in the schema.
        name: String,

        /// Full name of the descriptor holding the reference.
        referenced_by: String,

        /// The kind the reference position requires.
        expected: &'static str,
    },

    /// An extension number falls outside the extendee's declared ranges.
    #[snafu(display(
        "{}: \"{}\" does not declare {} as an extension number.",
        name, extendee, number
    ))]
    ExtensionOutOfRange
    {
        /// Full name of the extension field.
        name: String,

        /// Full name of the extended message.
        extendee: String,

        /// The extension's field number.
        number: u32,
    },

    /// A message-set container declares ordinary fields.
    #[snafu(display("{}: MessageSets cannot have fields, only extensions.", name))]
    MessageSetField
    {
        /// Full name of the message-set container.
        name: String,
    },

    /// An extension of a message-set container is not a singular message.
    #[snafu(display("{}: Extensions of MessageSets must be optional messages.", name))]
    MessageSetExtension
    {
        /// Full name of the extension field.
        name: String,
    },

    /// A declared default value could not be parsed for the field's type.
    #[snafu(display("{}: Couldn't parse default value: \"{}\"", name, value))]
    InvalidDefault
    {
        /// Full name of the field.
        name: String,

        /// The textual default as written in the schema.
        value: String,
    },

    /// The dependency descriptors do not match the file's dependency list.
    #[snafu(display(
        "Dependencies passed to FileDescriptor::build_from do not match those \
         listed in the FileDescriptorProto."
    ))]
    DependencyMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InternalRef(usize);

/// A reference to a file within a [`DescriptorPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileRef(InternalRef);

/// A reference to a message type within a [`DescriptorPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(InternalRef);

/// A reference to an enum type within a [`DescriptorPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumRef(InternalRef);

/// A reference to a service within a [`DescriptorPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceRef(InternalRef);

/// The scope a type is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParent
{
    /// Declared at the top level of a file.
    File(FileRef),

    /// Nested inside a message.
    Message(MessageRef),
}

/// Entry in the pool's symbol table.
#[derive(Debug, Clone, Copy)]
enum Symbol
{
    Message(usize),
    Enum(usize),
    Service(usize),

    /// Fields and enum values occupy their scope's namespace but are not
    /// looked up through the table.
    Member,

    /// A package name segment; multiple files may share it.
    Package,
}

/// Resolved type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType
{
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    UInt32,
    /// `uint64`
    UInt64,
    /// `sint32`
    SInt32,
    /// `sint64`
    SInt64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    SFixed32,
    /// `sfixed64`
    SFixed64,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// An enum type.
    Enum(EnumRef),
    /// A message type.
    Message(MessageRef),
    /// A proto2 group.
    Group(MessageRef),
}

impl FieldType
{
    /// The wire type values of this field type are encoded with.
    pub fn wire_type(self) -> WireType
    {
        match self {
            FieldType::Int32
            | FieldType::Int64
            | FieldType::UInt32
            | FieldType::UInt64
            | FieldType::SInt32
            | FieldType::SInt64
            | FieldType::Bool
            | FieldType::Enum(..) => WireType::Varint,
            FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => WireType::Fixed64,
            FieldType::String | FieldType::Bytes | FieldType::Message(..) => {
                WireType::LengthDelimited
            }
            FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => WireType::Fixed32,
            FieldType::Group(..) => WireType::StartGroup,
        }
    }

    /// True for types that may appear in a packed repeated field.
    pub fn is_packable(self) -> bool
    {
        !matches!(
            self,
            FieldType::String | FieldType::Bytes | FieldType::Message(..) | FieldType::Group(..)
        )
    }

    /// Short name used in diagnostics.
    pub(crate) fn name(self) -> &'static str
    {
        match self {
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::UInt32 => "uint32",
            FieldType::UInt64 => "uint64",
            FieldType::SInt32 => "sint32",
            FieldType::SInt64 => "sint64",
            FieldType::Fixed32 => "fixed32",
            FieldType::Fixed64 => "fixed64",
            FieldType::SFixed32 => "sfixed32",
            FieldType::SFixed64 => "sfixed64",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Enum(..) => "enum",
            FieldType::Message(..) => "message",
            FieldType::Group(..) => "group",
        }
    }
}

/// A type reference that may still await linking.
#[derive(Debug, Clone)]
enum TypeSlot
{
    /// Not yet linked; holds the reference text and the declared kind.
    Unresolved
    {
        type_name: String,
        declared: Option<proto::ProtoType>,
    },

    /// Fully resolved.
    Resolved(FieldType),
}

/// A message reference that may still await linking.
#[derive(Debug, Clone)]
enum MessageSlot
{
    Unresolved(String),
    Resolved(MessageRef),
}

/// Describes a single field or extension.
#[derive(Debug)]
pub struct FieldDescriptor
{
    name: String,
    full_name: String,
    number: u32,
    index: usize,
    label: FieldLabel,
    packed: bool,
    field_type: TypeSlot,
    containing_type: MessageSlot,
    is_extension: bool,
    default_value: Option<Value>,
    proto: FieldDescriptorProto,
}

/// Describes a message type.
#[derive(Debug)]
pub struct MessageDescriptor
{
    name: String,
    full_name: String,
    self_ref: MessageRef,
    index: usize,
    parent: TypeParent,
    file: FileRef,
    fields: Vec<FieldDescriptor>,
    fields_by_number: BTreeMap<u32, usize>,
    fields_by_name: HashMap<String, usize>,
    nested_types: Vec<MessageRef>,
    enum_types: Vec<EnumRef>,

    /// Indexes into the pool's extension list for extensions declared here.
    extension_decls: Vec<usize>,

    /// Half-open `[start, end)` ranges.
    extension_ranges: Vec<(u32, u32)>,
    message_set_wire_format: bool,
    has_required_fields: bool,
    proto: DescriptorProto,
}

/// Describes one value of an enum type.
#[derive(Debug)]
pub struct EnumValueDescriptor
{
    name: String,
    full_name: String,
    number: i32,
    index: usize,
}

/// Describes an enum type.
#[derive(Debug)]
pub struct EnumDescriptor
{
    name: String,
    full_name: String,
    self_ref: EnumRef,
    index: usize,
    parent: TypeParent,
    file: FileRef,
    values: Vec<EnumValueDescriptor>,

    /// First declaration wins for aliased numbers.
    values_by_number: BTreeMap<i32, usize>,
    values_by_name: HashMap<String, usize>,
    proto: EnumDescriptorProto,
}

/// Describes one rpc method.
#[derive(Debug)]
pub struct MethodDescriptor
{
    name: String,
    full_name: String,
    index: usize,
    input_type: MessageSlot,
    output_type: MessageSlot,
    proto: MethodDescriptorProto,
}

/// Describes a service.
#[derive(Debug)]
pub struct ServiceDescriptor
{
    name: String,
    full_name: String,
    self_ref: ServiceRef,
    index: usize,
    file: FileRef,
    methods: Vec<MethodDescriptor>,
    methods_by_name: HashMap<String, usize>,
    proto: ServiceDescriptorProto,
}

#[derive(Debug)]
enum TypeInfo
{
    Message(MessageDescriptor),
    Enum(EnumDescriptor),
}

#[derive(Debug)]
struct FileInfo
{
    name: String,
    package: String,
    self_ref: FileRef,
    dependencies: Vec<FileRef>,
    messages: Vec<MessageRef>,
    enums: Vec<EnumRef>,
    services: Vec<ServiceRef>,
    extension_decls: Vec<usize>,
    proto: FileDescriptorProto,
}

/// Holds the fully linked descriptors of a file and its dependency closure.
///
/// Pools are immutable once built. All `resolve_*` and `find_*` operations
/// borrow descriptors out of the pool.
#[derive(Debug)]
pub struct DescriptorPool
{
    files: Vec<FileInfo>,
    files_by_name: HashMap<String, usize>,
    types: Vec<TypeInfo>,
    services: Vec<ServiceDescriptor>,
    extensions: Vec<FieldDescriptor>,
    extensions_by_number: HashMap<(MessageRef, u32), usize>,
    symbols: HashMap<String, Symbol>,
}

/// Handle to one built file and the pool containing its dependency closure.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct FileDescriptor
{
    pool: Arc<DescriptorPool>,
    file: FileRef,
}
