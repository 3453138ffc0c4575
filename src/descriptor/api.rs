//! Lookup and accessor surface of the descriptor model.

use crate::dynamic::Value;
use crate::wire::WireType;

use super::proto::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FieldLabel, FileDescriptorProto,
    ServiceDescriptorProto,
};
use super::{
    DescriptorPool, EnumDescriptor, EnumRef, EnumValueDescriptor, FieldDescriptor, FieldType,
    FileDescriptor, FileRef, MessageDescriptor, MessageRef, MessageSlot, MethodDescriptor,
    ServiceDescriptor, ServiceRef, Symbol, TypeInfo, TypeParent, TypeSlot,
};

impl DescriptorPool
{
    /// Resolve a message reference into its descriptor.
    ///
    /// # Panics
    ///
    /// Will **panic** if the message defined by the `MessageRef` does not
    /// exist in this pool. Such panic means the `MessageRef` came from a
    /// different pool. The panic is not guaranteed, as a message with an
    /// equal `MessageRef` may exist in multiple pools.
    pub fn resolve_message(&self, msg_ref: MessageRef) -> &MessageDescriptor
    {
        match self.types.get((msg_ref.0).0) {
            Some(TypeInfo::Message(message)) => message,
            _ => panic!("Message did not exist in this pool"),
        }
    }

    /// Resolve an enum reference into its descriptor.
    ///
    /// # Panics
    ///
    /// Will **panic** if the enum defined by the `EnumRef` does not exist in
    /// this pool. Such panic means the `EnumRef` came from a different pool.
    /// The panic is not guaranteed, as an enum with an equal `EnumRef` may
    /// exist in multiple pools.
    pub fn resolve_enum(&self, enum_ref: EnumRef) -> &EnumDescriptor
    {
        match self.types.get((enum_ref.0).0) {
            Some(TypeInfo::Enum(descriptor)) => descriptor,
            _ => panic!("Enum did not exist in this pool"),
        }
    }

    /// Resolve a service reference into its descriptor.
    ///
    /// # Panics
    ///
    /// Will **panic** if the service defined by the `ServiceRef` does not
    /// exist in this pool.
    pub fn resolve_service(&self, service_ref: ServiceRef) -> &ServiceDescriptor
    {
        match self.services.get((service_ref.0).0) {
            Some(service) => service,
            None => panic!("Service did not exist in this pool"),
        }
    }

    /// Find a message by its full name.
    pub fn find_message(&self, full_name: &str) -> Option<&MessageDescriptor>
    {
        match self.symbols.get(full_name)? {
            Symbol::Message(idx) => match &self.types[*idx] {
                TypeInfo::Message(message) => Some(message),
                TypeInfo::Enum(..) => None,
            },
            _ => None,
        }
    }

    /// Find an enum by its full name.
    pub fn find_enum(&self, full_name: &str) -> Option<&EnumDescriptor>
    {
        match self.symbols.get(full_name)? {
            Symbol::Enum(idx) => match &self.types[*idx] {
                TypeInfo::Enum(descriptor) => Some(descriptor),
                TypeInfo::Message(..) => None,
            },
            _ => None,
        }
    }

    /// Find a service by its full name.
    pub fn find_service(&self, full_name: &str) -> Option<&ServiceDescriptor>
    {
        match self.symbols.get(full_name)? {
            Symbol::Service(idx) => self.services.get(*idx),
            _ => None,
        }
    }

    /// Find the extension of `extendee` registered for `number`.
    pub fn find_extension(&self, extendee: MessageRef, number: u32) -> Option<&FieldDescriptor>
    {
        self.extensions_by_number
            .get(&(extendee, number))
            .map(|&idx| &self.extensions[idx])
    }

    /// Find an extension field by its full name.
    pub fn find_extension_by_name(&self, full_name: &str) -> Option<&FieldDescriptor>
    {
        self.extensions.iter().find(|ext| ext.full_name == full_name)
    }

    /// Extension fields declared inside `message`, in declaration order.
    pub fn declared_extensions<'a>(
        &'a self,
        message: &'a MessageDescriptor,
    ) -> impl Iterator<Item = &'a FieldDescriptor>
    {
        message.extension_decls.iter().map(move |&idx| &self.extensions[idx])
    }
}

impl FileDescriptor
{
    /// File name as declared in the schema.
    pub fn name(&self) -> &str
    {
        &self.pool.files[(self.file.0).0].name
    }

    /// Package of the file, empty for the anonymous package.
    pub fn package(&self) -> &str
    {
        &self.pool.files[(self.file.0).0].package
    }

    /// The pool holding this file and its dependency closure.
    pub fn pool(&self) -> &DescriptorPool
    {
        &self.pool
    }

    /// Reference to this file within [`Self::pool`].
    pub fn self_ref(&self) -> FileRef
    {
        self.file
    }

    /// Top-level message types, in declaration order.
    pub fn message_types(&self) -> impl Iterator<Item = &MessageDescriptor>
    {
        let pool = &*self.pool;
        pool.files[(self.file.0).0]
            .messages
            .iter()
            .map(move |&msg_ref| pool.resolve_message(msg_ref))
    }

    /// Top-level enum types, in declaration order.
    pub fn enum_types(&self) -> impl Iterator<Item = &EnumDescriptor>
    {
        let pool = &*self.pool;
        pool.files[(self.file.0).0]
            .enums
            .iter()
            .map(move |&enum_ref| pool.resolve_enum(enum_ref))
    }

    /// Services, in declaration order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor>
    {
        let pool = &*self.pool;
        pool.files[(self.file.0).0]
            .services
            .iter()
            .map(move |&service_ref| pool.resolve_service(service_ref))
    }

    /// Extension fields declared at the top level of the file.
    pub fn extensions(&self) -> impl Iterator<Item = &FieldDescriptor>
    {
        let pool = &*self.pool;
        pool.files[(self.file.0).0]
            .extension_decls
            .iter()
            .map(move |&idx| &pool.extensions[idx])
    }

    /// The files this file directly depends on.
    pub fn dependencies(&self) -> Vec<FileDescriptor>
    {
        self.pool.files[(self.file.0).0]
            .dependencies
            .iter()
            .map(|&dep| FileDescriptor {
                pool: self.pool.clone(),
                file: dep,
            })
            .collect()
    }

    /// The flat proto this file was built from.
    pub fn proto(&self) -> &FileDescriptorProto
    {
        &self.pool.files[(self.file.0).0].proto
    }
}

impl MessageDescriptor
{
    /// Simple name of the message.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Full dotted name, including the package.
    pub fn full_name(&self) -> &str
    {
        &self.full_name
    }

    /// Reference to this message within its pool.
    pub fn self_ref(&self) -> MessageRef
    {
        self.self_ref
    }

    /// Position within the parent's message list.
    pub fn index(&self) -> usize
    {
        self.index
    }

    /// The scope this message is declared in.
    pub fn parent(&self) -> TypeParent
    {
        self.parent
    }

    /// The file this message is declared in.
    pub fn file(&self) -> FileRef
    {
        self.file
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor]
    {
        &self.fields
    }

    /// Find a declared field by number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor>
    {
        self.fields_by_number.get(&number).map(|&idx| &self.fields[idx])
    }

    /// Find a declared field by simple name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor>
    {
        self.fields_by_name.get(name).map(|&idx| &self.fields[idx])
    }

    /// Nested message types, in declaration order.
    pub fn nested_types(&self) -> &[MessageRef]
    {
        &self.nested_types
    }

    /// Nested enum types, in declaration order.
    pub fn enum_types(&self) -> &[EnumRef]
    {
        &self.enum_types
    }

    /// Half-open `[start, end)` extension number ranges.
    pub fn extension_ranges(&self) -> &[(u32, u32)]
    {
        &self.extension_ranges
    }

    /// True if `number` falls within one of the extension ranges.
    pub fn is_extension_number(&self, number: u32) -> bool
    {
        self.extension_ranges
            .iter()
            .any(|&(start, end)| number >= start && number < end)
    }

    /// True if the message is a message-set container.
    pub fn is_message_set(&self) -> bool
    {
        self.message_set_wire_format
    }

    /// True if this message or any reachable message field declares a
    /// required field.
    pub fn has_required_fields(&self) -> bool
    {
        self.has_required_fields
    }

    /// The flat proto this message was built from.
    pub fn proto(&self) -> &DescriptorProto
    {
        &self.proto
    }
}

impl FieldDescriptor
{
    /// Simple name of the field.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Full dotted name.
    pub fn full_name(&self) -> &str
    {
        &self.full_name
    }

    /// Field number.
    pub fn number(&self) -> u32
    {
        self.number
    }

    /// Position within the declaring field or extension list.
    pub fn index(&self) -> usize
    {
        self.index
    }

    /// Declared cardinality.
    pub fn label(&self) -> FieldLabel
    {
        self.label
    }

    /// True for repeated fields.
    pub fn is_repeated(&self) -> bool
    {
        self.label == FieldLabel::Repeated
    }

    /// True for required fields.
    pub fn is_required(&self) -> bool
    {
        self.label == FieldLabel::Required
    }

    /// True if the field serializes as a packed run: declared with the
    /// `packed` option, repeated, and of a packable scalar type. The option
    /// is ignored on types that cannot be packed, such as strings.
    pub fn is_packed(&self) -> bool
    {
        self.packed && self.is_repeated() && self.field_type().is_packable()
    }

    /// True for extension fields.
    pub fn is_extension(&self) -> bool
    {
        self.is_extension
    }

    /// Resolved type of the field.
    pub fn field_type(&self) -> FieldType
    {
        match &self.field_type {
            TypeSlot::Resolved(field_type) => *field_type,
            TypeSlot::Unresolved { .. } => unreachable!("descriptors are linked when built"),
        }
    }

    /// The wire type values of this field are encoded with.
    pub fn wire_type(&self) -> WireType
    {
        self.field_type().wire_type()
    }

    /// The message this field belongs to. For extensions this is the
    /// extended message.
    pub fn containing_type(&self) -> MessageRef
    {
        match &self.containing_type {
            MessageSlot::Resolved(msg_ref) => *msg_ref,
            MessageSlot::Unresolved(..) => unreachable!("descriptors are linked when built"),
        }
    }

    /// The value a singular field reports while unset. `None` for repeated
    /// and message-typed fields.
    pub fn default_value(&self) -> Option<&Value>
    {
        self.default_value.as_ref()
    }

    /// True if the schema declared an explicit default.
    pub fn has_explicit_default(&self) -> bool
    {
        self.proto.default_value.is_some()
    }

    /// The flat proto this field was built from.
    pub fn proto(&self) -> &FieldDescriptorProto
    {
        &self.proto
    }
}

impl EnumDescriptor
{
    /// Simple name of the enum.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Full dotted name, including the package.
    pub fn full_name(&self) -> &str
    {
        &self.full_name
    }

    /// Reference to this enum within its pool.
    pub fn self_ref(&self) -> EnumRef
    {
        self.self_ref
    }

    /// Position within the parent's enum list.
    pub fn index(&self) -> usize
    {
        self.index
    }

    /// The scope this enum is declared in.
    pub fn parent(&self) -> TypeParent
    {
        self.parent
    }

    /// The file this enum is declared in.
    pub fn file(&self) -> FileRef
    {
        self.file
    }

    /// Declared values, in declaration order.
    pub fn values(&self) -> &[EnumValueDescriptor]
    {
        &self.values
    }

    /// Find a value by number. When several values alias one number, the
    /// first declared value wins.
    pub fn value_by_number(&self, number: i32) -> Option<&EnumValueDescriptor>
    {
        self.values_by_number.get(&number).map(|&idx| &self.values[idx])
    }

    /// Find a value by simple name.
    pub fn value_by_name(&self, name: &str) -> Option<&EnumValueDescriptor>
    {
        self.values_by_name.get(name).map(|&idx| &self.values[idx])
    }

    /// The value an enum-typed field defaults to: the first declared value.
    pub fn default_value(&self) -> &EnumValueDescriptor
    {
        &self.values[0]
    }

    /// The flat proto this enum was built from.
    pub fn proto(&self) -> &EnumDescriptorProto
    {
        &self.proto
    }
}

impl EnumValueDescriptor
{
    /// Value name.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Full dotted name. Enum values live in the scope enclosing their enum.
    pub fn full_name(&self) -> &str
    {
        &self.full_name
    }

    /// Value number.
    pub fn number(&self) -> i32
    {
        self.number
    }

    /// Position within the enum's value list.
    pub fn index(&self) -> usize
    {
        self.index
    }
}

impl ServiceDescriptor
{
    /// Simple name of the service.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Full dotted name, including the package.
    pub fn full_name(&self) -> &str
    {
        &self.full_name
    }

    /// Reference to this service within its pool.
    pub fn self_ref(&self) -> ServiceRef
    {
        self.self_ref
    }

    /// Position within the file's service list.
    pub fn index(&self) -> usize
    {
        self.index
    }

    /// The file this service is declared in.
    pub fn file(&self) -> FileRef
    {
        self.file
    }

    /// Declared methods, in declaration order.
    pub fn methods(&self) -> &[MethodDescriptor]
    {
        &self.methods
    }

    /// Find a method by simple name.
    pub fn method_by_name(&self, name: &str) -> Option<&MethodDescriptor>
    {
        self.methods_by_name.get(name).map(|&idx| &self.methods[idx])
    }

    /// The flat proto this service was built from.
    pub fn proto(&self) -> &ServiceDescriptorProto
    {
        &self.proto
    }
}

impl MethodDescriptor
{
    /// Method name.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Full dotted name.
    pub fn full_name(&self) -> &str
    {
        &self.full_name
    }

    /// Position within the service's method list.
    pub fn index(&self) -> usize
    {
        self.index
    }

    /// The request message type.
    pub fn input_type(&self) -> MessageRef
    {
        match &self.input_type {
            MessageSlot::Resolved(msg_ref) => *msg_ref,
            MessageSlot::Unresolved(..) => unreachable!("descriptors are linked when built"),
        }
    }

    /// The response message type.
    pub fn output_type(&self) -> MessageRef
    {
        match &self.output_type {
            MessageSlot::Resolved(msg_ref) => *msg_ref,
            MessageSlot::Unresolved(..) => unreachable!("descriptors are linked when built"),
        }
    }

    /// The flat proto this method was built from.
    pub fn proto(&self) -> &super::proto::MethodDescriptorProto
    {
        &self.proto
    }
}
