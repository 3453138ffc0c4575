//! Two-phase descriptor construction.
//!
//! The first phase walks the flat protos of the whole dependency closure in
//! topological order, registering every full name in the symbol table and
//! producing descriptors whose cross-references are still textual. The second
//! phase resolves those references through the symbol table, validates
//! extensions, parses default values and computes the transitive
//! required-field flags.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::byte_string::ByteString;
use crate::dynamic::Value;

use super::proto::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FieldLabel, FileDescriptorProto,
    ProtoType, ServiceDescriptorProto,
};
use super::{
    DescriptorError, DescriptorPool, EnumDescriptor, EnumRef, EnumValueDescriptor,
    FieldDescriptor, FieldType, FileDescriptor, FileInfo, FileRef, InternalRef,
    MessageDescriptor, MessageRef, MessageSlot, MethodDescriptor, ServiceDescriptor, ServiceRef,
    Symbol, TypeInfo, TypeParent, TypeSlot, MAX_FIELD_NUMBER,
};

impl FileDescriptor
{
    /// Build a file and its dependency closure into a fresh pool.
    ///
    /// `dependencies` must match the file's `dependency` list by name and
    /// position. The transitive closure of the dependencies is rebuilt into
    /// the new pool, so handles obtained from this descriptor are not
    /// interchangeable with handles from the dependency descriptors.
    pub fn build_from(
        proto: FileDescriptorProto,
        dependencies: &[FileDescriptor],
    ) -> Result<FileDescriptor, DescriptorError>
    {
        if proto.dependency.len() != dependencies.len() {
            return Err(DescriptorError::DependencyMismatch);
        }
        for (declared, dep) in proto.dependency.iter().zip(dependencies) {
            if *declared != dep.pool.files[(dep.file.0).0].name {
                return Err(DescriptorError::DependencyMismatch);
            }
        }

        let mut closure = Vec::new();
        let mut seen = HashSet::new();
        for dep in dependencies {
            collect_closure(&dep.pool, dep.file, &mut closure, &mut seen);
        }

        let mut pool = DescriptorPool::empty();
        for file_proto in closure {
            translate_file(&mut pool, file_proto)?;
        }
        let file = translate_file(&mut pool, proto)?;

        link(&mut pool)?;
        assign_defaults(&mut pool)?;
        compute_required(&mut pool);

        Ok(FileDescriptor {
            pool: Arc::new(pool),
            file,
        })
    }
}

impl DescriptorPool
{
    fn empty() -> Self
    {
        DescriptorPool {
            files: Vec::new(),
            files_by_name: HashMap::new(),
            types: Vec::new(),
            services: Vec::new(),
            extensions: Vec::new(),
            extensions_by_number: HashMap::new(),
            symbols: HashMap::new(),
        }
    }

    fn add_symbol(&mut self, name: String, symbol: Symbol) -> Result<(), DescriptorError>
    {
        use std::collections::hash_map::Entry;
        match self.symbols.entry(name) {
            Entry::Occupied(entry) => Err(DescriptorError::DuplicateName {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(symbol);
                Ok(())
            }
        }
    }

    fn add_package(&mut self, name: &str) -> Result<(), DescriptorError>
    {
        use std::collections::hash_map::Entry;
        match self.symbols.entry(name.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                Symbol::Package => Ok(()),
                _ => Err(DescriptorError::DuplicateName {
                    name: entry.key().clone(),
                }),
            },
            Entry::Vacant(entry) => {
                entry.insert(Symbol::Package);
                Ok(())
            }
        }
    }
}

/// Push the protos of `file` and everything it depends on, dependencies
/// first, skipping files already collected.
fn collect_closure(
    pool: &DescriptorPool,
    file: FileRef,
    order: &mut Vec<FileDescriptorProto>,
    seen: &mut HashSet<String>,
)
{
    let info = &pool.files[(file.0).0];
    if !seen.insert(info.name.clone()) {
        return;
    }
    for &dep in &info.dependencies {
        collect_closure(pool, dep, order, seen);
    }
    order.push(info.proto.clone());
}

fn join_name(scope: &str, name: &str) -> String
{
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn parent_scope(full_name: &str) -> &str
{
    full_name.rfind('.').map(|i| &full_name[..i]).unwrap_or("")
}

fn translate_file(
    pool: &mut DescriptorPool,
    proto: FileDescriptorProto,
) -> Result<FileRef, DescriptorError>
{
    let self_ref = FileRef(InternalRef(pool.files.len()));

    if !proto.package.is_empty() {
        let mut prefix = String::new();
        for segment in proto.package.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            pool.add_package(&prefix)?;
        }
    }

    let mut dependencies = Vec::with_capacity(proto.dependency.len());
    for dep_name in &proto.dependency {
        let idx = pool
            .files_by_name
            .get(dep_name)
            .copied()
            .ok_or_else(|| DescriptorError::DependencyMismatch)?;
        dependencies.push(pool.files[idx].self_ref);
    }

    let mut messages = Vec::with_capacity(proto.message_type.len());
    for (index, nested) in proto.message_type.iter().enumerate() {
        messages.push(translate_message(
            pool,
            nested,
            self_ref,
            TypeParent::File(self_ref),
            index,
            &proto.package,
        )?);
    }
    let mut enums = Vec::with_capacity(proto.enum_type.len());
    for (index, nested) in proto.enum_type.iter().enumerate() {
        enums.push(translate_enum(
            pool,
            nested,
            self_ref,
            TypeParent::File(self_ref),
            index,
            &proto.package,
        )?);
    }
    let mut services = Vec::with_capacity(proto.service.len());
    for (index, nested) in proto.service.iter().enumerate() {
        services.push(translate_service(pool, nested, self_ref, index, &proto.package)?);
    }
    let mut extension_decls = Vec::with_capacity(proto.extension.len());
    for (index, nested) in proto.extension.iter().enumerate() {
        extension_decls.push(translate_extension(pool, nested, index, &proto.package)?);
    }

    pool.files_by_name.insert(proto.name.clone(), pool.files.len());
    pool.files.push(FileInfo {
        name: proto.name.clone(),
        package: proto.package.clone(),
        self_ref,
        dependencies,
        messages,
        enums,
        services,
        extension_decls,
        proto,
    });
    Ok(self_ref)
}

fn translate_message(
    pool: &mut DescriptorPool,
    proto: &DescriptorProto,
    file: FileRef,
    parent: TypeParent,
    index: usize,
    scope: &str,
) -> Result<MessageRef, DescriptorError>
{
    let full_name = join_name(scope, &proto.name);
    let type_index = pool.types.len();
    let self_ref = MessageRef(InternalRef(type_index));
    pool.add_symbol(full_name.clone(), Symbol::Message(type_index))?;

    if proto.options.message_set_wire_format && !proto.field.is_empty() {
        return Err(DescriptorError::MessageSetField { name: full_name });
    }

    let mut fields = Vec::with_capacity(proto.field.len());
    let mut fields_by_number = BTreeMap::new();
    let mut fields_by_name = HashMap::new();
    for (field_index, field_proto) in proto.field.iter().enumerate() {
        let field = translate_field(
            pool,
            field_proto,
            field_index,
            &full_name,
            MessageSlot::Resolved(self_ref),
            false,
        )?;
        if fields_by_number.insert(field.number, field_index).is_some() {
            return Err(DescriptorError::DuplicateFieldNumber {
                name: full_name,
                number: field.number,
            });
        }
        fields_by_name.insert(field.name.clone(), field_index);
        fields.push(field);
    }

    let extension_ranges = proto
        .extension_range
        .iter()
        .map(|range| (range.start.max(0) as u32, range.end.max(0) as u32))
        .collect();

    pool.types.push(TypeInfo::Message(MessageDescriptor {
        name: proto.name.clone(),
        full_name: full_name.clone(),
        self_ref,
        index,
        parent,
        file,
        fields,
        fields_by_number,
        fields_by_name,
        nested_types: Vec::new(),
        enum_types: Vec::new(),
        extension_decls: Vec::new(),
        extension_ranges,
        message_set_wire_format: proto.options.message_set_wire_format,
        has_required_fields: false,
        proto: proto.clone(),
    }));

    let mut nested_types = Vec::with_capacity(proto.nested_type.len());
    for (nested_index, nested) in proto.nested_type.iter().enumerate() {
        nested_types.push(translate_message(
            pool,
            nested,
            file,
            TypeParent::Message(self_ref),
            nested_index,
            &full_name,
        )?);
    }
    let mut enum_types = Vec::with_capacity(proto.enum_type.len());
    for (nested_index, nested) in proto.enum_type.iter().enumerate() {
        enum_types.push(translate_enum(
            pool,
            nested,
            file,
            TypeParent::Message(self_ref),
            nested_index,
            &full_name,
        )?);
    }
    let mut extension_decls = Vec::with_capacity(proto.extension.len());
    for (nested_index, nested) in proto.extension.iter().enumerate() {
        extension_decls.push(translate_extension(pool, nested, nested_index, &full_name)?);
    }

    match &mut pool.types[type_index] {
        TypeInfo::Message(message) => {
            message.nested_types = nested_types;
            message.enum_types = enum_types;
            message.extension_decls = extension_decls;
        }
        TypeInfo::Enum(..) => unreachable!(),
    }
    Ok(self_ref)
}

fn translate_field(
    pool: &mut DescriptorPool,
    proto: &FieldDescriptorProto,
    index: usize,
    scope: &str,
    containing_type: MessageSlot,
    is_extension: bool,
) -> Result<FieldDescriptor, DescriptorError>
{
    let full_name = join_name(scope, &proto.name);
    pool.add_symbol(full_name.clone(), Symbol::Member)?;

    if proto.number <= 0 {
        return Err(DescriptorError::InvalidFieldNumber { name: full_name });
    }
    if proto.number > MAX_FIELD_NUMBER {
        return Err(DescriptorError::FieldNumberTooLarge { name: full_name });
    }

    let field_type = match proto.proto_type.and_then(scalar_field_type) {
        Some(resolved) => TypeSlot::Resolved(resolved),
        None => TypeSlot::Unresolved {
            type_name: proto.type_name.clone(),
            declared: proto.proto_type,
        },
    };

    Ok(FieldDescriptor {
        name: proto.name.clone(),
        full_name,
        number: proto.number as u32,
        index,
        label: proto.label,
        packed: proto.packed,
        field_type,
        containing_type,
        is_extension,
        default_value: None,
        proto: proto.clone(),
    })
}

fn scalar_field_type(proto_type: ProtoType) -> Option<FieldType>
{
    Some(match proto_type {
        ProtoType::Double => FieldType::Double,
        ProtoType::Float => FieldType::Float,
        ProtoType::Int64 => FieldType::Int64,
        ProtoType::Uint64 => FieldType::UInt64,
        ProtoType::Int32 => FieldType::Int32,
        ProtoType::Fixed64 => FieldType::Fixed64,
        ProtoType::Fixed32 => FieldType::Fixed32,
        ProtoType::Bool => FieldType::Bool,
        ProtoType::String => FieldType::String,
        ProtoType::Bytes => FieldType::Bytes,
        ProtoType::Uint32 => FieldType::UInt32,
        ProtoType::Sfixed32 => FieldType::SFixed32,
        ProtoType::Sfixed64 => FieldType::SFixed64,
        ProtoType::Sint32 => FieldType::SInt32,
        ProtoType::Sint64 => FieldType::SInt64,
        ProtoType::Group | ProtoType::Message | ProtoType::Enum => return None,
    })
}

fn translate_enum(
    pool: &mut DescriptorPool,
    proto: &EnumDescriptorProto,
    file: FileRef,
    parent: TypeParent,
    index: usize,
    scope: &str,
) -> Result<EnumRef, DescriptorError>
{
    let full_name = join_name(scope, &proto.name);
    let type_index = pool.types.len();
    let self_ref = EnumRef(InternalRef(type_index));
    pool.add_symbol(full_name.clone(), Symbol::Enum(type_index))?;

    if proto.value.is_empty() {
        return Err(DescriptorError::EmptyEnum { name: full_name });
    }

    let mut values = Vec::with_capacity(proto.value.len());
    let mut values_by_number = BTreeMap::new();
    let mut values_by_name = HashMap::new();
    for (value_index, value) in proto.value.iter().enumerate() {
        // Enum values live in the scope enclosing the enum, C style.
        let value_full_name = join_name(scope, &value.name);
        pool.add_symbol(value_full_name.clone(), Symbol::Member)?;
        values_by_number.entry(value.number).or_insert(value_index);
        values_by_name.insert(value.name.clone(), value_index);
        values.push(EnumValueDescriptor {
            name: value.name.clone(),
            full_name: value_full_name,
            number: value.number,
            index: value_index,
        });
    }

    pool.types.push(TypeInfo::Enum(EnumDescriptor {
        name: proto.name.clone(),
        full_name,
        self_ref,
        index,
        parent,
        file,
        values,
        values_by_number,
        values_by_name,
        proto: proto.clone(),
    }));
    Ok(self_ref)
}

fn translate_service(
    pool: &mut DescriptorPool,
    proto: &ServiceDescriptorProto,
    file: FileRef,
    index: usize,
    scope: &str,
) -> Result<ServiceRef, DescriptorError>
{
    let full_name = join_name(scope, &proto.name);
    let service_index = pool.services.len();
    let self_ref = ServiceRef(InternalRef(service_index));
    pool.add_symbol(full_name.clone(), Symbol::Service(service_index))?;

    let mut methods = Vec::with_capacity(proto.method.len());
    let mut methods_by_name = HashMap::new();
    for (method_index, method) in proto.method.iter().enumerate() {
        let method_full_name = join_name(&full_name, &method.name);
        pool.add_symbol(method_full_name.clone(), Symbol::Member)?;
        methods_by_name.insert(method.name.clone(), method_index);
        methods.push(MethodDescriptor {
            name: method.name.clone(),
            full_name: method_full_name,
            index: method_index,
            input_type: MessageSlot::Unresolved(method.input_type.clone()),
            output_type: MessageSlot::Unresolved(method.output_type.clone()),
            proto: method.clone(),
        });
    }

    pool.services.push(ServiceDescriptor {
        name: proto.name.clone(),
        full_name,
        self_ref,
        index,
        file,
        methods,
        methods_by_name,
        proto: proto.clone(),
    });
    Ok(self_ref)
}

fn translate_extension(
    pool: &mut DescriptorPool,
    proto: &FieldDescriptorProto,
    index: usize,
    scope: &str,
) -> Result<usize, DescriptorError>
{
    let extension_index = pool.extensions.len();
    let field = translate_field(
        pool,
        proto,
        index,
        scope,
        MessageSlot::Unresolved(proto.extendee.clone()),
        true,
    )?;
    pool.extensions.push(field);
    Ok(extension_index)
}

/// Resolve a reference the way nested scopes see it: a leading dot makes the
/// name absolute, otherwise each enclosing scope is tried from the innermost
/// outward.
fn lookup(symbols: &HashMap<String, Symbol>, name: &str, scope: &str) -> Option<Symbol>
{
    if let Some(absolute) = name.strip_prefix('.') {
        return symbols.get(absolute).copied();
    }
    let mut scope = scope;
    loop {
        let candidate = join_name(scope, name);
        if let Some(symbol) = symbols.get(&candidate) {
            return Some(*symbol);
        }
        match scope.rfind('.') {
            Some(split) => scope = &scope[..split],
            None if scope.is_empty() => return None,
            None => scope = "",
        }
    }
}

fn link_field_type(
    field: &mut FieldDescriptor,
    scope: &str,
    symbols: &HashMap<String, Symbol>,
) -> Result<(), DescriptorError>
{
    let (type_name, declared) = match &field.field_type {
        TypeSlot::Resolved(..) => return Ok(()),
        TypeSlot::Unresolved { type_name, declared } => (type_name.clone(), *declared),
    };
    let symbol = lookup(symbols, &type_name, scope).ok_or_else(|| {
        DescriptorError::TypeNotFound {
            name: type_name.clone(),
            referenced_by: field.full_name.clone(),
        }
    })?;
    let resolved = match (declared, symbol) {
        (Some(ProtoType::Message), Symbol::Message(idx)) | (None, Symbol::Message(idx)) => {
            FieldType::Message(MessageRef(InternalRef(idx)))
        }
        (Some(ProtoType::Group), Symbol::Message(idx)) => {
            FieldType::Group(MessageRef(InternalRef(idx)))
        }
        (Some(ProtoType::Enum), Symbol::Enum(idx)) | (None, Symbol::Enum(idx)) => {
            FieldType::Enum(EnumRef(InternalRef(idx)))
        }
        (Some(ProtoType::Enum), _) => {
            return Err(DescriptorError::WrongTypeKind {
                name: type_name,
                referenced_by: field.full_name.clone(),
                expected: "an enum",
            })
        }
        (Some(..), _) => {
            return Err(DescriptorError::WrongTypeKind {
                name: type_name,
                referenced_by: field.full_name.clone(),
                expected: "a message",
            })
        }
        (None, _) => {
            return Err(DescriptorError::WrongTypeKind {
                name: type_name,
                referenced_by: field.full_name.clone(),
                expected: "a message or enum",
            })
        }
    };
    field.field_type = TypeSlot::Resolved(resolved);
    Ok(())
}

fn link(pool: &mut DescriptorPool) -> Result<(), DescriptorError>
{
    // Ordinary fields resolve in the scope of their containing message.
    {
        let DescriptorPool {
            ref mut types,
            ref symbols,
            ..
        } = *pool;
        for info in types.iter_mut() {
            if let TypeInfo::Message(message) = info {
                let scope = message.full_name.clone();
                for field in message.fields.iter_mut() {
                    link_field_type(field, &scope, symbols)?;
                }
            }
        }
    }

    // Extensions additionally resolve and validate their extendee.
    {
        let DescriptorPool {
            ref types,
            ref mut extensions,
            ref mut extensions_by_number,
            ref symbols,
            ..
        } = *pool;
        for (extension_index, extension) in extensions.iter_mut().enumerate() {
            let scope = parent_scope(&extension.full_name).to_string();

            let extendee_name = match &extension.containing_type {
                MessageSlot::Unresolved(name) => name.clone(),
                MessageSlot::Resolved(..) => unreachable!(),
            };
            let extendee_index = match lookup(symbols, &extendee_name, &scope) {
                Some(Symbol::Message(idx)) => idx,
                Some(..) => {
                    return Err(DescriptorError::WrongTypeKind {
                        name: extendee_name,
                        referenced_by: extension.full_name.clone(),
                        expected: "a message",
                    })
                }
                None => {
                    return Err(DescriptorError::TypeNotFound {
                        name: extendee_name,
                        referenced_by: extension.full_name.clone(),
                    })
                }
            };
            let extendee_ref = MessageRef(InternalRef(extendee_index));
            let extendee = match &types[extendee_index] {
                TypeInfo::Message(message) => message,
                TypeInfo::Enum(..) => unreachable!(),
            };

            let number = extension.number;
            let in_range = extendee
                .extension_ranges
                .iter()
                .any(|&(start, end)| number >= start && number < end);
            if !in_range {
                return Err(DescriptorError::ExtensionOutOfRange {
                    name: extension.full_name.clone(),
                    extendee: extendee.full_name.clone(),
                    number,
                });
            }

            link_field_type(extension, &scope, symbols)?;

            if extendee.message_set_wire_format {
                let singular_message = extension.label == FieldLabel::Optional
                    && matches!(
                        extension.field_type,
                        TypeSlot::Resolved(FieldType::Message(..))
                    );
                if !singular_message {
                    return Err(DescriptorError::MessageSetExtension {
                        name: extension.full_name.clone(),
                    });
                }
            }

            extension.containing_type = MessageSlot::Resolved(extendee_ref);
            if extensions_by_number
                .insert((extendee_ref, number), extension_index)
                .is_some()
            {
                return Err(DescriptorError::DuplicateFieldNumber {
                    name: extendee.full_name.clone(),
                    number,
                });
            }
        }
    }

    // Methods must point at message types.
    {
        let DescriptorPool {
            ref mut services,
            ref symbols,
            ..
        } = *pool;
        for service in services.iter_mut() {
            let scope = parent_scope(&service.full_name).to_string();
            for method in service.methods.iter_mut() {
                method.input_type = resolve_method_type(
                    &method.input_type,
                    &method.full_name,
                    &scope,
                    symbols,
                )?;
                method.output_type = resolve_method_type(
                    &method.output_type,
                    &method.full_name,
                    &scope,
                    symbols,
                )?;
            }
        }
    }

    Ok(())
}

fn resolve_method_type(
    slot: &MessageSlot,
    referenced_by: &str,
    scope: &str,
    symbols: &HashMap<String, Symbol>,
) -> Result<MessageSlot, DescriptorError>
{
    let name = match slot {
        MessageSlot::Resolved(msg_ref) => return Ok(MessageSlot::Resolved(*msg_ref)),
        MessageSlot::Unresolved(name) => name,
    };
    match lookup(symbols, name, scope) {
        Some(Symbol::Message(idx)) => Ok(MessageSlot::Resolved(MessageRef(InternalRef(idx)))),
        Some(..) => Err(DescriptorError::WrongTypeKind {
            name: name.clone(),
            referenced_by: referenced_by.to_string(),
            expected: "a message",
        }),
        None => Err(DescriptorError::TypeNotFound {
            name: name.clone(),
            referenced_by: referenced_by.to_string(),
        }),
    }
}

enum FieldLocation
{
    Declared(usize, usize),
    Extension(usize),
}

fn assign_defaults(pool: &mut DescriptorPool) -> Result<(), DescriptorError>
{
    let mut computed = Vec::new();
    {
        let DescriptorPool {
            ref types,
            ref extensions,
            ..
        } = *pool;
        for (type_index, info) in types.iter().enumerate() {
            if let TypeInfo::Message(message) = info {
                for (field_index, field) in message.fields.iter().enumerate() {
                    computed.push((
                        FieldLocation::Declared(type_index, field_index),
                        default_for(field, types)?,
                    ));
                }
            }
        }
        for (extension_index, extension) in extensions.iter().enumerate() {
            computed.push((
                FieldLocation::Extension(extension_index),
                default_for(extension, types)?,
            ));
        }
    }
    for (location, value) in computed {
        match location {
            FieldLocation::Declared(type_index, field_index) => {
                if let TypeInfo::Message(message) = &mut pool.types[type_index] {
                    message.fields[field_index].default_value = value;
                }
            }
            FieldLocation::Extension(extension_index) => {
                pool.extensions[extension_index].default_value = value
            }
        }
    }
    Ok(())
}

fn default_for(
    field: &FieldDescriptor,
    types: &[TypeInfo],
) -> Result<Option<Value>, DescriptorError>
{
    let field_type = match &field.field_type {
        TypeSlot::Resolved(field_type) => *field_type,
        TypeSlot::Unresolved { .. } => unreachable!("defaults assigned after linking"),
    };

    if field.label == FieldLabel::Repeated {
        if let Some(text) = &field.proto.default_value {
            return Err(DescriptorError::InvalidDefault {
                name: field.full_name.clone(),
                value: text.clone(),
            });
        }
        return Ok(None);
    }

    match &field.proto.default_value {
        Some(text) => parse_default(&field.full_name, text, field_type, types).map(Some),
        None => Ok(implicit_default(field_type, types)),
    }
}

/// The value a singular field reports when unset. Message fields have no
/// default value object.
fn implicit_default(field_type: FieldType, types: &[TypeInfo]) -> Option<Value>
{
    Some(match field_type {
        FieldType::Double => Value::Double(0.0),
        FieldType::Float => Value::Float(0.0),
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => Value::Int32(0),
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => Value::Int64(0),
        FieldType::UInt32 | FieldType::Fixed32 => Value::UInt32(0),
        FieldType::UInt64 | FieldType::Fixed64 => Value::UInt64(0),
        FieldType::Bool => Value::Bool(false),
        FieldType::String => Value::String(String::new()),
        FieldType::Bytes => Value::Bytes(ByteString::empty()),
        FieldType::Enum(enum_ref) => {
            let first = match &types[(enum_ref.0).0] {
                TypeInfo::Enum(e) => e.values[0].number,
                TypeInfo::Message(..) => unreachable!(),
            };
            Value::Enum(enum_ref, first)
        }
        FieldType::Message(..) | FieldType::Group(..) => return None,
    })
}

fn parse_default(
    full_name: &str,
    text: &str,
    field_type: FieldType,
    types: &[TypeInfo],
) -> Result<Value, DescriptorError>
{
    let invalid = || {
        DescriptorError::InvalidDefault {
            name: full_name.to_string(),
            value: text.to_string(),
        }
    };
    Ok(match field_type {
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            let v = parse_i64(text).ok_or_else(invalid)?;
            if v < i32::min_value() as i64 || v > i32::max_value() as i64 {
                return Err(invalid());
            }
            Value::Int32(v as i32)
        }
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            Value::Int64(parse_i64(text).ok_or_else(invalid)?)
        }
        FieldType::UInt32 | FieldType::Fixed32 => {
            let v = parse_u64(text).ok_or_else(invalid)?;
            if v > u32::max_value() as u64 {
                return Err(invalid());
            }
            Value::UInt32(v as u32)
        }
        FieldType::UInt64 | FieldType::Fixed64 => {
            Value::UInt64(parse_u64(text).ok_or_else(invalid)?)
        }
        FieldType::Float => Value::Float(parse_floating(text).ok_or_else(invalid)? as f32),
        FieldType::Double => Value::Double(parse_floating(text).ok_or_else(invalid)?),
        FieldType::Bool => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        FieldType::String => Value::String(text.to_string()),
        FieldType::Bytes => {
            Value::Bytes(ByteString::from(unescape_bytes(text).ok_or_else(invalid)?))
        }
        FieldType::Enum(enum_ref) => {
            let descriptor = match &types[(enum_ref.0).0] {
                TypeInfo::Enum(e) => e,
                TypeInfo::Message(..) => unreachable!(),
            };
            let value_index = *descriptor.values_by_name.get(text).ok_or_else(invalid)?;
            Value::Enum(enum_ref, descriptor.values[value_index].number)
        }
        FieldType::Message(..) | FieldType::Group(..) => return Err(invalid()),
    })
}

/// Parse an unsigned integer, accepting `0x`/`0X` hex and leading-zero octal.
fn parse_u64(text: &str) -> Option<u64>
{
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

fn parse_i64(text: &str) -> Option<i64>
{
    let (negative, body) = match text.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, text),
    };
    let magnitude = parse_u64(body)?;
    if negative {
        if magnitude > i64::max_value() as u64 + 1 {
            return None;
        }
        Some(magnitude.wrapping_neg() as i64)
    } else if magnitude > i64::max_value() as u64 {
        None
    } else {
        Some(magnitude as i64)
    }
}

fn parse_floating(text: &str) -> Option<f64>
{
    match text {
        "inf" | "infinity" => Some(std::f64::INFINITY),
        "-inf" | "-infinity" => Some(std::f64::NEG_INFINITY),
        "nan" => Some(std::f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Undo C-style escapes in a bytes default value.
fn unescape_bytes(text: &str) -> Option<Vec<u8>>
{
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next()? {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            '\\' => out.push(b'\\'),
            '\'' => out.push(b'\''),
            '"' => out.push(b'"'),
            '?' => out.push(b'?'),
            'x' => {
                let mut value = chars.peek()?.to_digit(16)? as u8;
                chars.next();
                if let Some(digit) = chars.peek().and_then(|c| c.to_digit(16)) {
                    value = value * 16 + digit as u8;
                    chars.next();
                }
                out.push(value);
            }
            c @ '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0) as u32;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if value > 0xff {
                    return None;
                }
                out.push(value as u8);
            }
            _ => return None,
        }
    }
    Some(out)
}

#[derive(Clone, Copy, PartialEq)]
enum RequiredState
{
    Unknown,
    Visiting,
    Done(bool),
}

fn compute_required(pool: &mut DescriptorPool)
{
    let flags: Vec<bool> = {
        let types = &pool.types;
        let mut states = vec![RequiredState::Unknown; types.len()];
        (0..types.len())
            .map(|idx| required_dfs(types, idx, &mut states))
            .collect()
    };
    for (idx, flag) in flags.into_iter().enumerate() {
        if let TypeInfo::Message(message) = &mut pool.types[idx] {
            message.has_required_fields = flag;
        }
    }
}

/// A message transitively has required fields if it declares one or any
/// message-typed field's target does. A type currently on the DFS stack
/// contributes `false` so that recursive message graphs terminate.
fn required_dfs(types: &[TypeInfo], idx: usize, states: &mut Vec<RequiredState>) -> bool
{
    match states[idx] {
        RequiredState::Done(flag) => return flag,
        RequiredState::Visiting => return false,
        RequiredState::Unknown => {}
    }
    states[idx] = RequiredState::Visiting;
    let result = match &types[idx] {
        TypeInfo::Enum(..) => false,
        TypeInfo::Message(message) => {
            let mut required = false;
            for field in &message.fields {
                if field.label == FieldLabel::Required {
                    required = true;
                    break;
                }
                if let TypeSlot::Resolved(
                    FieldType::Message(target) | FieldType::Group(target),
                ) = &field.field_type
                {
                    if required_dfs(types, (target.0).0, states) {
                        required = true;
                        break;
                    }
                }
            }
            required
        }
    };
    states[idx] = RequiredState::Done(result);
    result
}
