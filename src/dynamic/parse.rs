//! Wire decoding against a descriptor.

use crate::descriptor::{DescriptorPool, FieldDescriptor, FieldType, MessageRef};
use crate::unknown::UnknownFieldSet;
use crate::wire::{make_tag, tag_field_number, tag_wire_type, CodedInput, WireError, WireType};

use super::field_set::FieldSet;
use super::{DynamicMessage, Value};

/// Decode fields until end of input, end of the current limit, or an
/// end-group tag, which is left as the input's last tag for the caller to
/// validate.
///
/// Known fields whose wire type matches the declaration are decoded into
/// `fields`; everything else, including known fields arriving with the wrong
/// wire type and unrecognized enum values, is preserved in `unknown`.
pub(super) fn merge_message_fields(
    fields: &mut FieldSet,
    unknown: &mut UnknownFieldSet,
    msg_ref: MessageRef,
    input: &mut CodedInput<'_>,
    pool: &DescriptorPool,
) -> Result<(), WireError>
{
    let message = pool.resolve_message(msg_ref);
    loop {
        let tag = input.read_tag()?;
        if tag == 0 || tag_wire_type(tag) == Some(WireType::EndGroup) {
            return Ok(());
        }
        let number = tag_field_number(tag);
        let wire_type = tag_wire_type(tag);

        let field = match message
            .field_by_number(number)
            .or_else(|| pool.find_extension(msg_ref, number))
        {
            Some(field) => field,
            None => {
                unknown.merge_field_from(tag, input)?;
                continue;
            }
        };

        let field_type = field.field_type();
        if field.is_repeated()
            && wire_type == Some(WireType::LengthDelimited)
            && field_type.is_packable()
            && field_type.wire_type() != WireType::LengthDelimited
        {
            // A packed run. Accepted whether or not the field was declared
            // packed.
            let len = input.read_length()?;
            let old_limit = input.push_limit(len)?;
            while !input.is_at_end() {
                read_scalar_occurrence(fields, unknown, field, field_type, input, pool)?;
            }
            input.pop_limit(old_limit);
        } else if wire_type == Some(field_type.wire_type()) {
            read_field_occurrence(fields, unknown, field, field_type, number, input, pool)?;
        } else {
            unknown.merge_field_from(tag, input)?;
        }
    }
}

fn read_field_occurrence(
    fields: &mut FieldSet,
    unknown: &mut UnknownFieldSet,
    field: &FieldDescriptor,
    field_type: FieldType,
    number: u32,
    input: &mut CodedInput<'_>,
    pool: &DescriptorPool,
) -> Result<(), WireError>
{
    match field_type {
        FieldType::Message(target) => {
            let len = input.read_length()?;
            let old_limit = input.push_limit(len)?;
            input.increment_recursion_depth()?;
            let value = read_message_value(target, input, pool)?;
            input.decrement_recursion_depth();
            input.pop_limit(old_limit);
            store_message(fields, field, value);
        }
        FieldType::Group(target) => {
            input.increment_recursion_depth()?;
            let value = read_message_value(target, input, pool)?;
            input.check_last_tag_was(make_tag(number, WireType::EndGroup))?;
            input.decrement_recursion_depth();
            store_message(fields, field, value);
        }
        _ => read_scalar_occurrence(fields, unknown, field, field_type, input, pool)?,
    }
    Ok(())
}

fn read_message_value(
    target: MessageRef,
    input: &mut CodedInput<'_>,
    pool: &DescriptorPool,
) -> Result<DynamicMessage, WireError>
{
    let mut fields = FieldSet::new();
    let mut unknown = UnknownFieldSet::new();
    merge_message_fields(&mut fields, &mut unknown, target, input, pool)?;
    Ok(DynamicMessage::from_parts(target, fields, unknown))
}

/// Decode one scalar occurrence, routing unrecognized enum values into the
/// unknown set exactly as an unknown varint field would be.
fn read_scalar_occurrence(
    fields: &mut FieldSet,
    unknown: &mut UnknownFieldSet,
    field: &FieldDescriptor,
    field_type: FieldType,
    input: &mut CodedInput<'_>,
    pool: &DescriptorPool,
) -> Result<(), WireError>
{
    let value = match field_type {
        FieldType::Double => Value::Double(input.read_double()?),
        FieldType::Float => Value::Float(input.read_float()?),
        FieldType::Int32 => Value::Int32(input.read_int32()?),
        FieldType::Int64 => Value::Int64(input.read_int64()?),
        FieldType::UInt32 => Value::UInt32(input.read_uint32()?),
        FieldType::UInt64 => Value::UInt64(input.read_uint64()?),
        FieldType::SInt32 => Value::Int32(input.read_sint32()?),
        FieldType::SInt64 => Value::Int64(input.read_sint64()?),
        FieldType::Fixed32 => Value::UInt32(input.read_fixed32()?),
        FieldType::Fixed64 => Value::UInt64(input.read_fixed64()?),
        FieldType::SFixed32 => Value::Int32(input.read_sfixed32()?),
        FieldType::SFixed64 => Value::Int64(input.read_sfixed64()?),
        FieldType::Bool => Value::Bool(input.read_bool()?),
        FieldType::String => Value::String(input.read_string()?),
        FieldType::Bytes => Value::Bytes(input.read_bytes()?),
        FieldType::Enum(enum_ref) => {
            let n = input.read_enum()?;
            if pool.resolve_enum(enum_ref).value_by_number(n).is_none() {
                unknown.add_varint(field.number(), n as i64 as u64);
                return Ok(());
            }
            Value::Enum(enum_ref, n)
        }
        FieldType::Message(..) | FieldType::Group(..) => unreachable!(),
    };
    if field.is_repeated() {
        fields.push_repeated(field.number(), value);
    } else {
        fields.set_single(field.number(), value);
    }
    Ok(())
}

fn store_message(fields: &mut FieldSet, field: &FieldDescriptor, value: DynamicMessage)
{
    if field.is_repeated() {
        fields.push_repeated(field.number(), Value::Message(Box::new(value)));
    } else {
        fields.set_or_merge_message(field.number(), value);
    }
}
