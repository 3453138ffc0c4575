//! Wire encoding against a descriptor.

use crate::descriptor::{DescriptorPool, FieldDescriptor, FieldType, MessageRef};
use crate::unknown::UnknownFieldSet;
use crate::wire::{CodedOutput, WireType};

use super::field_set::{FieldEntry, FieldSet};
use super::Value;

/// Serialize fields in ascending number order, unknown fields last. Fields
/// declared packed emit a single length-delimited run.
pub(super) fn write_fields(
    fields: &FieldSet,
    unknown: &UnknownFieldSet,
    msg_ref: MessageRef,
    pool: &DescriptorPool,
    output: &mut CodedOutput,
)
{
    let message = pool.resolve_message(msg_ref);
    for (&number, entry) in fields.iter() {
        let field = match message
            .field_by_number(number)
            .or_else(|| pool.find_extension(msg_ref, number))
        {
            Some(field) => field,
            None => continue,
        };
        match entry {
            FieldEntry::Single(value) => write_field(field, value, pool, output),
            FieldEntry::Repeated(values) => {
                if field.is_packed() {
                    let mut packed = CodedOutput::new();
                    for value in values {
                        write_scalar_no_tag(field.field_type(), value, &mut packed);
                    }
                    output.write_tag(number, WireType::LengthDelimited);
                    output.write_length(packed.len());
                    output.write_raw_bytes(packed.as_slice());
                } else {
                    for value in values {
                        write_field(field, value, pool, output);
                    }
                }
            }
        }
    }
    unknown.write_to(output);
}

fn write_field(
    field: &FieldDescriptor,
    value: &Value,
    pool: &DescriptorPool,
    output: &mut CodedOutput,
)
{
    let field_type = field.field_type();
    match (field_type, value) {
        (FieldType::Message(..), Value::Message(message)) => {
            let mut inner = CodedOutput::new();
            message.write_to(pool, &mut inner);
            output.write_message_bytes(field.number(), inner.as_slice());
        }
        (FieldType::Group(..), Value::Message(message)) => {
            output.write_tag(field.number(), WireType::StartGroup);
            message.write_to(pool, output);
            output.write_tag(field.number(), WireType::EndGroup);
        }
        _ => {
            output.write_tag(field.number(), field_type.wire_type());
            write_scalar_no_tag(field_type, value, output);
        }
    }
}

fn write_scalar_no_tag(field_type: FieldType, value: &Value, output: &mut CodedOutput)
{
    match (field_type, value) {
        (FieldType::Double, Value::Double(v)) => output.write_double_no_tag(*v),
        (FieldType::Float, Value::Float(v)) => output.write_float_no_tag(*v),
        (FieldType::Int32, Value::Int32(v)) => output.write_int32_no_tag(*v),
        (FieldType::Int64, Value::Int64(v)) => output.write_int64_no_tag(*v),
        (FieldType::UInt32, Value::UInt32(v)) => output.write_uint32_no_tag(*v),
        (FieldType::UInt64, Value::UInt64(v)) => output.write_uint64_no_tag(*v),
        (FieldType::SInt32, Value::Int32(v)) => output.write_sint32_no_tag(*v),
        (FieldType::SInt64, Value::Int64(v)) => output.write_sint64_no_tag(*v),
        (FieldType::Fixed32, Value::UInt32(v)) => output.write_fixed32_no_tag(*v),
        (FieldType::Fixed64, Value::UInt64(v)) => output.write_fixed64_no_tag(*v),
        (FieldType::SFixed32, Value::Int32(v)) => output.write_sfixed32_no_tag(*v),
        (FieldType::SFixed64, Value::Int64(v)) => output.write_sfixed64_no_tag(*v),
        (FieldType::Bool, Value::Bool(v)) => output.write_bool_no_tag(*v),
        (FieldType::String, Value::String(v)) => {
            output.write_length(v.len());
            output.write_raw_bytes(v.as_bytes());
        }
        (FieldType::Bytes, Value::Bytes(v)) => {
            output.write_length(v.len());
            output.write_raw_bytes(v.as_slice());
        }
        (FieldType::Enum(..), Value::Enum(_, number)) => output.write_enum_no_tag(*number),
        _ => panic!("value does not match field type"),
    }
}
