//! Protobuf text format rendering.
//!
//! One `name: value` line per scalar occurrence, message values as indented
//! `name { ... }` blocks, extensions bracketed by full name and unknown
//! fields printed by number in the shape they were captured in. Because
//! wrong-typed known fields are captured as unknown data, a message rendered
//! through this writer looks the same no matter which schema failed to
//! recognize its fields.

use crate::descriptor::{DescriptorPool, FieldDescriptor, MessageRef};
use crate::unknown::UnknownFieldSet;

use super::field_set::{FieldEntry, FieldSet};
use super::Value;

pub(super) fn print_fields(
    fields: &FieldSet,
    unknown: &UnknownFieldSet,
    msg_ref: MessageRef,
    pool: &DescriptorPool,
    indent: usize,
    out: &mut String,
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
            FieldEntry::Single(value) => print_field(field, value, pool, indent, out),
            FieldEntry::Repeated(values) => {
                for value in values {
                    print_field(field, value, pool, indent, out);
                }
            }
        }
    }
    print_unknown(unknown, indent, out);
}

fn print_field(
    field: &FieldDescriptor,
    value: &Value,
    pool: &DescriptorPool,
    indent: usize,
    out: &mut String,
)
{
    push_indent(indent, out);
    if field.is_extension() {
        out.push('[');
        out.push_str(field.full_name());
        out.push(']');
    } else {
        out.push_str(field.name());
    }
    match value {
        Value::Message(message) => {
            out.push_str(" {\n");
            print_fields(
                message.fields(),
                message.unknown_fields(),
                message.msg_ref(),
                pool,
                indent + 1,
                out,
            );
            push_indent(indent, out);
            out.push_str("}\n");
        }
        _ => {
            out.push_str(": ");
            print_scalar(value, pool, out);
            out.push('\n');
        }
    }
}

fn print_scalar(value: &Value, pool: &DescriptorPool, out: &mut String)
{
    match value {
        Value::Double(v) => out.push_str(&float_text(*v)),
        Value::Float(v) => out.push_str(&float_text(*v as f64)),
        Value::Int32(v) => out.push_str(&v.to_string()),
        Value::Int64(v) => out.push_str(&v.to_string()),
        Value::UInt32(v) => out.push_str(&v.to_string()),
        Value::UInt64(v) => out.push_str(&v.to_string()),
        Value::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        Value::String(v) => print_quoted(v.as_bytes(), out),
        Value::Bytes(v) => print_quoted(v.as_slice(), out),
        Value::Enum(enum_ref, number) => {
            match pool.resolve_enum(*enum_ref).value_by_number(*number) {
                Some(value) => out.push_str(value.name()),
                None => out.push_str(&number.to_string()),
            }
        }
        Value::Message(..) => unreachable!(),
    }
}

fn float_text(v: f64) -> String
{
    if v.is_nan() {
        "nan".to_string()
    } else if v == std::f64::INFINITY {
        "inf".to_string()
    } else if v == std::f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{}", v)
    }
}

fn print_quoted(bytes: &[u8], out: &mut String)
{
    out.push('"');
    for &b in bytes {
        match b {
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            0x0c => out.push_str("\\f"),
            0x0b => out.push_str("\\v"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out.push('"');
}

pub(super) fn print_unknown(unknown: &UnknownFieldSet, indent: usize, out: &mut String)
{
    for (number, field) in unknown.iter() {
        for v in &field.varints {
            push_indent(indent, out);
            out.push_str(&format!("{}: {}\n", number, v));
        }
        for v in &field.fixed32s {
            push_indent(indent, out);
            out.push_str(&format!("{}: 0x{:08x}\n", number, v));
        }
        for v in &field.fixed64s {
            push_indent(indent, out);
            out.push_str(&format!("{}: 0x{:016x}\n", number, v));
        }
        for v in &field.length_delimited {
            push_indent(indent, out);
            out.push_str(&format!("{}: ", number));
            print_quoted(v.as_slice(), out);
            out.push('\n');
        }
        for group in &field.groups {
            push_indent(indent, out);
            out.push_str(&format!("{} {{\n", number));
            print_unknown(group, indent + 1, out);
            push_indent(indent, out);
            out.push_str("}\n");
        }
    }
}

fn push_indent(indent: usize, out: &mut String)
{
    for _ in 0..indent {
        out.push_str("  ");
    }
}
