use protodyn::descriptor::proto::*;
use protodyn::descriptor::FileDescriptor;
use protodyn::dynamic::{DynamicMessage, Value};
use protodyn::wire::{CodedInput, CodedOutput, WireError, WireType};

fn scalar_file() -> FileDescriptor
{
    let mut message = DescriptorProto::new("Message");
    message.field.push(FieldDescriptorProto::scalar(
        "s", 1, FieldLabel::Optional, ProtoType::String,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "small", 2, FieldLabel::Optional, ProtoType::Int32,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "signed", 3, FieldLabel::Optional, ProtoType::Sint32,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "fixed", 4, FieldLabel::Optional, ProtoType::Fixed64,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "b", 5, FieldLabel::Optional, ProtoType::Bool,
    ));
    message
        .field
        .push(FieldDescriptorProto::message("child", 10, FieldLabel::Optional, "Message"));

    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    FileDescriptor::build_from(file, &[]).unwrap()
}

#[test]
fn scalar_fields()
{
    let file = scalar_file();
    let pool = file.pool();
    let msg = pool.find_message("Message").unwrap();

    let mut payload = CodedOutput::new();
    payload.write_string(1, "parent");
    payload.write_tag(2, WireType::Varint);
    payload.write_int32_no_tag(123);
    payload.write_tag(3, WireType::Varint);
    payload.write_sint32_no_tag(-123);
    payload.write_tag(4, WireType::Fixed64);
    payload.write_fixed64_no_tag(12356);
    payload.write_tag(5, WireType::Varint);
    payload.write_bool_no_tag(true);

    let mut child = CodedOutput::new();
    child.write_string(1, "child");
    payload.write_message_bytes(10, child.as_slice());

    let value = DynamicMessage::parse_from(msg.self_ref(), payload.as_slice(), pool).unwrap();

    assert_eq!(
        value.get(msg.field_by_name("s").unwrap()),
        Value::String("parent".to_string()),
    );
    assert_eq!(value.get(msg.field_by_name("small").unwrap()), Value::Int32(123));
    assert_eq!(value.get(msg.field_by_name("signed").unwrap()), Value::Int32(-123));
    assert_eq!(value.get(msg.field_by_name("fixed").unwrap()), Value::UInt64(12356));
    assert_eq!(value.get(msg.field_by_name("b").unwrap()), Value::Bool(true));

    let child_value = match value.get(msg.field_by_name("child").unwrap()) {
        Value::Message(m) => m,
        other => panic!("expected message, got {:?}", other),
    };
    assert_eq!(
        child_value.get(msg.field_by_name("s").unwrap()),
        Value::String("child".to_string()),
    );
    assert!(!child_value.has_field(msg.field_by_name("small").unwrap()));

    // Serialization is canonical: ascending field number order reproduces
    // the buffer that was built in that order.
    assert_eq!(value.encode(pool), payload.as_slice());
}

#[test]
fn repeated_and_packed()
{
    let mut message = DescriptorProto::new("Message");
    message.field.push(FieldDescriptorProto::scalar(
        "s", 1, FieldLabel::Repeated, ProtoType::String,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "small", 2, FieldLabel::Repeated, ProtoType::Int32,
    ));
    message.field.push(
        FieldDescriptorProto::scalar("large", 3, FieldLabel::Repeated, ProtoType::Int32)
            .with_packed(),
    );
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("Message").unwrap();

    let mut payload = Vec::new();
    payload.extend_from_slice(b"\x0a\x0bfirst value");
    payload.extend_from_slice(b"\x0a\x0csecond value");
    // An unpacked-declared int32 field arriving as a packed run.
    payload.extend_from_slice(b"\x12\x06\x01\x80\x01\x80\x80\x02");
    // A packed-declared field.
    payload.extend_from_slice(b"\x1a\x03\x01\x02\x03");

    let value = DynamicMessage::parse_from(msg.self_ref(), &payload, pool).unwrap();

    let s = msg.field_by_name("s").unwrap();
    assert_eq!(value.repeated_len(s), 2);
    assert_eq!(value.get_repeated(s, 0), &Value::String("first value".to_string()));
    assert_eq!(value.get_repeated(s, 1), &Value::String("second value".to_string()));

    let small = msg.field_by_name("small").unwrap();
    assert_eq!(value.repeated_len(small), 3);
    assert_eq!(value.get_repeated(small, 0), &Value::Int32(1));
    assert_eq!(value.get_repeated(small, 1), &Value::Int32(1 << 7));
    assert_eq!(value.get_repeated(small, 2), &Value::Int32(1 << 15));

    let large = msg.field_by_name("large").unwrap();
    assert_eq!(value.repeated_len(large), 3);

    // Re-encoding honors the declarations: `small` unpacked, `large` packed.
    let mut expected = Vec::new();
    expected.extend_from_slice(b"\x0a\x0bfirst value");
    expected.extend_from_slice(b"\x0a\x0csecond value");
    expected.extend_from_slice(b"\x10\x01\x10\x80\x01\x10\x80\x80\x02");
    expected.extend_from_slice(b"\x1a\x03\x01\x02\x03");
    assert_eq!(value.encode(pool), expected);
}

#[test]
fn singular_message_reoccurrence_merges()
{
    let file = scalar_file();
    let pool = file.pool();
    let msg = pool.find_message("Message").unwrap();

    // Two occurrences of the singular `child` field: their contents merge
    // into one instance, later scalars overwriting earlier ones.
    let mut first = CodedOutput::new();
    first.write_string(1, "one");
    first.write_tag(2, WireType::Varint);
    first.write_int32_no_tag(1);

    let mut second = CodedOutput::new();
    second.write_string(1, "two");

    let mut payload = CodedOutput::new();
    payload.write_message_bytes(10, first.as_slice());
    payload.write_message_bytes(10, second.as_slice());

    let value = DynamicMessage::parse_from(msg.self_ref(), payload.as_slice(), pool).unwrap();
    let child = match value.get(msg.field_by_name("child").unwrap()) {
        Value::Message(m) => m,
        other => panic!("expected message, got {:?}", other),
    };
    assert_eq!(
        child.get(msg.field_by_name("s").unwrap()),
        Value::String("two".to_string()),
    );
    assert_eq!(child.get(msg.field_by_name("small").unwrap()), Value::Int32(1));
}

#[test]
fn unknown_fields_roundtrip_byte_exact()
{
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(DescriptorProto::new("Empty"));
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("Empty").unwrap();

    let payload = b"\x08\x96\x01\x15\x01\x00\x00\x00\x1a\x03abc\x25\xff\xff\xff\xff";
    let value = DynamicMessage::parse_from(msg.self_ref(), payload, pool).unwrap();

    assert_eq!(value.unknown_fields().len(), 4);
    assert_eq!(value.unknown_fields().get(1).unwrap().varints, vec![150]);
    assert_eq!(value.encode(pool), payload.to_vec());
}

#[test]
fn wrong_wire_type_is_unknown_data()
{
    // The same payload against two schemas that disagree about field 1:
    // neither declaration matches the fixed32 occurrence, so both preserve
    // it untouched and render it identically.
    let mut as_string = DescriptorProto::new("M");
    as_string.field.push(FieldDescriptorProto::scalar(
        "s", 1, FieldLabel::Optional, ProtoType::String,
    ));
    let mut file_a = FileDescriptorProto::new("a.proto");
    file_a.message_type.push(as_string);
    let file_a = FileDescriptor::build_from(file_a, &[]).unwrap();

    let mut as_int = DescriptorProto::new("M");
    as_int.field.push(FieldDescriptorProto::scalar(
        "s", 1, FieldLabel::Optional, ProtoType::Int32,
    ));
    let mut file_b = FileDescriptorProto::new("b.proto");
    file_b.message_type.push(as_int);
    let file_b = FileDescriptor::build_from(file_b, &[]).unwrap();

    let payload = b"\x0d\x2a\x00\x00\x00";

    let msg_a = file_a.pool().find_message("M").unwrap();
    let value_a =
        DynamicMessage::parse_from(msg_a.self_ref(), payload, file_a.pool()).unwrap();
    let msg_b = file_b.pool().find_message("M").unwrap();
    let value_b =
        DynamicMessage::parse_from(msg_b.self_ref(), payload, file_b.pool()).unwrap();

    assert!(!value_a.has_field(msg_a.field_by_name("s").unwrap()));
    assert!(!value_b.has_field(msg_b.field_by_name("s").unwrap()));
    assert_eq!(value_a.to_text(file_a.pool()), "1: 0x0000002a\n");
    assert_eq!(value_a.to_text(file_a.pool()), value_b.to_text(file_b.pool()));
    assert_eq!(value_a.encode(file_a.pool()), payload.to_vec());
}

#[test]
fn unrecognized_enum_value_is_unknown_data()
{
    let mut color = EnumDescriptorProto::new("Color");
    color.value.push(EnumValueDescriptorProto::new("RED", 1));
    color.value.push(EnumValueDescriptorProto::new("BLUE", 2));

    let mut message = DescriptorProto::new("M");
    message.field.push(FieldDescriptorProto::enumeration(
        "color", 1, FieldLabel::Optional, "Color",
    ));

    let mut file = FileDescriptorProto::new("test.proto");
    file.enum_type.push(color);
    file.message_type.push(message);
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("M").unwrap();

    let value = DynamicMessage::parse_from(msg.self_ref(), b"\x08\x07", pool).unwrap();
    assert!(!value.has_field(msg.field_by_name("color").unwrap()));
    assert_eq!(value.unknown_fields().get(1).unwrap().varints, vec![7]);
    assert_eq!(value.encode(pool), b"\x08\x07".to_vec());

    let value = DynamicMessage::parse_from(msg.self_ref(), b"\x08\x02", pool).unwrap();
    let color_field = msg.field_by_name("color").unwrap();
    match value.get(color_field) {
        Value::Enum(_, 2) => {}
        other => panic!("expected enum value 2, got {:?}", other),
    }
}

#[test]
fn groups()
{
    let mut message = DescriptorProto::new("M");
    message.nested_type.push({
        let mut group = DescriptorProto::new("Inner");
        group.field.push(FieldDescriptorProto::scalar(
            "x", 1, FieldLabel::Optional, ProtoType::Int32,
        ));
        group
    });
    message.field.push(FieldDescriptorProto {
        name: "inner".to_string(),
        number: 3,
        label: FieldLabel::Optional,
        proto_type: Some(ProtoType::Group),
        type_name: "M.Inner".to_string(),
        ..Default::default()
    });
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("M").unwrap();

    // field 3 start-group, x = 5, field 3 end-group
    let payload = b"\x1b\x08\x05\x1c";
    let value = DynamicMessage::parse_from(msg.self_ref(), payload, pool).unwrap();
    let inner = match value.get(msg.field_by_name("inner").unwrap()) {
        Value::Message(m) => m,
        other => panic!("expected message, got {:?}", other),
    };
    let inner_msg = pool.find_message("M.Inner").unwrap();
    assert_eq!(inner.get(inner_msg.field_by_name("x").unwrap()), Value::Int32(5));
    assert_eq!(value.encode(pool), payload.to_vec());

    // Terminating with the wrong group's end tag is an error.
    let result = DynamicMessage::parse_from(msg.self_ref(), b"\x1b\x08\x05\x24", pool);
    assert_eq!(result, Err(WireError::InvalidEndTag));
    assert_eq!(
        result.unwrap_err().to_string(),
        "Protocol message end-group tag did not match expected tag.",
    );
}

#[test]
fn delimited_stream()
{
    let file = scalar_file();
    let pool = file.pool();
    let msg = pool.find_message("Message").unwrap();

    let first = DynamicMessage::parse_from(msg.self_ref(), b"\x10\x01", pool).unwrap();
    let second = DynamicMessage::parse_from(msg.self_ref(), b"\x10\x02", pool).unwrap();

    let mut stream = CodedOutput::new();
    first.write_delimited_to(pool, &mut stream);
    second.write_delimited_to(pool, &mut stream);
    assert_eq!(stream.as_slice(), b"\x02\x10\x01\x02\x10\x02");

    let mut input = CodedInput::new(stream.as_slice());
    let a = DynamicMessage::parse_delimited_from(msg.self_ref(), &mut input, pool).unwrap();
    let b = DynamicMessage::parse_delimited_from(msg.self_ref(), &mut input, pool).unwrap();
    let end = DynamicMessage::parse_delimited_from(msg.self_ref(), &mut input, pool).unwrap();

    assert_eq!(a, Some(first));
    assert_eq!(b, Some(second));
    assert_eq!(end, None);
}
