use protodyn::byte_string::ByteString;
use protodyn::descriptor::proto::*;
use protodyn::descriptor::FileDescriptor;
use protodyn::dynamic::{DynamicBuilder, DynamicMessage, Value};

#[test]
fn fields_are_written_in_number_order()
{
    let mut message = DescriptorProto::new("M");
    message.field.push(FieldDescriptorProto::scalar(
        "late", 7, FieldLabel::Optional, ProtoType::Int32,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "early", 2, FieldLabel::Optional, ProtoType::Int32,
    ));
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("M").unwrap();

    let mut builder = DynamicBuilder::new(msg.self_ref());
    builder.set(msg.field_by_name("late").unwrap(), Value::Int32(7)).unwrap();
    builder.set(msg.field_by_name("early").unwrap(), Value::Int32(2)).unwrap();
    let value = builder.build(pool).unwrap();

    // Number order, regardless of the order values were set in.
    assert_eq!(value.encode(pool), b"\x10\x02\x38\x07".to_vec());
}

#[test]
fn unknown_fields_are_written_last()
{
    let mut message = DescriptorProto::new("M");
    message.field.push(FieldDescriptorProto::scalar(
        "known", 5, FieldLabel::Optional, ProtoType::Int32,
    ));
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("M").unwrap();

    // Unknown field 1 arrives before the known field 5.
    let value = DynamicMessage::parse_from(msg.self_ref(), b"\x08\x01\x28\x05", pool).unwrap();
    assert_eq!(value.encode(pool), b"\x28\x05\x08\x01".to_vec());
}

#[test]
fn packed_option_is_ignored_on_unpackable_types()
{
    let mut message = DescriptorProto::new("M");
    message.field.push(
        FieldDescriptorProto::scalar("s", 1, FieldLabel::Repeated, ProtoType::String)
            .with_packed(),
    );
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("M").unwrap();

    let s = msg.field_by_name("s").unwrap();
    assert!(!s.is_packed());

    let mut builder = DynamicBuilder::new(msg.self_ref());
    builder.add_repeated(s, Value::String("ab".to_string())).unwrap();
    builder.add_repeated(s, Value::String("cd".to_string())).unwrap();
    let value = builder.build(pool).unwrap();

    // Each element gets its own tag; no single length-delimited run.
    assert_eq!(value.encode(pool), b"\x0a\x02ab\x0a\x02cd".to_vec());

    let back = DynamicMessage::parse_from(msg.self_ref(), b"\x0a\x02ab\x0a\x02cd", pool)
        .unwrap();
    assert_eq!(back.repeated_len(s), 2);
    assert_eq!(back.get_repeated(s, 1), &Value::String("cd".to_string()));
}

#[test]
fn fixed_width_and_length_delimited_scalars()
{
    let mut message = DescriptorProto::new("M");
    message.field.push(FieldDescriptorProto::scalar(
        "f", 1, FieldLabel::Optional, ProtoType::Float,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "d", 2, FieldLabel::Optional, ProtoType::Double,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "raw", 3, FieldLabel::Optional, ProtoType::Bytes,
    ));
    message.field.push(FieldDescriptorProto::scalar(
        "z", 4, FieldLabel::Optional, ProtoType::Sint64,
    ));
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    let file = FileDescriptor::build_from(file, &[]).unwrap();
    let pool = file.pool();
    let msg = pool.find_message("M").unwrap();

    let mut builder = DynamicBuilder::new(msg.self_ref());
    builder.set(msg.field_by_name("f").unwrap(), Value::Float(1.5)).unwrap();
    builder.set(msg.field_by_name("d").unwrap(), Value::Double(-2.0)).unwrap();
    builder
        .set(
            msg.field_by_name("raw").unwrap(),
            Value::Bytes(ByteString::from(b"\x00\xff".to_vec())),
        )
        .unwrap();
    builder.set(msg.field_by_name("z").unwrap(), Value::Int64(-1)).unwrap();
    let value = builder.build(pool).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(b"\x0d\x00\x00\xc0\x3f");
    expected.extend_from_slice(b"\x11\x00\x00\x00\x00\x00\x00\x00\xc0");
    expected.extend_from_slice(b"\x1a\x02\x00\xff");
    expected.extend_from_slice(b"\x20\x01");
    assert_eq!(value.encode(pool), expected);

    let back = DynamicMessage::parse_from(msg.self_ref(), &expected, pool).unwrap();
    assert_eq!(back, value);
}
