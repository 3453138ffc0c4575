use protodyn::descriptor::proto::*;
use protodyn::descriptor::FileDescriptor;
use protodyn::dynamic::{DynamicBuilder, DynamicMessage, ReflectError, Value};
use protodyn::wire::WireError;

fn required_file() -> FileDescriptor
{
    let mut required = DescriptorProto::new("TestRequired");
    required.field.push(FieldDescriptorProto::scalar(
        "a", 1, FieldLabel::Required, ProtoType::Int32,
    ));
    required.field.push(FieldDescriptorProto::scalar(
        "b", 2, FieldLabel::Required, ProtoType::Int32,
    ));
    required.field.push(FieldDescriptorProto::scalar(
        "c", 3, FieldLabel::Required, ProtoType::Int32,
    ));

    let mut nested = DescriptorProto::new("TestNested");
    nested.field.push(FieldDescriptorProto::message(
        "optional_message", 1, FieldLabel::Optional, "TestRequired",
    ));
    nested.field.push(FieldDescriptorProto::message(
        "repeated_message", 2, FieldLabel::Repeated, "TestRequired",
    ));

    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(required);
    file.message_type.push(nested);
    FileDescriptor::build_from(file, &[]).unwrap()
}

#[test]
fn parse_reports_missing_required_fields()
{
    let file = required_file();
    let pool = file.pool();
    let msg = pool.find_message("TestRequired").unwrap();

    let err = DynamicMessage::parse_from(msg.self_ref(), b"", pool).unwrap_err();
    assert_eq!(err.to_string(), "Message missing required fields: a, b, c");

    let err = DynamicMessage::parse_from(msg.self_ref(), b"\x10\x01", pool).unwrap_err();
    assert_eq!(err.to_string(), "Message missing required fields: a, c");

    let value = DynamicMessage::parse_from(msg.self_ref(), b"\x08\x01\x10\x02\x18\x03", pool)
        .unwrap();
    assert!(value.is_initialized(pool));
}

#[test]
fn parse_partial_accepts_missing_required_fields()
{
    let file = required_file();
    let pool = file.pool();
    let msg = pool.find_message("TestRequired").unwrap();

    let value = DynamicMessage::parse_partial_from(msg.self_ref(), b"\x10\x01", pool).unwrap();
    assert!(!value.is_initialized(pool));
    assert_eq!(value.missing_fields(pool), vec!["a".to_string(), "c".to_string()]);
    assert_eq!(value.get(msg.field_by_name("b").unwrap()), Value::Int32(1));
}

#[test]
fn nested_missing_fields_use_dotted_paths()
{
    let file = required_file();
    let pool = file.pool();
    let required = pool.find_message("TestRequired").unwrap();
    let nested = pool.find_message("TestNested").unwrap();

    let empty = DynamicMessage::empty(required.self_ref());
    let mut builder = DynamicBuilder::new(nested.self_ref());
    builder
        .set(
            nested.field_by_name("optional_message").unwrap(),
            Value::Message(Box::new(empty.clone())),
        )
        .unwrap();
    builder
        .add_repeated(
            nested.field_by_name("repeated_message").unwrap(),
            Value::Message(Box::new(empty.clone())),
        )
        .unwrap();
    builder
        .add_repeated(
            nested.field_by_name("repeated_message").unwrap(),
            Value::Message(Box::new(empty)),
        )
        .unwrap();

    let err = builder.build(pool).unwrap_err();
    assert_eq!(
        err,
        ReflectError::Uninitialized {
            fields: "optional_message.a, optional_message.b, optional_message.c, \
                     repeated_message[0].a, repeated_message[0].b, repeated_message[0].c, \
                     repeated_message[1].a, repeated_message[1].b, repeated_message[1].c"
                .to_string(),
        },
    );

    let partial = builder.build_partial();
    assert_eq!(partial.missing_fields(pool).len(), 9);
}

#[test]
fn builder_build_checks_required_fields()
{
    let file = required_file();
    let pool = file.pool();
    let msg = pool.find_message("TestRequired").unwrap();

    let mut builder = DynamicBuilder::new(msg.self_ref());
    builder.set(msg.field_by_name("b").unwrap(), Value::Int32(2)).unwrap();
    let err = builder.build(pool).unwrap_err();
    assert_eq!(
        err,
        ReflectError::Uninitialized {
            fields: "a, c".to_string(),
        },
    );
    assert_eq!(err.to_string(), "Message missing required fields: a, c");

    // A failed build does not spend the builder.
    builder.set(msg.field_by_name("a").unwrap(), Value::Int32(1)).unwrap();
    builder.set(msg.field_by_name("c").unwrap(), Value::Int32(3)).unwrap();
    let value = builder.build(pool).unwrap();
    assert!(value.is_initialized(pool));
}

#[test]
fn uninitialized_wire_error_display()
{
    let file = required_file();
    let pool = file.pool();
    let msg = pool.find_message("TestRequired").unwrap();

    let err = DynamicMessage::parse_from(msg.self_ref(), b"", pool).unwrap_err();
    assert_eq!(
        err,
        WireError::Uninitialized {
            fields: "a, b, c".to_string(),
        },
    );
}
