use protodyn::descriptor::proto::*;
use protodyn::descriptor::FileDescriptor;
use protodyn::dynamic::DynamicMessage;
use protodyn::wire::{CodedInput, CodedOutput, WireError, WireType};

fn recursive_file() -> FileDescriptor
{
    let mut message = DescriptorProto::new("Recursive");
    message.field.push(FieldDescriptorProto::message(
        "child", 1, FieldLabel::Optional, "Recursive",
    ));
    let mut file = FileDescriptorProto::new("test.proto");
    file.message_type.push(message);
    FileDescriptor::build_from(file, &[]).unwrap()
}

/// A payload nesting `child` messages `depth` levels below the root.
fn nest(depth: usize) -> Vec<u8>
{
    let mut payload = Vec::new();
    for _ in 0..depth {
        let mut outer = CodedOutput::new();
        outer.write_tag(1, WireType::LengthDelimited);
        outer.write_length(payload.len());
        outer.write_raw_bytes(&payload);
        payload = outer.into_vec();
    }
    payload
}

#[test]
fn default_recursion_limit()
{
    let file = recursive_file();
    let pool = file.pool();
    let msg = pool.find_message("Recursive").unwrap();

    // The root does not count against the limit; 64 nested children fit.
    assert!(DynamicMessage::parse_from(msg.self_ref(), &nest(64), pool).is_ok());

    let err = DynamicMessage::parse_from(msg.self_ref(), &nest(65), pool).unwrap_err();
    assert_eq!(err, WireError::RecursionLimitExceeded);
    assert_eq!(
        err.to_string(),
        "Protocol message had too many levels of nesting.  May be malicious.  \
         Use CodedInput::set_recursion_limit to increase the depth limit.",
    );
}

#[test]
fn explicit_recursion_limit()
{
    let file = recursive_file();
    let pool = file.pool();
    let msg = pool.find_message("Recursive").unwrap();

    let shallow = nest(8);
    let mut input = CodedInput::new(&shallow);
    input.set_recursion_limit(8);
    assert!(DynamicMessage::parse_from_input(msg.self_ref(), &mut input, pool).is_ok());

    let deep = nest(9);
    let mut input = CodedInput::new(&deep);
    input.set_recursion_limit(8);
    assert_eq!(
        DynamicMessage::parse_from_input(msg.self_ref(), &mut input, pool).unwrap_err(),
        WireError::RecursionLimitExceeded,
    );
}

#[test]
fn size_limit()
{
    let file = recursive_file();
    let pool = file.pool();
    let msg = pool.find_message("Recursive").unwrap();

    let payload = nest(10);
    let mut input = CodedInput::new(&payload);
    input.set_size_limit(8);
    assert_eq!(
        DynamicMessage::parse_from_input(msg.self_ref(), &mut input, pool).unwrap_err(),
        WireError::SizeLimitExceeded,
    );

    let mut input = CodedInput::new(&payload);
    input.set_size_limit(8);
    input.set_size_limit(payload.len());
    assert!(DynamicMessage::parse_from_input(msg.self_ref(), &mut input, pool).is_ok());
}

#[test]
fn truncated_input()
{
    let file = recursive_file();
    let pool = file.pool();
    let msg = pool.find_message("Recursive").unwrap();

    // A nested message claiming more bytes than remain.
    let err = DynamicMessage::parse_from(msg.self_ref(), b"\x0a\x05\x0a\x00", pool)
        .unwrap_err();
    assert_eq!(err, WireError::TruncatedMessage);
    assert_eq!(
        err.to_string(),
        "While parsing a protocol message, the input ended unexpectedly in the middle of \
         a field.  This could mean either that the input has been truncated or that an \
         embedded message misreported its own length.",
    );

    // A varint running past ten bytes.
    let err = DynamicMessage::parse_from(
        msg.self_ref(),
        b"\x10\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff",
        pool,
    )
    .unwrap_err();
    assert_eq!(err, WireError::MalformedVarint);

    // A zero tag.
    let err = DynamicMessage::parse_from(msg.self_ref(), b"\x00", pool).unwrap_err();
    assert_eq!(err, WireError::InvalidTag);
}
