//!
//! Protodyn is a schema-driven protocol buffer runtime. It decodes and
//! encodes the binary wire format against a descriptor model built at
//! runtime from the flat `FileDescriptorProto` representation, so messages
//! can be read and written generically without per-type generated code.
//!
//! ```
//! use protodyn::descriptor::proto::*;
//! use protodyn::descriptor::FileDescriptor;
//! use protodyn::dynamic::{DynamicMessage, Value};
//!
//! let mut file = FileDescriptorProto::new("service.proto");
//! let mut message = DescriptorProto::new("Response");
//! message.field.push(FieldDescriptorProto::scalar(
//!     "distance", 1, FieldLabel::Optional, ProtoType::Int32,
//! ));
//! file.message_type.push(message);
//!
//! let file = FileDescriptor::build_from(file, &[]).unwrap();
//! let pool = file.pool();
//! let response = pool.find_message("Response").unwrap();
//!
//! let value = DynamicMessage::parse_from(response.self_ref(), b"\x08\xa9\x46", pool).unwrap();
//! let distance = response.field_by_name("distance").unwrap();
//! assert_eq!(value.get(distance), Value::Int32(9001));
//! ```
#![warn(missing_docs)]
#![allow(clippy::match_bool)]

pub mod byte_string;
pub mod descriptor;
pub mod dynamic;
pub mod unknown;
pub mod wire;

pub use byte_string::ByteString;
pub use descriptor::{DescriptorError, DescriptorPool, FileDescriptor};
pub use dynamic::{DynamicBuilder, DynamicMessage, ReflectError, Value};
pub use unknown::{UnknownField, UnknownFieldSet};
pub use wire::{CodedInput, CodedOutput, WireError, WireType};
