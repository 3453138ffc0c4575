//! Immutable byte buffers with value semantics.

use bytes::Bytes;

/// An immutable sequence of bytes.
///
/// A `ByteString` owns its contents. Constructing one from a slice takes a
/// defensive copy and reading the contents out through [`ByteString::to_vec`]
/// copies again, so no mutation of outside buffers can ever be observed
/// through an already-constructed value. Cloning is cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteString
{
    bytes: Bytes,
}

impl ByteString
{
    /// An empty byte string.
    pub fn empty() -> Self
    {
        ByteString {
            bytes: Bytes::new(),
        }
    }

    /// Create a byte string by copying the given slice.
    pub fn copy_from(data: &[u8]) -> Self
    {
        ByteString {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    /// Number of bytes.
    pub fn len(&self) -> usize
    {
        self.bytes.len()
    }

    /// True if the byte string contains no bytes.
    pub fn is_empty(&self) -> bool
    {
        self.bytes.is_empty()
    }

    /// Borrow the contents as a slice.
    pub fn as_slice(&self) -> &[u8]
    {
        &self.bytes
    }

    /// Copy the contents into a fresh vector.
    pub fn to_vec(&self) -> Vec<u8>
    {
        self.bytes.to_vec()
    }
}

impl From<Vec<u8>> for ByteString
{
    fn from(data: Vec<u8>) -> Self
    {
        ByteString {
            bytes: Bytes::from(data),
        }
    }
}

impl From<String> for ByteString
{
    fn from(data: String) -> Self
    {
        ByteString {
            bytes: Bytes::from(data.into_bytes()),
        }
    }
}

impl AsRef<[u8]> for ByteString
{
    fn as_ref(&self) -> &[u8]
    {
        &self.bytes
    }
}
