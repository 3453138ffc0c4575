//! Field-number keyed value storage shared by messages and builders.

use std::collections::BTreeMap;

use super::Value;

/// The stored shape of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry
{
    /// A singular field with a present value.
    Single(Value),

    /// A repeated field with its elements in insertion order.
    Repeated(Vec<Value>),
}

/// Values keyed by field number. Iteration is in ascending number order,
/// which is also the canonical serialization order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldSet
{
    entries: BTreeMap<u32, FieldEntry>,
}

impl FieldSet
{
    pub fn new() -> Self
    {
        FieldSet::default()
    }

    pub fn get(&self, number: u32) -> Option<&FieldEntry>
    {
        self.entries.get(&number)
    }

    pub fn set_single(&mut self, number: u32, value: Value)
    {
        self.entries.insert(number, FieldEntry::Single(value));
    }

    pub fn push_repeated(&mut self, number: u32, value: Value)
    {
        match self
            .entries
            .entry(number)
            .or_insert_with(|| FieldEntry::Repeated(Vec::new()))
        {
            FieldEntry::Repeated(values) => values.push(value),
            entry @ FieldEntry::Single(..) => *entry = FieldEntry::Repeated(vec![value]),
        }
    }

    /// Replace an element of a repeated field. Returns the previous length
    /// when `index` is out of range.
    pub fn set_repeated(&mut self, number: u32, index: usize, value: Value) -> Result<(), usize>
    {
        match self.entries.get_mut(&number) {
            Some(FieldEntry::Repeated(values)) if index < values.len() => {
                values[index] = value;
                Ok(())
            }
            Some(FieldEntry::Repeated(values)) => Err(values.len()),
            _ => Err(0),
        }
    }

    /// Store a parsed singular message occurrence. A second occurrence of a
    /// singular message field on the wire merges into the first.
    pub fn set_or_merge_message(&mut self, number: u32, value: super::DynamicMessage)
    {
        match self.entries.get_mut(&number) {
            Some(FieldEntry::Single(Value::Message(existing))) => existing.merge_with(&value),
            _ => self.set_single(number, Value::Message(Box::new(value))),
        }
    }

    pub fn clear(&mut self, number: u32)
    {
        self.entries.remove(&number);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &FieldEntry)>
    {
        self.entries.iter()
    }

    /// Merge `other` into `self` with message merge semantics: singular
    /// scalars are overwritten, singular messages merge recursively and
    /// repeated elements are appended.
    pub fn merge_from(&mut self, other: &FieldSet)
    {
        for (&number, entry) in other.iter() {
            match entry {
                FieldEntry::Repeated(values) => {
                    for value in values {
                        self.push_repeated(number, value.clone());
                    }
                }
                FieldEntry::Single(value) => {
                    match (self.entries.get_mut(&number), value) {
                        (
                            Some(FieldEntry::Single(Value::Message(existing))),
                            Value::Message(incoming),
                        ) => existing.merge_with(incoming),
                        _ => self.set_single(number, value.clone()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test
{
    use super::*;

    #[test]
    fn merge_overwrites_scalars_and_appends_repeated()
    {
        let mut left = FieldSet::new();
        left.set_single(1, Value::Int32(1));
        left.push_repeated(2, Value::String("a".to_string()));

        let mut right = FieldSet::new();
        right.set_single(1, Value::Int32(2));
        right.push_repeated(2, Value::String("b".to_string()));

        left.merge_from(&right);
        assert_eq!(left.get(1), Some(&FieldEntry::Single(Value::Int32(2))));
        assert_eq!(
            left.get(2),
            Some(&FieldEntry::Repeated(vec![
                Value::String("a".to_string()),
                Value::String("b".to_string()),
            ])),
        );
    }
}
