//! A dynamic representation of an options message.
//!
//! Interpreted option values are written into an [`OptionSet`]: a bag of
//! `(tag, value)` pairs kept in ascending tag order, together with the
//! not-yet-interpreted `uninterpreted_option` entries (field 999). The
//! set implements [`prost::Message`], so an options message containing
//! arbitrary extension fields can be serialized and later decoded as the
//! concrete generated type, or re-read with extensions intact. Encoding
//! is deterministic: ascending tags, list items in insertion order.

use bytes::{Buf, BufMut, Bytes};
use prost::{
    encoding::{
        self, decode_key, decode_varint, encode_key, encode_varint, encoded_len_varint, key_len,
        DecodeContext, WireType,
    },
    DecodeError, Message,
};
use prost_types::UninterpretedOption;

use crate::tag;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionSet {
    fields: Vec<(u32, Value)>,
    uninterpreted: Vec<UninterpretedOption>,
}

/// A single typed option value.
///
/// Scalar variants record the protobuf encoding, not just the rust type,
/// so that `sint32` and `int32` values round-trip with the right wire
/// format. Values decoded without a schema surface as `Uint64`,
/// `Fixed32`, `Fixed64`, `Bytes` or `Group` according to their wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Sint32(i32),
    Sint64(i64),
    Fixed32(u32),
    Fixed64(u64),
    Sfixed32(i32),
    Sfixed64(i64),
    Float(f32),
    Double(f64),
    Enum(i32),
    String(String),
    Bytes(Bytes),
    Message(OptionSet),
    Group(OptionSet),
    List(Vec<Value>),
}

impl OptionSet {
    pub fn new() -> Self {
        OptionSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.uninterpreted.is_empty()
    }

    pub fn get(&self, tag: i32) -> Option<&Value> {
        let tag = tag as u32;
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, tag: i32) -> Option<&mut Value> {
        let tag = tag as u32;
        self.fields
            .iter_mut()
            .find(|(t, _)| *t == tag)
            .map(|(_, value)| value)
    }

    /// Sets a singular field, replacing any existing value.
    pub fn set(&mut self, tag: i32, value: Value) {
        let tag = tag as u32;
        match self.fields.iter().position(|(t, _)| *t == tag) {
            Some(index) => self.fields[index].1 = value,
            None => self.insert_sorted(tag, value),
        }
    }

    /// Returns the message value stored at `tag`, inserting an empty one
    /// if the field is unset. `group` selects the wire representation
    /// when inserting.
    pub fn get_or_insert_message(&mut self, tag: i32, group: bool) -> Option<&mut OptionSet> {
        let utag = tag as u32;
        if self.get(tag).is_none() {
            let value = if group {
                Value::Group(OptionSet::new())
            } else {
                Value::Message(OptionSet::new())
            };
            self.insert_sorted(utag, value);
        }
        match self.get_mut(tag) {
            Some(Value::Message(set)) | Some(Value::Group(set)) => Some(set),
            _ => None,
        }
    }

    /// Appends to a repeated field, creating the list if the field is
    /// unset. Returns the index of the appended item.
    pub fn push_list_item(&mut self, tag: i32, value: Value) -> usize {
        let utag = tag as u32;
        match self.fields.iter().position(|(t, _)| *t == utag) {
            Some(index) => match &mut self.fields[index].1 {
                Value::List(items) => {
                    items.push(value);
                    items.len() - 1
                }
                _ => panic!("push_list_item on non-list field"),
            },
            None => {
                self.insert_sorted(utag, Value::List(vec![value]));
                0
            }
        }
    }

    /// Number of items currently stored in a repeated field.
    pub fn list_len(&self, tag: i32) -> usize {
        match self.get(tag) {
            Some(Value::List(items)) => items.len(),
            Some(_) => 1,
            None => 0,
        }
    }

    /// Typed fields in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Value)> + '_ {
        self.fields.iter().map(|(tag, value)| (*tag as i32, value))
    }

    pub fn uninterpreted(&self) -> &[UninterpretedOption] {
        &self.uninterpreted
    }

    pub fn push_uninterpreted(&mut self, option: UninterpretedOption) {
        self.uninterpreted.push(option);
    }

    pub fn take_uninterpreted(&mut self) -> Vec<UninterpretedOption> {
        std::mem::take(&mut self.uninterpreted)
    }

    pub fn set_uninterpreted(&mut self, options: Vec<UninterpretedOption>) {
        self.uninterpreted = options;
    }

    /// Copies fields from `other` that are absent here, recursing into
    /// message values present on both sides. Existing scalar and list
    /// entries win.
    pub fn merge_absent(&mut self, other: &OptionSet) {
        for (tag, value) in &other.fields {
            match self.fields.iter().position(|(t, _)| t == tag) {
                None => self.insert_sorted(*tag, value.clone()),
                Some(index) => {
                    if let (
                        Value::Message(existing) | Value::Group(existing),
                        Value::Message(incoming) | Value::Group(incoming),
                    ) = (&mut self.fields[index].1, value)
                    {
                        existing.merge_absent(incoming);
                    }
                }
            }
        }
    }

    fn insert_sorted(&mut self, tag: u32, value: Value) {
        let index = self
            .fields
            .iter()
            .position(|(t, _)| *t > tag)
            .unwrap_or(self.fields.len());
        self.fields.insert(index, (tag, value));
    }
}

impl Value {
    pub fn as_message(&self) -> Option<&OptionSet> {
        match self {
            Value::Message(set) | Value::Group(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int32(v) | Value::Sint32(v) | Value::Sfixed32(v) | Value::Enum(v) => {
                Some(v as i64)
            }
            Value::Int64(v) | Value::Sint64(v) | Value::Sfixed64(v) => Some(v),
            Value::Uint32(v) | Value::Fixed32(v) => Some(v as i64),
            Value::Uint64(v) | Value::Fixed64(v) => i64::try_from(v).ok(),
            Value::Bool(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    fn varint(&self) -> u64 {
        match *self {
            Value::Bool(v) => v as u64,
            Value::Int32(v) => v as i64 as u64,
            Value::Enum(v) => v as i64 as u64,
            Value::Int64(v) => v as u64,
            Value::Uint32(v) => v as u64,
            Value::Uint64(v) => v,
            Value::Sint32(v) => (v.wrapping_shl(1) ^ (v >> 31)) as u32 as u64,
            Value::Sint64(v) => (v.wrapping_shl(1) ^ (v >> 63)) as u64,
            _ => unreachable!("not a varint value"),
        }
    }

    fn encode<B>(&self, tag: u32, buf: &mut B)
    where
        B: BufMut,
    {
        match self {
            Value::List(items) => {
                for item in items {
                    item.encode(tag, buf);
                }
            }
            Value::Group(set) => {
                encode_key(tag, WireType::StartGroup, buf);
                set.encode_raw(buf);
                encode_key(tag, WireType::EndGroup, buf);
            }
            Value::Message(set) => {
                encode_key(tag, WireType::LengthDelimited, buf);
                encode_varint(set.encoded_len() as u64, buf);
                set.encode_raw(buf);
            }
            Value::String(value) => {
                encode_key(tag, WireType::LengthDelimited, buf);
                encode_varint(value.len() as u64, buf);
                buf.put_slice(value.as_bytes());
            }
            Value::Bytes(value) => {
                encode_key(tag, WireType::LengthDelimited, buf);
                encode_varint(value.len() as u64, buf);
                buf.put_slice(value);
            }
            Value::Fixed32(value) => {
                encode_key(tag, WireType::ThirtyTwoBit, buf);
                buf.put_u32_le(*value);
            }
            Value::Sfixed32(value) => {
                encode_key(tag, WireType::ThirtyTwoBit, buf);
                buf.put_i32_le(*value);
            }
            Value::Float(value) => {
                encode_key(tag, WireType::ThirtyTwoBit, buf);
                buf.put_f32_le(*value);
            }
            Value::Fixed64(value) => {
                encode_key(tag, WireType::SixtyFourBit, buf);
                buf.put_u64_le(*value);
            }
            Value::Sfixed64(value) => {
                encode_key(tag, WireType::SixtyFourBit, buf);
                buf.put_i64_le(*value);
            }
            Value::Double(value) => {
                encode_key(tag, WireType::SixtyFourBit, buf);
                buf.put_f64_le(*value);
            }
            _ => {
                encode_key(tag, WireType::Varint, buf);
                encode_varint(self.varint(), buf);
            }
        }
    }

    fn encoded_len(&self, tag: u32) -> usize {
        match self {
            Value::List(items) => items.iter().map(|item| item.encoded_len(tag)).sum(),
            Value::Group(set) => 2 * key_len(tag) + set.encoded_len(),
            Value::Message(set) => {
                let len = set.encoded_len();
                key_len(tag) + encoded_len_varint(len as u64) + len
            }
            Value::String(value) => {
                key_len(tag) + encoded_len_varint(value.len() as u64) + value.len()
            }
            Value::Bytes(value) => {
                key_len(tag) + encoded_len_varint(value.len() as u64) + value.len()
            }
            Value::Fixed32(_) | Value::Sfixed32(_) | Value::Float(_) => key_len(tag) + 4,
            Value::Fixed64(_) | Value::Sfixed64(_) | Value::Double(_) => key_len(tag) + 8,
            _ => key_len(tag) + encoded_len_varint(self.varint()),
        }
    }
}

impl Message for OptionSet {
    fn encode_raw<B>(&self, buf: &mut B)
    where
        B: BufMut,
    {
        let uninterpreted_tag = tag::options::UNINTERPRETED as u32;

        for (tag, value) in &self.fields {
            if *tag >= uninterpreted_tag {
                break;
            }
            value.encode(*tag, buf);
        }
        for option in &self.uninterpreted {
            encoding::message::encode(uninterpreted_tag, option, buf);
        }
        for (tag, value) in &self.fields {
            if *tag < uninterpreted_tag {
                continue;
            }
            value.encode(*tag, buf);
        }
    }

    fn encoded_len(&self) -> usize {
        let fields: usize = self
            .fields
            .iter()
            .map(|(tag, value)| value.encoded_len(*tag))
            .sum();
        let uninterpreted: usize = self
            .uninterpreted
            .iter()
            .map(|option| encoding::message::encoded_len(tag::options::UNINTERPRETED as u32, option))
            .sum();
        fields + uninterpreted
    }

    fn merge_field<B>(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        B: Buf,
    {
        if tag == tag::options::UNINTERPRETED as u32 {
            let mut option = UninterpretedOption::default();
            encoding::message::merge(wire_type, &mut option, buf, ctx)?;
            self.uninterpreted.push(option);
            return Ok(());
        }

        let value = match wire_type {
            WireType::Varint => Value::Uint64(decode_varint(buf)?),
            WireType::ThirtyTwoBit => {
                if buf.remaining() < 4 {
                    return Err(DecodeError::new("buffer underflow"));
                }
                Value::Fixed32(buf.get_u32_le())
            }
            WireType::SixtyFourBit => {
                if buf.remaining() < 8 {
                    return Err(DecodeError::new("buffer underflow"));
                }
                Value::Fixed64(buf.get_u64_le())
            }
            WireType::LengthDelimited => {
                let len = decode_varint(buf)? as usize;
                if buf.remaining() < len {
                    return Err(DecodeError::new("buffer underflow"));
                }
                Value::Bytes(buf.copy_to_bytes(len))
            }
            WireType::StartGroup => {
                let mut group = OptionSet::new();
                loop {
                    let (inner_tag, inner_wire_type) = decode_key(buf)?;
                    if inner_wire_type == WireType::EndGroup {
                        if inner_tag != tag {
                            return Err(DecodeError::new("unexpected end group tag"));
                        }
                        break;
                    }
                    group.merge_field(inner_tag, inner_wire_type, buf, ctx.clone())?;
                }
                Value::Group(group)
            }
            WireType::EndGroup => return Err(DecodeError::new("unexpected end group tag")),
        };

        // Repeated occurrences of a tag accumulate in field order.
        match self.fields.iter().position(|(t, _)| *t == tag) {
            Some(index) => match &mut self.fields[index].1 {
                Value::List(items) => items.push(value),
                existing => {
                    let first = existing.clone();
                    *existing = Value::List(vec![first, value]);
                }
            },
            None => self.insert_sorted(tag, value),
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.fields.clear();
        self.uninterpreted.clear();
    }
}
