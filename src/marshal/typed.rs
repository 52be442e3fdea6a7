//! Schema-shaped output of the marshaller.

use crate::schema::{Enumerant, StructSchema};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A converted value. Integers keep their full-width representation whatever
/// the declared width.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Void,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Data(Vec<u8>),
    Enum(Enumerant),
    List(TypedList),
    Struct(TypedStruct),
}

impl TypedValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TypedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            TypedValue::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            TypedValue::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<Enumerant> {
        match self {
            TypedValue::Enum(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TypedList> {
        match self {
            TypedValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&TypedStruct> {
        match self {
            TypedValue::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TypedValue::Void => serializer.serialize_unit(),
            TypedValue::Bool(b) => serializer.serialize_bool(*b),
            TypedValue::Int(i) => serializer.serialize_i64(*i),
            TypedValue::UInt(u) => serializer.serialize_u64(*u),
            TypedValue::Float(f) => serializer.serialize_f64(*f),
            TypedValue::Text(s) => serializer.serialize_str(s),
            TypedValue::Data(bytes) => {
                let mut seq = serializer.serialize_seq(Some(bytes.len()))?;
                for byte in bytes {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
            TypedValue::Enum(e) => serializer.serialize_str(e.name),
            TypedValue::List(list) => list.serialize(serializer),
            TypedValue::Struct(s) => s.serialize(serializer),
        }
    }
}

/// Struct instance holding only the fields present in the input, in schema
/// declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedStruct {
    schema: &'static StructSchema,
    fields: Vec<(usize, TypedValue)>,
}

impl TypedStruct {
    pub(crate) fn new(schema: &'static StructSchema, mut fields: Vec<(usize, TypedValue)>) -> Self {
        fields.sort_by_key(|(ordinal, _)| *ordinal);
        Self { schema, fields }
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        let (ordinal, _) = self.schema.field(name)?;
        self.fields
            .iter()
            .find(|(o, _)| *o == ordinal)
            .map(|(_, value)| value)
    }

    /// Present fields as `(name, value)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TypedValue)> {
        let schema = self.schema;
        self.fields
            .iter()
            .map(move |(ordinal, value)| (schema.fields[*ordinal].name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for TypedStruct {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// List instance; element `i` came from script index `i + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedList {
    items: Vec<TypedValue>,
}

impl TypedList {
    pub(crate) fn new(items: Vec<TypedValue>) -> Self {
        Self { items }
    }

    pub fn get(&self, index: usize) -> Option<&TypedValue> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedValue> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Serialize for TypedList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}
