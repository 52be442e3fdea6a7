//! Static schemas the marshaller validates against.
//!
//! Schemas are plain `'static` data: a struct is an ordered field list, a
//! list is a single element kind, an enum is a fixed set of variant names.
//! Payload schemas for the resource types live in [`catalog`] and are
//! resolvable by their short display name.

pub mod catalog;

use std::fmt;

/// Kind of a struct field or list element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Text,
    Data,
    Enum(&'static EnumSchema),
    List(&'static FieldKind),
    Struct(&'static StructSchema),
    /// Interface/capability pointers have no script-side representation.
    AnyPointer,
}

impl FieldKind {
    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            FieldKind::Int8 | FieldKind::Int16 | FieldKind::Int32 | FieldKind::Int64
        )
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(
            self,
            FieldKind::UInt8 | FieldKind::UInt16 | FieldKind::UInt32 | FieldKind::UInt64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, FieldKind::Float32 | FieldKind::Float64)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Void => f.write_str("Void"),
            FieldKind::Bool => f.write_str("Bool"),
            FieldKind::Int8 => f.write_str("Int8"),
            FieldKind::Int16 => f.write_str("Int16"),
            FieldKind::Int32 => f.write_str("Int32"),
            FieldKind::Int64 => f.write_str("Int64"),
            FieldKind::UInt8 => f.write_str("UInt8"),
            FieldKind::UInt16 => f.write_str("UInt16"),
            FieldKind::UInt32 => f.write_str("UInt32"),
            FieldKind::UInt64 => f.write_str("UInt64"),
            FieldKind::Float32 => f.write_str("Float32"),
            FieldKind::Float64 => f.write_str("Float64"),
            FieldKind::Text => f.write_str("Text"),
            FieldKind::Data => f.write_str("Data"),
            FieldKind::Enum(schema) => write!(f, "Enum({})", schema.name),
            FieldKind::List(element) => write!(f, "List({element})"),
            FieldKind::Struct(schema) => write!(f, "Struct({})", schema.name),
            FieldKind::AnyPointer => f.write_str("AnyPointer"),
        }
    }
}

/// One named field of a struct schema.
#[derive(Debug, PartialEq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Member of the struct's union; at most one member may be set.
    pub union: bool,
}

impl FieldSchema {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            union: false,
        }
    }

    pub const fn member(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            union: true,
        }
    }
}

/// Named struct with an ordered field list.
///
/// Schemas may refer to themselves, so equality is identity and `Debug`
/// prints only the name.
pub struct StructSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSchema],
}

impl StructSchema {
    /// Field lookup by name, returning its declaration ordinal too.
    pub fn field(&self, name: &str) -> Option<(usize, &'static FieldSchema)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
    }
}

/// Named enum with a fixed variant set; ordinals follow declaration order.
#[derive(Debug)]
pub struct EnumSchema {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumSchema {
    pub fn variant(&self, name: &str) -> Option<Enumerant> {
        self.variants
            .iter()
            .position(|variant| *variant == name)
            .map(|ordinal| Enumerant {
                ordinal: ordinal as u16,
                name: self.variants[ordinal],
            })
    }
}

impl PartialEq for StructSchema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for StructSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for EnumSchema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

/// A resolved enum variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Enumerant {
    pub ordinal: u16,
    pub name: &'static str,
}

/// Resolve a payload struct schema by its short display name.
pub fn lookup_struct(name: &str) -> Option<&'static StructSchema> {
    catalog::ALL_STRUCTS
        .iter()
        .copied()
        .find(|schema| schema.name == name)
}
