//! Schema-directed conversion from dynamic values to typed structs and lists.
//!
//! [`Marshaller::convert_struct`] walks every key/value pair of a table,
//! resolves the key against the struct schema and converts the value
//! according to the field kind, recursing into nested structs and lists.
//! Conversion is all-or-nothing: the typed tree is only returned when every
//! pair converted, and errors carry the path to the offending value. At most
//! one member of a struct's union may be present.

pub mod error;
pub mod typed;

pub use error::{Breadcrumb, MarshalError, MarshalErrorKind};
pub use typed::{TypedList, TypedStruct, TypedValue};

use crate::schema::{FieldKind, StructSchema};
use crate::value::{Table, TableKey, Value};

/// Default bound on nested struct/list descent.
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// Converter with a fixed recursion bound.
#[derive(Clone, Copy, Debug)]
pub struct Marshaller {
    max_depth: u32,
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Marshaller {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    /// Convert a string-keyed table into an instance of `schema`.
    ///
    /// `depth` is the nesting level of `value`; pass 0 for a root payload.
    pub fn convert_struct(
        &self,
        value: &Value,
        schema: &'static StructSchema,
        depth: u32,
    ) -> Result<TypedStruct, MarshalError> {
        self.check_depth(depth)
            .map_err(|err| err.within_struct(schema.name))?;
        let table = value.as_table().ok_or_else(|| {
            MarshalError::new(MarshalErrorKind::NotATable {
                found: value.type_name(),
            })
            .within_struct(schema.name)
        })?;
        self.struct_fields(table, schema, depth)
    }

    /// Like [`Marshaller::convert_struct`] for a table already in hand.
    pub fn convert_table(
        &self,
        table: &Table,
        schema: &'static StructSchema,
        depth: u32,
    ) -> Result<TypedStruct, MarshalError> {
        self.check_depth(depth)
            .map_err(|err| err.within_struct(schema.name))?;
        self.struct_fields(table, schema, depth)
    }

    fn struct_fields(
        &self,
        table: &Table,
        schema: &'static StructSchema,
        depth: u32,
    ) -> Result<TypedStruct, MarshalError> {
        let mut fields = Vec::with_capacity(table.pair_count());
        for (key, item) in table.pairs() {
            let TableKey::String(raw_key) = key else {
                return Err(MarshalError::new(MarshalErrorKind::NonStringKey).within_struct(schema.name));
            };
            let name = String::from_utf8_lossy(raw_key);
            let Some((ordinal, field)) = schema.field(&name) else {
                return Err(
                    MarshalError::new(MarshalErrorKind::UnknownField(name.into_owned()))
                        .within_struct(schema.name),
                );
            };
            let converted = self
                .convert_value(field.kind, item, field.name, depth)
                .map_err(|err| err.within_field(field.name).within_struct(schema.name))?;
            fields.push((ordinal, converted));
        }
        fields.sort_by_key(|(ordinal, _)| *ordinal);
        let mut members = fields
            .iter()
            .map(|(ordinal, _)| &schema.fields[*ordinal])
            .filter(|field| field.union);
        if let (Some(first), Some(second)) = (members.next(), members.next()) {
            return Err(MarshalError::new(MarshalErrorKind::UnionConflict {
                first: first.name,
                second: second.name,
            })
            .within_struct(schema.name));
        }
        Ok(TypedStruct::new(schema, fields))
    }

    /// Convert a sequence table (indices `1..=len`) into a list of `element`.
    pub fn convert_list(
        &self,
        value: &Value,
        element: &'static FieldKind,
        depth: u32,
    ) -> Result<TypedList, MarshalError> {
        self.check_depth(depth)?;
        let table = value.as_table().ok_or_else(|| {
            MarshalError::new(MarshalErrorKind::NotATable {
                found: value.type_name(),
            })
        })?;

        let len = table.sequence_len();
        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            let Some(item) = table.get_index(index as i64 + 1) else {
                break;
            };
            let subject = format!("[{index}]");
            let converted = self
                .convert_value(*element, item, &subject, depth)
                .map_err(|err| err.within_element(*element, index))?;
            items.push(converted);
        }
        Ok(TypedList::new(items))
    }

    fn check_depth(&self, depth: u32) -> Result<(), MarshalError> {
        if depth > self.max_depth {
            return Err(MarshalError::new(
                MarshalErrorKind::RecursionLimitExceeded {
                    limit: self.max_depth,
                },
            ));
        }
        Ok(())
    }

    /// Convert one field value or list element. `subject` names it in errors.
    fn convert_value(
        &self,
        kind: FieldKind,
        value: &Value,
        subject: &str,
        depth: u32,
    ) -> Result<TypedValue, MarshalError> {
        let mismatch = || {
            MarshalError::new(MarshalErrorKind::TypeMismatch {
                field: subject.to_string(),
                expected: kind.to_string(),
                found: value.type_name(),
            })
        };

        match kind {
            // Presence of the key is the whole meaning.
            FieldKind::Void => Ok(TypedValue::Void),
            FieldKind::Bool => match value {
                Value::Bool(b) => Ok(TypedValue::Bool(*b)),
                _ => Err(mismatch()),
            },
            kind if kind.is_signed_int() => self.integer(value, subject, mismatch).map(TypedValue::Int),
            kind if kind.is_unsigned_int() => match value {
                Value::Id(id) => Ok(TypedValue::UInt(id.value)),
                _ => self
                    .integer(value, subject, mismatch)
                    .map(|i| TypedValue::UInt(i as u64)),
            },
            kind if kind.is_float() => value.as_number().map(TypedValue::Float).ok_or_else(mismatch),
            FieldKind::Text => value
                .as_bytes()
                .map(|bytes| TypedValue::Text(String::from_utf8_lossy(&bytes).into_owned()))
                .ok_or_else(mismatch),
            FieldKind::Data => value
                .as_bytes()
                .map(|bytes| TypedValue::Data(bytes.into_owned()))
                .ok_or_else(mismatch),
            FieldKind::Enum(schema) => {
                let name = value.as_str().ok_or_else(mismatch)?;
                schema.variant(&name).map(TypedValue::Enum).ok_or_else(|| {
                    MarshalError::new(MarshalErrorKind::UnknownEnumerant {
                        field: subject.to_string(),
                        name: name.into_owned(),
                    })
                })
            }
            FieldKind::List(element) => {
                let table = value.as_table().ok_or_else(mismatch)?;
                if table.sequence_len() == 0 {
                    return Ok(TypedValue::List(TypedList::new(Vec::new())));
                }
                self.convert_list(value, element, depth + 1).map(TypedValue::List)
            }
            FieldKind::Struct(schema) => {
                // A resource object nested in a template stands for its table.
                let table = match value {
                    Value::Capability(object) => &*object.template,
                    other => other.as_table().ok_or_else(mismatch)?,
                };
                self.convert_table(table, schema, depth + 1)
                    .map(TypedValue::Struct)
            }
            other => Err(MarshalError::new(MarshalErrorKind::UnsupportedFieldKind {
                field: subject.to_string(),
                kind: other.to_string(),
            })),
        }
    }

    fn integer(
        &self,
        value: &Value,
        subject: &str,
        mismatch: impl FnOnce() -> MarshalError,
    ) -> Result<i64, MarshalError> {
        if !value.is_number() {
            return Err(mismatch());
        }
        value.as_integer().ok_or_else(|| {
            MarshalError::new(MarshalErrorKind::NonIntegerValue(subject.to_string()))
        })
    }
}

/// Convert with the default recursion bound, starting at depth 0.
pub fn convert_struct(value: &Value, schema: &'static StructSchema) -> Result<TypedStruct, MarshalError> {
    Marshaller::default().convert_struct(value, schema, 0)
}
