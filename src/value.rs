//! Dynamic values produced by script evaluation.
//!
//! Script tables are imported into this owned, tagged representation before
//! the marshaller ever sees them, so the converter never touches the script
//! runtime directly. Tables keep both faces of a Lua table: string-keyed
//! fields for structs and 1-based integer keys for sequences.

use crate::catalog::{CapabilityObject, Id};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::rc::Rc;

/// A script-produced value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(Vec<u8>),
    /// Shared so a table reachable along several paths is imported once.
    Table(Rc<Table>),
    Id(Id),
    Capability(Box<CapabilityObject>),
    /// Functions, coroutines and foreign userdata. Carries the runtime's type
    /// name for diagnostics; never matches a field kind.
    Opaque(&'static str),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Id(_) => "id",
            Value::Capability(_) => "resource object",
            Value::Opaque(name) => name,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Number(_))
    }

    /// Returns the exact integer this value represents, if any.
    ///
    /// Floats qualify only when they are finite, have no fractional part and
    /// fit in an `i64`.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            Value::Number(f) => float_to_integer(f),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Value::Integer(i) => Some(i as f64),
            Value::Number(f) => Some(f),
            _ => None,
        }
    }

    /// Bytes of a string-like value.
    ///
    /// Numbers are string-like and render the way the script runtime's
    /// `tostring` renders them.
    pub fn as_bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            Value::String(bytes) => Some(Cow::Borrowed(bytes.as_slice())),
            Value::Integer(i) => Some(Cow::Owned(i.to_string().into_bytes())),
            Value::Number(f) => Some(Cow::Owned(format_float(*f).into_bytes())),
            _ => None,
        }
    }

    /// Only true strings; numbers are not accepted where a name is expected.
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(bytes) => Some(String::from_utf8_lossy(bytes)),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table.as_ref()),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

fn float_to_integer(f: f64) -> Option<i64> {
    // i64::MIN is exactly representable; i64::MAX + 1 is the first float out of range.
    const LOWER: f64 = -9_223_372_036_854_775_808.0;
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    if f.is_finite() && f.fract() == 0.0 && (LOWER..UPPER).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        return if f.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if f.is_infinite() {
        return if f < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into_bytes())
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Value::Table(Rc::new(value))
    }
}

impl From<Id> for Value {
    fn from(value: Id) -> Self {
        Value::Id(value)
    }
}

impl From<CapabilityObject> for Value {
    fn from(value: CapabilityObject) -> Self {
        Value::Capability(Box::new(value))
    }
}

/// Key of a [`Table`] pair.
///
/// Floats with an integral value become [`TableKey::Integer`] so `t[1.0]` and
/// `t[1]` address the same slot. Tables, functions and other reference values
/// are keyed by identity.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TableKey {
    Bool(bool),
    Integer(i64),
    /// Non-integral float, by bit pattern.
    Number(u64),
    String(Vec<u8>),
    Id(Id),
    Object {
        type_name: &'static str,
        address: usize,
    },
}

impl TableKey {
    pub fn type_name(&self) -> &'static str {
        match self {
            TableKey::Bool(_) => "boolean",
            TableKey::Integer(_) | TableKey::Number(_) => "number",
            TableKey::String(_) => "string",
            TableKey::Id(_) => "id",
            TableKey::Object { type_name, .. } => type_name,
        }
    }
}

impl From<bool> for TableKey {
    fn from(key: bool) -> Self {
        TableKey::Bool(key)
    }
}

impl From<i64> for TableKey {
    fn from(key: i64) -> Self {
        TableKey::Integer(key)
    }
}

impl From<f64> for TableKey {
    fn from(key: f64) -> Self {
        match float_to_integer(key) {
            Some(i) => TableKey::Integer(i),
            None => TableKey::Number(key.to_bits()),
        }
    }
}

impl From<&str> for TableKey {
    fn from(key: &str) -> Self {
        TableKey::String(key.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for TableKey {
    fn from(key: Vec<u8>) -> Self {
        TableKey::String(key)
    }
}

impl From<Id> for TableKey {
    fn from(key: Id) -> Self {
        TableKey::Id(key)
    }
}

/// Associative table with Lua key semantics.
///
/// Pairs keep insertion order and assigning nil removes a pair. The sequence
/// border is maintained on every insert and removal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    entries: IndexMap<TableKey, Value>,
    border: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table whose values sit at keys `1..=n`.
    pub fn sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut table = Table::new();
        for (idx, item) in items.into_iter().enumerate() {
            table.insert(idx as i64 + 1, item);
        }
        table
    }

    /// Builds a table from string-keyed fields.
    pub fn fields<'a, I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<Value>,
    {
        let mut table = Table::new();
        for (name, item) in items {
            table.insert(name, item);
        }
        table
    }

    pub fn insert(&mut self, key: impl Into<TableKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if value.is_nil() {
            self.remove(&key);
            return;
        }
        let extends = key == TableKey::Integer(self.border as i64 + 1);
        self.entries.insert(key, value);
        if extends {
            while self
                .entries
                .contains_key(&TableKey::Integer(self.border as i64 + 1))
            {
                self.border += 1;
            }
        }
    }

    fn remove(&mut self, key: &TableKey) {
        if self.entries.shift_remove(key).is_none() {
            return;
        }
        if let TableKey::Integer(index) = *key {
            if index >= 1 && index as u64 <= self.border as u64 {
                self.border = index as usize - 1;
            }
        }
    }

    pub fn get(&self, key: &TableKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.entries.get(&TableKey::from(name))
    }

    /// 1-based sequence access.
    pub fn get_index(&self, index: i64) -> Option<&Value> {
        self.entries.get(&TableKey::Integer(index))
    }

    /// Sequence border: the largest `n` such that keys `1..=n` are all present.
    pub fn sequence_len(&self) -> usize {
        self.border
    }

    /// Number of pairs of any key type.
    pub fn pair_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every key/value pair, each visited exactly once.
    pub fn pairs(&self) -> impl Iterator<Item = (&TableKey, &Value)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_are_integers() {
        assert_eq!(Value::Number(42.0).as_integer(), Some(42));
        assert_eq!(Value::Number(-0.0).as_integer(), Some(0));
        assert_eq!(Value::Number(1.5).as_integer(), None);
        assert_eq!(Value::Number(f64::NAN).as_integer(), None);
        assert_eq!(Value::Number(1e19).as_integer(), None);
        assert_eq!(Value::from("42").as_integer(), None);
    }

    #[test]
    fn numbers_are_string_like() {
        assert_eq!(Value::Integer(-7).as_bytes().unwrap().as_ref(), b"-7");
        assert_eq!(Value::Number(2.0).as_bytes().unwrap().as_ref(), b"2.0");
        assert_eq!(Value::Number(0.5).as_bytes().unwrap().as_ref(), b"0.5");
        assert!(Value::Bool(true).as_bytes().is_none());
        assert!(Value::Integer(1).as_str().is_none());
    }

    #[test]
    fn sequence_border_stops_at_first_hole() {
        let mut table = Table::sequence([1i64, 2, 3]);
        assert_eq!(table.sequence_len(), 3);
        table.insert(2i64, Value::Nil);
        assert_eq!(table.sequence_len(), 1);
        assert_eq!(table.pair_count(), 2);
        table.insert(2i64, 20i64);
        assert_eq!(table.sequence_len(), 3);
    }

    #[test]
    fn border_follows_out_of_order_inserts() {
        let mut table = Table::new();
        table.insert(3i64, "c");
        table.insert(2i64, "b");
        assert_eq!(table.sequence_len(), 0);
        table.insert(1i64, "a");
        assert_eq!(table.sequence_len(), 3);
        table.insert(1i64, Value::Nil);
        assert_eq!(table.sequence_len(), 0);
    }

    #[test]
    fn fields_have_no_sequence_but_are_not_empty() {
        let table = Table::fields([("a", 1i64)]);
        assert_eq!(table.sequence_len(), 0);
        assert_eq!(table.pair_count(), 1);
        assert!(!table.is_empty());
        assert!(Table::new().is_empty());
    }

    #[test]
    fn float_keys_alias_integer_keys() {
        let mut table = Table::new();
        table.insert(1.0, "one");
        assert_eq!(table.get_index(1), Some(&Value::from("one")));
        table.insert(1i64, "uno");
        assert_eq!(table.pairs().count(), 1);
        assert_eq!(table.get(&TableKey::from(1.0)), Some(&Value::from("uno")));
        table.insert(1.5, "half");
        assert_eq!(table.get(&TableKey::from(1.5)), Some(&Value::from("half")));
        assert_eq!(table.sequence_len(), 1);
    }

    #[test]
    fn pairs_keep_insertion_order() {
        let mut table = Table::fields([("b", 1i64), ("a", 2i64)]);
        table.insert(1i64, true);
        let keys: Vec<_> = table.pairs().map(|(key, _)| key.type_name()).collect();
        assert_eq!(keys, vec!["string", "string", "number"]);
        assert_eq!(table.pairs().next().unwrap().0, &TableKey::from("b"));
    }

    #[test]
    fn long_sequences_index_directly() {
        let table = Table::sequence(0..100_000i64);
        assert_eq!(table.sequence_len(), 100_000);
        assert_eq!(table.get_index(100_000), Some(&Value::Integer(99_999)));
    }

    #[test]
    fn field_lookup_by_name() {
        let table = Table::fields([("path", "/etc/motd")]);
        assert_eq!(table.get_field("path"), Some(&Value::from("/etc/motd")));
        assert!(table.get_field("mode").is_none());
    }
}
