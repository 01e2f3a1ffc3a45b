//! Dynamically-typed field values.
//!
//! Every field crossing a schema boundary is represented as a closed
//! tagged variant so codecs check shapes at the boundary instead of
//! assuming them. Absence is modeled with `Option` at the field level;
//! there is no null variant.

use std::collections::BTreeMap;
use std::fmt;

use stevedore_common::error::{Result, StevedoreError};

/// An insertion-ordered string-keyed map.
///
/// Source documents treat mapping order as meaningful (a compose file's
/// service order is an implicit identifier), so the in-memory tree must
/// preserve it. The deterministic serializers re-sort keys at render time.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a key, replacing any existing entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(existing) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Looks up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Removes and returns a value by key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns `true` when the map holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns entries sorted ascending by key, for deterministic output.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Equality is over the key-value pairs, not insertion order: two maps
/// holding the same entries are the same mapping. Keys are unique
/// (`insert` replaces), so a one-way lookup check suffices.
impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl From<BTreeMap<String, Value>> for ValueMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

/// A dynamically-typed field value: string, integer, boolean, sequence,
/// or mapping. Absence is `Option<Value>` at the field level.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A text value.
    String(String),
    /// A whole number (unit-less CPU shares, MB of memory, ports).
    Integer(i64),
    /// A boolean flag.
    Boolean(bool),
    /// An ordered sequence of values.
    Sequence(Vec<Value>),
    /// An insertion-ordered mapping of string keys to values.
    Mapping(ValueMap),
}

impl Value {
    /// Short type name, used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Borrows the value as a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a boolean.
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrows the value as a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the value as a mapping.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&ValueMap> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Converts a parsed JSON tree into a canonical value.
    ///
    /// JSON `null` marks an unset value: null entries are omitted from
    /// mappings and sequences, and a document that is nothing but null
    /// converts to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::UnsupportedDocument`] for numbers the
    /// closed variant cannot carry (non-integral floats).
    pub fn from_json(raw: &serde_json::Value) -> Result<Option<Self>> {
        match raw {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Bool(b) => Ok(Some(Self::Boolean(*b))),
            serde_json::Value::Number(n) => integer_from_parts(n.as_i64(), n.as_f64()).map(Some),
            serde_json::Value::String(s) => Ok(Some(Self::String(s.clone()))),
            serde_json::Value::Array(items) => {
                let mut seq = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(value) = Self::from_json(item)? {
                        seq.push(value);
                    }
                }
                Ok(Some(Self::Sequence(seq)))
            }
            serde_json::Value::Object(fields) => {
                let mut map = ValueMap::new();
                for (key, value) in fields {
                    if let Some(value) = Self::from_json(value)? {
                        map.insert(key.clone(), value);
                    }
                }
                Ok(Some(Self::Mapping(map)))
            }
        }
    }

    /// Renders the value as a JSON tree with lexically sorted keys.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Integer(n) => serde_json::Value::Number((*n).into()),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Mapping(map) => serde_json::Value::Object(
                map.sorted_entries()
                    .into_iter()
                    .map(|(k, v)| (k.to_owned(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Converts a parsed YAML tree into a canonical value.
    ///
    /// Null handling matches [`Value::from_json`]; a compose file's bare
    /// `volumes:` keys (null-valued mapping entries) simply vanish, which
    /// is the intended reading.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::UnsupportedDocument`] for non-integral
    /// floats and YAML tagged values.
    pub fn from_yaml(raw: &serde_yaml::Value) -> Result<Option<Self>> {
        match raw {
            serde_yaml::Value::Null => Ok(None),
            serde_yaml::Value::Bool(b) => Ok(Some(Self::Boolean(*b))),
            serde_yaml::Value::Number(n) => integer_from_parts(n.as_i64(), n.as_f64()).map(Some),
            serde_yaml::Value::String(s) => Ok(Some(Self::String(s.clone()))),
            serde_yaml::Value::Sequence(items) => {
                let mut seq = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(value) = Self::from_yaml(item)? {
                        seq.push(value);
                    }
                }
                Ok(Some(Self::Sequence(seq)))
            }
            serde_yaml::Value::Mapping(fields) => {
                let mut map = ValueMap::new();
                for (key, value) in fields {
                    let key = key.as_str().ok_or_else(|| {
                        StevedoreError::unsupported("non-string mapping key in document")
                    })?;
                    if let Some(value) = Self::from_yaml(value)? {
                        map.insert(key, value);
                    }
                }
                Ok(Some(Self::Mapping(map)))
            }
            serde_yaml::Value::Tagged(_) => {
                Err(StevedoreError::unsupported("YAML tagged value in document"))
            }
        }
    }

    /// Renders the value as a YAML tree with lexically sorted keys.
    #[must_use]
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Self::String(s) => serde_yaml::Value::String(s.clone()),
            Self::Integer(n) => serde_yaml::Value::Number((*n).into()),
            Self::Boolean(b) => serde_yaml::Value::Bool(*b),
            Self::Sequence(items) => {
                serde_yaml::Value::Sequence(items.iter().map(Self::to_yaml).collect())
            }
            Self::Mapping(map) => {
                let mut out = serde_yaml::Mapping::new();
                for (key, value) in map.sorted_entries() {
                    let _ = out.insert(serde_yaml::Value::String(key.to_owned()), value.to_yaml());
                }
                serde_yaml::Value::Mapping(out)
            }
        }
    }
}

fn integer_from_parts(int: Option<i64>, float: Option<f64>) -> Result<Value> {
    if let Some(n) = int {
        return Ok(Value::Integer(n));
    }
    // Integral floats (e.g. YAML "200.0") are accepted as integers.
    #[allow(clippy::cast_possible_truncation)]
    match float {
        Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            Ok(Value::Integer(f as i64))
        }
        _ => Err(StevedoreError::unsupported(
            "non-integral number in document",
        )),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Mapping(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Self::Mapping(map)
    }
}
