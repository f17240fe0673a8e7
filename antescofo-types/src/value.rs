//! Value model for data exchanged with the engine.
//!
//! The engine understands scalars (integers, floats, strings), ordered
//! lists ("tabs") and string-keyed maps. [`Value`] is the closed union
//! over those shapes; [`Tab`] and [`Map`] are the container types.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

/// A single engine value: scalar, tab, or map.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Tab(Tab),
    Map(Map),
}

impl Value {
    /// Numeric view of this value, if it has one. Strings are parsed,
    /// matching how the engine reports times in trace messages.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Tab(_) | Value::Map(_) => None,
        }
    }

    /// The value as a plain string: `Str` yields its contents unquoted,
    /// everything else its display form.
    pub fn display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Tab(t) => write!(f, "{}", t),
            Value::Map(m) => write!(f, "{}", m),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Tab> for Value {
    fn from(v: Tab) -> Self {
        Value::Tab(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(v)
    }
}

/// An ordered, index-addressable list of heterogeneous values.
///
/// Two tabs with equal contents are still distinct objects;
/// [`Tab::to_vec`] and [`Tab::from_vec`] always copy, never alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tab {
    values: Vec<Value>,
}

impl Tab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tab from a vector. The tab owns an independent copy of
    /// the storage.
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Copy the contents out into a fresh vector.
    pub fn to_vec(&self) -> Vec<Value> {
        self.values.clone()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

impl Index<usize> for Tab {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl IndexMut<usize> for Tab {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        &mut self.values[index]
    }
}

impl From<Vec<Value>> for Tab {
    fn from(values: Vec<Value>) -> Self {
        Self::from_vec(values)
    }
}

impl FromIterator<Value> for Tab {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Tab {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

/// A string-keyed map of heterogeneous values. Entry order carries no
/// meaning. Same copy-independence contract as [`Tab`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: HashMap<String, Value>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }

    pub fn to_map(&self) -> HashMap<String, Value> {
        self.entries.clone()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> std::collections::hash_map::Keys<'_, String, Value> {
        self.entries.keys()
    }
}

impl From<HashMap<String, Value>> for Map {
    fn from(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_to_vec_is_independent() {
        let mut tab = Tab::from_vec(vec![Value::Int(1), Value::Int(2)]);
        let copy = tab.to_vec();
        tab.push(3i64);
        assert_eq!(copy.len(), 2);
        assert_eq!(tab.len(), 3);
    }

    #[test]
    fn test_tab_from_vec_is_independent() {
        let source = vec![Value::Int(1)];
        let mut tab = Tab::from_vec(source.clone());
        tab[0] = Value::Int(9);
        assert_eq!(source[0], Value::Int(1));
    }

    #[test]
    fn test_tab_indexing() {
        let mut tab = Tab::from_vec(vec![Value::Int(1), Value::Str("x".into())]);
        assert_eq!(tab[0], Value::Int(1));
        tab[1] = Value::Float(2.5);
        assert_eq!(tab.get(1), Some(&Value::Float(2.5)));
        assert_eq!(tab.get(2), None);
    }

    #[test]
    fn test_tab_display_nested() {
        let inner = Tab::from_vec(vec![Value::Int(2), Value::Int(3)]);
        let tab = Tab::from_vec(vec![Value::Int(1), Value::Tab(inner), Value::Str("x".into())]);
        assert_eq!(tab.to_string(), "[1, [2, 3], x]");
    }

    #[test]
    fn test_map_insert_get() {
        let mut map = Map::new();
        map.insert("a", 1i64);
        map.insert("b", "two");
        assert_eq!(map.get("a"), Some(&Value::Int(1)));
        assert_eq!(map.get("b"), Some(&Value::Str("two".into())));
        assert!(map.get("c").is_none());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_map_to_map_is_independent() {
        let mut map = Map::new();
        map.insert("a", 1i64);
        let copy = map.to_map();
        map.insert("b", 2i64);
        assert_eq!(copy.len(), 1);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_map_display_single_entry() {
        let mut map = Map::new();
        map.insert("a", 1i64);
        assert_eq!(map.to_string(), "{a: 1}");
    }

    #[test]
    fn test_value_as_f64() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Str("2.25".into()).as_f64(), Some(2.25));
        assert_eq!(Value::Str("nope".into()).as_f64(), None);
        assert_eq!(Value::Tab(Tab::new()).as_f64(), None);
    }

    #[test]
    fn test_display_string_is_unquoted() {
        assert_eq!(Value::Str("hello".into()).display_string(), "hello");
        assert_eq!(Value::Int(7).display_string(), "7");
    }
}
