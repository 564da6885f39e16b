use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::{Error, ErrorKind, Result};

/// Reserved identifier field, unique per collection.
pub const ID_FIELD: &str = "_id";

/// A single field value. `Int` and `Float` form one numeric type class:
/// they compare and test equal across representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Document),
}

impl Value {
    /// Rank used to order values of different types relative to each other.
    /// Numbers share a rank regardless of representation.
    pub fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Date(_) => 4,
            Value::Array(_) => 5,
            Value::Object(_) => 6,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// True when both values belong to the same type class and can be
    /// meaningfully compared (numbers with numbers, text with text, ...).
    pub fn same_class(a: &Value, b: &Value) -> bool {
        a.type_rank() == b.type_rank()
    }

    /// Total order across all values: values of different type classes
    /// order by rank, values of the same class by their natural order.
    /// NaN falls back to `Equal` rather than poisoning the sort.
    pub fn compare(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Int(x), Value::Int(y)) => x.cmp(y),
            (x, y) if x.is_number() && y.is_number() => {
                let xf = x.as_f64().unwrap_or(0.0);
                let yf = y.as_f64().unwrap_or(0.0);
                xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
            }
            (Value::Text(x), Value::Text(y)) => x.cmp(y),
            (Value::Date(x), Value::Date(y)) => x.cmp(y),
            (Value::Array(x), Value::Array(y)) => {
                for (xv, yv) in x.iter().zip(y.iter()) {
                    let ord = Value::compare(xv, yv);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                x.len().cmp(&y.len())
            }
            (Value::Object(x), Value::Object(y)) => {
                for ((xn, xv), (yn, yv)) in x.iter().zip(y.iter()) {
                    let ord = xn.cmp(yn);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    let ord = Value::compare(xv, yv);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                x.len().cmp(&y.len())
            }
            _ => a.type_rank().cmp(&b.type_rank()),
        }
    }

    /// Strict equality within a type class. `Int(5)` equals `Float(5.0)`
    /// because both are numbers; `Text("5")` equals neither.
    pub fn equals(a: &Value, b: &Value) -> bool {
        Value::same_class(a, b) && Value::compare(a, b) == Ordering::Equal
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Object(v)
    }
}

/// A schema-less record: an insertion-ordered mapping from field name to
/// value. Field order is preserved for iteration and projection output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    /// Builder-style insert, for fixture and test construction.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Overwrite the named field in place, or append it if absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// The document identifier, if one has been assigned.
    pub fn id(&self) -> Option<&Value> {
        self.get(ID_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Build a document from a JSON object. Integers stay `Int`, other
    /// numbers become `Float`; nested objects and arrays convert
    /// recursively. Non-object input is a `Parse` error.
    pub fn from_json(json: &serde_json::Value) -> Result<Document> {
        match json {
            serde_json::Value::Object(map) => {
                let mut doc = Document::new();
                for (name, value) in map {
                    doc.set(name.clone(), value_from_json(value)?);
                }
                Ok(doc)
            }
            other => Err(Error::new(
                ErrorKind::Parse,
                format!("expected JSON object, got {}", other),
            )),
        }
    }

    pub fn parse_json(text: &str) -> Result<Document> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Document::from_json(&json)
    }

    /// Render the document as JSON. Dates become RFC 3339 text since
    /// JSON has no date type; non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), value_to_json(value));
        }
        serde_json::Value::Object(map)
    }
}

fn value_from_json(json: &serde_json::Value) -> Result<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(value_from_json(item)?);
            }
            Value::Array(out)
        }
        serde_json::Value::Object(_) => Value::Object(Document::from_json(json)?),
    })
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Object(doc) => doc.to_json(),
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = Document;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a map of field names to values")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Document, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut doc = Document::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    doc.set(name, value);
                }
                Ok(doc)
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_is_preserved() {
        let doc = Document::new()
            .with("title", "Echoes of Tomorrow")
            .with("author", "Ravi Sharma")
            .with("price", 500)
            .with("in_print", true);

        let names: Vec<&str> = doc.field_names().collect();
        assert_eq!(names, vec!["title", "author", "price", "in_print"]);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        doc.set("a", 10);

        let names: Vec<&str> = doc.field_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn numbers_compare_across_representation() {
        assert!(Value::equals(&Value::Int(5), &Value::Float(5.0)));
        assert_eq!(
            Value::compare(&Value::Int(3), &Value::Float(3.5)),
            Ordering::Less
        );
        assert!(!Value::equals(&Value::Int(5), &Value::Text("5".into())));
    }

    #[test]
    fn type_classes_order_by_rank() {
        assert_eq!(
            Value::compare(&Value::Null, &Value::Bool(false)),
            Ordering::Less
        );
        assert_eq!(
            Value::compare(&Value::Int(99999), &Value::Text("a".into())),
            Ordering::Less
        );
        assert_eq!(
            Value::compare(&Value::Text("z".into()), &Value::Date(Utc::now())),
            Ordering::Less
        );
    }

    #[test]
    fn null_equals_null_only() {
        assert!(Value::equals(&Value::Null, &Value::Null));
        assert!(!Value::equals(&Value::Null, &Value::Int(0)));
        assert!(!Value::equals(&Value::Null, &Value::Bool(false)));
    }

    #[test]
    fn json_round_trip_keeps_order_and_types() {
        let doc = Document::parse_json(r#"{"cid": 1, "cname": "Ravi", "amount": 500.5}"#).unwrap();
        assert_eq!(doc.get("cid"), Some(&Value::Int(1)));
        assert_eq!(doc.get("amount"), Some(&Value::Float(500.5)));

        let json = doc.to_json();
        assert_eq!(
            json,
            serde_json::json!({"cid": 1, "cname": "Ravi", "amount": 500.5})
        );
    }
}
