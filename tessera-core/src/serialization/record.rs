//! Generic interchange record
//!
//! Every entity in the interchange document is a JSON object tagged with the
//! local name (`type`) and, outside the core namespace, the namespace (`ns`)
//! of its concrete kind. [`Record`] wraps such an object with typed
//! accessors that turn malformed input into structural errors.

use crate::error::{Error, Result};
use crate::factory::{QualifiedName, CORE_NAMESPACE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

const TYPE_KEY: &str = "type";
const NAMESPACE_KEY: &str = "ns";
const OPTIONAL_KEY: &str = "optional";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Empty record tagged with `name`
    pub fn new(name: &QualifiedName) -> Self {
        let mut fields = Map::new();
        fields.insert(TYPE_KEY.to_string(), Value::String(name.local_name().to_string()));
        if !name.is_core() {
            fields.insert(
                NAMESPACE_KEY.to_string(),
                Value::String(name.namespace().to_string()),
            );
        }
        Self { fields }
    }

    /// Untagged record, used when constructing entities by tag alone
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::structural(format!(
                "expected an entity object, found {}",
                other
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Qualified name from the `type` and `ns` tags
    pub fn qualified_name(&self) -> Result<QualifiedName> {
        let local = self.str(TYPE_KEY)?;
        let namespace = self.opt_str(NAMESPACE_KEY)?.unwrap_or(CORE_NAMESPACE);
        Ok(QualifiedName::new(local, namespace))
    }

    /// Whether an unknown kind in this record may be skipped
    ///
    /// Records from foreign namespaces are extensions, as is anything
    /// flagged `"optional": true`.
    pub fn is_optional(&self) -> bool {
        let flagged = self
            .fields
            .get(OPTIONAL_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let foreign = self
            .fields
            .get(NAMESPACE_KEY)
            .and_then(Value::as_str)
            .map(|ns| ns != CORE_NAMESPACE)
            .unwrap_or(false);
        flagged || foreign
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Result<&str> {
        self.opt_str(key)?
            .ok_or_else(|| Error::structural(format!("{} is missing attribute {:?}", self.describe(), key)))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&str>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(Error::structural(format!(
                "{} attribute {:?} must be a string",
                self.describe(),
                key
            ))),
        }
    }

    /// Typed attribute
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.opt(key)?
            .ok_or_else(|| Error::structural(format!("{} is missing attribute {:?}", self.describe(), key)))
    }

    pub fn opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                Error::structural(format!("{} attribute {:?}: {}", self.describe(), key, e))
            }),
        }
    }

    /// Nested entity records; a missing key is an empty list
    pub fn records(&self, key: &str) -> Result<Vec<Record>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().cloned().map(Record::from_value).collect(),
            Some(_) => Err(Error::structural(format!(
                "{} attribute {:?} must be a list",
                self.describe(),
                key
            ))),
        }
    }

    /// Single nested entity record
    pub fn record(&self, key: &str) -> Result<Option<Record>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Record::from_value(value.clone()).map(Some),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        self.fields.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn set_record(&mut self, key: &str, record: Record) {
        self.fields.insert(key.to_string(), record.into_value());
    }

    pub fn set_records(&mut self, key: &str, records: Vec<Record>) {
        self.fields.insert(
            key.to_string(),
            Value::Array(records.into_iter().map(Record::into_value).collect()),
        );
    }

    /// Short description for error messages
    pub fn describe(&self) -> String {
        let kind = self.fields.get(TYPE_KEY).and_then(Value::as_str).unwrap_or("record");
        match self.fields.get("id").and_then(Value::as_str) {
            Some(id) => format!("{} {:?}", kind, id),
            None => kind.to_string(),
        }
    }
}
