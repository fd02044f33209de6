//! Records: stored data for one thing of one kind

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: String,
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder form of a raw field write (no validation)
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(super) fn store(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// What steps see as `this`: the stored fields plus `kind` and `id`
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("kind".into(), Value::String(self.kind.clone()));
        object.insert("id".into(), Value::String(self.id.clone()));
        Value::Object(object)
    }
}
