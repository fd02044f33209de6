//! Schema: property table for one kind of record
//!
//! Each property is either stored data or a composition. Computing a
//! composite property resolves its external dependencies on the same
//! record first, recursively.
//!
//! ```text
//! Schema::compute(record, "name")
//!   └─ Composition deps: [nameOverride, baseName, this]
//!        ├─ nameOverride → stored
//!        ├─ baseName     → composite → ...
//!        └─ this         → record.to_value()
//! ```

mod record;

pub use record::Record;

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::composition::Composition;
use crate::error::{CompositeError, Result};
use crate::input::UpdateSpec;
use crate::runtime::GenerationRun;
use crate::step::Environment;

/// How one property's value comes about
#[derive(Debug, Clone)]
pub enum PropertyDescriptor {
    /// Plain settable field, optionally validated
    Stored { update: Option<UpdateSpec> },
    /// Computed (or transformed, when the composition updates)
    Composite(Arc<Composition>),
}

#[derive(Debug, Clone)]
pub struct Schema {
    kind: String,
    properties: IndexMap<String, PropertyDescriptor>,
}

impl Schema {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn stored(mut self, name: impl Into<String>) -> Self {
        self.properties
            .insert(name.into(), PropertyDescriptor::Stored { update: None });
        self
    }

    pub fn stored_with(mut self, name: impl Into<String>, update: UpdateSpec) -> Self {
        self.properties.insert(
            name.into(),
            PropertyDescriptor::Stored {
                update: Some(update),
            },
        );
        self
    }

    pub fn composite(mut self, name: impl Into<String>, composition: Composition) -> Self {
        self.properties
            .insert(name.into(), PropertyDescriptor::Composite(Arc::new(composition)));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    fn descriptor(&self, name: &str) -> Result<&PropertyDescriptor> {
        self.properties
            .get(name)
            .ok_or_else(|| CompositeError::UnknownProperty {
                kind: self.kind.clone(),
                property: name.to_string(),
            })
    }

    /// Compute one property of `record`
    pub fn compute(&self, record: &Record, property: &str, run: &mut GenerationRun) -> Result<Value> {
        let mut resolver = Resolver {
            schema: self,
            record,
            stack: Vec::new(),
            resolved: FxHashMap::default(),
        };
        resolver.resolve(property, run)
    }

    /// Compute every property, in declaration order
    pub fn compute_all(&self, record: &Record, run: &mut GenerationRun) -> Result<Map<String, Value>> {
        let mut resolver = Resolver {
            schema: self,
            record,
            stack: Vec::new(),
            resolved: FxHashMap::default(),
        };
        let mut values = Map::new();
        for name in self.property_names() {
            values.insert(name.to_string(), resolver.resolve(name, run)?);
        }
        Ok(values)
    }

    /// Store a value, validated through the property's update description
    pub fn set(&self, record: &mut Record, property: &str, value: Value) -> Result<()> {
        let update = match self.descriptor(property)? {
            PropertyDescriptor::Stored { update } => update.as_ref(),
            PropertyDescriptor::Composite(composition) => {
                if !composition.flags().update {
                    return Err(CompositeError::ReadOnlyProperty {
                        property: property.to_string(),
                    });
                }
                composition.update()
            }
        };

        if let Some(update) = update {
            update
                .check(&value)
                .map_err(|e| CompositeError::UpdateRejected {
                    property: property.to_string(),
                    reason: format!("{e:#}"),
                })?;
        }

        record.store(property, value);
        Ok(())
    }
}

/// One resolution pass over a record
struct Resolver<'a> {
    schema: &'a Schema,
    record: &'a Record,
    stack: Vec<String>,
    resolved: FxHashMap<String, Value>,
}

impl Resolver<'_> {
    fn resolve(&mut self, property: &str, run: &mut GenerationRun) -> Result<Value> {
        if let Some(value) = self.resolved.get(property) {
            return Ok(value.clone());
        }
        if let Some(start) = self.stack.iter().position(|p| p == property) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(property.to_string());
            return Err(CompositeError::PropertyCycle {
                cycle: cycle.join(" -> "),
            });
        }

        let schema = self.schema;
        let value = match schema.descriptor(property)? {
            PropertyDescriptor::Stored { update } => self.stored(property, update.as_ref()),
            PropertyDescriptor::Composite(composition) => {
                self.stack.push(property.to_string());
                let value = self.composite(property, composition, run);
                self.stack.pop();
                value?
            }
        };

        self.resolved.insert(property.to_string(), value.clone());
        Ok(value)
    }

    fn stored(&self, property: &str, update: Option<&UpdateSpec>) -> Value {
        self.record
            .field(property)
            .cloned()
            .or_else(|| update.and_then(|u| u.default.clone()))
            .unwrap_or(Value::Null)
    }

    fn composite(
        &mut self,
        property: &str,
        composition: &Composition,
        run: &mut GenerationRun,
    ) -> Result<Value> {
        let mut env = Environment::default();
        for dependency in composition.dependencies() {
            let value = if dependency == "this" {
                self.record.to_value()
            } else {
                self.resolve(dependency, run)?
            };
            env.insert(dependency.clone(), value);
        }

        debug!(
            kind = %self.schema.kind,
            record = self.record.id(),
            property,
            dependencies = env.len(),
            "computing property"
        );

        if composition.flags().update {
            let stored = self.stored(property, composition.update());
            composition.transform(stored, &env, run)
        } else {
            composition.compute(&env, run)
        }
    }
}
