//! Dependency environments and the filtered view a step receives

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Full environment visible to a composition: names to values.
///
/// Always carries `this` when computed for a record.
pub type Environment = FxHashMap<String, Value>;

/// Build an environment from pairs
pub fn environment<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Environment
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// The dependencies a step declared, and nothing else.
///
/// Ordered maps keep the flattened cache key stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deps {
    names: BTreeMap<String, Value>,
    inputs: BTreeMap<String, Value>,
    static_names: BTreeMap<String, String>,
    update_value: Option<Value>,
}

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named dependency (builder form, for testing steps in isolation)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.names.insert(name.into(), value.into());
        self
    }

    /// Add an input value (builder form)
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    /// Named dependency, or an error naming the missing dependency
    pub fn require(&self, name: &str) -> anyhow::Result<&Value> {
        self.names
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("dependency '{name}' is not available to this step"))
    }

    /// Value of an input of the enclosing template
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Input value, treating an absent input as null
    pub fn input_or_null(&self, name: &str) -> &Value {
        self.inputs.get(name).unwrap_or(&Value::Null)
    }

    /// Dependency name bound to a static-dependency input
    pub fn static_dependency(&self, name: &str) -> Option<&str> {
        self.static_names.get(name).map(String::as_str)
    }

    pub fn this(&self) -> Option<&Value> {
        self.names.get("this")
    }

    pub fn update_value(&self) -> Option<&Value> {
        self.update_value.as_ref()
    }

    /// Declared dependency names that were present
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
            && self.inputs.is_empty()
            && self.static_names.is_empty()
            && self.update_value.is_none()
    }

    pub(crate) fn insert_name(&mut self, name: &str, value: Value) {
        self.names.insert(name.to_string(), value);
    }

    pub(crate) fn insert_input(&mut self, name: &str, value: Value) {
        self.inputs.insert(name.to_string(), value);
    }

    pub(crate) fn insert_static_name(&mut self, input: &str, dependency: &str) {
        self.static_names
            .insert(input.to_string(), dependency.to_string());
    }

    pub(crate) fn set_update_value(&mut self, value: Value) {
        self.update_value = Some(value);
    }

    /// Flatten into one section per kind of dependency: names, inputs,
    /// static names, then the update value.
    ///
    /// Each section is an array of alternating keys and values, so a plain
    /// name can never stand in for an input of the same spelling.
    pub fn flatten(&self) -> Vec<Value> {
        fn section<'a, V: Clone + Into<Value> + 'a>(
            entries: impl Iterator<Item = (&'a String, &'a V)>,
        ) -> Value {
            Value::Array(
                entries
                    .flat_map(|(k, v)| [Value::String(k.clone()), v.clone().into()])
                    .collect(),
            )
        }

        vec![
            section(self.names.iter()),
            section(self.inputs.iter()),
            section(self.static_names.iter()),
            Value::Array(self.update_value.iter().cloned().collect()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_names_missing_dependency() {
        let deps = Deps::new().with("n", 5);
        assert_eq!(deps.require("n").unwrap(), &json!(5));
        let err = deps.require("m").unwrap_err();
        assert!(err.to_string().contains("'m'"));
    }

    #[test]
    fn test_flatten_sections_by_kind() {
        let deps = Deps::new().with("b", 2).with("a", 1).with_input("from", "x");
        assert_eq!(
            deps.flatten(),
            vec![json!(["a", 1, "b", 2]), json!(["from", "x"]), json!([]), json!([])]
        );
    }

    #[test]
    fn test_flatten_keeps_names_and_inputs_apart() {
        let as_name = Deps::new().with("input(from)", "x");
        let as_input = Deps::new().with_input("from", "x");
        assert_ne!(as_name.flatten(), as_input.flatten());

        let mut null_update = Deps::new();
        null_update.set_update_value(Value::Null);
        assert_ne!(null_update.flatten(), Deps::new().flatten());
    }

    #[test]
    fn test_input_or_null() {
        let deps = Deps::new();
        assert_eq!(deps.input_or_null("missing"), &Value::Null);
        assert!(deps.is_empty());
    }

    #[test]
    fn test_environment_from_pairs() {
        let env = environment([("n", json!(5)), ("this", json!({"id": "a"}))]);
        assert_eq!(env.len(), 2);
        assert_eq!(env["n"], json!(5));
    }
}
