//! Continuation results returned by steps

use std::fmt;

use serde_json::{Map, Value};

/// Partial dependency environment carried by a directive
pub type Provided = Map<String, Value>;

/// Directive a step hands back to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// Merge `dependencies` into the environment (and, for transforms,
    /// replace the working value) then run the next step
    Continue {
        dependencies: Provided,
        value: Option<Value>,
    },
    /// Stop the whole computation with a final value
    Exit(Value),
    /// Stop this composition and map the environment onto its outputs
    RaiseOutput(Provided),
    /// Stop this composition and its parent, which raises these as its own outputs
    RaiseOutputAbove(Provided),
}

/// Directive name without payload, for logs and events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Continue,
    Exit,
    RaiseOutput,
    RaiseOutputAbove,
}

impl Directive {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Exit => "exit",
            Self::RaiseOutput => "raiseOutput",
            Self::RaiseOutputAbove => "raiseOutputAbove",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn collect<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Provided
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl Continuation {
    /// Continue without changes
    pub fn proceed() -> Self {
        Self::Continue {
            dependencies: Provided::new(),
            value: None,
        }
    }

    /// Continue, providing new dependencies to later steps
    pub fn provide<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Continue {
            dependencies: collect(pairs),
            value: None,
        }
    }

    /// Continue with a new working value (transform steps)
    pub fn transformed(value: impl Into<Value>) -> Self {
        Self::Continue {
            dependencies: Provided::new(),
            value: Some(value.into()),
        }
    }

    /// Continue with a new working value and new dependencies
    pub fn transformed_with<K, V>(
        value: impl Into<Value>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Continue {
            dependencies: collect(pairs),
            value: Some(value.into()),
        }
    }

    pub fn exit(value: impl Into<Value>) -> Self {
        Self::Exit(value.into())
    }

    pub fn raise_output<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::RaiseOutput(collect(pairs))
    }

    pub fn raise_output_above<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::RaiseOutputAbove(collect(pairs))
    }

    pub fn directive(&self) -> Directive {
        match self {
            Self::Continue { .. } => Directive::Continue,
            Self::Exit(_) => Directive::Exit,
            Self::RaiseOutput(_) => Directive::RaiseOutput,
            Self::RaiseOutputAbove(_) => Directive::RaiseOutputAbove,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provide_collects_pairs() {
        let c = Continuation::provide([("#double", 10)]);
        match c {
            Continuation::Continue { dependencies, value } => {
                assert_eq!(dependencies.get("#double"), Some(&json!(10)));
                assert!(value.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_directive_names() {
        assert_eq!(Continuation::proceed().directive().as_str(), "continue");
        assert_eq!(Continuation::exit(1).directive(), Directive::Exit);
        assert_eq!(
            Continuation::raise_output_above([("#a", 1)]).directive().to_string(),
            "raiseOutputAbove"
        );
    }
}
