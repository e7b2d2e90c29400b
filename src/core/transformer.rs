use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

use crate::database::Included;

/// Produces the serialized shape of a record.
///
/// `available_includes` names the relations (dotted for nested ones, e.g.
/// `author.profile`) the transformer knows how to expand. The same list is the
/// eager-load set and the set of scopes search and filters may traverse.
pub trait Transformer: Send + Sync {
    type Model;

    fn available_includes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Render one record. `included` holds the eagerly loaded relations of
    /// this record, keyed by top-level include name.
    fn transform(&self, model: &Self::Model, included: &Included) -> Value;
}

/// Serializes the model with `serde` and merges the loaded includes into the
/// resulting object.
pub struct ModelTransformer<M> {
    includes: Vec<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M> ModelTransformer<M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            includes: Vec::new(),
            _model: PhantomData,
        }
    }

    #[must_use]
    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }
}

impl<M> Default for ModelTransformer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Serialize> Transformer for ModelTransformer<M> {
    type Model = M;

    fn available_includes(&self) -> Vec<String> {
        self.includes.clone()
    }

    fn transform(&self, model: &M, included: &Included) -> Value {
        match serde_json::to_value(model) {
            Ok(Value::Object(mut object)) => {
                for (name, value) in included.iter() {
                    object.insert(name.clone(), value.clone());
                }
                Value::Object(object)
            }
            Ok(other) => other,
            Err(error) => {
                tracing::error!(error = %error, "Failed to serialize record");
                Value::Null
            }
        }
    }
}
