use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;
use triomphe::Arc;

use super::field::FieldDef;

/// Schemas are shared by every reference built from them.
pub type SchemaHandle = Arc<Schema>;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("field `{0}` is declared twice")]
    DuplicateField(String),
    #[error("blocking key `{0}` is declared twice")]
    DuplicateBlockingKey(String),
    #[error("probability {value} for field `{field}` is outside (0, 1)")]
    InvalidProbability { field: String, value: f64 },
    #[error("field `{0}` is not declared on the schema")]
    UnknownField(String),
}

/// Read-only view over a reference's populated field values, handed to
/// blocking key closures.
pub struct FieldValues<'a> {
    values: &'a BTreeMap<String, Value>,
}

impl<'a> FieldValues<'a> {
    pub(crate) fn new(values: &'a BTreeMap<String, Value>) -> Self {
        FieldValues { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }
}

pub(crate) type BlockingKeyFn = Box<dyn Fn(&FieldValues) -> Option<String> + Send + Sync>;

/// Derives one candidate-pruning key value from a reference.
///
/// The closure sees the reference's populated fields and returns the key
/// value, or `None` to leave the key unset on that reference: a reference
/// carries at most one value per distinct key name.
pub struct BlockingKeyDef {
    name: String,
    compute: BlockingKeyFn,
}

impl BlockingKeyDef {
    pub fn new(
        name: impl Into<String>,
        compute: impl Fn(&FieldValues) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        BlockingKeyDef {
            name: name.into(),
            compute: Box::new(compute),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn compute(&self, values: &FieldValues) -> Option<String> {
        (self.compute)(values)
    }
}

impl fmt::Debug for BlockingKeyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingKeyDef")
            .field("name", &self.name)
            .finish()
    }
}

/// The value-level description of a reference type: which named fields it
/// carries and which blocking keys it derives.
///
/// A `Schema` is immutable once built and shared between all references
/// constructed from it.
#[derive(Debug)]
pub struct Schema {
    fields: BTreeMap<String, FieldDef>,
    blocking_keys: Vec<BlockingKeyDef>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            fields: Vec::new(),
            blocking_keys: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Declared field names in lexicographic order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn blocking_keys(&self) -> &[BlockingKeyDef] {
        &self.blocking_keys
    }
}

pub struct SchemaBuilder {
    fields: Vec<FieldDef>,
    blocking_keys: Vec<BlockingKeyDef>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn blocking_key(
        mut self,
        name: impl Into<String>,
        compute: impl Fn(&FieldValues) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.blocking_keys.push(BlockingKeyDef::new(name, compute));
        self
    }

    /// Validates the declarations and freezes them into a shared schema.
    pub fn build(self) -> Result<SchemaHandle, SchemaError> {
        let mut fields = BTreeMap::new();
        for field in self.fields {
            for probability in [
                field.true_match_probability(),
                field.false_match_probability(),
            ] {
                if !(probability > 0.0 && probability < 1.0) {
                    return Err(SchemaError::InvalidProbability {
                        field: field.name().to_string(),
                        value: probability,
                    });
                }
            }
            let name = field.name().to_string();
            if fields.insert(name.clone(), field).is_some() {
                return Err(SchemaError::DuplicateField(name));
            }
        }
        for (i, key) in self.blocking_keys.iter().enumerate() {
            if self.blocking_keys[..i].iter().any(|k| k.name() == key.name()) {
                return Err(SchemaError::DuplicateBlockingKey(key.name().to_string()));
            }
        }
        Ok(Arc::new(Schema {
            fields,
            blocking_keys: self.blocking_keys,
        }))
    }
}
