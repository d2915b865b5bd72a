use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use fnv::FnvHashMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use triomphe::Arc;

use super::schema::{FieldValues, SchemaError, SchemaHandle};
use super::{next_oid, Oid};

/// References are shared between the resolver's clusters.
pub type ReferenceHandle = Arc<Reference>;

/// Name and value of the dummy blocking key given to references whose
/// schema declares no blocking keys. Every such reference lands in the same
/// block, which disables blocking.
const DUMMY_BLOCKING_KEY: (&str, &str) = ("BK", "0");

/// One observed record, immutable after construction.
///
/// A reference holds the populated subset of its schema's fields (a value
/// that was never supplied, or supplied as JSON null, is absent), an
/// optional opaque metadata payload carried verbatim to the output, and the
/// computed blocking key values. Identity, equality and hashing are by
/// `oid`.
pub struct Reference {
    oid: Oid,
    schema: SchemaHandle,
    values: BTreeMap<String, Value>,
    metadata: Option<Value>,
    blocking_keys: FnvHashMap<String, String>,
}

impl Reference {
    pub fn builder(schema: SchemaHandle) -> ReferenceBuilder {
        ReferenceBuilder {
            schema,
            values: BTreeMap::new(),
            metadata: None,
        }
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn schema(&self) -> &SchemaHandle {
        &self.schema
    }

    /// The populated value for `name`, if any.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Populated field names in lexicographic order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    pub fn blocking_keys(&self) -> &FnvHashMap<String, String> {
        &self.blocking_keys
    }

    /// Pairwise Fellegi-Sunter log-odds between two references.
    ///
    /// Sums the per-field adjustments over the names populated on `self`,
    /// using `self`'s probabilities and comparator. A name absent on
    /// `other`, or excluded on either side, contributes nothing, so the
    /// score is only guaranteed symmetric when both references populate the
    /// same fields of one schema.
    pub fn compare(&self, other: &Reference) -> f64 {
        let mut score = 0.0;
        for (name, value) in &self.values {
            let field = self
                .schema
                .field(name)
                .expect("populated field is declared on the schema");
            if field.is_excluded() {
                continue;
            }
            let other_value = match other.values.get(name) {
                Some(other_value) => other_value,
                None => continue,
            };
            if let Some(other_field) = other.schema.field(name) {
                if other_field.is_excluded() {
                    continue;
                }
            }
            score += field.adjustment(field.matches(value, other_value));
        }
        score
    }

    /// The reference as a flat `field name -> value` record, plus the
    /// metadata payload under `"metadata"` when requested and present.
    pub fn to_record(&self, include_metadata: bool) -> Map<String, Value> {
        let mut record = Map::new();
        for (name, value) in &self.values {
            record.insert(name.clone(), value.clone());
        }
        if include_metadata {
            if let Some(metadata) = &self.metadata {
                record.insert("metadata".to_string(), metadata.clone());
            }
        }
        record
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.oid.hash(state)
    }
}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reference {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.oid.cmp(&other.oid)
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .values
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect();
        write!(f, "<Reference oid={} fields=[{}]>", self.oid, fields.join(", "))
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record(true).serialize(serializer)
    }
}

pub struct ReferenceBuilder {
    schema: SchemaHandle,
    values: BTreeMap<String, Value>,
    metadata: Option<Value>,
}

impl ReferenceBuilder {
    /// Supplies the value for one declared field. A JSON null marks the
    /// value as absent. Undeclared names are reported by [`build`].
    ///
    /// [`build`]: ReferenceBuilder::build
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Attaches an opaque payload carried verbatim to the output.
    pub fn metadata(mut self, metadata: impl Into<Value>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn build(self) -> Result<Reference, SchemaError> {
        let mut values = BTreeMap::new();
        for (name, value) in self.values {
            if self.schema.field(&name).is_none() {
                return Err(SchemaError::UnknownField(name));
            }
            if value.is_null() {
                continue;
            }
            values.insert(name, value);
        }
        let mut blocking_keys = FnvHashMap::default();
        {
            let view = FieldValues::new(&values);
            for key in self.schema.blocking_keys() {
                if let Some(value) = key.compute(&view) {
                    blocking_keys.insert(key.name().to_string(), value);
                }
            }
        }
        if self.schema.blocking_keys().is_empty() {
            let (name, value) = DUMMY_BLOCKING_KEY;
            blocking_keys.insert(name.to_string(), value.to_string());
        }
        Ok(Reference {
            oid: next_oid(),
            schema: self.schema,
            values,
            metadata: self.metadata,
            blocking_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, Schema};
    use rapidfuzz::fuzz;
    use serde_json::json;

    fn fuzzy_name_field() -> FieldDef {
        FieldDef::new("observed_name")
            .probabilities(0.85, 0.15)
            .comparator(|a, b| match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => fuzz::ratio(a.chars(), b.chars()) >= 70.0,
                _ => false,
            })
    }

    fn simple_schema() -> SchemaHandle {
        Schema::builder().field(fuzzy_name_field()).build().unwrap()
    }

    fn compound_schema() -> SchemaHandle {
        Schema::builder()
            .field(fuzzy_name_field())
            .field(FieldDef::new("retail_store").exclude())
            .build()
            .unwrap()
    }

    fn simple(schema: &SchemaHandle, name: &str, id: u64) -> Reference {
        Reference::builder(schema.clone())
            .field("observed_name", name)
            .metadata(json!({ "id": id }))
            .build()
            .unwrap()
    }

    #[test]
    fn compare_same_is_positive() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        assert!(r1.compare(&r1) > 0.0);
    }

    #[test]
    fn compare_similar_is_positive() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let r3 = simple(&schema, "PrimeHarvLstCheese1F0g", 3);
        assert!(r1.compare(&r3) > 0.0);
    }

    #[test]
    fn compare_different_is_negative() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let r2 = simple(&schema, "PureGourCetYogurt2.4kg", 2);
        assert!(r1.compare(&r2) < 0.0);
    }

    #[test]
    fn compare_is_commutative_on_shared_schema() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let r2 = simple(&schema, "PureGourCetYogurt2.4kg", 2);
        assert_eq!(r1.compare(&r2), r2.compare(&r1));
    }

    #[test]
    fn compare_sums_over_every_populated_field() {
        let schema = Schema::builder()
            .field(FieldDef::new("brand"))
            .field(FieldDef::new("size"))
            .build()
            .unwrap();
        let r1 = Reference::builder(schema.clone())
            .field("brand", "acme")
            .field("size", "100g")
            .build()
            .unwrap();
        let r2 = Reference::builder(schema.clone())
            .field("brand", "acme")
            .field("size", "200g")
            .build()
            .unwrap();
        // One agreeing field and one disagreeing field with the default
        // 0.9 / 0.1 probabilities cancel out exactly.
        assert!(r1.compare(&r2).abs() < 1e-12);
    }

    #[test]
    fn reference_without_fields_scores_zero() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let r7 = Reference::builder(schema.clone())
            .metadata(json!({ "id": 7 }))
            .build()
            .unwrap();
        assert_eq!(r1.compare(&r7), 0.0);
        assert_eq!(r7.compare(&r1), 0.0);
    }

    #[test]
    fn null_value_is_absent() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let blank = Reference::builder(schema.clone())
            .field("observed_name", Value::Null)
            .build()
            .unwrap();
        assert!(blank.value("observed_name").is_none());
        assert_eq!(r1.compare(&blank), 0.0);
    }

    #[test]
    fn excluded_field_contributes_nothing() {
        let schema = compound_schema();
        let r8 = Reference::builder(schema.clone())
            .field("observed_name", "PrimeHarvestCheese10Qg")
            .field("retail_store", "SM")
            .build()
            .unwrap();
        let r9 = Reference::builder(schema.clone())
            .field("observed_name", "PureGourCetYogurt2.4kg")
            .field("retail_store", "SM")
            .build()
            .unwrap();
        // Only the disagreeing name contributes.
        let expected = (0.15f64 / 0.85).ln();
        assert!((r8.compare(&r9) - expected).abs() < 1e-12);
    }

    #[test]
    fn excluded_field_disagreement_is_ignored() {
        let schema = compound_schema();
        let a = Reference::builder(schema.clone())
            .field("observed_name", "PrimeHarvestCheese10Qg")
            .field("retail_store", "SM")
            .build()
            .unwrap();
        let b = Reference::builder(schema.clone())
            .field("observed_name", "PrimeHarvestCheese10Qg")
            .field("retail_store", "Robinsons")
            .build()
            .unwrap();
        // The agreeing name is the whole score despite the store mismatch.
        let expected = (0.85f64 / 0.15).ln();
        assert!((a.compare(&b) - expected).abs() < 1e-12);
    }

    #[test]
    fn undeclared_field_is_a_schema_error() {
        let schema = simple_schema();
        let err = Reference::builder(schema)
            .field("observed_price", "1.99")
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownField("observed_price".to_string()));
    }

    #[test]
    fn blocking_keys_are_computed_from_fields() {
        let schema = Schema::builder()
            .field(fuzzy_name_field())
            .field(FieldDef::new("retail_store").exclude())
            .blocking_key("RSBK", |fields| {
                fields.get_str("retail_store").map(str::to_string)
            })
            .build()
            .unwrap();
        let r1 = Reference::builder(schema.clone())
            .field("observed_name", "PrimeHarvestCheese10Qg")
            .field("retail_store", "SM")
            .build()
            .unwrap();
        let r3 = Reference::builder(schema.clone())
            .field("observed_name", "PrimeHarvLstCheese1F0g")
            .field("retail_store", "Robinsons")
            .build()
            .unwrap();
        assert_eq!(r1.blocking_keys()["RSBK"], "SM");
        assert_eq!(r3.blocking_keys()["RSBK"], "Robinsons");
        assert_ne!(r1.blocking_keys()["RSBK"], "Robinsons");
    }

    #[test]
    fn blocking_key_returning_none_is_omitted() {
        let schema = Schema::builder()
            .field(fuzzy_name_field())
            .field(FieldDef::new("retail_store").exclude())
            .blocking_key("RSBK", |fields| {
                fields.get_str("retail_store").map(str::to_string)
            })
            .build()
            .unwrap();
        let bare = Reference::builder(schema)
            .field("observed_name", "PrimeHarvestCheese10Qg")
            .build()
            .unwrap();
        assert!(bare.blocking_keys().is_empty());
    }

    #[test]
    fn schema_without_blocking_keys_gets_the_dummy_key() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        assert_eq!(r1.blocking_keys()["BK"], "0");
        assert_eq!(r1.blocking_keys().len(), 1);
    }

    #[test]
    fn record_carries_values_and_metadata() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let without = r1.to_record(false);
        assert_eq!(without["observed_name"], json!("PrimeHarvestCheese10Qg"));
        assert!(!without.contains_key("metadata"));
        let with = r1.to_record(true);
        assert_eq!(with["metadata"], json!({ "id": 1 }));
    }

    #[test]
    fn serialize_produces_the_record_shape() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let value = serde_json::to_value(&r1).unwrap();
        assert_eq!(
            value,
            json!({
                "observed_name": "PrimeHarvestCheese10Qg",
                "metadata": { "id": 1 },
            })
        );
    }

    #[test]
    fn identity_is_by_oid() {
        let schema = simple_schema();
        let r1 = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        let twin = simple(&schema, "PrimeHarvestCheese10Qg", 1);
        assert_ne!(r1, twin);
        assert!(r1.oid() < twin.oid());
    }
}
