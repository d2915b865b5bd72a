use std::fmt;

use serde_json::Value;

/// Logarithmic Fellegi-Sunter adjustment for one boolean field comparison.
///
/// A comparator agreement contributes `ln(p / q)` where `p` is the
/// true-match probability and `q` the false-match probability; a
/// disagreement contributes `ln((1 - p) / (1 - q))`.
pub fn fellegi_sunter_adjustment(
    matched: bool,
    true_match_probability: f64,
    false_match_probability: f64,
) -> f64 {
    if matched {
        (true_match_probability / false_match_probability).ln()
    } else {
        ((1.0 - true_match_probability) / (1.0 - false_match_probability)).ln()
    }
}

pub(crate) type Comparator = Box<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Matching profile of one named attribute: the probability that the
/// comparator agrees on a true match (`true_match_probability`) and on a
/// false match (`false_match_probability`), plus the comparator itself.
///
/// The default comparator is value equality. An `exclude`d field never
/// contributes to a score; it exists to feed blocking keys or to be carried
/// to the output.
///
/// Both probabilities must lie strictly inside (0, 1); [`Schema::build`]
/// rejects anything else.
///
/// [`Schema::build`]: super::SchemaBuilder::build
pub struct FieldDef {
    name: String,
    true_match_probability: f64,
    false_match_probability: f64,
    exclude: bool,
    comparator: Comparator,
}

impl FieldDef {
    /// A field with the default probabilities (0.9 / 0.1) and the equality
    /// comparator.
    pub fn new(name: impl Into<String>) -> Self {
        FieldDef {
            name: name.into(),
            true_match_probability: 0.9,
            false_match_probability: 0.1,
            exclude: false,
            comparator: Box::new(|a, b| a == b),
        }
    }

    pub fn probabilities(mut self, true_match: f64, false_match: f64) -> Self {
        self.true_match_probability = true_match;
        self.false_match_probability = false_match;
        self
    }

    /// Marks the field as excluded from scoring.
    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// Replaces the equality comparator. The closure decides whether two
    /// present values agree; a panic inside it propagates to the caller of
    /// the in-flight resolve.
    pub fn comparator(
        mut self,
        comparator: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn true_match_probability(&self) -> f64 {
        self.true_match_probability
    }

    pub fn false_match_probability(&self) -> f64 {
        self.false_match_probability
    }

    pub fn is_excluded(&self) -> bool {
        self.exclude
    }

    pub fn matches(&self, a: &Value, b: &Value) -> bool {
        (self.comparator)(a, b)
    }

    pub(crate) fn adjustment(&self, matched: bool) -> f64 {
        fellegi_sunter_adjustment(
            matched,
            self.true_match_probability,
            self.false_match_probability,
        )
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("true_match_probability", &self.true_match_probability)
            .field("false_match_probability", &self.false_match_probability)
            .field("exclude", &self.exclude)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adjustment_is_log_odds() {
        let agree = fellegi_sunter_adjustment(true, 0.9, 0.1);
        let disagree = fellegi_sunter_adjustment(false, 0.9, 0.1);
        assert!((agree - (0.9f64 / 0.1).ln()).abs() < 1e-12);
        assert!((disagree - (0.1f64 / 0.9).ln()).abs() < 1e-12);
    }

    #[test]
    fn adjustment_is_antisymmetric_for_symmetric_probabilities() {
        let agree = fellegi_sunter_adjustment(true, 0.85, 0.15);
        let disagree = fellegi_sunter_adjustment(false, 0.85, 0.15);
        assert!((agree + disagree).abs() < 1e-12);
    }

    #[test]
    fn default_comparator_is_equality() {
        let field = FieldDef::new("name");
        assert!(field.matches(&json!("acme"), &json!("acme")));
        assert!(!field.matches(&json!("acme"), &json!("zenith")));
        assert!(field.matches(&json!(42), &json!(42)));
        assert!(!field.matches(&json!(42), &json!("42")));
    }

    #[test]
    fn custom_comparator_overrides_equality() {
        let field = FieldDef::new("name").comparator(|a, b| {
            match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            }
        });
        assert!(field.matches(&json!("Acme"), &json!("ACME")));
        assert!(!field.matches(&json!("Acme"), &json!("Zenith")));
    }

    #[test]
    fn field_agreement_weight_uses_configured_probabilities() {
        let field = FieldDef::new("name").probabilities(0.85, 0.15);
        assert!((field.adjustment(true) - (0.85f64 / 0.15).ln()).abs() < 1e-12);
    }
}
