//! Metric deriver: appends computed columns to a record set without touching
//! the source fields

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{FieldSource, RecordSet, Timestamp};
use crate::error::{PipelineError, Result};

/// Pure function over the values of a rule's input fields
pub type DeriveFn = Arc<dyn Fn(&[f64]) -> Option<f64> + Send + Sync>;

/// A rule built in code rather than loaded from configuration
#[derive(Clone)]
pub struct CustomRule {
    pub inputs: Vec<String>,
    pub func: DeriveFn,
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RuleKind {
    /// `max(0, a - b)`
    ClippedDifference { a: String, b: String },
    /// `a - b`
    Difference { a: String, b: String },
    /// `numerator / denominator`, absent when the denominator is zero
    Ratio { numerator: String, denominator: String },
    Sum { fields: Vec<String> },
    #[serde(skip)]
    Custom(CustomRule),
}

/// A named output column and the rule that computes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationRule {
    pub name: String,
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl DerivationRule {
    pub fn clipped_difference(name: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::ClippedDifference { a: a.into(), b: b.into() },
        }
    }

    pub fn difference(name: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::Difference { a: a.into(), b: b.into() },
        }
    }

    pub fn ratio(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::Ratio {
                numerator: numerator.into(),
                denominator: denominator.into(),
            },
        }
    }

    pub fn sum<S: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::Sum {
                fields: fields.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn custom<S, F>(name: impl Into<String>, inputs: impl IntoIterator<Item = S>, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(&[f64]) -> Option<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: RuleKind::Custom(CustomRule {
                inputs: inputs.into_iter().map(Into::into).collect(),
                func: Arc::new(func),
            }),
        }
    }

    /// Fields that must all be present for the rule to produce a value
    pub fn inputs(&self) -> Vec<&str> {
        match &self.kind {
            RuleKind::ClippedDifference { a, b } | RuleKind::Difference { a, b } => {
                vec![a.as_str(), b.as_str()]
            }
            RuleKind::Ratio {
                numerator,
                denominator,
            } => vec![numerator.as_str(), denominator.as_str()],
            RuleKind::Sum { fields } => fields.iter().map(String::as_str).collect(),
            RuleKind::Custom(rule) => rule.inputs.iter().map(String::as_str).collect(),
        }
    }

    /// Apply the rule to input values given in [`inputs`](Self::inputs) order.
    /// Non-finite results are absent.
    pub fn evaluate(&self, values: &[f64]) -> Option<f64> {
        let result = match (&self.kind, values) {
            (RuleKind::ClippedDifference { .. }, [a, b]) => Some((a - b).max(0.0)),
            (RuleKind::Difference { .. }, [a, b]) => Some(a - b),
            (RuleKind::Ratio { .. }, [_, d]) if *d == 0.0 => None,
            (RuleKind::Ratio { .. }, [n, d]) => Some(n / d),
            (RuleKind::Sum { .. }, values) => Some(values.iter().sum()),
            (RuleKind::Custom(rule), values) => (rule.func)(values),
            _ => None,
        };
        result.filter(|v| v.is_finite())
    }
}

/// Values of one derived field, aligned with the base records
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// A record set plus derived columns. Derived columns are views aligned with
/// the shared base records; the base is never copied or modified.
#[derive(Debug, Clone)]
pub struct EnrichedSet {
    base: RecordSet,
    derived: Vec<Arc<DerivedColumn>>,
}

impl From<RecordSet> for EnrichedSet {
    fn from(base: RecordSet) -> Self {
        Self {
            base,
            derived: Vec::new(),
        }
    }
}

impl EnrichedSet {
    pub fn base(&self) -> &RecordSet {
        &self.base
    }

    pub fn derived(&self) -> impl Iterator<Item = &DerivedColumn> {
        self.derived.iter().map(Arc::as_ref)
    }

    fn derived_column(&self, name: &str) -> Option<&DerivedColumn> {
        self.derived.iter().find(|c| c.name == name).map(Arc::as_ref)
    }

    /// Append one column per rule, in declaration order. A rule may read the
    /// output of an earlier rule.
    pub fn derive(&self, rules: &[DerivationRule]) -> Result<EnrichedSet> {
        profiling::scope!("derive");

        let mut enriched = self.clone();
        for rule in rules {
            if rule.name == enriched.base.schema().timestamp_column() || enriched.has_field(&rule.name) {
                return Err(PipelineError::DuplicateField {
                    field: rule.name.clone(),
                });
            }

            let inputs = rule.inputs();
            let mut args = Vec::with_capacity(inputs.len());
            let values = (0..enriched.len())
                .map(|idx| {
                    args.clear();
                    for field in &inputs {
                        args.push(enriched.numeric(idx, field)?);
                    }
                    rule.evaluate(&args)
                })
                .collect::<Vec<_>>();

            debug!(
                field = %rule.name,
                present = values.iter().filter(|v| v.is_some()).count(),
                "derived field"
            );
            enriched.derived.push(Arc::new(DerivedColumn {
                name: rule.name.clone(),
                values,
            }));
        }
        Ok(enriched)
    }
}

/// Derive `rules` over a freshly parsed record set
pub fn derive(records: &RecordSet, rules: &[DerivationRule]) -> Result<EnrichedSet> {
    EnrichedSet::from(records.clone()).derive(rules)
}

impl FieldSource for EnrichedSet {
    fn len(&self) -> usize {
        self.base.len()
    }

    fn has_field(&self, field: &str) -> bool {
        self.base.has_field(field) || self.derived_column(field).is_some()
    }

    fn numeric_fields(&self) -> Vec<String> {
        let mut fields = self.base.numeric_fields();
        fields.extend(self.derived.iter().map(|c| c.name.clone()));
        fields
    }

    fn numeric(&self, idx: usize, field: &str) -> Option<f64> {
        match self.derived_column(field) {
            Some(column) => column.values.get(idx).copied().flatten(),
            None => self.base.numeric(idx, field),
        }
    }

    fn text(&self, idx: usize, field: &str) -> Option<&str> {
        self.base.text(idx, field)
    }

    fn timestamp(&self, idx: usize) -> Timestamp {
        self.base.timestamp(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FieldMapping, RawTable, parse_table};

    fn records() -> RecordSet {
        let table = RawTable::from_pairs(vec![
            vec![("timestamp", "2024-01-01 00:00:01"), ("actual", "3"), ("baseline", "10")],
            vec![("timestamp", "2024-01-01 00:00:02"), ("actual", "10"), ("baseline", "3")],
            vec![("timestamp", "2024-01-01 00:00:03"), ("actual", "12"), ("baseline", "")],
        ]);
        let mapping = FieldMapping::new("timestamp", ["actual", "baseline"]);
        parse_table(&table, &mapping).unwrap().records
    }

    #[test]
    fn test_clipped_difference() {
        let rule = DerivationRule::clipped_difference("extra", "a", "b");
        assert_eq!(rule.evaluate(&[3.0, 10.0]), Some(0.0));
        assert_eq!(rule.evaluate(&[10.0, 3.0]), Some(7.0));
    }

    #[test]
    fn test_ratio_zero_denominator_is_absent() {
        let rule = DerivationRule::ratio("efficiency", "planned", "actual");
        assert_eq!(rule.evaluate(&[12.0, 0.0]), None);
        assert_eq!(rule.evaluate(&[12.0, 4.0]), Some(3.0));
    }

    #[test]
    fn test_derive_appends_and_keeps_count() {
        let base = records();
        let enriched = derive(
            &base,
            &[DerivationRule::clipped_difference("extra_steps", "actual", "baseline")],
        )
        .unwrap();

        assert_eq!(enriched.len(), base.len());
        assert_eq!(enriched.numeric(0, "extra_steps"), Some(0.0));
        assert_eq!(enriched.numeric(1, "extra_steps"), Some(7.0));
        // Missing input yields an absent derived value, not zero
        assert_eq!(enriched.numeric(2, "extra_steps"), None);
        // Source fields are untouched and shared
        assert_eq!(enriched.numeric(1, "actual"), Some(10.0));
        assert!(std::ptr::eq(
            enriched.base().records().as_ptr(),
            base.records().as_ptr()
        ));
        assert!(!base.has_field("extra_steps"));
    }

    #[test]
    fn test_rules_chain_in_declaration_order() {
        let enriched = derive(
            &records(),
            &[
                DerivationRule::sum("total", ["actual", "baseline"]),
                DerivationRule::custom("half_total", ["total"], |v| Some(v[0] / 2.0)),
            ],
        )
        .unwrap();
        assert_eq!(enriched.numeric(0, "half_total"), Some(6.5));
        assert_eq!(
            enriched.numeric_fields(),
            vec!["actual", "baseline", "total", "half_total"]
        );
    }

    #[test]
    fn test_duplicate_output_is_rejected() {
        let err = derive(&records(), &[DerivationRule::difference("actual", "actual", "baseline")])
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateField { .. }));
    }

    #[test]
    fn test_rule_json_shape() {
        let rule: DerivationRule = serde_json::from_str(
            r#"{"name": "extra_steps", "op": "clipped_difference", "a": "actual", "b": "baseline"}"#,
        )
        .unwrap();
        assert_eq!(rule.inputs(), vec!["actual", "baseline"]);
        assert!(matches!(rule.kind, RuleKind::ClippedDifference { .. }));
    }
}
