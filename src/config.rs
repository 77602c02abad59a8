//! Experiment configuration: which columns to read, what to derive, how to
//! summarize and what to chart

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{GroupOrder, Reduction};
use crate::compose::{ChartSpec, SourceRef};
use crate::data::FieldMapping;
use crate::derive::DerivationRule;
use crate::error::{PipelineError, Result};

/// A named summary computed from the enriched records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySpec {
    pub id: String,
    /// Grouping field
    pub key: String,
    pub reduction: Reduction,
    #[serde(default)]
    pub order: GroupOrder,
    /// Keep only groups with these key values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
}

impl SummarySpec {
    pub fn new(id: impl Into<String>, key: impl Into<String>, reduction: Reduction) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            reduction,
            order: GroupOrder::FirstSeen,
            include: None,
        }
    }

    pub fn ascending(mut self) -> Self {
        self.order = GroupOrder::Ascending;
        self
    }

    pub fn include<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub fields: FieldMapping,
    #[serde(default)]
    pub derivations: Vec<DerivationRule>,
    #[serde(default)]
    pub summaries: Vec<SummarySpec>,
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
}

impl ExperimentConfig {
    pub fn new(name: impl Into<String>, fields: FieldMapping) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fields,
            derivations: Vec::new(),
            summaries: Vec::new(),
            charts: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn derive(mut self, rule: DerivationRule) -> Self {
        self.derivations.push(rule);
        self
    }

    pub fn summary(mut self, spec: SummarySpec) -> Self {
        self.summaries.push(spec);
        self
    }

    pub fn chart(mut self, spec: ChartSpec) -> Self {
        self.charts.push(spec);
        self
    }

    /// Check references between sections before any data is touched
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for summary in &self.summaries {
            if !ids.insert(summary.id.as_str()) {
                return Err(PipelineError::Config(format!(
                    "summary id '{}' is declared twice",
                    summary.id
                )));
            }
        }

        let mut charts = HashSet::new();
        for chart in &self.charts {
            if !charts.insert(chart.id.as_str()) {
                return Err(PipelineError::Config(format!(
                    "chart id '{}' is declared twice",
                    chart.id
                )));
            }
            for series in &chart.series {
                if let SourceRef::Summary(id) = &series.source {
                    if !ids.contains(id.as_str()) {
                        return Err(PipelineError::UnknownSummary { id: id.clone() });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), name = %config.name, "loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), name = %self.name, "saved config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{SeriesSpec, XSource, YSource};

    fn config() -> ExperimentConfig {
        ExperimentConfig::new("methods", FieldMapping::new("timestamp", ["collisions"]).with_categorical(["method_name"]))
            .summary(SummarySpec::new("final", "method_name", Reduction::Last).include(["GRID", "PATH"]))
            .chart(ChartSpec::new("collisions", "Collisions").series(
                SeriesSpec::new("collisions", XSource::GroupKey, YSource::Field("collisions".into()))
                    .from_summary("final"),
            ))
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("methods.json");

        config().save(&path).unwrap();
        let loaded = ExperimentConfig::load(&path).unwrap();

        assert_eq!(loaded.name, "methods");
        assert_eq!(loaded.summaries, config().summaries);
        assert_eq!(loaded.charts, config().charts);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = ExperimentConfig::from_json(r#"{"name": "bare", "fields": {"numeric": ["clicks"]}}"#).unwrap();
        assert_eq!(config.fields.timestamp, "timestamp");
        assert!(config.derivations.is_empty());
        assert!(config.charts.is_empty());
    }

    #[test]
    fn test_unknown_summary_reference() {
        let mut config = config();
        config.summaries.clear();
        assert!(matches!(config.validate(), Err(PipelineError::UnknownSummary { .. })));
    }

    #[test]
    fn test_duplicate_summary_id() {
        let config = config().summary(SummarySpec::new("final", "method_name", Reduction::Last));
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ExperimentConfig::from_json("{ not json"),
            Err(PipelineError::Json(_))
        ));
    }
}
