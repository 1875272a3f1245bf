use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::{ErrorMetric, FactorModel, Record, SharedModel};
use tracing::{debug, info};

/// One weighted member of an ensemble
#[derive(Clone)]
pub struct EnsembleMember {
    pub model: SharedModel,
    pub weight: f64,
}

/// Ensemble Model
///
/// Combines member predictions as a weighted average:
/// `sum(w_i * p_i) / sum(w_i)`. Weights are normalized at prediction time, so
/// they need not sum to 1 when added. Zero-weight members stay in the ensemble
/// (and are still trained) but are never asked for a prediction.
///
/// The ensemble owns its member list, not the models: members are shared
/// handles that may also be registered under other names.
pub struct EnsembleModel {
    name: String,
    members: Vec<EnsembleMember>,
    metric: ErrorMetric,
}

impl EnsembleModel {
    pub fn new() -> Self {
        Self::named("ensemble")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            metric: ErrorMetric::Mse,
        }
    }

    pub fn with_metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Appends a member. Weights must be finite and non-negative.
    pub fn add_model(&mut self, model: SharedModel, weight: f64) -> FactorResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(FactorEngineError::InvalidWeight { weight });
        }
        debug!(
            "Ensemble {}: adding {} with weight {}",
            self.name,
            model.name(),
            weight
        );
        self.members.push(EnsembleMember { model, weight });
        Ok(())
    }

    pub fn members(&self) -> &[EnsembleMember] {
        &self.members
    }

    pub fn total_weight(&self) -> f64 {
        self.members.iter().map(|m| m.weight).sum()
    }
}

impl Default for EnsembleModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FactorModel for EnsembleModel {
    /// Trains members in order and stops at the first failure
    fn train(&self, records: &[Record], epochs: usize) -> FactorResult<()> {
        if self.members.is_empty() {
            return Err(FactorEngineError::EmptyEnsemble {
                model: self.name.clone(),
            });
        }

        info!(
            "Training ensemble {} ({} members)",
            self.name,
            self.members.len()
        );
        for member in &self.members {
            member.model.train(records, epochs).map_err(|e| {
                FactorEngineError::TrainingFailed {
                    model: member.model.name().to_string(),
                    source: Box::new(e),
                }
            })?;
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> FactorResult<f64> {
        if self.members.is_empty() {
            return Err(FactorEngineError::EmptyEnsemble {
                model: self.name.clone(),
            });
        }

        let total_weight = self.total_weight();
        if total_weight <= 0.0 {
            return Err(FactorEngineError::ZeroWeightSum {
                model: self.name.clone(),
            });
        }
        if !total_weight.is_finite() {
            return Err(FactorEngineError::PredictionFailed {
                model: self.name.clone(),
                reason: format!("weight sum {} is not finite", total_weight),
            });
        }

        let mut weighted_sum = 0.0;
        // zero-weight members are disabled and never consulted
        for member in self.members.iter().filter(|m| m.weight > 0.0) {
            weighted_sum += member.weight * member.model.predict(features)?;
        }

        let prediction = weighted_sum / total_weight;
        if !prediction.is_finite() {
            return Err(FactorEngineError::PredictionFailed {
                model: self.name.clone(),
                reason: "weighted prediction is not finite".to_string(),
            });
        }
        Ok(prediction)
    }

    fn evaluate(&self, records: &[Record]) -> FactorResult<f64> {
        if records.is_empty() {
            return Err(FactorEngineError::EmptyEvaluationSet {
                model: self.name.clone(),
            });
        }

        let predictions = records
            .iter()
            .map(|r| self.predict(&r.features))
            .collect::<FactorResult<Vec<f64>>>()?;
        let targets: Vec<f64> = records.iter().map(|r| r.target).collect();
        Ok(self.metric.compute(&predictions, &targets))
    }

    fn metric(&self) -> ErrorMetric {
        self.metric
    }

    fn is_trained(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(|m| m.model.is_trained())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Implement Debug manually since SharedModel doesn't impl Debug
impl std::fmt::Debug for EnsembleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members: Vec<(&str, f64)> = self
            .members
            .iter()
            .map(|m| (m.model.name(), m.weight))
            .collect();
        f.debug_struct("EnsembleModel")
            .field("name", &self.name)
            .field("members", &members)
            .field("metric", &self.metric)
            .finish()
    }
}
