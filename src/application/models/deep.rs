use crate::config::DeepModelConfig;
use crate::domain::errors::{FactorEngineError, FactorResult};
use crate::domain::ml::model::{check_feature_size, check_training_set};
use crate::domain::ml::{ErrorMetric, FactorModel, Record};
use ndarray::{Array, Array1, Array2, ArrayView2, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::RwLock;
use tracing::{debug, info};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;
const L2: f64 = 1e-4;
const TRAIN_SPLIT: f64 = 0.8;

/// Weights of the dense network: input -> tanh -> relu -> linear output
#[derive(Debug, Clone)]
struct Params {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
    w3: Array2<f64>,
    b3: Array1<f64>,
}

impl Params {
    fn xavier(input: usize, hidden1: usize, hidden2: usize, rng: &mut StdRng) -> Self {
        Self {
            w1: xavier_matrix(input, hidden1, rng),
            b1: Array1::zeros(hidden1),
            w2: xavier_matrix(hidden1, hidden2, rng),
            b2: Array1::zeros(hidden2),
            w3: xavier_matrix(hidden2, 1, rng),
            b3: Array1::zeros(1),
        }
    }

    fn zeros_like(other: &Params) -> Self {
        Self {
            w1: Array2::zeros(other.w1.raw_dim()),
            b1: Array1::zeros(other.b1.raw_dim()),
            w2: Array2::zeros(other.w2.raw_dim()),
            b2: Array1::zeros(other.b2.raw_dim()),
            w3: Array2::zeros(other.w3.raw_dim()),
            b3: Array1::zeros(other.b3.raw_dim()),
        }
    }

    fn is_finite(&self) -> bool {
        [&self.w1, &self.w2, &self.w3]
            .iter()
            .all(|w| w.iter().all(|v| v.is_finite()))
            && [&self.b1, &self.b2, &self.b3]
                .iter()
                .all(|b| b.iter().all(|v| v.is_finite()))
    }
}

fn xavier_matrix(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.random_range(-limit..limit))
}

struct Activations {
    a1: Array2<f64>,
    z2: Array2<f64>,
    a2: Array2<f64>,
    output: Array2<f64>,
}

fn forward(params: &Params, x: ArrayView2<f64>) -> Activations {
    let a1 = (x.dot(&params.w1) + &params.b1).mapv(f64::tanh);
    let z2 = a1.dot(&params.w2) + &params.b2;
    let a2 = z2.mapv(|v| v.max(0.0));
    let output = a2.dot(&params.w3) + &params.b3;
    Activations { a1, z2, a2, output }
}

/// Gradients of the mean squared error (plus L2 on weights)
fn backward(params: &Params, x: ArrayView2<f64>, y: &Array2<f64>, acts: &Activations) -> Params {
    let n = x.nrows().max(1) as f64;
    let d_out = (&acts.output - y) * (2.0 / n);

    let w3 = acts.a2.t().dot(&d_out) + &params.w3 * L2;
    let b3 = d_out.sum_axis(Axis(0));

    let relu_grad = acts.z2.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
    let d_z2 = d_out.dot(&params.w3.t()) * relu_grad;
    let w2 = acts.a1.t().dot(&d_z2) + &params.w2 * L2;
    let b2 = d_z2.sum_axis(Axis(0));

    let tanh_grad = acts.a1.mapv(|a| 1.0 - a * a);
    let d_z1 = d_z2.dot(&params.w2.t()) * tanh_grad;
    let w1 = x.t().dot(&d_z1) + &params.w1 * L2;
    let b1 = d_z1.sum_axis(Axis(0));

    Params {
        w1,
        b1,
        w2,
        b2,
        w3,
        b3,
    }
}

struct Adam {
    m: Params,
    v: Params,
    step: i32,
    learning_rate: f64,
}

impl Adam {
    fn new(params: &Params, learning_rate: f64) -> Self {
        Self {
            m: Params::zeros_like(params),
            v: Params::zeros_like(params),
            step: 0,
            learning_rate,
        }
    }

    fn apply(&mut self, params: &mut Params, grads: &Params) {
        self.step += 1;
        let lr = self.learning_rate;
        let t = self.step;
        adam_update(&mut params.w1, &grads.w1, &mut self.m.w1, &mut self.v.w1, lr, t);
        adam_update(&mut params.b1, &grads.b1, &mut self.m.b1, &mut self.v.b1, lr, t);
        adam_update(&mut params.w2, &grads.w2, &mut self.m.w2, &mut self.v.w2, lr, t);
        adam_update(&mut params.b2, &grads.b2, &mut self.m.b2, &mut self.v.b2, lr, t);
        adam_update(&mut params.w3, &grads.w3, &mut self.m.w3, &mut self.v.w3, lr, t);
        adam_update(&mut params.b3, &grads.b3, &mut self.m.b3, &mut self.v.b3, lr, t);
    }
}

fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    lr: f64,
    step: i32,
) {
    let m_correction = 1.0 - BETA1.powi(step);
    let v_correction = 1.0 - BETA2.powi(step);
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            let m_hat = *m / m_correction;
            let v_hat = *v / v_correction;
            *p -= lr * m_hat / (v_hat.sqrt() + EPSILON);
        });
}

struct DeepState {
    params: Params,
    rng: StdRng,
    trained: bool,
}

/// Non-linear factor model: a small dense network trained with mini-batch Adam.
///
/// Training holds out the last 20% of the records (time order is kept) and
/// logs the holdout MSE once all epochs have run.
pub struct DeepFactorModel {
    name: String,
    input_size: usize,
    config: DeepModelConfig,
    metric: ErrorMetric,
    state: RwLock<DeepState>,
}

impl DeepFactorModel {
    pub fn new(input_size: usize) -> Self {
        Self::with_config("deeplearning", input_size, DeepModelConfig::default())
    }

    pub fn with_config(name: impl Into<String>, input_size: usize, config: DeepModelConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let hidden1 = config.hidden_size.max(1);
        let hidden2 = (hidden1 / 2).max(1);
        let params = Params::xavier(input_size, hidden1, hidden2, &mut rng);
        let name = name.into();

        info!(
            "{} initialized with input size: {}, hidden layers: {}x{}",
            name, input_size, hidden1, hidden2
        );

        Self {
            name,
            input_size,
            config,
            metric: ErrorMetric::Mse,
            state: RwLock::new(DeepState {
                params,
                rng,
                trained: false,
            }),
        }
    }

    pub fn with_metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    fn to_matrices(records: &[Record], input_size: usize) -> FactorResult<(Array2<f64>, Array2<f64>)> {
        let flat: Vec<f64> = records
            .iter()
            .flat_map(|r| r.features.iter().copied())
            .collect();
        let x = Array2::from_shape_vec((records.len(), input_size), flat).map_err(|e| {
            FactorEngineError::Unknown {
                reason: format!("feature matrix shape: {}", e),
            }
        })?;
        let y = Array2::from_shape_vec(
            (records.len(), 1),
            records.iter().map(|r| r.target).collect(),
        )
        .map_err(|e| FactorEngineError::Unknown {
            reason: format!("target matrix shape: {}", e),
        })?;
        Ok((x, y))
    }

    fn training_loss(params: &Params, x: &Array2<f64>, y: &Array2<f64>) -> f64 {
        let output = forward(params, x.view()).output;
        let predictions: Vec<f64> = output.iter().copied().collect();
        let targets: Vec<f64> = y.iter().copied().collect();
        ErrorMetric::Mse.compute(&predictions, &targets)
    }
}

impl FactorModel for DeepFactorModel {
    fn train(&self, records: &[Record], epochs: usize) -> FactorResult<()> {
        check_training_set(&self.name, self.input_size, records)?;
        if epochs == 0 {
            return Err(FactorEngineError::InvalidTrainingData {
                model: self.name.clone(),
                reason: "epochs must be positive".to_string(),
            });
        }

        info!(
            "Training {} with {} samples for {} epochs",
            self.name,
            records.len(),
            epochs
        );

        let split = ((records.len() as f64 * TRAIN_SPLIT).round() as usize).clamp(1, records.len());
        let (train_set, holdout) = records.split_at(split);
        let (x, y) = Self::to_matrices(train_set, self.input_size)?;

        let mut state = self
            .state
            .write()
            .map_err(|_| FactorEngineError::poisoned("deep model"))?;
        let DeepState { params, rng, .. } = &mut *state;

        // Train on a copy so a diverged run leaves the previous weights intact
        let mut candidate = params.clone();
        let mut optimizer = Adam::new(&candidate, self.config.learning_rate);
        let mut indices: Vec<usize> = (0..x.nrows()).collect();
        let batch_size = self.config.batch_size.max(1);

        for epoch in 0..epochs {
            indices.shuffle(rng);
            for chunk in indices.chunks(batch_size) {
                let xb = x.select(Axis(0), chunk);
                let yb = y.select(Axis(0), chunk);
                let acts = forward(&candidate, xb.view());
                let grads = backward(&candidate, xb.view(), &yb, &acts);
                optimizer.apply(&mut candidate, &grads);
            }
            debug!(
                "Epoch {} completed, loss: {:.6}",
                epoch,
                Self::training_loss(&candidate, &x, &y)
            );
        }

        if !candidate.is_finite() {
            return Err(FactorEngineError::InvalidTrainingData {
                model: self.name.clone(),
                reason: "training diverged (non-finite weights)".to_string(),
            });
        }

        *params = candidate;
        state.trained = true;

        if holdout.is_empty() {
            info!("{} training completed. No holdout records", self.name);
        } else {
            let (hx, hy) = Self::to_matrices(holdout, self.input_size)?;
            info!(
                "{} training completed. Test MSE: {:.6}",
                self.name,
                Self::training_loss(&state.params, &hx, &hy)
            );
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> FactorResult<f64> {
        let state = self
            .state
            .read()
            .map_err(|_| FactorEngineError::poisoned("deep model"))?;
        if !state.trained {
            return Err(FactorEngineError::NotTrained {
                model: self.name.clone(),
            });
        }
        check_feature_size(&self.name, self.input_size, features)?;

        let x = Array2::from_shape_vec((1, self.input_size), features.to_vec()).map_err(|e| {
            FactorEngineError::PredictionFailed {
                model: self.name.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(forward(&state.params, x.view()).output[[0, 0]])
    }

    fn evaluate(&self, records: &[Record]) -> FactorResult<f64> {
        let state = self
            .state
            .read()
            .map_err(|_| FactorEngineError::poisoned("deep model"))?;
        if !state.trained {
            return Err(FactorEngineError::NotTrained {
                model: self.name.clone(),
            });
        }
        if records.is_empty() {
            return Err(FactorEngineError::EmptyEvaluationSet {
                model: self.name.clone(),
            });
        }
        for record in records {
            check_feature_size(&self.name, self.input_size, &record.features)?;
        }

        let (x, _) = Self::to_matrices(records, self.input_size)?;
        let predictions: Vec<f64> = forward(&state.params, x.view())
            .output
            .iter()
            .copied()
            .collect();
        let targets: Vec<f64> = records.iter().map(|r| r.target).collect();
        let score = self.metric.compute(&predictions, &targets);
        info!(
            "{} evaluation completed. {}: {:.6}",
            self.name,
            self.metric.as_str(),
            score
        );
        Ok(score)
    }

    fn metric(&self) -> ErrorMetric {
        self.metric
    }

    fn is_trained(&self) -> bool {
        self.state.read().map(|s| s.trained).unwrap_or(false)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn sample_records(n: usize, seed: u64) -> Vec<Record> {
        let mut rng = StdRng::seed_from_u64(seed);
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        (0..n)
            .map(|i| {
                let features: Vec<f64> = (0..5).map(|_| rng.random::<f64>()).collect();
                let target = features[0] * 0.5 + features[1] * 0.3 + features[2] * 0.2;
                Record::new(today - Duration::days(i as i64), features, target)
                    .with_factor_value(target)
            })
            .collect()
    }

    #[test]
    fn test_train_and_predict() {
        let config = DeepModelConfig {
            learning_rate: 0.01,
            ..DeepModelConfig::default()
        };
        let model = DeepFactorModel::with_config("deeplearning", 5, config);
        let data = sample_records(100, 7);

        model.train(&data, 30).unwrap();
        assert!(model.is_trained());

        let prediction = model.predict(&data[0].features).unwrap();
        assert!(prediction.is_finite());

        let mse = model.evaluate(&data).unwrap();
        assert!(mse < 0.1, "MSE should be less than 0.1, got {}", mse);
    }

    #[test]
    fn test_predict_before_training() {
        let model = DeepFactorModel::new(5);
        let data = sample_records(1, 1);
        let err = model.predict(&data[0].features).unwrap_err();
        assert!(matches!(err, FactorEngineError::NotTrained { .. }));
    }

    #[test]
    fn test_feature_size_mismatch() {
        let model = DeepFactorModel::new(5);
        model.train(&sample_records(20, 3), 2).unwrap();
        let err = model.predict(&[0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            FactorEngineError::FeatureSizeMismatch {
                expected: 5,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let data = sample_records(40, 11);
        let a = DeepFactorModel::new(5);
        let b = DeepFactorModel::new(5);
        a.train(&data, 5).unwrap();
        b.train(&data, 5).unwrap();

        let features = [0.2, 0.4, 0.6, 0.8, 1.0];
        assert_eq!(a.predict(&features).unwrap(), b.predict(&features).unwrap());
    }

    #[test]
    fn test_rejects_empty_data_and_zero_epochs() {
        let model = DeepFactorModel::new(5);
        assert!(model.train(&[], 10).is_err());
        assert!(model.train(&sample_records(10, 2), 0).is_err());
        assert!(!model.is_trained());
    }
}
