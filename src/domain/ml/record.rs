use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One dated observation: a fixed-length feature vector and its target.
///
/// `factor_value` and `realized_return` are derived fields filled in by
/// record transforms or by the data supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub features: Vec<f64>,
    pub target: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_return: Option<f64>,
}

impl Record {
    pub fn new(date: NaiveDate, features: Vec<f64>, target: f64) -> Self {
        Self {
            date,
            features,
            target,
            factor_value: None,
            realized_return: None,
        }
    }

    pub fn with_factor_value(mut self, value: f64) -> Self {
        self.factor_value = Some(value);
        self
    }

    pub fn with_realized_return(mut self, value: f64) -> Self {
        self.realized_return = Some(value);
        self
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}
