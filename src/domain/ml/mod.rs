pub mod metrics;
pub mod model;
pub mod record;

pub use metrics::ErrorMetric;
pub use model::{FactorModel, SharedModel};
pub use record::Record;
