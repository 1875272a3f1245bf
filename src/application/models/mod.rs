// Concrete factor models
pub mod deep;
pub mod linear;

// Composition and naming
pub mod ensemble;
pub mod registry;

pub use deep::DeepFactorModel;
pub use ensemble::{EnsembleMember, EnsembleModel};
pub use linear::LinearRegressionModel;
pub use registry::{DEEP_MODEL, ENSEMBLE_MODEL, LINEAR_MODEL, ModelRegistry};
