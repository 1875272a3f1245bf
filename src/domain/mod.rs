// Records, the model contract and error metrics
pub mod ml;

// Domain-specific error types
pub mod errors;
