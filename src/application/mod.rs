// Record preprocessing strategies
pub mod processing;

// Factor models, ensemble and registry
pub mod models;

// Engine orchestrator
pub mod engine;
