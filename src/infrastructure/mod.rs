// Record sources (CSV, synthetic)
pub mod records;
