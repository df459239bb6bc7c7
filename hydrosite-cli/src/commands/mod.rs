pub mod analyze;
pub mod layers;
