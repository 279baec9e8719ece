// Domain layer - Core types, errors and invariants

pub mod errors;
pub mod model;
