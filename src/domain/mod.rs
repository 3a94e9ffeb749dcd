// Domain layer: result types and the ports the validation service depends on.

pub mod model;
pub mod ports;
