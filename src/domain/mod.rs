// Domain layer: core models and the GitHub port. No transport code here.

pub mod model;
pub mod ports;
