// Domain layer: request-scoped models and the resolver ports.

pub mod model;
pub mod ports;
