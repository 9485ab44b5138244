// Domain layer: fault model and ports. No runtime behaviour lives here.

pub mod model;
pub mod ports;
