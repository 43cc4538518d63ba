// Domain layer: pipeline artifacts and the stage port. No I/O.

pub mod model;
pub mod ports;
