// Domain layer: models, report types, ports and pure services. No I/O here.

pub mod model;
pub mod ports;
pub mod report;

pub mod services;
