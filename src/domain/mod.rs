// Domain layer: trip models, the storage port and legacy-record migration.

pub mod migration;
pub mod model;
pub mod ports;
