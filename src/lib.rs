pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TrackerConfig;

pub use adapters::{
    build_store, fallback::FallbackStore, github::GithubStore, local::LocalStore,
    remote::RemoteStore,
};
pub use crate::core::{days, tracker::TripTracker};
pub use domain::model::{Country, NewTrip, Traveler, Trip, TripUpdate};
pub use utils::error::{Result, TrackerError};
