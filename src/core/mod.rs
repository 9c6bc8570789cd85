pub mod days;
pub mod report;
pub mod thresholds;
pub mod tracker;

pub use crate::domain::model::{CountryTotals, Served, StoreSnapshot, Trip};
pub use crate::domain::ports::{ConfigProvider, TripStore};
pub use crate::utils::error::Result;
