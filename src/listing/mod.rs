//! Truck listing: the fleet records and the filter/sort applied to them.

mod filter;
mod truck;

pub use filter::{filter_and_sort, Availability, FilterConstraints, SortMode};
pub use truck::{SelectedTruck, Truck, TruckStatus};
