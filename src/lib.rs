//! FreightFlow: offline cache manager, truck listing and checkout helpers for
//! the FreightFlow booking site.

pub mod cache;
pub mod checkout;
pub mod config;
pub mod db;
pub mod listing;
pub mod net;
pub mod worker;

#[cfg(test)]
mod testing;
