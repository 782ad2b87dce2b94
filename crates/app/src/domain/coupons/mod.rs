//! Coupons

pub mod data;
mod errors;
pub mod memory;
pub mod postgres;
mod repositories;
pub mod service;
pub mod store;

pub use errors::{CouponsServiceError, StoreError};
pub use service::*;
