//! Coupon application service: store collaborators, the validate/apply
//! service, configuration and logging for the `coupons` binary.

pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod observability;

#[cfg(test)]
mod test;
