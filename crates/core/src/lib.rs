//! Coupons
//!
//! Coupons is the pure half of the coupon application engine: the coupon
//! data model, code normalisation, batch validation and deterministic
//! discount planning. Nothing here performs I/O; lookups and usage
//! bookkeeping live with the store collaborators in `coupons-app`.

pub mod coupons;
pub mod prelude;
pub mod usage;
pub mod uuids;
pub mod validation;
