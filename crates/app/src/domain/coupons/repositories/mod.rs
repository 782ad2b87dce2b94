pub(crate) mod coupons;
pub(crate) mod usages;
