//! The inner-product functional-encryption scheme: parameter search,
//! keys, and the encrypt/decrypt operations.

pub mod params;
pub mod scheme;
