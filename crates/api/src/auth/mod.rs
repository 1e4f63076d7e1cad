//! Authentication primitives.
//!
//! Users are identified by an HS256 bearer token issued by the identity
//! provider; [`jwt`] validates it and yields the owner id.

pub mod jwt;
