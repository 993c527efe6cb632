//! Credential primitives: password hashing and bearer-token signing.

pub mod password;
pub mod token;

pub use token::{TokenError, TokenService};
