//! Authentication module

mod jwt;

pub use jwt::{Claims, JwtAuthProvider, JwtService};
