//! Authentication primitives shared by HTTP front ends
//!
//! Pure functions and settings-table access only; each front end wraps these
//! with its own extractors.

pub mod auth;

pub use auth::{
    calculate_hash, hash_password, initialize_shared_secret, issue_token, load_shared_secret,
    validate_password, verify_password, verify_token, Role, TokenClaims, MIN_PASSWORD_LEN,
};
