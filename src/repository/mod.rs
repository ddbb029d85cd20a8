//! Database repository layer

pub mod credential_repo;
pub mod credential_store;

pub use credential_repo::*;
pub use credential_store::*;
