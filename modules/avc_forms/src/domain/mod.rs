pub mod error;
pub mod identity;
pub mod password;
pub mod policy;
pub mod repo;
pub mod service;

pub use error::DomainError;
pub use identity::Identity;
