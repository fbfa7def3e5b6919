// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::model;

// === MODULE DEFINITION ===
pub mod config;
pub mod module;
pub use module::AvcForms;

// === INTERNAL MODULES ===
// Exposed for integration tests; consumers should stick to `contract` and `AvcForms`.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
