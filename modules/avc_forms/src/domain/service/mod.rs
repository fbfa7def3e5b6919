mod patients;
mod users;

pub use patients::PatientsService;
pub use users::UsersService;

use crate::contract::model::PageRequest;

/// Offsets are bound as signed 64-bit SQL parameters.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Configuration for the domain services
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub max_code_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: 25,
            max_page_size: 100,
            max_code_length: 100,
        }
    }
}

impl ServiceConfig {
    /// Effective `(limit, offset)`: a missing or zero limit takes the default,
    /// larger limits are capped at `max_page_size`, offsets at `i64::MAX`.
    pub fn window(&self, req: PageRequest) -> (u64, u64) {
        let limit = match req.limit {
            None | Some(0) => self.default_page_size,
            Some(n) => n.min(self.max_page_size),
        };
        (limit, req.offset.unwrap_or(0).min(MAX_OFFSET))
    }
}
