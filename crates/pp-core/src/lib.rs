//! pp-core: stable foundation for the power plant emulator.
//!
//! Contains:
//! - registers (the shared `RegisterBank` and its locked view)
//! - map (register addresses, roles and descriptors)
//! - numeric (Real + register encoding helpers)
//! - ids (compact token identifiers)
//! - timing (tick duration accounting)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod map;
pub mod numeric;
pub mod registers;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::{TokenId, TokenIdAllocator};
pub use map::{Address, RegisterDescriptor, RegisterRole};
pub use numeric::*;
pub use registers::{BANK_SIZE, RegisterBank, RegisterView};
pub use timing::TickTimer;
