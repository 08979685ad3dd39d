pub mod enums;
pub mod error;
pub mod store;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{EntityRef, Resolution};
pub use error::{CoreError, StoreError};
pub use store::{InMemoryReturnStore, ReturnStore};
pub use structs::{DatedReturn, Market, MarketId, ProgramId};
