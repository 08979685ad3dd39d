//! # Database Crate
//!
//! This crate is the application's interface to the PostgreSQL return
//! database: programs, markets (traded and benchmark) and their P&L records.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** This crate encapsulates all database-specific logic. It
//!   provides a clean API to the rest of the application, hiding the underlying
//!   SQL and database implementation details.
//! - **Snapshot Loading:** The analytics core is synchronous. This crate loads the
//!   rows a run needs into an `InMemoryReturnStore` up front, concurrently, and
//!   the core reads only from that snapshot.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent database access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: A utility to apply database migrations, ensuring the schema is up-to-date.
//! - `DbRepository`: Holds the connection pool and provides the data access methods
//!   (e.g., `load_return_store`, `get_program`).
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, connect_with_url, run_migrations};
pub use error::DbError;
pub use repository::{
    DateBounds, DbMarket, DbPnlRecord, DbProgram, DbRepository, build_return_store,
};
