//! # firkin
//!
//! An embedded, crash-consistent key-value store built on an append-only
//! log with an in-memory key directory.
//!
//! ## Features
//!
//! - **Log-Structured Storage**: every mutation is an append; segment
//!   files are never rewritten in place
//! - **Fast Point Lookups**: one hash lookup plus one positional read
//! - **Crash Recovery**: the key directory is rebuilt from the segment
//!   files on open, tolerating a torn record at the tail
//! - **Group Commit**: buffered writes with a periodic flush-then-fsync
//! - **Concurrent Access**: parallel readers, serialized writers
//! - **Checksummed Records**: CRC-32 Castagnoli verified on every read
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use firkin::Store;
//!
//! // Open store
//! let store = Store::open("./my_data")?;
//!
//! // Basic operations
//! store.put(b"hello", b"world")?;
//! let value = store.get(b"hello")?;
//! store.delete(b"hello")?;
//!
//! // Force durability
//! store.sync()?;
//! store.close()?;
//! ```

// Public modules
pub mod error;
pub mod options;

// Store module
mod store;

// Internal modules
mod flusher;
mod keydir;
mod record;
mod segment;
mod util;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use options::{Options, OptionsBuilder};

// Store
pub use store::Store;
