// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-table
//!
//! A symbolic registry mapping transcript tensor names to live device values.
//!
//! # Key Components
//!
//! - [`MemoryTable`]: the registry. Inserts overwrite unconditionally;
//!   lookup and removal of unknown names fail fast.
//! - [`TableStats`]: cumulative counters (inserts, overwrites, removals,
//!   peak live entries).
//! - [`TableError`]: the `MissingReference` failure.
//!
//! # Ownership Model
//!
//! ```text
//! insert(name, handle) ──► entries[name] = handle   (old handle returned)
//! lookup(name)         ──► &handle                   (clone = extra claim)
//! remove(name)         ──► handle dropped by caller
//! ```
//!
//! Values are typically reference-counted tensor handles. Overwriting a
//! name releases the table's claim on the previous value; other claims
//! (aliases registered under different names, views) keep it alive.
//!
//! # Example
//! ```
//! use memory_table::MemoryTable;
//!
//! let mut table = MemoryTable::new();
//! table.insert("x", 1);
//! assert_eq!(*table.lookup("x").unwrap(), 1);
//!
//! table.insert("x", 2);
//! assert_eq!(table.stats().overwrites, 1);
//!
//! table.remove("x").unwrap();
//! assert!(table.lookup("x").is_err());
//! ```

mod error;
mod stats;
mod table;

pub use error::TableError;
pub use stats::TableStats;
pub use table::MemoryTable;
