//! Persisted settings store for autorec.
//!
//! Every room's persisted settings live in one process-wide document that
//! is written wholesale. This crate owns that document:
//!
//! 1. **Sink**: the [`SettingsSink`] trait rooms use to say "my settings
//!    changed" without knowing anything about files or timing.
//! 2. **Store**: [`SettingsStore`] is a single actor task that keeps the
//!    document, coalesces bursts of changes and serializes saves, so two
//!    rooms changing at once never interleave writes.
//! 3. **Storage**: where the bytes go ([`Storage`] trait, with
//!    [`JsonFileStorage`] for real use and [`MemoryStorage`] for tests).
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)      ← calls SettingsSink::mark_dirty on setting changes
//!     ↕
//! Settings layer (this crate)  ← batches and writes the whole document
//!     ↕
//! Model layer (below)     ← provides RoomSettings and the Codec
//! ```

mod document;
mod error;
mod sink;
mod storage;
mod store;

pub use document::{SettingsConfig, SettingsDocument};
pub use error::SettingsError;
pub use sink::SettingsSink;
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::{SettingsHandle, SettingsStore};
