//! Shared data model for autorec.
//!
//! This crate defines the data every other layer agrees on:
//!
//! - **Identity** ([`RoomId`], [`ShortRoomId`], [`RoomInfo`]): which
//!   broadcast room we are talking about and what it currently shows.
//! - **Settings** ([`RoomSettings`], [`MonitorTiming`], [`RecorderTiming`]):
//!   the persisted per-room knobs and the timing views handed to the
//!   monitor and recorder collaborators.
//! - **Segments** ([`RecordedSegment`]): what a recorder reports when it
//!   finishes writing a file.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how settings documents
//!   are turned into bytes and back.
//!
//! It knows nothing about rooms being live, recorders or tasks; it only
//! describes data.

mod codec;
mod error;
mod settings;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ModelError;
pub use settings::{MonitorTiming, RecorderTiming, RoomSettings};
pub use types::{RecordedSegment, RoomId, RoomInfo, ShortRoomId};
