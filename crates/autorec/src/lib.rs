//! # Autorec
//!
//! Watches live-stream rooms and records them while they are live.
//!
//! Embedding applications implement [`Backend`](autorec_room::Backend)
//! to supply a monitor (what is live?) and a recorder (capture the
//! stream). Autorec handles per-room orchestration, settings persistence
//! and event fan-out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autorec::prelude::*;
//!
//! // Implement Backend for your platform, then:
//! // autorec::init_tracing();
//! // let mut app = Autorec::builder()
//! //     .settings_path("settings.json")
//! //     .build(MyBackend::new())
//! //     .await?;
//! // app.add_room(RoomInfo::new(RoomId(21452505)))?;
//! // app.run().await
//! ```

mod app;
mod error;
mod logging;

pub use app::{Autorec, AutorecBuilder, DEFAULT_EVENT_CAPACITY, DEFAULT_SETTINGS_PATH};
pub use error::AutorecError;
pub use logging::{init_tracing, init_tracing_with};

pub use autorec_model as model;
pub use autorec_room as room;
pub use autorec_settings as settings;

pub mod prelude {
    pub use crate::{Autorec, AutorecBuilder, AutorecError, init_tracing};
    pub use autorec_model::{
        MonitorTiming, RecordedSegment, RecorderTiming, RoomId, RoomInfo, RoomSettings,
        ShortRoomId,
    };
    pub use autorec_room::{
        Backend, HandleError, MonitorContext, MonitorEvents, MonitorHandle, PollingMonitor,
        RecorderContext, RecorderEvents, RecorderHandle, RecordingStatus, Room, RoomEvent,
        RoomStatus, StatusSource,
    };
}
