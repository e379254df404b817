//! Interaction session capture.
//!
//! `trail` records clicks, form submissions, field input, navigation and
//! pointer movement inside a document during a bounded recording interval,
//! keeps the in-progress log in an external key-value store so it survives
//! reloads, and turns finalized sessions into exportable documents.
//!
//! The host (a content script, a test harness, the CLI replayer) provides
//! three capabilities:
//!
//! * [`Element`] - ancestor/sibling access to document elements
//! * [`EventHost`] - listener registration and navigation interception
//! * [`KeyValueStore`] - the asynchronous persistent store
//!
//! [`SessionController`] ties them together:
//!
//! ```ignore
//! let (bridge, worker) = PersistenceBridge::new(store, config.persist.clone());
//! tokio::spawn(worker.run());
//!
//! let mut controller = SessionController::new(host, bridge, Arc::new(SystemClock), config.capture);
//! controller.restore().await?;
//! let response = controller.handle_command(CommandRequest::StartTracking).await;
//! controller.dispatch(RawEvent::Click { target: element })?;
//! ```

pub mod capture;
pub mod clock;
pub mod config;
pub mod controller;
pub mod dom;
pub mod element;
pub mod error;
pub mod export;
pub mod locator;
pub mod persist;
pub mod testing;

pub use capture::{EventCapture, EventHost, HookId, ListenerId, ListenerKind, RawEvent, Throttle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CaptureConfig, PersistConfig, TrailConfig};
pub use controller::{ActiveSession, RestoreOutcome, SessionController, SessionState};
pub use element::Element;
pub use error::{Result, TrailError};
pub use export::{ExportedFile, export_batch, export_document, export_filename, render_document};
pub use locator::{ROOT_PATH, resolve_locator};
pub use persist::{KeyValueStore, MemoryStore, PersistenceBridge, PersistenceWorker, StoreError};

pub use trail_protocol as protocol;
