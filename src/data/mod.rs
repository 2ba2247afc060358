//! Data models and pure processing for the service mirror.
//!
//! Nothing in this module performs I/O. Network access lives in
//! [`crate::client`] and [`crate::sync`]; this module only shapes and
//! derives data.
//!
//! ## Submodules
//!
//! - [`duration`]: Parsing and formatting of durations and relative ages
//! - [`history`]: Latency sample cache and sparkline geometry
//! - [`latency`]: Latency classification against [`Thresholds`]
//! - [`registry`]: The client-side [`Registry`] of services
//! - [`service`]: Wire models ([`ServiceRecord`], [`ServiceDraft`])
//! - [`view`]: Filtering, ordering and aggregate [`Stats`]
//!
//! ## Data Flow
//!
//! ```text
//! GET /api/services (JSON)
//!        │
//!        ▼
//! Registry::replace_all() / Registry::patch()
//!        │
//!        ├──▶ view::project() ──▶ ordered, filtered services
//!        │
//!        └──▶ Stats::from_registry() ──▶ header counters
//! ```

pub mod duration;
pub mod history;
pub mod latency;
pub mod registry;
pub mod service;
pub mod view;

pub use history::HistoryStore;
pub use latency::{classify, LatencyTier, Thresholds};
pub use registry::{PatchOutcome, Registry};
pub use service::{ServiceDraft, ServiceRecord, ServiceStatus};
pub use view::{project, FilterMode, Stats, ViewFilter};
