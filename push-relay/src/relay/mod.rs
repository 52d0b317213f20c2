//! Delivery-reliability engine.
//!
//! Notifications are handed to a [`Dispatcher`], which resolves the app's
//! transport from the [`TransportRegistry`], classifies each gateway response,
//! retries transient failures with exponential backoff and keeps per-device
//! counters through the [`DeviceTracker`]. A [`ConnectionMonitor`] rebuilds
//! every transport when deliveries have been idle for too long.

pub mod attempt;
pub mod context;
pub mod dispatcher;
pub mod monitor;
pub mod notification;
pub mod registry;
pub mod tracker;

pub use attempt::{AttemptError, attempt};
pub use context::RelayContext;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use monitor::{ConnectionMonitor, LastDelivery};
pub use notification::Notification;
pub use registry::TransportRegistry;
pub use tracker::DeviceTracker;
