//! Metrics and observability infrastructure for dockside.
//!
//! - `events`: Internal event types and the `InternalEvent` trait
//! - `server`: Prometheus exporter initialization

pub mod events;
pub mod server;

pub use server::init;

/// Emit an internal event.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding Prometheus metric. Without an installed
/// recorder the call is a no-op.
///
/// # Example
///
/// ```ignore
/// use dockside::metrics::events::RowsClassified;
///
/// emit!(RowsClassified { count: 100 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
