pub mod calendar_projection;
pub mod mutation_handle;
pub mod mutation_service;

pub use calendar_projection::{project, CalendarDay, CalendarProjection};
pub use mutation_handle::MutationHandle;
pub use mutation_service::{MutationReconciler, Snapshot};
