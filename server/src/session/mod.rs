//! Per-session coordination: serialised state updates, request throttling and
//! the persistence port.

pub mod locks;
pub mod store;
pub mod throttle;

pub use locks::SessionLocks;
pub use store::StateStore;
pub use throttle::Throttle;
