//! Interfaces to the external collaborators of the group engine: durable storage, the
//! message transport and the push-notification bridge.
mod dispatcher;
mod notifications;
mod store;

pub use dispatcher::Dispatcher;
pub use notifications::NotificationBridge;
pub use store::GroupStore;
