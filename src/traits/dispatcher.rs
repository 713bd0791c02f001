use std::error::Error;

use crate::address::Address;
use crate::message::ControlMessage;

/// Outgoing message transport with two delivery disciplines.
///
/// Durable sends are queued and retried by the transport itself; the engine fires and
/// forgets them and a delivery failure is never surfaced as an operation failure.
/// Non-durable sends are awaited: the engine blocks on the outcome and uses it to gate a
/// dependent local mutation, for example deactivating a group only once the leave notice
/// went out.
pub trait Dispatcher {
    type Error: Error;

    /// Durable send: enqueued for delivery with the transport's own retry policy.
    fn send(&self, message: &ControlMessage, address: &Address);

    /// Non-durable send: best effort, awaited by the caller.
    fn send_awaited(&self, message: &ControlMessage, address: &Address)
    -> Result<(), Self::Error>;
}
