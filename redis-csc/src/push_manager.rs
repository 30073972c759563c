use crate::{PushKind, Value};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Holds information about received Push data
#[derive(Debug, Clone)]
pub struct PushInfo {
    /// Push Kind
    pub kind: PushKind,
    /// Data from push message
    pub data: Vec<Value>,
    /// Connection address to distinguish connections
    pub con_addr: Arc<String>,
}

/// Routes out-of-band push values from a connection's read path to whoever
/// consumes them, typically an invalidation listener.  Sending never blocks,
/// so the connection can forward a push while a normal response is in flight.
#[derive(Clone, Default)]
pub struct PushManager {
    sender: Arc<ArcSwap<Option<tokio::sync::mpsc::UnboundedSender<PushInfo>>>>,
}

impl PushManager {
    /// Creates new `PushManager` without a consumer attached.
    pub fn new() -> Self {
        PushManager {
            sender: Arc::from(ArcSwap::from(Arc::from(None))),
        }
    }

    /// Attaches (or replaces) the consuming side of the manager.
    pub fn replace_sender(&self, sender: tokio::sync::mpsc::UnboundedSender<PushInfo>) {
        self.sender.store(Arc::new(Some(sender)));
    }

    /// Checks if `PushManager` has a consumer attached.
    pub fn has_sender(&self) -> bool {
        self.sender.load().is_some()
    }

    /// Forwards the value when it is a push message and a consumer is
    /// attached.  Returns true if the value was a push message.
    pub fn try_send_raw(&self, value: &Value, con_addr: &Arc<String>) -> bool {
        if let Value::Push { kind, data } = value {
            self.send(PushInfo {
                kind: kind.clone(),
                data: data.clone(),
                con_addr: con_addr.clone(),
            });
            true
        } else {
            false
        }
    }

    /// Try to send `PushInfo` to the channel without blocking.  A closed
    /// receiver detaches the consumer instead of erroring.
    pub(crate) fn send(&self, pi: PushInfo) {
        let guard = self.sender.load();
        if let Some(sender) = &**guard {
            if sender.send(pi).is_err() {
                self.sender.compare_and_swap(guard, Arc::new(None));
            }
        }
    }
}
