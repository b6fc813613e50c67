//! The provisioning bridge.
//!
//! The node sits between the provisioning collaborator and whoever the
//! embedding application registered as a subscriber. The bridge acts on the
//! completion event (committing keys and identity) and then forwards every
//! event unmodified, in arrival order. It never suppresses anything,
//! including the completion event it acted on.

use tokio::sync::mpsc;
use tracing::debug;

use crate::events::ProvisioningEvent;

/// What the node does with a provisioning event before forwarding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeDisposition {
    /// Commit the provisioning output, then forward.
    CommitAndForward,
    /// Update lifecycle state only, then forward.
    ForwardOnly,
}

/// Classify which provisioning events carry output the node must commit.
pub fn classify_provisioning_event(event: &ProvisioningEvent) -> BridgeDisposition {
    match event {
        ProvisioningEvent::Complete(_) => BridgeDisposition::CommitAndForward,
        ProvisioningEvent::LinkOpened
        | ProvisioningEvent::LinkClosed
        | ProvisioningEvent::Failed { .. } => BridgeDisposition::ForwardOnly,
    }
}

/// Holds the single subscriber slot and forwards events into it.
#[derive(Debug, Default)]
pub struct ProvisioningBridge {
    subscriber: Option<mpsc::UnboundedSender<ProvisioningEvent>>,
}

impl ProvisioningBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the subscriber, replacing any previous registration.
    pub fn set_subscriber(&mut self, subscriber: mpsc::UnboundedSender<ProvisioningEvent>) {
        self.subscriber = Some(subscriber);
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Forward an event to the subscriber, if one is registered. A closed
    /// receiver unregisters the subscriber.
    pub fn forward(&mut self, event: ProvisioningEvent) {
        if let Some(subscriber) = &self.subscriber {
            if subscriber.send(event).is_err() {
                debug!("provisioning subscriber dropped, unregistering");
                self.subscriber = None;
            }
        }
    }
}
