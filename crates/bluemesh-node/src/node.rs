//! The mesh node: bring-up, the async event loop, and the lifecycle
//! transitions it drives.
//!
//! A [`MeshNode`] owns every collaborator (bearer, key repository, stack
//! layers, provisioning bridge) and routes all events through a single
//! handler, so transitions run to completion before the next event is
//! processed and no locking is needed between the collaborators.

use tokio::sync::{mpsc, watch};

use rand::RngCore;

use bluemesh_core::advertising::{
    node_identity_advertisement, unprovisioned_device_advertisement, unprovisioned_device_beacon,
};
use bluemesh_core::keys::{ApplicationKey, NetworkKey};
use bluemesh_core::provisioning::{ProvisioningData, FLAG_IV_UPDATE};
use bluemesh_core::record::{decode_node_record, encode_node_record, NodeRecord};
use bluemesh_core::tag::{InternalIndex, Tag};
use bluemesh_core::types::{DeviceUuid, NetKeyIndex, UnicastAddress};
use bluemesh_crypto::derive::node_identity_hash;

use crate::bearer::{AnyBearer, ProxyMode};
use crate::bridge::{classify_provisioning_event, BridgeDisposition, ProvisioningBridge};
use crate::bringup::{bringup_sequence, BringUpStep, Capabilities};
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::{ControllerEvent, NodeEvent, ProvisioningEvent};
use crate::identity::NodeIdentity;
use crate::lifecycle::{self, LifecycleState, ResumeAction};
use crate::repository::KeyRepository;
use crate::stack::{
    AccessLayer, LowerTransport, ModelIdentifier, NetworkLayer, UpperTransport,
    CONFIGURATION_SERVER_MODEL_ID, HEALTH_SERVER_MODEL_ID,
};
use crate::store::{AnyTagStore, StoreProvider};

/// Cloneable handle for signalling node shutdown from outside the event loop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Signal the node to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// A Bluetooth Mesh node: lifecycle state machine, key repository, and the
/// event loop wiring them to the bearer and storage.
pub struct MeshNode {
    config: NodeConfig,
    caps: Capabilities,
    bearer: AnyBearer,
    store_provider: StoreProvider,
    /// Resolved on the stack-operational event; the handle may not exist
    /// before that signal.
    store: Option<AnyTagStore>,
    repository: KeyRepository,
    identity: NodeIdentity,
    network: NetworkLayer,
    lower_transport: Option<LowerTransport>,
    upper_transport: Option<UpperTransport>,
    access: Option<AccessLayer>,
    bridge: ProvisioningBridge,
    state: LifecycleState,
    /// The netkey index received during provisioning; drives proxy
    /// advertising payload selection.
    primary_netkey_index: Option<NetKeyIndex>,
    event_tx: mpsc::Sender<NodeEvent>,
    event_rx: mpsc::Receiver<NodeEvent>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    started: bool,
    uuid_task: Option<tokio::task::JoinHandle<()>>,
}

impl MeshNode {
    /// Create a node from configuration and collaborators.
    pub fn new(
        config: NodeConfig,
        caps: Capabilities,
        bearer: AnyBearer,
        store_provider: StoreProvider,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            caps,
            bearer,
            store_provider,
            store: None,
            repository: KeyRepository::new(),
            identity: NodeIdentity::new(),
            network: NetworkLayer::new(),
            lower_transport: None,
            upper_transport: None,
            access: None,
            bridge: ProvisioningBridge::new(),
            state: LifecycleState::Unprovisioned,
            primary_netkey_index: None,
            event_tx,
            event_rx,
            shutdown_tx,
            shutdown_rx,
            started: false,
            uuid_task: None,
        }
    }

    /// Execute the bring-up sequence. Storage resolution and key loading are
    /// deferred to the stack-operational event.
    pub fn start(&mut self) -> Result<(), NodeError> {
        if self.started {
            return Err(NodeError::AlreadyRunning);
        }
        for step in bringup_sequence(self.caps) {
            self.execute_step(step)?;
            tracing::debug!(?step, "bring-up step complete");
        }
        self.started = true;
        tracing::info!(bearer = self.bearer.name(), "node started");
        Ok(())
    }

    fn execute_step(&mut self, step: BringUpStep) -> Result<(), NodeError> {
        match step {
            BringUpStep::RegisterEventHandler => {
                // The event channel from new() is the handler registration.
            }
            BringUpStep::InitAdvBearer => {
                tracing::debug!(bearer = self.bearer.name(), "advertising bearer ready");
            }
            BringUpStep::InitGattBearer => {
                tracing::debug!("gatt bearer ready");
            }
            BringUpStep::InitBeacon => {
                tracing::debug!("beacon module ready");
            }
            BringUpStep::InitProvisioning => {
                tracing::debug!("provisioning collaborator ready");
            }
            BringUpStep::InitNodeIdentity => {
                if let Some(uuid_hex) = &self.config.node.device_uuid {
                    let bytes = hex::decode(uuid_hex)
                        .map_err(|e| NodeError::Config(format!("invalid device_uuid: {e}")))?;
                    let uuid = DeviceUuid::try_from(bytes.as_slice())
                        .map_err(|e| NodeError::Config(format!("invalid device_uuid: {e}")))?;
                    self.identity.set_device_uuid(uuid);
                }
            }
            BringUpStep::InitNetwork => {
                self.network = NetworkLayer::new();
            }
            BringUpStep::InitLowerTransport => {
                self.lower_transport = Some(LowerTransport::new());
            }
            BringUpStep::InitUpperTransport => {
                if self.lower_transport.is_none() {
                    return Err(NodeError::BringUp("upper transport requires lower transport"));
                }
                self.upper_transport = Some(UpperTransport::new());
            }
            BringUpStep::InitAccess => {
                self.access = Some(AccessLayer::new());
            }
            BringUpStep::RegisterDefaultModels => {
                let Some(access) = self.access.as_mut() else {
                    return Err(NodeError::BringUp("default models require the access layer"));
                };
                let element = access.primary_element_mut();
                element.add_model(ModelIdentifier::sig(CONFIGURATION_SERVER_MODEL_ID));
                element.add_model(ModelIdentifier::sig(HEALTH_SERVER_MODEL_ID));
            }
        }
        Ok(())
    }

    /// Run the event loop. Returns when shutdown is signalled or the event
    /// channel closes.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        if !self.started {
            return Err(NodeError::NotStarted);
        }
        tracing::info!("entering event loop");

        loop {
            tokio::select! {
                biased;

                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            tracing::info!("event channel closed, exiting");
                            break;
                        }
                    }
                }

                _ = self.shutdown_rx.changed() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Route one event through the node. Each event runs to completion
    /// before the loop polls for the next.
    pub async fn handle_event(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::Controller(event) => self.handle_controller_event(event).await,
            NodeEvent::Provisioning(event) => self.handle_provisioning_event(event).await,
            NodeEvent::DeviceUuidReady(uuid) => self.handle_device_uuid_ready(uuid),
        }
    }

    async fn handle_controller_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::StackOperational => self.handle_stack_operational().await,
            ControllerEvent::ConnectionEstablished => {
                let previous = self.state;
                self.state = lifecycle::on_connection_established(previous);
                if self.state != previous {
                    // The connection consumed the advertising slot.
                    self.bearer.stop_unprovisioned_beacon();
                    self.bearer.stop_proxy_advertising();
                }
                tracing::debug!(state = ?self.state, "connection established");
            }
            ControllerEvent::LinkDisconnected => {
                let provisioned = self.identity.is_provisioned();
                self.state = lifecycle::on_link_disconnected(self.state, provisioned);
                if self.state != LifecycleState::Provisioning {
                    match lifecycle::advertising_after_disconnect(provisioned) {
                        ResumeAction::NetworkIdProxy => self.start_network_id_advertising(),
                        ResumeAction::UnprovisionedDevice => self.begin_unprovisioned_advertising(),
                    }
                }
                tracing::debug!(state = ?self.state, "link disconnected");
            }
        }
    }

    /// The stack is powered: resolve storage, recover persisted state, and
    /// start advertising in the mode matching the provisioned flag.
    async fn handle_stack_operational(&mut self) {
        match self.store_provider.open() {
            Ok(store) => self.store = store,
            Err(e) => {
                // Non-fatal: the node runs without persistence.
                tracing::warn!("failed to open tag store: {e}");
                self.store = None;
            }
        }

        let mut record = None;
        if let Some(store) = &self.store {
            self.repository.load_all(store, &mut self.network).await;
            record = match store.get_tag(Tag::node_record()).await {
                Ok(Some(bytes)) => match decode_node_record(&bytes) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!("skipping undecodable node record: {e}");
                        None
                    }
                },
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!("failed to read node record: {e}");
                    None
                }
            };
        }

        if let Some(record) = &record {
            self.identity.restore(record);
            self.network
                .iv_recovered(record.iv_index, record.flags & FLAG_IV_UPDATE != 0);
            if let Some(upper) = self.upper_transport.as_mut() {
                upper.set_device_key(record.device_key);
            }
            self.primary_netkey_index = Some(record.netkey_index);
            tracing::info!(
                unicast_address = %record.unicast_address,
                netkey_index = %record.netkey_index,
                "restored provisioned node state"
            );
        }

        // The latch covers both a restored record and in-session
        // provisioning; it decides the landing state and advertising mode.
        let provisioned = self.identity.is_provisioned();
        self.state = lifecycle::initial_state(provisioned);

        if provisioned {
            self.start_recovered_beacons();
            self.start_network_id_advertising();
        } else {
            self.begin_unprovisioned_advertising();
        }
    }

    async fn handle_provisioning_event(&mut self, event: ProvisioningEvent) {
        match classify_provisioning_event(&event) {
            BridgeDisposition::CommitAndForward => {
                if let ProvisioningEvent::Complete(data) = &event {
                    self.commit_provisioning_data(*data).await;
                }
            }
            BridgeDisposition::ForwardOnly => match &event {
                ProvisioningEvent::LinkOpened => {
                    self.state = lifecycle::on_provisioning_link_opened(self.state);
                    tracing::debug!(state = ?self.state, "provisioning link opened");
                }
                ProvisioningEvent::LinkClosed => {
                    let provisioned = self.identity.is_provisioned();
                    self.state = lifecycle::on_provisioning_link_closed(provisioned);
                    if !provisioned {
                        self.begin_unprovisioned_advertising();
                    }
                    tracing::debug!(state = ?self.state, "provisioning link closed");
                }
                ProvisioningEvent::Failed { reason } => {
                    self.state = lifecycle::on_provisioning_failed();
                    tracing::warn!(reason = *reason, "provisioning failed");
                }
                ProvisioningEvent::Complete(_) => {}
            },
        }
        // Every event reaches the subscriber, including Complete.
        self.bridge.forward(event);
    }

    /// Commit provisioning output in dependency order: node record, primary
    /// network key and subnet, beacon, identity state, advertising, latch.
    async fn commit_provisioning_data(&mut self, data: ProvisioningData) {
        // The record's presence is what makes the node provisioned at the
        // next power-up, so it persists first.
        let device_uuid = self
            .identity
            .device_uuid()
            .copied()
            .unwrap_or(DeviceUuid::new([0u8; 16]));
        let record = NodeRecord {
            device_uuid,
            unicast_address: data.unicast_address,
            device_key: data.device_key,
            iv_index: data.iv_index,
            flags: data.flags,
            netkey_index: data.netkey_index,
        };
        if let Some(store) = &self.store {
            if let Err(e) = store
                .store_tag(Tag::node_record(), &encode_node_record(&record))
                .await
            {
                tracing::warn!("failed to persist node record: {e}");
            }
        }

        let key = NetworkKey::derive(data.netkey_index, data.net_key);
        match self
            .repository
            .add_network_key(self.store.as_ref(), &mut self.network, key)
            .await
        {
            Ok(_) => {
                self.network.start_beacon(data.netkey_index);
            }
            Err(e) => {
                tracing::warn!("failed to install primary network key: {e}");
            }
        }

        self.identity.set_primary_address(data.unicast_address);
        if let Some(upper) = self.upper_transport.as_mut() {
            upper.set_device_key(data.device_key);
        }
        self.network.iv_recovered(data.iv_index, data.iv_update_active());
        self.primary_netkey_index = Some(data.netkey_index);

        // The provisioner knows this device now; switch advertising over to
        // node identity.
        self.bearer.stop_unprovisioned_beacon();
        self.start_node_identity_advertising();

        self.identity.mark_provisioned();
        self.state = lifecycle::on_provisioning_complete();

        tracing::info!(
            unicast_address = %data.unicast_address,
            netkey_index = %data.netkey_index,
            "provisioning complete"
        );
    }

    fn handle_device_uuid_ready(&mut self, uuid: DeviceUuid) {
        if self.identity.device_uuid().is_none() {
            self.identity.set_device_uuid(uuid);
        }
        // A connection or provisioning start may have consumed the
        // advertising slot while the UUID was generated.
        if self.state == LifecycleState::Unprovisioned {
            self.begin_unprovisioned_advertising();
        }
    }

    /// Advertise as an unprovisioned device: PB-ADV beacon plus connectable
    /// PB-GATT advertising, each gated by its capability. Without a device
    /// UUID yet, generation is kicked off instead and its completion event
    /// re-enters here.
    fn begin_unprovisioned_advertising(&mut self) {
        let Some(uuid) = self.identity.device_uuid().copied() else {
            self.spawn_uuid_generation();
            return;
        };
        let oob_info = self.config.node.oob_info;
        if self.caps.pb_adv {
            let beacon = unprovisioned_device_beacon(&uuid, oob_info).to_vec();
            self.bearer.start_unprovisioned_beacon(beacon);
        }
        if self.caps.pb_gatt {
            let adv = unprovisioned_device_advertisement(&uuid, oob_info).to_vec();
            self.bearer.start_proxy_advertising(ProxyMode::Unprovisioned, adv);
        }
    }

    /// Generate a device UUID off the event loop; the result arrives back as
    /// an event, so connection events can interleave with generation.
    fn spawn_uuid_generation(&mut self) {
        if self.uuid_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let event_tx = self.event_tx.clone();
        self.uuid_task = Some(tokio::spawn(async move {
            let mut bytes = [0u8; 16];
            rand::rngs::OsRng.fill_bytes(&mut bytes);
            let uuid = DeviceUuid::new(bytes);
            tracing::debug!(%uuid, "generated device uuid");
            let _ = event_tx.send(NodeEvent::DeviceUuidReady(uuid)).await;
        }));
    }

    /// Start connectable network-id proxy advertising for the primary subnet.
    fn start_network_id_advertising(&mut self) {
        if !self.caps.proxy {
            return;
        }
        let Some(netkey_index) = self.primary_netkey_index else {
            tracing::debug!("no primary network key, skipping network-id advertising");
            return;
        };
        let Some(payload) = self
            .repository
            .network_key_by_index(netkey_index)
            .and_then(|(slot, _)| self.repository.network_id_advertisement(slot))
        else {
            tracing::warn!(%netkey_index, "primary network key missing from repository");
            return;
        };
        let payload = payload.to_vec();
        self.bearer.start_proxy_advertising(ProxyMode::NetworkId, payload);
    }

    /// Start connectable node-identity advertising for the primary subnet.
    fn start_node_identity_advertising(&mut self) {
        if !self.caps.proxy {
            return;
        }
        let Some(netkey_index) = self.primary_netkey_index else {
            return;
        };
        let Some(address) = self.identity.primary_address() else {
            return;
        };
        let Some((_, key)) = self.repository.network_key_by_index(netkey_index) else {
            tracing::warn!(%netkey_index, "primary network key missing from repository");
            return;
        };
        let mut random = [0u8; 8];
        rand::rngs::OsRng.fill_bytes(&mut random);
        let hash = node_identity_hash(key.identity_key.as_bytes(), &random, address.value());
        let payload = node_identity_advertisement(&hash, &random).to_vec();
        self.bearer.start_proxy_advertising(ProxyMode::NodeIdentity, payload);
    }

    fn start_recovered_beacons(&mut self) {
        let recovered: Vec<NetKeyIndex> =
            self.network.subnets().map(|s| s.netkey_index).collect();
        for netkey_index in recovered {
            self.network.start_beacon(netkey_index);
        }
    }

    /// Factory-reset: delete every persisted record, clear keys and
    /// identity, and return to unprovisioned advertising.
    ///
    /// Fails with [`NodeError::StoreUnavailable`] before storage has been
    /// resolved, since an in-memory-only reset would resurrect the old keys
    /// at the next power-up.
    pub async fn reset(&mut self) -> Result<(), NodeError> {
        if self.store.is_none() && !self.store_provider.is_disabled() {
            return Err(NodeError::StoreUnavailable);
        }
        self.repository
            .delete_all_network_keys(self.store.as_ref(), &mut self.network)
            .await?;
        self.repository
            .delete_all_app_keys(self.store.as_ref())
            .await?;
        if let Some(store) = &self.store {
            store.delete_tag(Tag::node_record()).await?;
        }
        if let Some(upper) = self.upper_transport.as_mut() {
            upper.clear_device_key();
        }
        self.identity.reset();
        self.primary_netkey_index = None;
        self.bearer.stop_proxy_advertising();
        self.state = LifecycleState::Unprovisioned;
        self.begin_unprovisioned_advertising();
        tracing::info!("node reset to unprovisioned state");
        Ok(())
    }

    /// Add a network key at runtime, outside of provisioning.
    pub async fn add_network_key(&mut self, key: NetworkKey) -> Result<InternalIndex, NodeError> {
        self.repository
            .add_network_key(self.store.as_ref(), &mut self.network, key)
            .await
    }

    /// Add an application key at runtime.
    pub async fn add_app_key(&mut self, key: ApplicationKey) -> Result<InternalIndex, NodeError> {
        self.repository.add_app_key(self.store.as_ref(), key).await
    }

    /// Register the subscriber receiving every provisioning event, replacing
    /// any previous registration.
    pub fn register_provisioning_subscriber(
        &mut self,
        subscriber: mpsc::UnboundedSender<ProvisioningEvent>,
    ) {
        self.bridge.set_subscriber(subscriber);
    }

    /// Signal the node to shut down.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Cloneable handle for signalling shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Sender feeding the node's event loop.
    pub fn event_sender(&self) -> mpsc::Sender<NodeEvent> {
        self.event_tx.clone()
    }

    /// Stop advertising and tear the node down.
    pub async fn shutdown(mut self) {
        tracing::info!("shutting down node");
        self.trigger_shutdown();

        if let Some(task) = self.uuid_task.take() {
            task.abort();
            let _ = task.await;
        }

        self.bearer.stop_unprovisioned_beacon();
        self.bearer.stop_proxy_advertising();

        tracing::info!("node shutdown complete");
    }

    pub fn is_provisioned(&self) -> bool {
        self.identity.is_provisioned()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.state
    }

    pub fn device_uuid(&self) -> Option<&DeviceUuid> {
        self.identity.device_uuid()
    }

    pub fn set_device_uuid(&mut self, uuid: DeviceUuid) {
        self.identity.set_device_uuid(uuid);
    }

    pub fn primary_address(&self) -> Option<UnicastAddress> {
        self.identity.primary_address()
    }

    pub fn set_primary_address(&mut self, address: UnicastAddress) {
        self.identity.set_primary_address(address);
    }

    pub fn repository(&self) -> &KeyRepository {
        &self.repository
    }

    pub fn network(&self) -> &NetworkLayer {
        &self.network
    }

    pub fn bearer(&self) -> &AnyBearer {
        &self.bearer
    }

    pub fn access(&self) -> Option<&AccessLayer> {
        self.access.as_ref()
    }
}
