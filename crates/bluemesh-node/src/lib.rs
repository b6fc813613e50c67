//! Node orchestration for a Bluetooth Mesh device.
//!
//! This crate turns the entities in `bluemesh-core` into a running node: it
//! sequences subsystem bring-up, reacts to controller and provisioning events,
//! switches bearer advertising modes, and persists security keys and node
//! state across restarts.

pub mod bearer;
pub mod bridge;
pub mod bringup;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod logging;
pub mod node;
pub mod pool;
pub mod repository;
pub mod stack;
pub mod store;

pub use bearer::{AdvBearer, AnyBearer, BearerCall, NullBearer, ProxyMode, RecordingBearer};
pub use bringup::Capabilities;
pub use config::NodeConfig;
pub use error::NodeError;
pub use events::{ControllerEvent, NodeEvent, ProvisioningEvent};
pub use lifecycle::{LifecycleState, ResumeAction};
pub use node::{MeshNode, ShutdownHandle};
pub use repository::KeyRepository;
pub use store::{AnyTagStore, FileTagStore, MemoryTagStore, StoreProvider, TagStore};
