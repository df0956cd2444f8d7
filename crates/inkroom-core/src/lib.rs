//! InkRoom Core Library
//!
//! Document model, tool state machine, selection/transform controller and
//! relay glue for the InkRoom shared whiteboard. Rendering is left to the
//! host, which feeds input into a [`Board`] and draws its [`Frame`].

pub mod board;
pub mod collaboration;
pub mod config;
pub mod delta;
pub mod document;
pub mod entity;
pub mod export;
pub mod import;
pub mod selection;
pub mod state;
pub mod sync;
pub mod text_edit;
pub mod tools;

pub use board::{Board, EngineRequest, Frame};
pub use collaboration::{LoopbackHub, LoopbackPeer, RelayTransport, SyncRelay};
pub use config::EngineConfig;
pub use delta::{Delta, StrokeKey};
pub use document::{Document, StoreError, StoreResult};
pub use entity::{Entity, EntityId, EntityKind, EntityPatch, Rgba};
pub use export::{ExportError, ExportedImage};
pub use import::{DecodedImage, ImportError, SelectedFile};
pub use selection::{NodeRef, Selection, TransformAttrs, TransformController};
pub use state::EngineState;
pub use sync::{ConnectionState, RelayError, RelayMessage, SyncEvent};
#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
pub use text_edit::{EditOverlay, Key, TextEditSession};
pub use tools::{StylePatch, StyleSettings, ToolKind};
