//! Frame orchestration
//!
//! The renderer and the tables it is driven by: which attachments and
//! synchronization primitives a configuration needs, and how the passes of a
//! frame depend on each other.

pub mod cluster;
pub mod sync;
pub mod dependency;
pub mod attachment_set;
pub mod renderer;

pub use cluster::{ClusterGrid, LightBufferHeader};
pub use sync::{FrameSync, SyncDelta, SyncKind};
pub use dependency::{PassKind, PassTopology};
pub use attachment_set::{AttachmentRole, AttachmentSet, SetLayouts};
pub use renderer::{FrameOutcome, Renderer};
