#![deny(unreachable_patterns)]

pub mod error;
pub mod folder_store;
pub mod global_store;
pub mod orphan;
pub mod schema;
pub mod sync;

pub use error::{StoreError, StoreResult};
pub use folder_store::FolderStore;
pub use global_store::{GlobalClipRow, GlobalStore, GlobalVideoRow, SyncCursor};
pub use orphan::RecoveryOutcome;
pub use sync::{SyncEngine, SyncResult};
