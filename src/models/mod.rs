pub mod photo;
pub mod remote_instance;
pub mod sync_event;

pub use photo::{Photo, SyncStatus};
pub use remote_instance::{InstanceStatus, RemoteInstance};
pub use sync_event::{SyncEvent, SyncEventStatus, SyncEventType};
