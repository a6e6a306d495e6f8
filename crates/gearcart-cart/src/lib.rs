//! Cart state engine: guest-cart persistence, login-time merge with the
//! remote cart, and the container the view layer reads from.

pub mod error;
pub mod local;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;

pub use error::CartError;
pub use local::{LocalCartStore, GUEST_CART_KEY};
pub use state::CartState;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::CartStore;
pub use sync::{AuthState, Reconciled, SyncController, SyncState};
