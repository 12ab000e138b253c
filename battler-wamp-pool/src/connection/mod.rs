mod manager;
mod pending_call;
mod pool;
mod state;
mod table;

pub use manager::ConnectionManager;
pub use pending_call::PendingCall;
pub use pool::ConnectionPool;
pub use state::{
    ConnectionState,
    ConnectionStatus,
};
