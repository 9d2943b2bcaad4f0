//! Services for statement-service.

pub mod database;
pub mod locks;
pub mod memory;
pub mod metrics;
pub mod statements;
pub mod store;

pub use database::Database;
pub use locks::{ClientLockGuard, ClientLocks};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use statements::{DeleteOutcome, RippleOutcome, StatementService};
pub use store::{LedgerChangeSet, StatementStore};
