pub mod retry;

pub use retry::{RetryConfig, retry_storage_call};
