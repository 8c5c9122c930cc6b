/// The cancellable, progress-reporting handle that every load is driven through.
pub mod async_operation;
pub mod error;


pub use async_operation::{AsyncOperation, OperationState, ProgressSnapshot};
pub use error::LoadError;
