pub mod archive;
pub mod config;
pub mod config_manager;
pub mod constants;
pub mod database;
pub mod db;
pub mod error;
pub mod fs_walk;
pub mod migrator;
pub mod operation;
pub mod options;
pub mod pipeline;
pub mod progress;
pub mod resources;
pub mod retention;
pub mod site;
pub mod sql_dump;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use error::{ErrorClass, MoverError, Result};
pub use migrator::{MigrationOrchestrator, OperationHandle, WaitOutcome};
pub use operation::{Operation, OperationId, OperationKind, OperationStatus};
pub use options::{Compression, ExportOptions, ImportOptions};
pub use pipeline::AppContext;
pub use progress::ProgressView;
