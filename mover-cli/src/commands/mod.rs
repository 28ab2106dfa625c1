mod archive;
mod maintenance;
mod operations;
mod storage;
mod transfer;

// Export / import commands
pub use transfer::{run_export, run_import, watch_operation};

// Operation record commands
pub use operations::{run_delete, run_list, run_progress};

// Storage commands
pub use storage::{run_test_connection, set_storage_from_file, show_settings};

// Archive commands
pub use archive::{run_archive_info, run_verify};

// Maintenance commands
pub use maintenance::run_cleanup;
