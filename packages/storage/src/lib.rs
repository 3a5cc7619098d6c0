// ABOUTME: Data layer and persistence for CAP records
// ABOUTME: SQLite pool setup, embedded migrations, and shared storage errors

pub mod error;
pub mod pool;
pub mod time;

pub use error::{StorageError, StorageResult};
pub use pool::{
    connect, connect_in_memory, data_dir, default_database_path, run_migrations, PoolSettings,
};
pub use time::{encode_timestamp, now};
