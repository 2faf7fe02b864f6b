//! Port implementations: Postgres for the running service, in-memory for
//! tests.

pub mod in_memory;
pub mod postgres_directory;
pub mod postgres_transaction_store;
pub mod postgres_transfer_store;

pub use postgres_directory::PostgresDirectory;
pub use postgres_transaction_store::PostgresTransactionStore;
pub use postgres_transfer_store::PostgresTransferStore;
