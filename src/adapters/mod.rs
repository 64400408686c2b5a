pub mod postgres_identity_store;

pub use postgres_identity_store::PostgresIdentityStore;
