//! Warehouse clients
//!
//! One client per warehouse family, all behind the [`WarehouseClient`]
//! contract: batched catalog introspection, ad-hoc query execution with
//! canonical result typing, and a connectivity probe.
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `postgres` - PostgreSQL and Redshift support
//! - `snowflake` - Snowflake support
//! - `bigquery` - Google BigQuery support
//! - `all-warehouses` - every client
//!
//! Without the feature a client's constructors still exist but return a
//! warehouse-connection condition, so callers compile either way.

pub mod bigquery;
pub mod client;
pub mod credentials;
pub mod mock;
pub mod postgres;
pub mod snowflake;
pub mod targets;

pub use bigquery::BigqueryClient;
pub use client::{client_from_credentials, QueryResults, WarehouseClient};
pub use credentials::{
    BigqueryCredentials, PostgresCredentials, SnowflakeCredentials, WarehouseCredentials,
};
pub use mock::MockClient;
pub use postgres::{PostgresClient, RedshiftClient};
pub use snowflake::SnowflakeClient;
pub use targets::credentials_from_target;
