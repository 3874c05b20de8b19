//! Native Oracle Net8/TTC driver.
//!
//! Speaks the Oracle database wire protocol (TNS/TTC) directly over a
//! `tokio` `TcpStream`, without linking against any Oracle client library.
//!
//! # Example
//!
//! ```no_run
//! use oranet_rs::{Connection, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Connect to the database
//!     let mut conn = Connection::connect(
//!         "localhost:1521/FREEPDB1",
//!         "username",
//!         "password"
//!     ).await?;
//!
//!     // Get server version
//!     if let Some(version) = conn.server_version() {
//!         println!("Connected to Oracle {}.{}.{}.{}.{}",
//!             version.0, version.1, version.2, version.3, version.4);
//!     }
//!
//!     // Close connection
//!     conn.close().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod cursor;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod stream;

// Re-export main types
pub use connection::{Connection, QueryResult};
pub use cursor::{CollectedRows, Cursor};
pub use error::{Error, Result};
pub use pool::{Pool, PoolConfig};
pub use protocol::auth::AuthCredentials;
pub use protocol::connect::ConnectParams;
pub use protocol::types::{Column, ColumnInfo, ColumnMetadata, OracleType, OracleValue, Row};
pub use stream::CursorStreamExt;
