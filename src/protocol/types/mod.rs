//! Oracle data types for query results.

mod bind_var;
mod column;
mod fetch_var;
mod lob;
mod metadata;
mod oracle_type;
mod row;
mod value;

pub use bind_var::{encode_bind_value, BindDirection, BindVarImpl};
pub use column::{Column, ColumnInfo};
pub use fetch_var::{build_fetch_vars_from_metadata, FetchVarImpl};
pub use lob::{LobLocator, LobValue};
pub use metadata::ColumnMetadata;
pub use oracle_type::OracleType;
pub use row::Row;
pub use value::OracleValue;
