//! TNS protocol implementation for Oracle thin client.

pub mod auth;
pub mod buffer;
pub mod connect;
pub mod constants;
pub mod crypto;
pub mod decode;
pub mod message;
pub mod messages;
pub mod packet;
pub mod response;
pub mod state;
pub mod types;

pub use buffer::{ReadBuffer, WriteBuffer};
pub use message::{DataMessage, Message, WriteExt};
pub use messages::{
    AuthPhaseOneMessage, AuthPhaseTwoMessage, ConnectMessage, DataTypesMessage, ExecuteMessage,
    FastAuthMessage, LobOpKind, LobOpMessage, MarkerMessage, ProtocolMessage,
    SimpleFunctionMessage,
};
pub use packet::Packet;
pub use state::{Action, ConnectionState, Event, OracleTask, QueueSlot, StateMachine};
pub use types::{Column, ColumnInfo, ColumnMetadata, OracleType, OracleValue, Row};
