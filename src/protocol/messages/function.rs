//! Zero-argument TTC function calls: ping, commit, rollback, logoff.
//!
//! All four share the same wire shape as `FetchMessage`: message type,
//! function code, sequence number. They differ only in which function
//! code is sent.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{DataMessage, Message, WriteExt};

/// A TTC function call with no arguments beyond the function code itself.
pub struct SimpleFunctionMessage {
    function_code: u8,
}

impl SimpleFunctionMessage {
    /// `TNS_FUNC_PING` — keep-alive round trip, answered with a Status message.
    pub fn ping() -> Self {
        Self {
            function_code: TNS_FUNC_PING,
        }
    }

    /// `TNS_FUNC_COMMIT`.
    pub fn commit() -> Self {
        Self {
            function_code: TNS_FUNC_COMMIT,
        }
    }

    /// `TNS_FUNC_ROLLBACK`.
    pub fn rollback() -> Self {
        Self {
            function_code: TNS_FUNC_ROLLBACK,
        }
    }

    /// `TNS_FUNC_LOGOFF` — last message sent before closing the TCP stream.
    pub fn logoff() -> Self {
        Self {
            function_code: TNS_FUNC_LOGOFF,
        }
    }
}

impl Message for SimpleFunctionMessage {
    fn wire_size(&self) -> usize {
        3 // message type + function code + sequence number
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(TNS_MSG_TYPE_FUNCTION);
        buf.write_u8(self.function_code);
        buf.write_u8(1); // sequence number
        Ok(())
    }
}

impl DataMessage for SimpleFunctionMessage {}
