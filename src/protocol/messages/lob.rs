//! LOB_OP message: out-of-line read/write/length/close calls against a
//! LOB locator, used once a CLOB/BLOB column (or bind) is too large to
//! have been prefetched inline with the row.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{
    bytes_with_length_wire_size, ub4_wire_size, ub8_wire_size, DataMessage, Message, WriteExt,
};
use crate::protocol::types::LobLocator;

/// Sub-function opcode carried in the LOB_OP payload, selecting what the
/// server should do with the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobOpKind {
    GetLength,
    Read { offset: u64, amount: u64 },
    Write { offset: u64, data: Vec<u8> },
    Close,
}

impl LobOpKind {
    fn opcode(&self) -> u32 {
        match self {
            LobOpKind::GetLength => TNS_LOB_OP_GET_LENGTH,
            LobOpKind::Read { .. } => TNS_LOB_OP_READ,
            LobOpKind::Write { .. } => TNS_LOB_OP_WRITE,
            LobOpKind::Close => TNS_LOB_OP_CLOSE,
        }
    }
}

/// `TNS_FUNC_LOB_OP` call against one locator.
pub struct LobOpMessage {
    locator: Vec<u8>,
    kind: LobOpKind,
}

impl LobOpMessage {
    pub fn new(locator: &LobLocator, kind: LobOpKind) -> Self {
        Self {
            locator: locator.locator.clone(),
            kind,
        }
    }

    fn offset(&self) -> u64 {
        match &self.kind {
            LobOpKind::Read { offset, .. } | LobOpKind::Write { offset, .. } => *offset,
            _ => 0,
        }
    }

    fn amount(&self) -> u64 {
        match &self.kind {
            LobOpKind::Read { amount, .. } => *amount,
            LobOpKind::Write { data, .. } => data.len() as u64,
            _ => 0,
        }
    }
}

impl Message for LobOpMessage {
    fn wire_size(&self) -> usize {
        let mut size = 3; // message type + function code + sequence number
        size += bytes_with_length_wire_size(self.locator.len());
        size += ub8_wire_size(self.offset()); // sourceLobOffset
        size += ub8_wire_size(0); // destLobOffset
        size += ub8_wire_size(self.amount());
        size += ub4_wire_size(self.kind.opcode());
        size += 1; // sendAmount flag
        size += 1; // charset placeholder byte
        if let LobOpKind::Write { data, .. } = &self.kind {
            size += bytes_with_length_wire_size(data.len());
        }
        size
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(TNS_MSG_TYPE_FUNCTION);
        buf.write_u8(TNS_FUNC_LOB_OP);
        buf.write_u8(1); // sequence number

        buf.write_bytes_with_length(&self.locator);
        buf.write_ub8(self.offset()); // sourceLobOffset
        buf.write_ub8(0); // destLobOffset, unused outside LOB-to-LOB copy
        buf.write_ub8(self.amount());
        buf.write_ub4(self.kind.opcode());
        buf.write_u8(if matches!(self.kind, LobOpKind::Write { .. }) {
            1
        } else {
            0
        });
        buf.write_u8(0); // charset id / form placeholder, single-byte charsets only

        if let LobOpKind::Write { data, .. } = &self.kind {
            buf.write_bytes_with_length(data);
        }
        Ok(())
    }
}

impl DataMessage for LobOpMessage {}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> LobLocator {
        LobLocator::new(vec![0xAB; 40], 100, 8192, true)
    }

    #[test]
    fn get_length_wire_size_matches_write() {
        let msg = LobOpMessage::new(&locator(), LobOpKind::GetLength);
        let mut buf = Vec::with_capacity(msg.wire_size());
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
    }

    #[test]
    fn read_carries_offset_and_amount() {
        let msg = LobOpMessage::new(
            &locator(),
            LobOpKind::Read {
                offset: 10,
                amount: 512,
            },
        );
        assert_eq!(msg.offset(), 10);
        assert_eq!(msg.amount(), 512);
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
    }

    #[test]
    fn write_appends_length_prefixed_payload() {
        let msg = LobOpMessage::new(
            &locator(),
            LobOpKind::Write {
                offset: 0,
                data: b"hello".to_vec(),
            },
        );
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
        assert!(buf.windows(5).any(|w| w == b"hello"));
    }

    #[test]
    fn close_sends_no_payload() {
        let msg = LobOpMessage::new(&locator(), LobOpKind::Close);
        assert_eq!(msg.amount(), 0);
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
    }
}
