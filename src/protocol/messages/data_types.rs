//! DataTypes negotiation message (TNS_MSG_TYPE_DATA_TYPES).
//!
//! Sent (standalone, or folded into FastAuth) after PROTOCOL to tell the
//! server which Oracle data types this driver understands and in what
//! representation it wants to exchange them. The server replies with its
//! own compatible subset; we don't need that list beyond draining it since
//! we always request representation 0 (native, no conversion).

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{bytes_with_length_wire_size, DataMessage, Message, WriteExt};

/// DataTypes message.
///
/// Carries the negotiated compile-time/runtime capability byte arrays and
/// the fixed array of supported Oracle data types.
pub struct DataTypesMessage<'a> {
    /// Compile-time capabilities.
    pub compile_caps: &'a [u8],
    /// Runtime capabilities.
    pub runtime_caps: &'a [u8],
}

impl Message for DataTypesMessage<'_> {
    fn wire_size(&self) -> usize {
        let mut size = 0;
        size += 1; // message type
        size += 2; // charset
        size += 2; // ncharset
        size += 1; // encoding flags
        size += bytes_with_length_wire_size(self.compile_caps.len());
        size += bytes_with_length_wire_size(self.runtime_caps.len());
        size += data_types_array_wire_size();
        size
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(TNS_MSG_TYPE_DATA_TYPES);
        buf.write_u16_le(TNS_CHARSET_UTF8);
        buf.write_u16_le(TNS_CHARSET_UTF8);
        buf.write_u8(TNS_ENCODING_MULTI_BYTE | TNS_ENCODING_CONV_LENGTH);
        buf.write_bytes_with_length(self.compile_caps);
        buf.write_bytes_with_length(self.runtime_caps);
        write_data_types_array(buf);
        Ok(())
    }
}

impl DataMessage for DataTypesMessage<'_> {}

/// Oracle types this driver declares support for, in the order the wire
/// protocol expects. Each entry is requested with representation 0
/// (native — no byte-order/charset conversion) and no distinct conv type.
const SUPPORTED_TYPES: &[u16] = &[
    ORA_TYPE_NUM_VARCHAR,
    ORA_TYPE_NUM_NUMBER,
    ORA_TYPE_NUM_BINARY_INTEGER,
    ORA_TYPE_NUM_ROWID,
    ORA_TYPE_NUM_DATE,
    ORA_TYPE_NUM_RAW,
    ORA_TYPE_NUM_LONG,
    ORA_TYPE_NUM_LONG_RAW,
    ORA_TYPE_NUM_CHAR,
    ORA_TYPE_NUM_CLOB,
    ORA_TYPE_NUM_BLOB,
    ORA_TYPE_NUM_BFILE,
    ORA_TYPE_NUM_CURSOR,
    ORA_TYPE_NUM_TIMESTAMP,
    ORA_TYPE_NUM_TIMESTAMP_TZ,
    ORA_TYPE_NUM_TIMESTAMP_LTZ,
    ORA_TYPE_NUM_INTERVAL_YM,
    ORA_TYPE_NUM_INTERVAL_DS,
    ORA_TYPE_NUM_BINARY_FLOAT,
    ORA_TYPE_NUM_BINARY_DOUBLE,
    ORA_TYPE_NUM_BOOLEAN,
    ORA_TYPE_NUM_UROWID,
    ORA_TYPE_NUM_JSON,
    ORA_TYPE_NUM_VECTOR,
];

/// Wire size of the fixed data-types array (each entry is type + conv_type,
/// both ub2, no representation/flags since we always ask for native), plus
/// the terminating zero ub2.
pub fn data_types_array_wire_size() -> usize {
    SUPPORTED_TYPES.len() * 4 + 2
}

/// Write the fixed data-types array: `(type, conv_type)` pairs terminated
/// by a `0u16`. `conv_type` equals `type` since we never ask the server to
/// convert representations for us.
pub fn write_data_types_array(buf: &mut Vec<u8>) {
    for &type_num in SUPPORTED_TYPES {
        buf.write_u16_be(type_num);
        buf.write_u16_be(type_num);
    }
    buf.write_u16_be(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_types_message_wire_size_matches_write() {
        let compile_caps = vec![0u8; 53];
        let runtime_caps = vec![0u8; 11];
        let msg = DataTypesMessage {
            compile_caps: &compile_caps,
            runtime_caps: &runtime_caps,
        };

        let mut buf = Vec::with_capacity(msg.wire_size());
        msg.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), msg.wire_size());
    }

    #[test]
    fn data_types_array_terminates_with_zero() {
        let mut buf = Vec::new();
        write_data_types_array(&mut buf);
        assert_eq!(&buf[buf.len() - 2..], &[0u8, 0u8]);
        assert_eq!(buf.len(), data_types_array_wire_size());
    }
}
