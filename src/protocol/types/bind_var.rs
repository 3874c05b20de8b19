//! Bind variable implementation for statement parameters.
//!
//! Mirrors `FetchVarImpl`'s role for column defines: one `BindVarImpl`
//! describes a single placeholder's wire shape (type, direction, buffer
//! size) to the server, separate from the `OracleValue` holding the actual
//! data for this execution.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::decode::encode_oracle_number;
use crate::protocol::types::OracleValue;

/// Parameter direction, matching `TNS_BIND_DIR_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindDirection {
    In,
    Out,
    InOut,
}

impl BindDirection {
    pub fn wire_value(self) -> u8 {
        match self {
            BindDirection::In => TNS_BIND_DIR_INPUT,
            BindDirection::Out => TNS_BIND_DIR_OUTPUT,
            BindDirection::InOut => TNS_BIND_DIR_INPUT_OUTPUT,
        }
    }
}

/// Metadata for one bind variable (placeholder).
///
/// Sent as part of `ExecuteMessage` when `TNS_EXEC_OPTION_BIND` is set, one
/// per `:n` or `:name` placeholder in the statement, in declaration order.
#[derive(Debug, Clone)]
pub struct BindVarImpl {
    pub ora_type_num: u8,
    pub direction: BindDirection,
    pub max_length: u32,
    pub charset_id: u16,
    pub charset_form: u8,
}

impl BindVarImpl {
    /// Describe an IN bind inferred from the value being sent.
    pub fn for_value(value: &OracleValue) -> Self {
        match value {
            OracleValue::Null => Self {
                ora_type_num: ORA_TYPE_NUM_VARCHAR as u8,
                direction: BindDirection::In,
                max_length: 1,
                charset_id: TNS_CHARSET_UTF8,
                charset_form: 1,
            },
            OracleValue::String(s) => Self {
                ora_type_num: ORA_TYPE_NUM_VARCHAR as u8,
                direction: BindDirection::In,
                max_length: (s.len().max(1) as u32),
                charset_id: TNS_CHARSET_UTF8,
                charset_form: 1,
            },
            OracleValue::Number(_) => Self {
                ora_type_num: ORA_TYPE_NUM_NUMBER as u8,
                direction: BindDirection::In,
                max_length: 22, // max Oracle NUMBER wire width
                charset_id: 0,
                charset_form: 0,
            },
            OracleValue::Date(_) => Self {
                ora_type_num: ORA_TYPE_NUM_DATE as u8,
                direction: BindDirection::In,
                max_length: 7,
                charset_id: 0,
                charset_form: 0,
            },
        }
    }

    /// Describe an OUT bind (e.g. `RETURNING ... INTO`) of the given type
    /// and buffer size, since there's no value yet to infer it from.
    pub fn out_param(ora_type_num: u8, max_length: u32) -> Self {
        Self {
            ora_type_num,
            direction: BindDirection::Out,
            max_length,
            charset_id: if matches!(
                ora_type_num as u16,
                ORA_TYPE_NUM_VARCHAR | ORA_TYPE_NUM_CHAR
            ) {
                TNS_CHARSET_UTF8
            } else {
                0
            },
            charset_form: if matches!(
                ora_type_num as u16,
                ORA_TYPE_NUM_VARCHAR | ORA_TYPE_NUM_CHAR
            ) {
                1
            } else {
                0
            },
        }
    }
}

/// Encode an `OracleValue` into the bytes sent for one bind's data, or
/// `None` for NULL (represented on the wire as a zero-length indicator).
pub fn encode_bind_value(value: &OracleValue) -> Result<Option<Vec<u8>>> {
    match value {
        OracleValue::Null => Ok(None),
        OracleValue::String(s) => Ok(Some(s.as_bytes().to_vec())),
        OracleValue::Number(n) => Ok(Some(encode_oracle_number(n)?)),
        OracleValue::Date(_) => Err(Error::type_conversion(
            "binding OracleValue::Date is not yet supported; bind as a formatted string",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bind_has_no_payload() {
        assert_eq!(encode_bind_value(&OracleValue::Null).unwrap(), None);
    }

    #[test]
    fn string_bind_round_trips_utf8() {
        let encoded = encode_bind_value(&OracleValue::String("hello".into()))
            .unwrap()
            .unwrap();
        assert_eq!(encoded, b"hello".to_vec());
    }

    #[test]
    fn number_bind_uses_oracle_number_wire_format() {
        let encoded = encode_bind_value(&OracleValue::Number("1".into()))
            .unwrap()
            .unwrap();
        assert_eq!(encoded, vec![0xC1, 0x02]);
    }

    #[test]
    fn out_param_gets_output_direction() {
        let var = BindVarImpl::out_param(ORA_TYPE_NUM_NUMBER as u8, 22);
        assert_eq!(var.direction, BindDirection::Out);
    }
}
