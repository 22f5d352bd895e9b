//! Schema-validated decoding of relay-chain notifications.
//!
//! Relay notifications carry a heterogeneous `states` array. Rather than
//! casting by position, each recognized method gets an explicit schema:
//! the expected index, type, and meaning of every field it uses. A
//! notification for some other method is simply not ours; a notification
//! claiming our method but violating the schema is a decode error.

use serde_json::Value;

use super::DecodeError;

/// Method name a settlement-request notification announces itself with.
pub const SETTLEMENT_METHOD: &str = "makeProof";

/// A settlement request addressed to some side chain: sign the value
/// stored under `key` and hand the signature back to the relay chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofNotice {
    pub side_chain_id: u64,
    /// Storage key of the value the inclusion proof must cover.
    pub key: String,
}

/// Decode a notification's states against the settlement-request schema:
///
/// | index | type    | meaning                      |
/// |-------|---------|------------------------------|
/// | 0     | string  | method name                  |
/// | 2     | uint    | target side-chain id         |
/// | 5     | string  | storage key of the request   |
///
/// Returns `Ok(None)` for notifications announcing a different method.
pub fn parse_proof_notice(states: &[Value]) -> Result<Option<ProofNotice>, DecodeError> {
    let method = states
        .first()
        .and_then(Value::as_str)
        .ok_or(DecodeError::UnexpectedState {
            index: 0,
            expected: "string",
        })?;
    if method != SETTLEMENT_METHOD {
        return Ok(None);
    }
    if states.len() < 6 {
        return Err(DecodeError::ShortStates {
            len: states.len(),
            expected: 6,
        });
    }
    let side_chain_id = states[2].as_u64().ok_or(DecodeError::UnexpectedState {
        index: 2,
        expected: "unsigned integer",
    })?;
    let key = states[5]
        .as_str()
        .ok_or(DecodeError::UnexpectedState {
            index: 5,
            expected: "string",
        })?
        .to_string();

    Ok(Some(ProofNotice { side_chain_id, key }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settlement_request_decodes() {
        let states = vec![
            json!("makeProof"),
            json!("0xabc"),
            json!(9),
            json!(null),
            json!(50),
            json!("proof-key-hex"),
        ];
        let notice = parse_proof_notice(&states).unwrap().unwrap();
        assert_eq!(notice.side_chain_id, 9);
        assert_eq!(notice.key, "proof-key-hex");
    }

    #[test]
    fn test_foreign_method_is_not_ours() {
        let states = vec![json!("btcTxToRelay"), json!(1)];
        assert_eq!(parse_proof_notice(&states).unwrap(), None);
    }

    #[test]
    fn test_non_string_method_is_schema_error() {
        let states = vec![json!(7), json!("x")];
        assert_eq!(
            parse_proof_notice(&states),
            Err(DecodeError::UnexpectedState {
                index: 0,
                expected: "string"
            })
        );
    }

    #[test]
    fn test_empty_states_is_schema_error() {
        assert!(parse_proof_notice(&[]).is_err());
    }

    #[test]
    fn test_short_states_rejected() {
        let states = vec![json!("makeProof"), json!("0xabc"), json!(9)];
        assert_eq!(
            parse_proof_notice(&states),
            Err(DecodeError::ShortStates {
                len: 3,
                expected: 6
            })
        );
    }

    #[test]
    fn test_wrong_field_types_rejected() {
        // side-chain id as a string
        let states = vec![
            json!("makeProof"),
            json!("0xabc"),
            json!("nine"),
            json!(null),
            json!(50),
            json!("key"),
        ];
        assert!(parse_proof_notice(&states).is_err());

        // key as a number
        let states = vec![
            json!("makeProof"),
            json!("0xabc"),
            json!(9),
            json!(null),
            json!(50),
            json!(123),
        ];
        assert!(parse_proof_notice(&states).is_err());

        // fractional side-chain id
        let states = vec![
            json!("makeProof"),
            json!("0xabc"),
            json!(9.5),
            json!(null),
            json!(50),
            json!("key"),
        ];
        assert!(parse_proof_notice(&states).is_err());
    }
}
