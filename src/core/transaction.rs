//! Transaction handling for the ledger
//!
//! A transaction moves an amount from a sender to a recipient. There is no
//! signature or balance check; the ledger only guarantees that the fields are
//! present and well formed before a transaction can be pooled.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Constants
// =============================================================================

/// Sender identity used for mining rewards
pub const REWARD_SENDER: &str = "0";

/// Amount awarded to the node that forges a block
pub const BLOCK_REWARD: u64 = 1;

// =============================================================================
// Transaction
// =============================================================================

/// A transfer of value waiting in the pool or sealed into a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Address of the sender
    pub sender: String,
    /// Address of the recipient
    pub recipient: String,
    /// Amount transferred
    pub amount: u64,
}

impl Transaction {
    /// Create a transaction submitted by a client.
    ///
    /// Sender and recipient must be non-empty and are stored exactly as given,
    /// so surrounding whitespace is refused rather than stripped. The sender
    /// may not be the reserved reward identity.
    pub fn new(sender: &str, recipient: &str, amount: u64) -> Result<Self, ValidationError> {
        check_party("sender", sender)?;
        check_party("recipient", recipient)?;

        if sender == REWARD_SENDER {
            return Err(ValidationError::ReservedSender(sender.to_string()));
        }

        Ok(Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
        })
    }

    /// Create the reward transaction for a freshly forged block
    pub fn reward(recipient: &str) -> Self {
        Self {
            sender: REWARD_SENDER.to_string(),
            recipient: recipient.to_string(),
            amount: BLOCK_REWARD,
        }
    }

    /// Build a transaction from an untyped JSON request body
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value
            .as_object()
            .ok_or_else(|| ValidationError::invalid("body", "expected a JSON object"))?;

        let sender = string_field(object, "sender")?;
        let recipient = string_field(object, "recipient")?;

        let amount = match object.get("amount") {
            None | Some(Value::Null) => return Err(ValidationError::MissingField("amount")),
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                ValidationError::invalid("amount", "must be a non-negative integer")
            })?,
            Some(_) => return Err(ValidationError::invalid("amount", "must be a number")),
        };

        Self::new(sender, recipient, amount)
    }

    /// Whether this is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }
}

fn check_party(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::invalid(field, "must not be empty"));
    }
    if value.trim() != value {
        return Err(ValidationError::invalid(
            field,
            "must not have leading or trailing whitespace",
        ));
    }
    Ok(())
}

fn string_field<'a>(
    object: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::invalid(field, "must be a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_transaction() {
        let tx = Transaction::new("alice", "bob", 5).unwrap();
        assert_eq!(tx.sender, "alice");
        assert_eq!(tx.recipient, "bob");
        assert_eq!(tx.amount, 5);
        assert!(!tx.is_reward());
    }

    #[test]
    fn test_reward_transaction() {
        let tx = Transaction::reward("node-1");
        assert_eq!(tx.sender, REWARD_SENDER);
        assert_eq!(tx.recipient, "node-1");
        assert_eq!(tx.amount, BLOCK_REWARD);
        assert!(tx.is_reward());
    }

    #[test]
    fn test_reserved_sender_rejected() {
        assert_eq!(
            Transaction::new("0", "bob", 1),
            Err(ValidationError::ReservedSender("0".to_string()))
        );
    }

    #[test]
    fn test_parties_stored_as_given() {
        for (sender, recipient, field) in [
            ("", "bob", "sender"),
            ("   ", "bob", "sender"),
            (" alice", "bob", "sender"),
            ("alice", "bob\n", "recipient"),
            ("alice", "", "recipient"),
        ] {
            let err = Transaction::new(sender, recipient, 1).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidField { field: f, .. } if f == field),
                "{:?} -> {:?} should fail on {}",
                sender,
                recipient,
                field
            );
        }

        let tx = Transaction::new("alice smith", "bob", 1).unwrap();
        assert_eq!(tx.sender, "alice smith");
    }

    #[test]
    fn test_from_json() {
        let tx = Transaction::from_json(&json!({
            "sender": "alice",
            "recipient": "bob",
            "amount": 3
        }))
        .unwrap();
        assert_eq!(tx, Transaction::new("alice", "bob", 3).unwrap());
    }

    #[test]
    fn test_from_json_missing_fields() {
        assert_eq!(
            Transaction::from_json(&json!({"recipient": "bob", "amount": 3})),
            Err(ValidationError::MissingField("sender"))
        );
        assert_eq!(
            Transaction::from_json(&json!({"sender": "alice", "amount": 3})),
            Err(ValidationError::MissingField("recipient"))
        );
        assert_eq!(
            Transaction::from_json(&json!({"sender": "alice", "recipient": "bob"})),
            Err(ValidationError::MissingField("amount"))
        );
    }

    #[test]
    fn test_from_json_malformed_fields() {
        let err = Transaction::from_json(&json!({
            "sender": "alice",
            "recipient": "bob",
            "amount": "ten"
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "amount", .. }));

        let err = Transaction::from_json(&json!({
            "sender": "alice",
            "recipient": "bob",
            "amount": -4
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "amount", .. }));

        let err = Transaction::from_json(&json!({
            "sender": 7,
            "recipient": "bob",
            "amount": 1
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "sender", .. }));

        let err = Transaction::from_json(&json!(["alice", "bob", 1])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "body", .. }));
    }
}
