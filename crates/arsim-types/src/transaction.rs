use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::encoding::{b64url_decode, b64url_decode_string, b64url_encode};
use crate::error::{TypeError, TypeResult};
use crate::id::{Address, TxId};
use crate::winston::Winston;

/// A transaction tag as it appears on the wire: name and value, each base64url.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    /// Build a wire tag from plain UTF-8 name and value.
    pub fn from_utf8(name: &str, value: &str) -> Self {
        Self {
            name: b64url_encode(name),
            value: b64url_encode(value),
        }
    }

    pub fn decoded(&self) -> TypeResult<(String, String)> {
        Ok((
            b64url_decode_string(&self.name, "name")?,
            b64url_decode_string(&self.value, "value")?,
        ))
    }
}

/// A signed transaction body as submitted by a client.
///
/// Only the fields the simulator indexes or charges for are typed; the rest
/// (`data_root`, `data_size`, ...) is carried in `extra` untouched. The
/// simulator stores the raw request bytes, not this struct, so re-serializing
/// never has to reproduce the client's formatting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(default = "default_format")]
    pub format: u8,
    pub id: TxId,
    #[serde(default)]
    pub last_tx: String,
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub quantity: Winston,
    #[serde(default)]
    pub data: String,
    pub reward: Winston,
    pub signature: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_format() -> u8 {
    1
}

impl SignedTransaction {
    /// Parse a JSON request body.
    pub fn from_json(body: &[u8]) -> TypeResult<Self> {
        serde_json::from_slice(body).map_err(|e| TypeError::MalformedTransaction(e.to_string()))
    }

    /// The address of the wallet that signed this transaction.
    pub fn sender(&self) -> TypeResult<Address> {
        sender_address(&self.owner)
    }

    /// Recipient address, if the transaction transfers value to one.
    pub fn target_address(&self) -> TypeResult<Option<Address>> {
        if self.target.is_empty() {
            Ok(None)
        } else {
            Address::parse(self.target.clone()).map(Some)
        }
    }

    /// Total debited from the sender: `reward + quantity`.
    pub fn total_cost(&self) -> Winston {
        self.reward.add(&self.quantity)
    }

    /// Decoded data payload.
    pub fn data_bytes(&self) -> TypeResult<Vec<u8>> {
        b64url_decode(&self.data)
    }

    /// First value of the named tag, decoded.
    pub fn tag_value(&self, name: &str) -> TypeResult<Option<String>> {
        for tag in &self.tags {
            let (n, v) = tag.decoded()?;
            if n == name {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    /// Whether the id is the SHA-256 of the signature, as the network derives it.
    pub fn id_matches_signature(&self) -> bool {
        match b64url_decode(&self.signature) {
            Ok(sig) => b64url_encode(Sha256::digest(sig)) == self.id.as_str(),
            Err(_) => false,
        }
    }
}

/// Derive a wallet address from a base64url owner (public key modulus).
pub fn sender_address(owner: &str) -> TypeResult<Address> {
    let modulus = b64url_decode(owner)?;
    Address::parse(b64url_encode(Sha256::digest(modulus)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(signature: &[u8]) -> String {
        let id = b64url_encode(Sha256::digest(signature));
        serde_json::json!({
            "format": 2,
            "id": id,
            "last_tx": "",
            "owner": b64url_encode(b"owner-modulus"),
            "tags": [
                {"name": b64url_encode("Content-Type"), "value": b64url_encode("text/html")},
                {"name": b64url_encode("App"), "value": b64url_encode("demo")}
            ],
            "target": "",
            "quantity": "0",
            "data": b64url_encode(b"<h1>hi</h1>"),
            "data_size": "11",
            "data_root": "",
            "reward": "1000",
            "signature": b64url_encode(signature),
        })
        .to_string()
    }

    #[test]
    fn parses_wire_body() {
        let tx = SignedTransaction::from_json(signed(b"sig").as_bytes()).unwrap();
        assert_eq!(tx.format, 2);
        assert_eq!(tx.reward, Winston::from(1000));
        assert_eq!(tx.quantity, Winston::zero());
        assert_eq!(tx.data_bytes().unwrap(), b"<h1>hi</h1>");
        assert_eq!(tx.extra.get("data_size"), Some(&Value::String("11".into())));
    }

    #[test]
    fn sender_is_hash_of_owner() {
        let tx = SignedTransaction::from_json(signed(b"sig").as_bytes()).unwrap();
        let expected = b64url_encode(Sha256::digest(b"owner-modulus"));
        assert_eq!(tx.sender().unwrap().as_str(), expected);
    }

    #[test]
    fn tag_lookup_decodes() {
        let tx = SignedTransaction::from_json(signed(b"sig").as_bytes()).unwrap();
        assert_eq!(tx.tag_value("Content-Type").unwrap().as_deref(), Some("text/html"));
        assert_eq!(tx.tag_value("Missing").unwrap(), None);
    }

    #[test]
    fn id_signature_check() {
        let mut tx = SignedTransaction::from_json(signed(b"sig").as_bytes()).unwrap();
        assert!(tx.id_matches_signature());
        tx.signature = b64url_encode(b"other");
        assert!(!tx.id_matches_signature());
    }

    #[test]
    fn missing_reward_is_malformed() {
        let body = br#"{"id":"bNbA3TEQVL60xlgCcqdz4ZPHFZ711cZ3hmkpGttDt_U","owner":"","signature":""}"#;
        assert!(matches!(
            SignedTransaction::from_json(body),
            Err(TypeError::MalformedTransaction(_))
        ));
    }

    #[test]
    fn total_cost_sums_reward_and_quantity() {
        let mut tx = SignedTransaction::from_json(signed(b"sig").as_bytes()).unwrap();
        tx.quantity = Winston::from(250);
        assert_eq!(tx.total_cost(), Winston::from(1250));
    }
}
