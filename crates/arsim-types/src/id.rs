use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Length of every transaction id and wallet address: 32 bytes, base64url, unpadded.
pub const ID_LENGTH: usize = 43;

fn validate(value: &str) -> TypeResult<()> {
    let valid = value.len() == ID_LENGTH
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(TypeError::InvalidId {
            value: value.to_string(),
            expected: ID_LENGTH,
        })
    }
}

macro_rules! base64url_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(value: impl Into<String>) -> TypeResult<Self> {
                let value = value.into();
                validate(&value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> TypeResult<Self> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> TypeResult<Self> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

base64url_id!(
    /// Transaction identifier: base64url of the SHA-256 of the transaction signature.
    TxId
);

base64url_id!(
    /// Wallet address: base64url of the SHA-256 of the owner's public key modulus.
    Address
);
