//! Strongly-typed identifiers for VPC resources.
//!
//! Resource IDs are opaque strings (`r006-4727d842-...`). Wrapping each kind in
//! its own type prevents passing a subnet ID where a VPC ID is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Longest identifier the API hands out.
pub const MAX_ID_LEN: usize = 64;

/// Macro to generate strongly-typed identifier wrapper types.
macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parses an identifier from a string.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is empty, too long, or contains
            /// characters other than ASCII alphanumerics, `-` and `_`.
            pub fn parse_str(input: &str) -> Result<Self> {
                validate_id(input).map(|()| Self(input.to_string()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Converts into the inner string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

resource_id!(VpcId, "VPC identifier");
resource_id!(SubnetId, "Subnet identifier");
resource_id!(InstanceId, "Virtual server instance identifier");
resource_id!(LoadBalancerId, "Load balancer identifier");
resource_id!(VpnGatewayId, "VPN gateway identifier");
resource_id!(BareMetalServerId, "Bare metal server identifier");
resource_id!(SecurityGroupId, "Security group identifier");
resource_id!(FloatingIpId, "Floating IP identifier");
resource_id!(PublicGatewayId, "Public gateway identifier");
resource_id!(ResourceGroupId, "Resource group identifier");

/// Validates an identifier string.
///
/// # Errors
///
/// Returns an error if the string is not a well-formed identifier.
pub fn validate_id(s: &str) -> Result<()> {
    let well_formed = !s.is_empty()
        && s.len() <= MAX_ID_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ID: &str = "r006-4727d842-f94f-4a2d-824a-9bc9b02c523b";

    #[test]
    fn test_parse_valid() {
        let id = VpcId::parse_str(VALID_ID).unwrap();
        assert_eq!(id.as_str(), VALID_ID);
        assert_eq!(id.to_string(), VALID_ID);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            SubnetId::parse_str(""),
            Err(Error::InvalidId(_))
        ));
        assert!(SubnetId::parse_str("has space").is_err());
        assert!(SubnetId::parse_str("a/b").is_err());
        assert!(SubnetId::parse_str(&"x".repeat(MAX_ID_LEN + 1)).is_err());
        assert!(SubnetId::parse_str(&"x".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn test_from_str() {
        let id: Result<InstanceId> = VALID_ID.parse();
        assert_eq!(id.unwrap().into_string(), VALID_ID);
    }

    #[test]
    fn test_serde_transparent() {
        let id = LoadBalancerId::parse_str(VALID_ID).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{VALID_ID}\""));

        let back: LoadBalancerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_as_ref() {
        let id = FloatingIpId::parse_str(VALID_ID).unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, VALID_ID);
    }
}
