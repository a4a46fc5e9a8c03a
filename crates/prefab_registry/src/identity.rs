//! Deterministic identity tokens for network-spawnable prefabs.
//!
//! A token is the MD5 digest of `display_name + type_qualifier + method_name`
//! (UTF-8, no separators), rendered as 32 lowercase hex characters. Peers that
//! build the same prefab from the same call site arrive at the same token
//! without negotiating. The digest is used for its distribution only; nothing
//! here depends on it being collision resistant.

use crate::error::{PrefabError, Result};
use md5::{Digest, Md5};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of bytes in an identity token.
pub const TOKEN_LEN: usize = 16;

/// A 128-bit prefab identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityToken([u8; TOKEN_LEN]);

impl IdentityToken {
    /// Derives the token for a prefab registered from the given call site.
    pub fn derive(display_name: &str, type_qualifier: &str, method_name: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(display_name.as_bytes());
        hasher.update(type_qualifier.as_bytes());
        hasher.update(method_name.as_bytes());
        let mut bytes = [0u8; TOKEN_LEN];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Lowercase hex rendering, two digits per byte in byte order.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 32-character hex string back into a token.
    pub fn parse(s: &str) -> Result<Self> {
        let mut bytes = [0u8; TOKEN_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| PrefabError::InvalidToken(format!("{s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityToken({})", self.to_hex())
    }
}

impl std::str::FromStr for IdentityToken {
    type Err = PrefabError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for IdentityToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for IdentityToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // md5("MobMods.Foo.SpawnerTypeSpawnMob")
        let token = IdentityToken::derive("Mob", "Mods.Foo.SpawnerType", "SpawnMob");
        let expected = hex::encode(Md5::digest("MobMods.Foo.SpawnerTypeSpawnMob".as_bytes()));
        assert_eq!(token.to_hex(), expected);

        // md5("") reference vector
        assert_eq!(IdentityToken::derive("", "", "").to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_derive_is_deterministic() {
        let first = IdentityToken::derive("Turret", "my_mod::turrets::Builder", "build");
        for _ in 0..16 {
            assert_eq!(IdentityToken::derive("Turret", "my_mod::turrets::Builder", "build"), first);
        }
        assert_ne!(first, IdentityToken::derive("Turret2", "my_mod::turrets::Builder", "build"));
    }

    #[test]
    fn test_token_format() {
        for name in ["a", "Mob", "ünïcødé", "with spaces and\ttabs"] {
            let hex = IdentityToken::derive(name, "t", "m").to_string();
            assert_eq!(hex.len(), 32);
            assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_boundary_is_not_recoverable() {
        // No separators between the parts, so shifting a boundary yields the same token.
        assert_eq!(
            IdentityToken::derive("Mob", "Type", "Method"),
            IdentityToken::derive("MobType", "", "Method")
        );
    }

    #[test]
    fn test_parse_and_display_agree() {
        let token = IdentityToken::derive("Mob", "Mods.Foo.SpawnerType", "SpawnMob");
        assert_eq!(IdentityToken::parse(&token.to_string()).unwrap(), token);
        assert_eq!(token.to_hex().parse::<IdentityToken>().unwrap(), token);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(matches!(IdentityToken::parse("abc"), Err(PrefabError::InvalidToken(_))));
        assert!(IdentityToken::parse(&"zz".repeat(16)).is_err());
        assert!(IdentityToken::parse(&"00".repeat(17)).is_err());
    }

    #[test]
    fn test_serializes_as_hex_string() {
        let token = IdentityToken::derive("Mob", "Mods.Foo.SpawnerType", "SpawnMob");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{}\"", token.to_hex()));
        let back: IdentityToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
