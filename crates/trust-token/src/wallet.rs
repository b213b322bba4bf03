//! Wallet addresses and signature verification.
//!
//! Reviews and users reference wallets by address string, so a
//! [`WalletAddress`] accepts any well-formed identifier. Signature checks
//! decode the address as a base58 ed25519 public key on demand.

use crate::error::{Result, TokenError};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address that tokens are burned to on spend.
pub const BURN_ADDRESS: &str = "11111111111111111111111111111111";

const MAX_ADDRESS_LEN: usize = 128;

/// A wallet identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse an address, rejecting empty or malformed input.
    ///
    /// Whitespace, quotes and backslashes are refused so that addresses can
    /// be embedded in store filters verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidAddress`] on malformed input.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TokenError::invalid_address("address is empty"));
        }
        if s.len() > MAX_ADDRESS_LEN {
            return Err(TokenError::invalid_address(format!(
                "address longer than {MAX_ADDRESS_LEN} characters"
            )));
        }
        if let Some(c) = s
            .chars()
            .find(|c| c.is_whitespace() || *c == '"' || *c == '\\')
        {
            return Err(TokenError::invalid_address(format!(
                "address contains forbidden character {c:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// The burn address.
    #[must_use]
    pub fn burn() -> Self {
        Self(BURN_ADDRESS.to_string())
    }

    /// Whether this is the burn address.
    #[must_use]
    pub fn is_burn(&self) -> bool {
        self.0 == BURN_ADDRESS
    }

    /// Create an address from raw public key bytes.
    ///
    /// # Errors
    ///
    /// Returns error if bytes are not 32 bytes.
    pub fn from_public_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(TokenError::invalid_address(format!(
                "public key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bs58::encode(bytes).into_string()))
    }

    /// Get the address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify a base58-encoded ed25519 signature of `message` by this wallet.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidAddress`] if the address is not a public
    /// key, or [`TokenError::InvalidSignature`] if the signature is malformed
    /// or does not match.
    pub fn verify_signature(&self, message: &[u8], signature: &str) -> Result<()> {
        let key_bytes: [u8; 32] = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| TokenError::invalid_address(format!("invalid base58: {e}")))?
            .try_into()
            .map_err(|_| TokenError::invalid_address("address is not a 32-byte public key"))?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| TokenError::invalid_address(format!("not an ed25519 key: {e}")))?;

        let sig_bytes: [u8; 64] = bs58::decode(signature.trim())
            .into_vec()
            .map_err(|e| TokenError::invalid_signature(format!("invalid base58: {e}")))?
            .try_into()
            .map_err(|_| TokenError::invalid_signature("signature must be 64 bytes"))?;
        let signature = Signature::from_bytes(&sig_bytes);

        key.verify(message, &signature)
            .map_err(|_| TokenError::invalid_signature("signature does not match message"))
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// An ed25519 keypair that can sign login messages.
pub struct Wallet {
    signing_key: SigningKey,
    address: WalletAddress,
}

impl Wallet {
    /// Generate a new random wallet from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns error if address derivation fails.
    pub fn generate() -> Result<Self> {
        let mut secret_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut secret_bytes);
        Self::from_secret_key(&secret_bytes)
    }

    /// Create a wallet from a 32-byte secret key.
    ///
    /// # Errors
    ///
    /// Returns error if the key has the wrong length.
    pub fn from_secret_key(secret: &[u8]) -> Result<Self> {
        let secret: [u8; 32] = secret.try_into().map_err(|_| TokenError::Wallet {
            message: format!("secret key must be 32 bytes, got {}", secret.len()),
        })?;
        let signing_key = SigningKey::from_bytes(&secret);
        let address = WalletAddress::from_public_key(signing_key.verifying_key().as_bytes())?;
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Get the wallet address.
    #[must_use]
    pub fn address(&self) -> &WalletAddress {
        &self.address
    }

    /// Sign a message, returning the base58-encoded signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> String {
        bs58::encode(self.signing_key.sign(message).to_bytes()).into_string()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
