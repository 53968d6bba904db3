//! EIP-712 signature over an auth root.

use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, B256, Bytes, Signature};
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain, sol};

sol! {
    struct AuthRoot {
        bytes32 root;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("failed to sign auth root: {0}")]
    Signer(String),

    #[error("malformed signature: {0}")]
    Malformed(String),
}

pub fn domain() -> Eip712Domain {
    eip712_domain! {
        name: "Tessera",
        version: "1.0.0",
    }
}

/// Digest the signer actually signs.
pub fn signing_hash(root: B256) -> B256 {
    AuthRoot { root }.eip712_signing_hash(&domain())
}

/// 65-byte `r ‖ s ‖ v` signature over `root`.
pub fn sign_auth_root(signer: &PrivateKeySigner, root: B256) -> Result<Bytes, SigningError> {
    let signature = signer
        .sign_hash_sync(&signing_hash(root))
        .map_err(|err| SigningError::Signer(err.to_string()))?;
    Ok(Bytes::from(signature.as_bytes().to_vec()))
}

pub fn recover_signer(root: B256, signature: &[u8]) -> Result<Address, SigningError> {
    let signature =
        Signature::try_from(signature).map_err(|err| SigningError::Malformed(err.to_string()))?;
    signature
        .recover_address_from_prehash(&signing_hash(root))
        .map_err(|err| SigningError::Malformed(err.to_string()))
}
