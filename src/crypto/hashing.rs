// Keccak-256 digests used across the portal: document fingerprints, ledger role ids and
// ABI function/event selectors.

use primitive_types::H256;
use sha3::{Digest, Keccak256};

/// Hashes arbitrary bytes into a H256 digest.
pub fn keccak256(bytes: impl AsRef<[u8]>) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(bytes.as_ref());
    H256::from_slice(&hasher.finalize())
}

/// Packed encoding of a list of `string` values, as `abi.encodePacked` produces it:
/// the raw UTF-8 bytes of each value, back to back, without length prefix or padding.
pub fn pack_strings<S: AsRef<str>>(values: &[S]) -> Vec<u8> {
    let total = values.iter().map(|v| v.as_ref().len()).sum();
    let mut packed = Vec::with_capacity(total);
    for value in values {
        packed.extend_from_slice(value.as_ref().as_bytes());
    }
    packed
}

/// Computes the document-set fingerprint: `keccak256(pack([salt, sorted content ids...]))`.
///
/// Content identifiers are sorted ascending by byte order first, so the result does not
/// depend on the order in which the ledger returned them.
pub fn fingerprint<S: AsRef<str>>(salt: &str, content_ids: &[S]) -> H256 {
    let mut sorted: Vec<&str> = content_ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut parts = Vec::with_capacity(sorted.len() + 1);
    parts.push(salt);
    parts.extend(sorted);
    keccak256(pack_strings(&parts))
}

/// Ledger identifier of an access-control role (`keccak256("ROLE_NAME")`).
pub fn role_id(role_name: &str) -> H256 {
    keccak256(role_name.as_bytes())
}

/// First four bytes of the Keccak-256 of a function signature, e.g. `getDocument(uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest.as_bytes()[..4]);
    out
}

/// Topic of an event, e.g. `IntegrityVerified(uint256,bytes32,bool,address,uint256)`.
pub fn event_topic(signature: &str) -> H256 {
    keccak256(signature.as_bytes())
}
