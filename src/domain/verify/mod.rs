//! Client-side integrity verification: fingerprint, submit, observe, verdict.

pub mod flow;
pub mod source;

pub use flow::{IntegrityVerifier, Verdict, VerificationState};
pub use source::{FingerprintSource, HashServiceClient};
