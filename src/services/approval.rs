//! Constant-time approval-token verification.
//!
//! Approval tokens gate promotions into sensitive maturity levels. The
//! comparison must not leak how many leading bytes matched, so it goes
//! through `subtle` rather than `==` on byte slices.

use subtle::ConstantTimeEq;

/// An operator-supplied approval for a graduation attempt.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Recorded on the `GraduationRecord` as `approved_by`.
    pub approver: String,
    /// Externally supplied token checked against the configured secret.
    pub token: String,
}

/// Compare an externally supplied token against the configured secret in
/// constant time. Length differences still return false, but only after a
/// full-width comparison has run.
pub fn verify_approval_token(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Burn a comparison of the expected secret against itself so the
        // early length mismatch costs the same as a content mismatch.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}
