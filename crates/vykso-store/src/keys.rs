//! Key encoding for the column families.
//!
//! Index keys concatenate the 16-byte account id with a 16-byte ULID, so a
//! prefix scan over an account yields its records in chronological order.

use vykso_core::{AccountId, JobId, TransactionId};

/// Account record key.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Transaction record key.
#[must_use]
pub fn transaction_key(transaction_id: TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Per-account transaction index key: `account_id || transaction_id`.
#[must_use]
pub fn account_transaction_key(account_id: &AccountId, transaction_id: TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Job record key.
#[must_use]
pub fn job_key(job_id: JobId) -> Vec<u8> {
    job_id.to_bytes().to_vec()
}

/// Per-account job index key: `account_id || job_id`.
#[must_use]
pub fn account_job_key(account_id: &AccountId, job_id: JobId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&job_id.to_bytes());
    key
}

/// Prefix for scanning all of an account's index entries.
#[must_use]
pub fn account_prefix(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Pull the trailing 16-byte ULID out of an index key.
///
/// # Panics
///
/// Panics if the key is shorter than 32 bytes; index keys are always
/// written at exactly 32.
#[must_use]
pub fn ulid_suffix(key: &[u8]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    bytes
}

/// Provider task id key (`jobs_by_provider`).
#[must_use]
pub fn provider_ref_key(provider_ref: &str) -> Vec<u8> {
    provider_ref.as_bytes().to_vec()
}

/// Billing subscription ref key (`accounts_by_subscription`).
#[must_use]
pub fn subscription_ref_key(subscription_ref: &str) -> Vec<u8> {
    subscription_ref.as_bytes().to_vec()
}

/// Processed webhook event key.
#[must_use]
pub fn event_key(event_id: &str) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_key_layout() {
        let account_id = AccountId::generate();
        let tx_id = TransactionId::generate();
        let key = account_transaction_key(&account_id, tx_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], account_id.as_bytes());
        assert_eq!(ulid_suffix(&key), tx_id.to_bytes());
    }

    #[test]
    fn job_index_roundtrip() {
        let account_id = AccountId::generate();
        let job_id = JobId::generate();
        let key = account_job_key(&account_id, job_id);

        assert_eq!(JobId::from_bytes(ulid_suffix(&key)), job_id);
    }
}
