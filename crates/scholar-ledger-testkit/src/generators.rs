//! Proptest generators for property-based testing.

use proptest::prelude::*;

use scholar_ledger_core::{Address, Keypair, RecordId, RecordInput};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate any address, including (rarely) the zero address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a non-zero address.
pub fn identity() -> impl Strategy<Value = Address> {
    address().prop_filter("zero address", |a| !a.is_zero())
}

/// Generate a random RecordId.
pub fn record_id() -> impl Strategy<Value = RecordId> {
    any::<[u8; 32]>().prop_map(RecordId::from_bytes)
}

/// Generate a blob of up to `max_len` bytes.
pub fn blob(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a non-empty blob, as a visitor key must be.
pub fn key_blob() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=96)
}

/// Generate a policy descriptor.
pub fn policy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,23}".prop_map(String::from)
}

/// Generate a valid entry for `student`.
pub fn record_input_for(student: Address) -> impl Strategy<Value = RecordInput> {
    (record_id(), blob(256), key_blob(), key_blob(), blob(64), policy()).prop_map(
        move |(id, data, key_inst, key_student, sig, policy)| {
            RecordInput::new(id, student)
                .encrypted_data(data)
                .keys(key_inst, key_student)
                .signature(sig)
                .policy(policy)
        },
    )
}

/// Generate a valid entry for a random student.
pub fn record_input() -> impl Strategy<Value = RecordInput> {
    identity().prop_flat_map(record_input_for)
}

/// Generate between 1 and `max_len` valid entries with distinct ids.
pub fn unique_batch(max_len: usize) -> impl Strategy<Value = Vec<RecordInput>> {
    prop::collection::vec(record_input(), 1..=max_len).prop_map(|mut inputs| {
        // Give each entry a distinct id by stamping its index into the last bytes.
        for (i, input) in inputs.iter_mut().enumerate() {
            let mut bytes = *input.record_id.as_bytes();
            bytes[28..].copy_from_slice(&(i as u32).to_be_bytes());
            input.record_id = RecordId::from_bytes(bytes);
        }
        inputs
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    proptest! {
        #[test]
        fn test_unique_batch_has_distinct_ids(batch in unique_batch(16)) {
            let ids: HashSet<_> = batch.iter().map(|e| e.record_id).collect();
            prop_assert_eq!(ids.len(), batch.len());
        }

        #[test]
        fn test_identity_never_zero(addr in identity()) {
            prop_assert!(!addr.is_zero());
        }

        #[test]
        fn test_inputs_have_real_students(input in record_input()) {
            prop_assert!(!input.student_address.is_zero());
            prop_assert!(!input.encrypted_key_student.is_empty());
        }
    }
}
