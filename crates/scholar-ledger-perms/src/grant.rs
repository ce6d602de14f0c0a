//! Visitor access rules.
//!
//! Only a record's student may hand out or withdraw access to it. A grant
//! is an opaque key blob for one `(record, visitor)` pair; the registry
//! checks who is asking and that the blob is non-empty, nothing more.

use bytes::Bytes;

use scholar_ledger_core::{Address, Record, RecordId};

use crate::directory::require_identity;
use crate::error::{PermsError, Result};

/// A validated visitor access grant, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub record_id: RecordId,
    pub student: Address,
    pub visitor: Address,
    pub encrypted_key: Bytes,
}

impl AccessGrant {
    /// Check that `caller` may give `visitor` access to `record` with `key`.
    ///
    /// Checks run in a fixed order: ownership, visitor identity, key.
    pub fn authorize(
        record: &Record,
        caller: &Address,
        visitor: &Address,
        key: Bytes,
    ) -> Result<Self> {
        authorize_student(record, caller)?;
        require_identity(visitor, "visitor")?;
        if key.is_empty() {
            return Err(PermsError::EmptyKey);
        }
        Ok(Self {
            record_id: record.record_id,
            student: record.student_address,
            visitor: *visitor,
            encrypted_key: key,
        })
    }
}

/// Check that `caller` may withdraw `visitor`'s access to `record`.
pub fn authorize_revoke(record: &Record, caller: &Address, visitor: &Address) -> Result<()> {
    authorize_student(record, caller)?;
    require_identity(visitor, "visitor")
}

/// Fail with `Unauthorized` unless `caller` is the record's student.
pub fn authorize_student(record: &Record, caller: &Address) -> Result<()> {
    if record.student_address == *caller {
        Ok(())
    } else {
        Err(PermsError::Unauthorized(format!(
            "{} is not the student of record {}",
            caller, record.record_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_ledger_core::RecordInput;

    const STUDENT: Address = Address::from_bytes([5; 20]);
    const VISITOR: Address = Address::from_bytes([6; 20]);

    fn record() -> Record {
        RecordInput::new(RecordId::from_bytes([1; 32]), STUDENT)
            .encrypted_data(b"ct".to_vec())
            .into_record(Address::from_bytes([9; 20]), 0)
    }

    #[test]
    fn test_student_may_grant() {
        let grant =
            AccessGrant::authorize(&record(), &STUDENT, &VISITOR, Bytes::from_static(b"k"))
                .unwrap();
        assert_eq!(grant.visitor, VISITOR);
        assert_eq!(grant.student, STUDENT);
        assert_eq!(grant.encrypted_key, Bytes::from_static(b"k"));
    }

    #[test]
    fn test_ownership_checked_before_key() {
        // A stranger with an empty key is rejected for ownership, not the key.
        let err = AccessGrant::authorize(&record(), &VISITOR, &VISITOR, Bytes::new()).unwrap_err();
        assert!(matches!(err, PermsError::Unauthorized(_)));
    }

    #[test]
    fn test_identity_checked_before_key() {
        let err =
            AccessGrant::authorize(&record(), &STUDENT, &Address::ZERO, Bytes::new()).unwrap_err();
        assert!(matches!(err, PermsError::InvalidIdentity(_)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = AccessGrant::authorize(&record(), &STUDENT, &VISITOR, Bytes::new()).unwrap_err();
        assert!(matches!(err, PermsError::EmptyKey));
    }

    #[test]
    fn test_revoke_rules() {
        authorize_revoke(&record(), &STUDENT, &VISITOR).unwrap();
        assert!(matches!(
            authorize_revoke(&record(), &VISITOR, &VISITOR),
            Err(PermsError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize_revoke(&record(), &STUDENT, &Address::ZERO),
            Err(PermsError::InvalidIdentity(_))
        ));
    }
}
