//! Client-side encryption flowing through the registry.

use anyhow::Result;

use scholar_ledger::core::verify_record_signature;
use scholar_ledger::perms::{EncryptedRecord, WrappedKey};
use scholar_ledger::RegistryError;
use scholar_ledger_testkit::{record_id, TestFixture};

#[tokio::test]
async fn visitor_decrypts_only_while_granted() -> Result<()> {
    let fx = TestFixture::new();
    let registry = fx.memory_registry().await?;
    let student = fx.student.address();
    let visitor = fx.visitor.address();
    let r1 = record_id(1);

    let (input, content_key) = fx.sealed_input(1, b"MSc Computer Science, distinction")?;
    registry
        .register_batch_records(&fx.institution.address(), vec![input])
        .await?;

    let record = registry.get_record(&r1).await?;
    verify_record_signature(&record, &fx.institution.keypair.public_key())?;

    // The student can always open their own copy.
    let student_key = WrappedKey::from_bytes(&record.encrypted_key_student)?
        .open(&r1, &fx.student.x25519)?;
    let envelope = EncryptedRecord::from_bytes(&record.encrypted_data)?;
    assert_eq!(envelope.decrypt(&student_key)?, b"MSc Computer Science, distinction");

    registry
        .grant_visitor_access(&student, &r1, &visitor, fx.visitor_blob(1, &content_key)?)
        .await?;

    let blob = registry
        .visitor_key(&r1, &visitor)
        .await?
        .expect("visitor key present after grant");
    let visitor_key = WrappedKey::from_bytes(&blob)?.open(&r1, &fx.visitor.x25519)?;
    assert_eq!(envelope.decrypt(&visitor_key)?, b"MSc Computer Science, distinction");

    // Someone else cannot open the visitor's blob.
    assert!(WrappedKey::from_bytes(&blob)?
        .open(&r1, &fx.outsider.x25519)
        .is_err());

    registry.revoke_visitor_access(&student, &r1, &visitor).await?;
    assert_eq!(registry.visitor_key(&r1, &visitor).await?, None);
    Ok(())
}

#[tokio::test]
async fn tampered_signature_still_stored_verbatim() -> Result<()> {
    let fx = TestFixture::new();
    let registry = fx.memory_registry().await?;

    let (input, _) = fx.sealed_input(2, b"BA History")?;
    let input = input.signature(vec![0u8; 64]);
    registry
        .register_batch_records(&fx.institution.address(), vec![input])
        .await?;

    let record = registry.get_record(&record_id(2)).await?;
    assert_eq!(&record.signature_institution[..], &[0u8; 64][..]);
    assert!(verify_record_signature(&record, &fx.institution.keypair.public_key()).is_err());
    Ok(())
}

#[tokio::test]
async fn grant_requires_non_empty_key_even_when_wrapped_elsewhere() -> Result<()> {
    let fx = TestFixture::new();
    let registry = fx.memory_registry().await?;
    let (input, _) = fx.sealed_input(3, b"PhD")?;
    registry
        .register_batch_records(&fx.institution.address(), vec![input])
        .await?;

    assert!(matches!(
        registry
            .grant_visitor_access(&fx.student.address(), &record_id(3), &fx.visitor.address(), Vec::<u8>::new())
            .await,
        Err(RegistryError::EmptyKey)
    ));
    Ok(())
}
