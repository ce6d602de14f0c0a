//! The directory: who may administer and who may register records.
//!
//! State is a set-once owner plus a set of institutions, both persisted
//! through the [`Store`]. Every mutating registry operation is gated by a
//! lookup here.

use std::sync::Arc;

use scholar_ledger_core::Address;
use scholar_ledger_store::Store;

use crate::error::{PermsError, Result};
use crate::role::{Role, RoleSet};

/// Owner and institution registry backed by a store.
pub struct Directory<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for Directory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> Directory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Make `caller` the owner.
    ///
    /// Succeeds exactly once per store. The owner can never change afterwards.
    pub async fn initialize(&self, caller: &Address) -> Result<()> {
        if caller.is_zero() {
            return Err(PermsError::InvalidIdentity(
                "owner cannot be the zero address".into(),
            ));
        }
        if !self.store.init_owner(caller).await? {
            return Err(PermsError::AlreadyInitialized);
        }
        tracing::info!(owner = %caller, "directory initialized");
        Ok(())
    }

    /// The owner, or `NotInitialized`.
    pub async fn owner(&self) -> Result<Address> {
        self.store.get_owner().await?.ok_or(PermsError::NotInitialized)
    }

    /// Grant the institution role. Owner only; idempotent.
    pub async fn add_institution(&self, caller: &Address, identity: &Address) -> Result<()> {
        self.require_owner(caller).await?;
        require_identity(identity, "institution")?;
        self.store.set_institution(identity, true).await?;
        tracing::info!(institution = %identity, "institution added");
        Ok(())
    }

    /// Revoke the institution role. Owner only; idempotent.
    ///
    /// Records already registered by the institution are unaffected.
    pub async fn remove_institution(&self, caller: &Address, identity: &Address) -> Result<()> {
        self.require_owner(caller).await?;
        require_identity(identity, "institution")?;
        self.store.set_institution(identity, false).await?;
        tracing::info!(institution = %identity, "institution removed");
        Ok(())
    }

    pub async fn is_institution(&self, identity: &Address) -> Result<bool> {
        Ok(self.store.is_institution(identity).await?)
    }

    /// Current institutions, sorted by address.
    pub async fn institutions(&self) -> Result<Vec<Address>> {
        Ok(self.store.list_institutions().await?)
    }

    /// Explicit roles held by `identity`.
    pub async fn roles(&self, identity: &Address) -> Result<RoleSet> {
        let mut roles = RoleSet::empty();
        if self.store.get_owner().await? == Some(*identity) {
            roles.insert(Role::Owner);
        }
        if self.store.is_institution(identity).await? {
            roles.insert(Role::Institution);
        }
        Ok(roles)
    }

    /// Fail with `Unauthorized` unless `caller` is an institution.
    pub async fn require_institution(&self, caller: &Address) -> Result<()> {
        if self.store.is_institution(caller).await? {
            Ok(())
        } else {
            Err(PermsError::Unauthorized(format!(
                "{} is not a registered institution",
                caller
            )))
        }
    }

    async fn require_owner(&self, caller: &Address) -> Result<()> {
        match self.store.get_owner().await? {
            Some(owner) if owner == *caller => Ok(()),
            _ => Err(PermsError::Unauthorized(format!(
                "{} is not the directory owner",
                caller
            ))),
        }
    }
}

/// Fail with `InvalidIdentity` if `identity` is the zero address.
pub fn require_identity(identity: &Address, what: &str) -> Result<()> {
    if identity.is_zero() {
        Err(PermsError::InvalidIdentity(format!(
            "{} cannot be the zero address",
            what
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_ledger_store::MemoryStore;

    const OWNER: Address = Address::from_bytes([1; 20]);
    const INST: Address = Address::from_bytes([2; 20]);
    const OTHER: Address = Address::from_bytes([3; 20]);

    async fn initialized() -> Directory<MemoryStore> {
        let dir = Directory::new(Arc::new(MemoryStore::new()));
        dir.initialize(&OWNER).await.unwrap();
        dir
    }

    #[tokio::test]
    async fn test_initialize_once() {
        let dir = Directory::new(Arc::new(MemoryStore::new()));
        assert!(matches!(dir.owner().await, Err(PermsError::NotInitialized)));

        dir.initialize(&OWNER).await.unwrap();
        assert_eq!(dir.owner().await.unwrap(), OWNER);

        assert!(matches!(
            dir.initialize(&OTHER).await,
            Err(PermsError::AlreadyInitialized)
        ));
        assert_eq!(dir.owner().await.unwrap(), OWNER);
    }

    #[tokio::test]
    async fn test_initialize_rejects_zero() {
        let dir = Directory::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            dir.initialize(&Address::ZERO).await,
            Err(PermsError::InvalidIdentity(_))
        ));
        assert!(matches!(dir.owner().await, Err(PermsError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_add_remove_idempotent() {
        let dir = initialized().await;

        dir.add_institution(&OWNER, &INST).await.unwrap();
        dir.add_institution(&OWNER, &INST).await.unwrap();
        assert!(dir.is_institution(&INST).await.unwrap());
        assert_eq!(dir.institutions().await.unwrap(), vec![INST]);

        dir.remove_institution(&OWNER, &INST).await.unwrap();
        dir.remove_institution(&OWNER, &INST).await.unwrap();
        assert!(!dir.is_institution(&INST).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_owner_rejected() {
        let dir = initialized().await;

        assert!(matches!(
            dir.add_institution(&OTHER, &INST).await,
            Err(PermsError::Unauthorized(_))
        ));
        dir.add_institution(&OWNER, &INST).await.unwrap();
        assert!(matches!(
            dir.remove_institution(&INST, &INST).await,
            Err(PermsError::Unauthorized(_))
        ));
        assert!(dir.is_institution(&INST).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_institution_rejected() {
        let dir = initialized().await;
        assert!(matches!(
            dir.add_institution(&OWNER, &Address::ZERO).await,
            Err(PermsError::InvalidIdentity(_))
        ));
        assert!(matches!(
            dir.remove_institution(&OWNER, &Address::ZERO).await,
            Err(PermsError::InvalidIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_can_also_be_institution() {
        let dir = initialized().await;
        dir.add_institution(&OWNER, &OWNER).await.unwrap();

        let roles = dir.roles(&OWNER).await.unwrap();
        assert!(roles.contains(Role::Owner));
        assert!(roles.contains(Role::Institution));
        assert!(dir.roles(&OTHER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_require_institution() {
        let dir = initialized().await;
        assert!(matches!(
            dir.require_institution(&INST).await,
            Err(PermsError::Unauthorized(_))
        ));
        dir.add_institution(&OWNER, &INST).await.unwrap();
        dir.require_institution(&INST).await.unwrap();
    }
}
