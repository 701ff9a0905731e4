//! The import builder.
//!
//! Enclaves come back to life three ways: from a sealed blob plus its key,
//! from the plain JSON form, or from the two raw share blobs of an earlier
//! DKG. When several sources are supplied the most protected one wins:
//! sealed, then JSON, then raw shares.

use crate::error::Error;
use crate::mpc::codec;
use crate::mpc::enclave::Enclave;
use crate::mpc::keyshare::Keyshare;
use crate::mpc::types::{random_nonce, Role};

#[derive(Default)]
pub struct ImportBuilder {
    sealed: Option<(Vec<u8>, Vec<u8>)>,
    json: Option<Vec<u8>>,
    shares: Option<(Vec<u8>, Vec<u8>)>,
}

impl ImportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import from a sealed blob and the key it was exported under.
    pub fn with_sealed(mut self, blob: &[u8], key: &[u8]) -> Self {
        self.sealed = Some((blob.to_vec(), key.to_vec()));
        self
    }

    /// Import from the unencrypted JSON form.
    pub fn with_json(mut self, bytes: &[u8]) -> Self {
        self.json = Some(bytes.to_vec());
        self
    }

    /// Assemble from the raw share blobs of a prior DKG. The public point
    /// is derived from the validator share; a fresh nonce is drawn.
    pub fn with_initial_shares(mut self, val: &[u8], user: &[u8]) -> Self {
        self.shares = Some((val.to_vec(), user.to_vec()));
        self
    }

    pub fn build(self) -> Result<Enclave, Error> {
        if let Some((blob, key)) = self.sealed {
            if blob.is_empty() {
                return Err(Error::EmptySealedInput);
            }
            return codec::unseal(&blob, &key);
        }
        if let Some(bytes) = self.json {
            return codec::from_json(&bytes);
        }
        if let Some((val, user)) = self.shares {
            if val.is_empty() {
                return Err(Error::MissingShare(Role::Validator));
            }
            if user.is_empty() {
                return Err(Error::MissingShare(Role::User));
            }
            let val_share = Keyshare::from_bytes(Role::Validator, &val)?;
            let user_share = Keyshare::from_bytes(Role::User, &user)?;
            return Enclave::from_parts(val_share, user_share, random_nonce());
        }
        Err(Error::NoImportOptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const TEST_KEY: &[u8] = b"test-key-12345678-test-key-123456";

    #[test]
    fn no_options_is_an_error() {
        assert!(matches!(ImportBuilder::new().build(), Err(Error::NoImportOptions)));
    }

    #[test]
    fn empty_sealed_blob_is_an_error() {
        let result = ImportBuilder::new().with_sealed(&[], TEST_KEY).build();
        assert!(matches!(result, Err(Error::EmptySealedInput)));
    }

    #[test]
    fn initial_shares_rebuild_the_enclave() -> Result<()> {
        let original = Enclave::new()?;
        let rebuilt = Enclave::import()
            .with_initial_shares(original.val_share().as_bytes(), original.user_share().as_bytes())
            .build()?;
        assert_eq!(rebuilt.pub_key_compressed(), original.pub_key_compressed());
        // The nonce is drawn fresh, not copied.
        assert_ne!(rebuilt.nonce(), original.nonce());

        let sig = rebuilt.sign(b"rebuilt enclave signs")?;
        assert!(original.verify(b"rebuilt enclave signs", &sig)?);
        Ok(())
    }

    #[test]
    fn a_missing_share_names_its_side() -> Result<()> {
        let enclave = Enclave::new()?;
        let result = ImportBuilder::new()
            .with_initial_shares(&[], enclave.user_share().as_bytes())
            .build();
        assert!(matches!(result, Err(Error::MissingShare(Role::Validator))));

        let result = ImportBuilder::new()
            .with_initial_shares(enclave.val_share().as_bytes(), &[])
            .build();
        assert!(matches!(result, Err(Error::MissingShare(Role::User))));
        Ok(())
    }

    #[test]
    fn swapped_shares_are_invalid() -> Result<()> {
        let enclave = Enclave::new()?;
        let result = ImportBuilder::new()
            .with_initial_shares(enclave.user_share().as_bytes(), enclave.val_share().as_bytes())
            .build();
        assert!(matches!(result, Err(Error::InvalidShare(Role::Validator))));
        Ok(())
    }

    #[test]
    fn sealed_takes_precedence_over_initial_shares() -> Result<()> {
        let sealed_owner = Enclave::new()?;
        let other = Enclave::new()?;
        let blob = sealed_owner.export(TEST_KEY)?;

        let imported = ImportBuilder::new()
            .with_initial_shares(other.val_share().as_bytes(), other.user_share().as_bytes())
            .with_sealed(&blob, TEST_KEY)
            .build()?;
        assert_eq!(imported.pub_key_compressed(), sealed_owner.pub_key_compressed());
        assert_ne!(imported.pub_key_compressed(), other.pub_key_compressed());
        Ok(())
    }

    #[test]
    fn mismatched_shares_from_different_runs_are_rejected() -> Result<()> {
        let a = Enclave::new()?;
        let b = Enclave::new()?;
        let result = ImportBuilder::new()
            .with_initial_shares(a.val_share().as_bytes(), b.user_share().as_bytes())
            .build();
        assert!(matches!(result, Err(Error::InvalidShare(Role::User))));
        Ok(())
    }
}
