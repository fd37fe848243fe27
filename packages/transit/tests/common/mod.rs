//! Shared fixtures for integration tests

#![allow(dead_code)]

use cryypt_transit::{
    InMemoryStorage, KeyRingGenerator, KeysBackend, PgpIdentity, PolicyError, PolicyStore,
    Result, Storage, TransitConfig,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const ED25519_OID: [u8; 9] = [0x2b, 0x06, 0x01, 0x04, 0x01, 0xda, 0x47, 0x0f, 0x01];

fn write_packet(out: &mut Vec<u8>, tag: u8, body: &[u8]) {
    assert!(body.len() < 192, "fixture packets are short");
    out.push(0xC0 | tag);
    out.push(body.len() as u8);
    out.extend_from_slice(body);
}

/// Binary key ring with one EdDSA secret key, one User ID and a signature stub
pub fn fixture_key_ring(user_id: &str, public_point: [u8; 32]) -> Vec<u8> {
    let mut key = vec![4, 0x61, 0x00, 0x00, 0x00, 22, ED25519_OID.len() as u8];
    key.extend_from_slice(&ED25519_OID);
    key.extend_from_slice(&[0x01, 0x07, 0x40]);
    key.extend_from_slice(&public_point);
    key.push(0);
    key.extend_from_slice(&[0x00, 0xFE]);
    key.extend_from_slice(&[0x3C; 32]);
    key.extend_from_slice(&[0xAB, 0xCD]);

    let mut ring = Vec::new();
    write_packet(&mut ring, 5, &key);
    write_packet(&mut ring, 13, user_id.as_bytes());
    write_packet(&mut ring, 2, &[4, 0x13, 22, 8, 0, 0]);
    ring
}

/// OpenPGP User ID in the usual `Name (Comment) <email>` form
pub fn user_id(identity: &PgpIdentity) -> String {
    let mut id = identity.real_name.clone();
    if !identity.comment.is_empty() {
        id.push_str(&format!(" ({})", identity.comment));
    }
    if !identity.email.is_empty() {
        id.push_str(&format!(" <{}>", identity.email));
    }
    id
}

/// Key ring generator producing deterministic fixture rings
pub struct FixtureKeyRings;

impl KeyRingGenerator for FixtureKeyRings {
    fn generate(&self, identity: &PgpIdentity) -> Result<Vec<u8>> {
        Ok(fixture_key_ring(&user_id(identity), [0x5A; 32]))
    }
}

/// In-memory storage whose deletes can be made to fail
#[derive(Default)]
pub struct FlakyStorage {
    inner: InMemoryStorage,
    fail_deletes: AtomicBool,
}

impl FlakyStorage {
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl Storage for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PolicyError::storage("delete", "backend unavailable"));
        }
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix).await
    }
}

pub fn backend() -> KeysBackend<InMemoryStorage> {
    backend_with(InMemoryStorage::new(), TransitConfig::default())
}

pub fn backend_with<S: Storage>(storage: S, config: TransitConfig) -> KeysBackend<S> {
    KeysBackend::new(
        PolicyStore::new(storage, config).with_key_ring_generator(Arc::new(FixtureKeyRings)),
    )
}
