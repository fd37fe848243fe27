//! End-to-end tests of the keys backend over in-memory storage

mod common;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use common::{FlakyStorage, backend, backend_with};
use cryypt_transit::{
    CreateKeyRequest, InMemoryStorage, KeyType, KeysBackend, Storage, TransitConfig, VersionTable,
};
use proptest::prelude::*;
use rsa::RsaPublicKey;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};

#[tokio::test]
async fn test_k1_rsa_2048_example() {
    let backend = backend();
    let response = backend
        .write_key(&CreateKeyRequest::new("k1", "rsa-2048"))
        .await
        .unwrap();
    assert!(response.warnings.is_empty());

    let description = backend.read_key("k1", None).await.unwrap().unwrap();
    assert_eq!(description.name, "k1");
    assert_eq!(description.key_type, KeyType::Rsa2048);
    assert_eq!(description.keys.versions(), vec!["1"]);

    let key = description.keys.asymmetric("1").unwrap();
    assert_eq!(key.name, "rsa-2048");
    assert!(key.public_key.starts_with("-----BEGIN PUBLIC KEY-----"));

    let json = serde_json::to_value(&description).unwrap();
    assert_eq!(json["type"], "rsa-2048");
    assert_eq!(json["keys"]["1"]["name"], "rsa-2048");
}

#[tokio::test]
async fn test_rsa_pem_round_trip_is_bit_exact() {
    let backend = backend();
    backend
        .write_key(&CreateKeyRequest::new("rsa", "rsa-2048"))
        .await
        .unwrap();

    let description = backend.read_key("rsa", None).await.unwrap().unwrap();
    let pem_text = &description.keys.asymmetric("1").unwrap().public_key;

    let parsed = RsaPublicKey::from_public_key_pem(pem_text).unwrap();
    let der = cryypt_transit::codec::decode_public_key(pem_text).unwrap();
    assert_eq!(parsed.to_public_key_der().unwrap().as_bytes(), der.as_slice());
}

#[tokio::test]
async fn test_reissued_create_warns_and_keeps_material() {
    let backend = backend();
    let request = CreateKeyRequest::new("signer", "ecdsa-p256");

    backend.write_key(&request).await.unwrap();
    let first = backend.read_key("signer", None).await.unwrap().unwrap();

    let response = backend.write_key(&request).await.unwrap();
    assert_eq!(response.warnings, vec!["key signer already existed"]);

    let second = backend.read_key("signer", None).await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(second.latest_version, 1);
}

#[tokio::test]
async fn test_upsert_does_not_touch_flags() {
    let backend = backend();
    backend
        .write_key(&CreateKeyRequest {
            allow_plaintext_backup: true,
            ..CreateKeyRequest::new("flags", "aes128-gcm96")
        })
        .await
        .unwrap();

    backend
        .write_key(&CreateKeyRequest {
            exportable: true,
            ..CreateKeyRequest::new("flags", "aes128-gcm96")
        })
        .await
        .unwrap();

    let description = backend.read_key("flags", None).await.unwrap().unwrap();
    assert!(description.allow_plaintext_backup);
    assert!(!description.exportable);
}

#[tokio::test]
async fn test_default_type_and_capabilities() {
    let backend = backend();
    backend
        .write_key(&serde_json::from_str(r#"{"name": "plain"}"#).unwrap())
        .await
        .unwrap();

    let description = backend.read_key("plain", None).await.unwrap().unwrap();
    assert_eq!(description.key_type, KeyType::Aes256Gcm96);
    assert!(description.deletion_allowed);
    assert!(description.supports_encryption);
    assert!(description.supports_derivation);
    assert!(!description.supports_signing);
    assert!(matches!(description.keys, VersionTable::Symmetric(_)));
    assert_eq!(
        (
            description.min_available_version,
            description.min_decryption_version,
            description.min_encryption_version,
            description.latest_version
        ),
        (1, 1, 1, 1)
    );
}

#[tokio::test]
async fn test_ed25519_derived_public_keys() {
    let backend = backend();
    backend
        .write_key(&CreateKeyRequest {
            derived: true,
            ..CreateKeyRequest::new("ed", "ed25519")
        })
        .await
        .unwrap();

    let without = backend.read_key("ed", None).await.unwrap().unwrap();
    assert_eq!(without.keys.asymmetric("1").unwrap().public_key, "");

    let ctx_a = STANDARD.encode("customer-a");
    let ctx_b = STANDARD.encode("customer-b");

    let a = derived_public_key(&backend, &ctx_a).await;
    assert!(!a.is_empty());
    assert_eq!(STANDARD.decode(&a).unwrap().len(), 32);
    assert_eq!(a, derived_public_key(&backend, &ctx_a).await);
    assert_ne!(a, derived_public_key(&backend, &ctx_b).await);
}

async fn derived_public_key(backend: &KeysBackend<InMemoryStorage>, context: &str) -> String {
    let description = backend.read_key("ed", Some(context)).await.unwrap().unwrap();
    description.keys.asymmetric("1").unwrap().public_key.clone()
}

#[tokio::test]
async fn test_malformed_context_is_invalid_request() {
    let backend = backend();
    backend
        .write_key(&CreateKeyRequest {
            derived: true,
            ..CreateKeyRequest::new("ed", "ed25519")
        })
        .await
        .unwrap();

    let err = backend.read_key("ed", Some("%%%")).await.unwrap_err();
    assert!(err.is_invalid_request());
}

#[tokio::test]
async fn test_delete_semantics() {
    let backend = backend();
    backend
        .write_key(&CreateKeyRequest::new("doomed", "chacha20-poly1305"))
        .await
        .unwrap();
    backend
        .write_key(&CreateKeyRequest::new("kept", "aes128-gcm96"))
        .await
        .unwrap();

    let err = backend.delete_key("unknown").await.unwrap_err();
    assert!(err.to_string().starts_with("error deleting policy unknown: "));
    assert_eq!(backend.list_keys().await.unwrap(), vec!["doomed", "kept"]);

    backend.delete_key("doomed").await.unwrap();
    assert!(backend.read_key("doomed", None).await.unwrap().is_none());
    assert_eq!(backend.list_keys().await.unwrap(), vec!["kept"]);
}

#[tokio::test]
async fn test_failed_delete_leaves_policy() {
    let backend = backend_with(FlakyStorage::default(), TransitConfig::default());
    backend
        .write_key(&CreateKeyRequest::new("sticky", "aes256-gcm96"))
        .await
        .unwrap();

    backend.store().storage().fail_deletes(true);
    let err = backend.delete_key("sticky").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "error deleting policy sticky: Storage backend error: delete failed - backend unavailable"
    );
    assert!(err.is_internal());
    assert!(backend.read_key("sticky", None).await.unwrap().is_some());

    backend.store().storage().fail_deletes(false);
    backend.delete_key("sticky").await.unwrap();
    assert!(backend.read_key("sticky", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rotation_extends_version_table() {
    let backend = backend();
    backend
        .write_key(&CreateKeyRequest::new("rot", "ed25519"))
        .await
        .unwrap();

    assert_eq!(backend.rotate_key("rot").await.unwrap(), 2);
    let description = backend.read_key("rot", None).await.unwrap().unwrap();
    assert_eq!(description.latest_version, 2);
    assert_eq!(description.keys.versions(), vec!["1", "2"]);
    assert_ne!(
        description.keys.asymmetric("1").unwrap().public_key,
        description.keys.asymmetric("2").unwrap().public_key
    );
}

#[tokio::test]
async fn test_caching_disabled_round_trip() {
    let config = TransitConfig {
        caching_disabled: true,
        storage_prefix: "transit/".to_string(),
    };
    let backend = backend_with(InMemoryStorage::new(), config);

    backend
        .write_key(&CreateKeyRequest::new("nc", "ecdsa-p521"))
        .await
        .unwrap();
    let response = backend
        .write_key(&CreateKeyRequest::new("nc", "ecdsa-p521"))
        .await
        .unwrap();
    assert_eq!(response.warnings.len(), 1);

    let description = backend.read_key("nc", None).await.unwrap().unwrap();
    assert_eq!(description.keys.asymmetric("1").unwrap().name, "P-521");
    assert!(backend
        .store()
        .storage()
        .get("transit/nc")
        .await
        .unwrap()
        .is_some());
}

fn any_key_type() -> impl Strategy<Value = KeyType> {
    proptest::sample::select(KeyType::ALL.to_vec())
}

fn cheap_key_type() -> impl Strategy<Value = KeyType> {
    proptest::sample::select(vec![
        KeyType::Aes128Gcm96,
        KeyType::Aes256Gcm96,
        KeyType::ChaCha20Poly1305,
        KeyType::EcdsaP256,
        KeyType::Ed25519,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_convergent_without_derived_always_rejected(
        key_type in any_key_type(),
        exportable in any::<bool>(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let backend = backend();
            let err = backend
                .write_key(&CreateKeyRequest {
                    convergent_encryption: true,
                    exportable,
                    ..CreateKeyRequest::new("conv", key_type.as_str())
                })
                .await
                .unwrap_err();
            prop_assert!(err.is_invalid_request());
            prop_assert!(backend.list_keys().await.unwrap().is_empty());
            Ok(())
        })?;
    }

    #[test]
    fn test_reissued_create_never_duplicates(
        key_type in cheap_key_type(),
        name in "[a-z][a-z0-9-]{0,15}",
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let backend = backend();
            let request = CreateKeyRequest::new(name.clone(), key_type.as_str());

            prop_assert!(backend.write_key(&request).await.unwrap().warnings.is_empty());
            let before = backend.read_key(&name, None).await.unwrap().unwrap();

            let response = backend.write_key(&request).await.unwrap();
            prop_assert_eq!(response.warnings, vec![format!("key {name} already existed")]);

            let after = backend.read_key(&name, None).await.unwrap().unwrap();
            prop_assert_eq!(before, after);
            Ok(())
        })?;
    }
}
