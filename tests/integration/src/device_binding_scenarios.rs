//! Device binding scenarios through the host facade

use crate::test_utils::{verify_b64, TestDevice};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use simbind_bridge::ErrorCode;
use simbind_core::hash_str;
use simbind_crypto::SecurityLevel;
use simbind_identity::testing::{ScriptedTelephony, StaticRootProbe};
use simbind_identity::{compose_fingerprint, HardwareClass, KeyValueStore};

#[test]
fn test_fresh_install_without_sim_permission() {
    let device = TestDevice::new();
    device.telephony.deny_permission();

    let sims = device.module.get_all_sims().unwrap_err();
    assert_eq!(sims.code, ErrorCode::PermissionDenied);
    assert!(!sims.retryable);

    let fingerprint = device.module.get_device_fingerprint().unwrap_err();
    assert_eq!(fingerprint.code, ErrorCode::FingerprintFailed);
    assert!(fingerprint.message.contains("permission"));
    assert!(!fingerprint.retryable);

    // Key binding does not depend on SIM access
    let key = device.module.initialize_keystore();
    assert!(key.success);

    device.telephony.grant_permission();
    assert!(device.module.get_device_fingerprint().is_ok());
}

#[test]
fn test_key_store_unavailable_on_first_run() {
    let device = TestDevice::new();
    device.key_store.set_generation_available(false);

    let key = device.module.initialize_keystore();
    assert!(!key.success);
    assert_eq!(key.public_key, "");

    let err = device
        .module
        .sign_challenge(&STANDARD.encode(b"challenge"))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::KeyNotFound);
    assert!(!err.retryable);
}

#[test]
fn test_key_store_outage_is_retryable() {
    let device = TestDevice::new();
    assert!(device.module.initialize_keystore().success);

    device.key_store.set_available(false);
    let err = device
        .module
        .sign_challenge(&STANDARD.encode(b"challenge"))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::KeystoreUnavailable);
    assert!(err.retryable);

    device.key_store.set_available(true);
    assert!(device
        .module
        .sign_challenge(&STANDARD.encode(b"challenge"))
        .is_ok());
}

#[test]
fn test_initialize_keystore_twice_keeps_key() {
    let device = TestDevice::new();
    let first = device.module.initialize_keystore();
    let second = device.module.initialize_keystore();

    assert!(first.success && second.success);
    assert_eq!(first.public_key, second.public_key);
    assert_eq!(device.key_store.key_count(), 1);
}

#[test]
fn test_challenge_round_trip() {
    let device = TestDevice::new();
    let key = device.module.initialize_keystore();

    for challenge in [&b"server-nonce-1"[..], &[0u8; 32][..], &[0xFF; 7][..]] {
        let signature = device
            .module
            .sign_challenge(&STANDARD.encode(challenge))
            .unwrap();
        assert!(verify_b64(&key.public_key, challenge, &signature));
    }
}

#[test]
fn test_signature_covers_decoded_challenge() {
    let device = TestDevice::new();
    let key = device.module.initialize_keystore();

    let raw = b"\x01\x02binary challenge\xfe";
    let encoded = STANDARD.encode(raw);
    let signature = device.module.sign_challenge(&encoded).unwrap();

    assert!(verify_b64(&key.public_key, raw, &signature));
    assert!(!verify_b64(&key.public_key, encoded.as_bytes(), &signature));
}

#[test]
fn test_invalid_challenge() {
    let device = TestDevice::new();
    device.module.initialize_keystore();
    let err = device.module.sign_challenge("%%%").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidChallenge);
}

#[test]
fn test_fingerprint_binding() {
    let device = TestDevice::new();
    let first = device.module.get_device_fingerprint().unwrap();
    assert_eq!(first, device.module.get_device_fingerprint().unwrap());

    let stored = device
        .storage
        .get("simbind.install_id")
        .unwrap()
        .expect("install id persisted");
    assert_eq!(stored, first.install_id);
    assert_eq!(first.device_id_hash, hash_str("a1b2c3d4e5f60789"));
    assert_eq!(
        first.fingerprint,
        compose_fingerprint(
            "a1b2c3d4e5f60789",
            &hash_str("89014103211118510720"),
            &first.install_id
        )
    );

    // Phone number is not part of the binding
    device
        .telephony
        .swap_sim("89014103211118510720", Some("+15559999"));
    assert_eq!(
        device.module.get_device_fingerprint().unwrap().fingerprint,
        first.fingerprint
    );

    // SIM identity is
    device.telephony.swap_sim("89014103211118510721", None);
    assert_ne!(
        device.module.get_device_fingerprint().unwrap().fingerprint,
        first.fingerprint
    );
}

#[test]
fn test_fingerprint_without_device_id() {
    let device = TestDevice::builder().device_id(None).build();
    let fingerprint = device.module.get_device_fingerprint().unwrap();
    assert_eq!(fingerprint.device_id, "");
    assert_eq!(fingerprint.fingerprint.len(), 64);
}

#[test]
fn test_fingerprint_without_sim() {
    let device = TestDevice::builder()
        .telephony(ScriptedTelephony::new())
        .build();
    let err = device.module.get_device_fingerprint().unwrap_err();
    assert_eq!(err.code, ErrorCode::FingerprintFailed);
    assert!(err.retryable);
}

#[test]
fn test_security_info_on_strongbox_device() {
    let device = TestDevice::builder()
        .security_level(SecurityLevel::StrongBox)
        .build();
    device.module.initialize_keystore();

    let info = device.module.get_security_info();
    assert_eq!(info.key_hardware_class, HardwareClass::StrongBox);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["keyHardwareClass"], "STRONGBOX");
    assert_eq!(json["bootState"], "VERIFIED");
    assert_eq!(json["rooted"], false);
}

#[test]
fn test_security_info_on_rooted_device() {
    let device = TestDevice::builder()
        .root_probe(StaticRootProbe {
            existing_paths: vec!["/sbin/su".to_string()],
            ..Default::default()
        })
        .build();

    assert!(device.module.is_rooted());
    let json = serde_json::to_value(device.module.get_security_info()).unwrap();
    assert_eq!(json["rooted"], true);
    assert_eq!(json["bootState"], "UNVERIFIED");
    assert_eq!(json["keyHardwareClass"], "UNKNOWN");
}

#[test]
fn test_posture_degrades_when_probes_fail() {
    let device = TestDevice::builder()
        .root_probe(StaticRootProbe {
            fail_io: true,
            ..Default::default()
        })
        .build();

    assert!(!device.module.is_rooted());
    assert!(!device.module.is_emulator());
}
