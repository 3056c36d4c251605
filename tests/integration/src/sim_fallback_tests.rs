//! Phone number fallback ordering across platform versions

use crate::test_utils::TestDevice;
use simbind_core::LEGACY_PROFILE_CUTOFF;
use simbind_identity::testing::ScriptedTelephony;
use simbind_identity::DefaultSimInfo;

fn telephony_without_declared_number() -> ScriptedTelephony {
    let telephony = ScriptedTelephony::new();
    telephony.add_subscription(7, 0, "8901", None, "Carrier A");
    telephony
}

fn phone_number(device: &TestDevice) -> String {
    device.module.get_sim_info(0).unwrap().phone_number
}

#[test]
fn test_declared_number_wins() {
    let telephony = ScriptedTelephony::single("8901", Some("+15550100"));
    telephony.set_carrier_number(Some("+15550200"));
    telephony.set_profile_numbers(vec!["+15550300"]);
    let device = TestDevice::builder()
        .telephony(telephony)
        .api_level(25)
        .build();

    assert_eq!(phone_number(&device), "+15550100");
    assert_eq!(device.telephony.profile_scan_count(), 0);
}

#[test]
fn test_carrier_lookup_before_profile_scan() {
    let telephony = telephony_without_declared_number();
    telephony.set_carrier_number(Some("+15550200"));
    telephony.set_profile_numbers(vec!["+15550300"]);
    let device = TestDevice::builder()
        .telephony(telephony)
        .api_level(25)
        .build();

    assert_eq!(phone_number(&device), "+15550200");
    assert_eq!(device.telephony.profile_scan_count(), 0);
}

#[test]
fn test_profile_scan_on_legacy_platform() {
    let telephony = telephony_without_declared_number();
    telephony.fail_carrier_lookup();
    telephony.set_profile_numbers(vec!["", "+15550300"]);
    let device = TestDevice::builder()
        .telephony(telephony)
        .api_level(LEGACY_PROFILE_CUTOFF - 1)
        .build();

    assert_eq!(phone_number(&device), "+15550300");
}

#[test]
fn test_no_carrier_lookup_before_scoped_api() {
    let telephony = telephony_without_declared_number();
    telephony.set_carrier_number(Some("+15550200"));
    telephony.set_profile_numbers(vec!["+15550300"]);
    let device = TestDevice::builder()
        .telephony(telephony)
        .api_level(23)
        .build();

    assert_eq!(phone_number(&device), "+15550300");
}

#[test]
fn test_no_profile_scan_from_cutoff() {
    let telephony = telephony_without_declared_number();
    telephony.set_profile_numbers(vec!["+15550300"]);
    let device = TestDevice::builder()
        .telephony(telephony)
        .api_level(LEGACY_PROFILE_CUTOFF)
        .build();

    let sim = device.module.get_sim_info(0).unwrap();
    assert_eq!(sim.phone_number, "");
    assert_eq!(sim.sim_id, "8901");
    assert_eq!(device.telephony.profile_scan_count(), 0);
}

#[test]
fn test_legacy_default_sim_path() {
    let telephony = ScriptedTelephony::new();
    telephony.set_default_sim(Some(DefaultSimInfo {
        sim_serial: "8901999".to_string(),
        line_number: None,
        operator_name: "Legacy Carrier".to_string(),
    }));
    telephony.set_profile_numbers(vec!["+15550300"]);
    let device = TestDevice::builder()
        .telephony(telephony)
        .api_level(21)
        .build();

    let sims = device.module.get_all_sims().unwrap();
    assert_eq!(sims.len(), 1);
    assert_eq!(sims[0].sim_id, "8901999");
    assert_eq!(sims[0].slot_index, 0);
    assert_eq!(sims[0].phone_number, "+15550300");
    assert_eq!(device.telephony.query_count(), 0);
}

#[test]
fn test_dual_sim_ordering_and_slot_fallback() {
    let telephony = ScriptedTelephony::new();
    telephony.add_subscription(2, 1, "8902", Some("+15550002"), "Carrier B");
    telephony.add_subscription(1, 0, "8901", Some("+15550001"), "Carrier A");
    let device = TestDevice::builder().telephony(telephony).build();

    let sims = device.module.get_all_sims().unwrap();
    let slots: Vec<i32> = sims.iter().map(|s| s.slot_index).collect();
    assert_eq!(slots, vec![0, 1]);

    assert_eq!(device.module.get_sim_info(1).unwrap().sim_id, "8902");
    // Empty slot resolves to the first SIM
    assert_eq!(device.module.get_sim_info(3).unwrap().sim_id, "8901");
}
