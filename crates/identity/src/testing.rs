//! Scriptable fakes for every platform collaborator.
//!
//! Used by this crate's tests and, through the `testing` feature, by the
//! bridge and integration test suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use simbind_core::SimNotification;

use crate::error::PlatformError;
use crate::platform::{
    BuildProperties, DefaultSimInfo, DeviceInfoProvider, NotificationSink, SimNotificationSource,
    SubscriptionInfo, TelephonyProvider,
};
use crate::posture::RootProbe;

type QueryHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TelephonyState {
    subscriptions: Vec<SubscriptionInfo>,
    carrier_number: Option<String>,
    carrier_fails: bool,
    profile_numbers: Vec<String>,
    default_sim: Option<DefaultSimInfo>,
    permission_denied: bool,
    scripted_failures: VecDeque<PlatformError>,
    query_hook: Option<QueryHook>,
}

/// Telephony fake whose answers are set by the test.
#[derive(Default)]
pub struct ScriptedTelephony {
    state: Mutex<TelephonyState>,
    queries: AtomicUsize,
    profile_scans: AtomicUsize,
}

impl ScriptedTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    /// One SIM in slot 0.
    pub fn single(icc_id: &str, number: Option<&str>) -> Self {
        let telephony = Self::new();
        telephony.add_subscription(1, 0, icc_id, number, "Test Carrier");
        telephony
    }

    pub fn add_subscription(
        &self,
        subscription_id: i32,
        slot_index: i32,
        icc_id: &str,
        number: Option<&str>,
        carrier_name: &str,
    ) {
        self.lock().subscriptions.push(SubscriptionInfo {
            subscription_id,
            slot_index,
            icc_id: icc_id.to_string(),
            number: number.map(str::to_string),
            carrier_name: carrier_name.to_string(),
        });
    }

    /// Replace every subscription with a single SIM in slot 0.
    pub fn swap_sim(&self, icc_id: &str, number: Option<&str>) {
        self.clear_subscriptions();
        self.add_subscription(1, 0, icc_id, number, "Test Carrier");
    }

    /// Remove all SIMs.
    pub fn clear_subscriptions(&self) {
        self.lock().subscriptions.clear();
    }

    pub fn set_carrier_number(&self, number: Option<&str>) {
        self.lock().carrier_number = number.map(str::to_string);
    }

    pub fn fail_carrier_lookup(&self) {
        self.lock().carrier_fails = true;
    }

    pub fn set_profile_numbers(&self, numbers: Vec<&str>) {
        self.lock().profile_numbers = numbers.into_iter().map(str::to_string).collect();
    }

    pub fn set_default_sim(&self, info: Option<DefaultSimInfo>) {
        self.lock().default_sim = info;
    }

    /// Deny every SIM read from now on.
    pub fn deny_permission(&self) {
        self.lock().permission_denied = true;
    }

    pub fn grant_permission(&self) {
        self.lock().permission_denied = false;
    }

    /// Fail the next subscription query with `error`.
    pub fn fail_next_query(&self, error: PlatformError) {
        self.lock().scripted_failures.push_back(error);
    }

    /// Run `hook` during the next subscription query.
    pub fn on_next_query(&self, hook: impl FnOnce() + Send + 'static) {
        self.lock().query_hook = Some(Box::new(hook));
    }

    /// Number of subscription queries served.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of linked profile scans attempted.
    pub fn profile_scan_count(&self) -> usize {
        self.profile_scans.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TelephonyState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_permission(&self) -> Result<(), PlatformError> {
        if self.lock().permission_denied {
            Err(PlatformError::PermissionDenied(
                "READ_PHONE_STATE not granted".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl TelephonyProvider for ScriptedTelephony {
    fn active_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, PlatformError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let hook = self.lock().query_hook.take();
        if let Some(hook) = hook {
            hook();
        }
        if let Some(error) = self.lock().scripted_failures.pop_front() {
            return Err(error);
        }
        self.check_permission()?;
        Ok(self.lock().subscriptions.clone())
    }

    fn carrier_line_number(&self, _subscription_id: i32) -> Result<Option<String>, PlatformError> {
        self.check_permission()?;
        let state = self.lock();
        if state.carrier_fails {
            return Err(PlatformError::PermissionDenied(
                "READ_PRIVILEGED_PHONE_STATE not granted".to_string(),
            ));
        }
        Ok(state.carrier_number.clone())
    }

    fn profile_phone_numbers(&self) -> Result<Vec<String>, PlatformError> {
        self.profile_scans.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().profile_numbers.clone())
    }

    fn default_sim(&self) -> Result<Option<DefaultSimInfo>, PlatformError> {
        self.check_permission()?;
        Ok(self.lock().default_sim.clone())
    }
}

/// Device info fake.
#[derive(Debug, Default)]
pub struct StaticDeviceInfo {
    device_id: Mutex<Option<String>>,
    api_level: u32,
    build: BuildProperties,
}

impl StaticDeviceInfo {
    /// Physical handset build on the given API level.
    pub fn new(device_id: Option<&str>, api_level: u32) -> Self {
        Self {
            device_id: Mutex::new(device_id.map(str::to_string)),
            api_level,
            build: BuildProperties {
                device: "husky".to_string(),
                manufacturer: "Google".to_string(),
                hardware: "husky".to_string(),
                product: "husky".to_string(),
                model: "Pixel 8 Pro".to_string(),
                brand: "google".to_string(),
                fingerprint: "google/husky/husky:14/UD1A.230803.041/10808477:user/release-keys"
                    .to_string(),
                tags: "release-keys".to_string(),
            },
        }
    }

    #[must_use]
    pub fn with_build(mut self, build: BuildProperties) -> Self {
        self.build = build;
        self
    }

    pub fn set_device_id(&self, device_id: Option<&str>) {
        if let Ok(mut id) = self.device_id.lock() {
            *id = device_id.map(str::to_string);
        }
    }
}

impl DeviceInfoProvider for StaticDeviceInfo {
    fn device_id(&self) -> Option<String> {
        self.device_id.lock().ok().and_then(|id| id.clone())
    }

    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn build_properties(&self) -> BuildProperties {
        self.build.clone()
    }
}

/// Root probe fake answering from fixed lists.
#[derive(Debug, Default)]
pub struct StaticRootProbe {
    pub existing_paths: Vec<String>,
    pub su_on_path: bool,
    pub fail_io: bool,
}

impl RootProbe for StaticRootProbe {
    fn path_exists(&self, path: &str) -> std::io::Result<bool> {
        if self.fail_io {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "stat denied",
            ));
        }
        Ok(self.existing_paths.iter().any(|p| p == path))
    }

    fn shell_which(&self, _binary: &str) -> std::io::Result<bool> {
        if self.fail_io {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no shell",
            ));
        }
        Ok(self.su_on_path)
    }
}

/// Notification source the test fires by hand.
#[derive(Debug, Default)]
pub struct ManualNotificationSource {
    sink: Mutex<Option<NotificationSink>>,
    registered: Mutex<Vec<SimNotification>>,
    unregistered: AtomicBool,
    refuse: AtomicBool,
}

impl ManualNotificationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next registration fail.
    pub fn refuse_registration(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    /// Deliver a notification; `false` if nothing is registered.
    pub fn fire(&self, notification: SimNotification) -> bool {
        match self.sink.lock().ok().and_then(|sink| sink.clone()) {
            Some(sink) => sink.notify(notification),
            None => false,
        }
    }

    /// Notifications requested at registration.
    pub fn registered(&self) -> Vec<SimNotification> {
        self.registered.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn is_unregistered(&self) -> bool {
        self.unregistered.load(Ordering::SeqCst)
    }
}

impl SimNotificationSource for ManualNotificationSource {
    fn register(
        &self,
        notifications: &[SimNotification],
        sink: NotificationSink,
    ) -> Result<(), PlatformError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable(
                "receiver registration rejected".to_string(),
            ));
        }
        if let Ok(mut registered) = self.registered.lock() {
            *registered = notifications.to_vec();
        }
        if let Ok(mut slot) = self.sink.lock() {
            *slot = Some(sink);
        }
        Ok(())
    }

    fn unregister(&self) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = None;
        }
        self.unregistered.store(true, Ordering::SeqCst);
    }
}
