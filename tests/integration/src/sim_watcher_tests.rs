//! SIM change listener behavior through the host facade

use crate::test_utils::{next_notice, settle, TestDevice};
use simbind_bridge::SimChangeNotice;
use simbind_core::SimNotification;
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn listen(device: &TestDevice) -> UnboundedReceiver<SimChangeNotice> {
    let (tx, rx) = mpsc::unbounded_channel();
    device
        .module
        .start_sim_change_listener(move |notice| {
            let _ = tx.send(notice);
        })
        .unwrap();
    rx
}

#[tokio::test]
async fn test_notification_storm_yields_one_notice() {
    let device = TestDevice::new();
    let mut rx = listen(&device);

    for _ in 0..25 {
        device
            .notifications
            .fire(SimNotification::SubscriptionsChanged);
    }

    let notice = next_notice(&mut rx).await.expect("one notice");
    assert!(!notice.sim_removed);
    settle().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(device.telephony.query_count(), 1);
}

#[tokio::test]
async fn test_burst_during_resolution_is_coalesced() {
    let device = TestDevice::new();
    let mut rx = listen(&device);

    let notifications = device.notifications.clone();
    device.telephony.on_next_query(move || {
        for _ in 0..5 {
            notifications.fire(SimNotification::SimStateChanged);
        }
    });

    device.notifications.fire(SimNotification::SimStateChanged);
    assert!(next_notice(&mut rx).await.is_some());
    settle().await;

    // One follow-up resolution for the whole burst, no duplicate notice
    assert_eq!(device.telephony.query_count(), 2);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_removal_notice_shape() {
    let device = TestDevice::new();
    let mut rx = listen(&device);

    device.telephony.clear_subscriptions();
    device.notifications.fire(SimNotification::SimStateChanged);

    let notice = next_notice(&mut rx).await.expect("removal notice");
    assert!(notice.sim_removed);
    let json = serde_json::to_value(&notice).unwrap();
    assert_eq!(json["simRemoved"], true);
    assert_eq!(json["slotIndex"], -1);
    assert_eq!(json["simIdHash"], "");
}

#[tokio::test]
async fn test_swap_cycle() {
    let device = TestDevice::new();
    let mut rx = listen(&device);

    device.telephony.clear_subscriptions();
    device.notifications.fire(SimNotification::SimStateChanged);
    assert!(next_notice(&mut rx).await.unwrap().sim_removed);

    device.telephony.swap_sim("8901000000000000002", None);
    device.notifications.fire(SimNotification::SimStateChanged);
    let inserted = next_notice(&mut rx).await.unwrap();
    assert!(!inserted.sim_removed);
    assert_eq!(inserted.sim.sim_id, "8901000000000000002");
}

#[tokio::test]
async fn test_stop_listener() {
    let device = TestDevice::new();
    let mut rx = listen(&device);

    device.module.stop_sim_change_listener();
    device.module.stop_sim_change_listener();

    assert!(!device.notifications.fire(SimNotification::SimStateChanged));
    settle().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_restart_replaces_listener() {
    let device = TestDevice::new();
    let mut first = listen(&device);
    let mut second = listen(&device);

    device.telephony.clear_subscriptions();
    device.notifications.fire(SimNotification::SimStateChanged);

    assert!(next_notice(&mut second).await.unwrap().sim_removed);
    settle().await;
    assert!(first.try_recv().is_err());
}
