// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LATE alert lifecycle: open, dedupe, resolve.

use crate::harness::{Harness, HEARTBEAT_PREFIX, QUEUE};
use bf_core::{AlertSeverity, AlertType, SlaRule, SlaRuleId};
use bf_engine::{SlaMonitor, SlaMonitorConfig};
use bf_storage::{AlertFilter, AlertStatusFilter};
use std::time::{SystemTime, UNIX_EPOCH};

fn monitor(harness: &Harness) -> SlaMonitor<bf_core::SystemClock> {
    SlaMonitor::new(
        harness.store.clone(),
        harness.broker_arc(),
        harness.clock,
        SlaMonitorConfig {
            queue_name: QUEUE.to_string(),
            heartbeat_prefix: HEARTBEAT_PREFIX.to_string(),
            ..Default::default()
        },
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn late_alert_opens_once_and_resolves() {
    let harness = Harness::new();
    let (robot, _) = harness.robot_with_script("silent-bot", "exit 0\n");
    harness
        .store
        .create_sla_rule(SlaRule {
            id: SlaRuleId::generate(),
            robot_id: robot.id.clone(),
            expected_run_every_minutes: Some(1),
            expected_daily_time: None,
            late_after_minutes: 1,
            alert_on_failure: true,
            alert_on_late: true,
            created_at_ms: 0,
        })
        .unwrap();

    let monitor = monitor(&harness);

    // No run has ever been queued: the first tick opens the alert.
    let first = monitor.tick().await;
    assert_eq!(first.checked_rules, 1);
    assert_eq!(first.created_alerts, 1);

    let open = harness.store.list_alerts(
        &AlertFilter { status: Some(AlertStatusFilter::Open), ..Default::default() },
        10,
    );
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].alert_type, AlertType::Late);
    assert_eq!(open[0].severity, AlertSeverity::Warn);
    assert_eq!(open[0].robot_id, robot.id);
    assert!(open[0].resolved_at_ms.is_none());

    // Same condition on the second tick: no new row.
    let second = monitor.tick().await;
    assert_eq!(second.created_alerts, 0);
    assert_eq!(
        harness
            .store
            .list_alerts(&AlertFilter { alert_type: Some(AlertType::Late), ..Default::default() }, 10)
            .len(),
        1,
    );

    // Resolution stamps the row.
    let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64;
    let resolved = harness.store.resolve_alert(&open[0].id, now_ms).unwrap();
    assert_eq!(resolved.resolved_at_ms, Some(now_ms));

    let still_open = harness.store.list_alerts(
        &AlertFilter { status: Some(AlertStatusFilter::Open), ..Default::default() },
        10,
    );
    assert!(still_open.is_empty());
}
