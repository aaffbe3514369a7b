// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert event application.

use super::FleetState;
use bf_core::Event;

pub(super) fn apply(state: &mut FleetState, event: &Event) {
    match event {
        Event::AlertOpened { alert } => {
            // At most one unresolved alert per (robot, type): a duplicate
            // open is dropped even if it carries a distinct id.
            if state.unresolved_alert(&alert.robot_id, alert.alert_type).is_some() {
                return;
            }
            state
                .alerts
                .entry(alert.id.as_str().to_string())
                .or_insert_with(|| alert.clone());
        }

        Event::AlertResolved { alert_id, at_ms } => {
            if let Some(alert) = state.alerts.get_mut(alert_id.as_str()) {
                if alert.resolved_at_ms.is_none() {
                    alert.resolved_at_ms = Some(*at_ms);
                }
            }
        }

        _ => {}
    }
}
