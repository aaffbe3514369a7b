// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot, version, schedule, and SLA-rule event application.

use super::FleetState;
use bf_core::Event;

pub(super) fn apply(state: &mut FleetState, event: &Event) {
    match event {
        Event::RobotRegistered { robot } => {
            state
                .robots
                .entry(robot.id.as_str().to_string())
                .or_insert_with(|| robot.clone());
        }

        Event::VersionAdded { version } => {
            if version.is_active {
                deactivate_robot_versions(state, version.robot_id.as_str());
            }
            state
                .versions
                .entry(version.id.as_str().to_string())
                .or_insert_with(|| version.clone());
        }

        Event::VersionActivated { robot_id, version_id } => {
            deactivate_robot_versions(state, robot_id.as_str());
            if let Some(version) = state.versions.get_mut(version_id.as_str()) {
                version.is_active = true;
            }
        }

        Event::ScheduleUpserted { schedule } => {
            // One schedule per robot: drop any prior schedule with a
            // different id before inserting.
            state
                .schedules
                .retain(|id, s| s.robot_id != schedule.robot_id || *id == schedule.id.as_str());
            state
                .schedules
                .insert(schedule.id.as_str().to_string(), schedule.clone());
        }

        Event::ScheduleDeleted { robot_id } => {
            state.schedules.retain(|_, s| &s.robot_id != robot_id);
        }

        Event::SlaRuleUpserted { rule } => {
            state
                .sla_rules
                .retain(|id, r| r.robot_id != rule.robot_id || *id == rule.id.as_str());
            state.sla_rules.insert(rule.id.as_str().to_string(), rule.clone());
        }

        _ => {}
    }
}

fn deactivate_robot_versions(state: &mut FleetState, robot_id: &str) {
    for version in state.versions.values_mut() {
        if version.robot_id.as_str() == robot_id {
            version.is_active = false;
        }
    }
}
