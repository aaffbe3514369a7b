// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prefixed identifier newtypes.
//!
//! Every generated id is `{prefix}{nanoid}` with a 19-character random
//! suffix, so the type of an id is visible in logs and in the WAL.

macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random id with the type prefix.
            pub fn generate() -> Self {
                Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(19)))
            }

            /// Wrap an existing string (parsing, WAL replay).
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id! {
    /// Identifier for a robot (the named automation program).
    RobotId, "rbt-"
}

define_id! {
    /// Identifier for one packaged version of a robot.
    VersionId, "ver-"
}

define_id! {
    /// Identifier for a single execution attempt.
    RunId, "run-"
}

define_id! {
    /// Identifier for a robot's cron schedule.
    ScheduleId, "sch-"
}

define_id! {
    /// Identifier for a robot's SLA rule.
    SlaRuleId, "sla-"
}

define_id! {
    /// Identifier for an alert event.
    AlertId, "alr-"
}

define_id! {
    /// Stable identifier for a worker process.
    WorkerId, "wkr-"
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
