// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain = { "1.0.0", true },
    zero = { "0.0.1", true },
    pre_release = { "2.1.0-beta.3", true },
    build_meta = { "1.0.0+sha.abc", true },
    two_parts = { "1.0", false },
    four_parts = { "1.0.0.0", false },
    alpha_core = { "1.a.0", false },
    empty = { "", false },
)]
fn semver_validation(input: &str, valid: bool) {
    assert_eq!(is_valid_semver(input), valid);
}

#[yare::parameterized(
    prod = { "prod", EnvName::Prod },
    upper = { "PROD", EnvName::Prod },
    padded = { " test ", EnvName::Test },
    hml = { "hml", EnvName::Hml },
)]
fn env_name_parses(input: &str, expected: EnvName) {
    assert_eq!(input.parse::<EnvName>().unwrap(), expected);
}

#[test]
fn env_name_rejects_unknown() {
    assert!("staging".parse::<EnvName>().is_err());
}

#[test]
fn enums_use_wire_casing() {
    assert_eq!(serde_json::to_string(&ArtifactKind::Zip).unwrap(), "\"ZIP\"");
    assert_eq!(serde_json::to_string(&EntrypointKind::Script).unwrap(), "\"SCRIPT\"");
    assert_eq!(serde_json::to_string(&ReleaseChannel::Hotfix).unwrap(), "\"hotfix\"");
    assert_eq!(EnvName::Hml.to_string(), "HML");
}
