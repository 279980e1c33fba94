// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

use std::env;
use std::ffi::OsStr;

/// Retrieves a boolean value from the given environment variable.
///
/// The following string values are considered true: `true`, `yes` or `1` (case-insensitive).
///
/// Returns `false` if the variable is not defined or contains an invalid value.
pub fn bool_from_env<K: AsRef<OsStr>>(key: K) -> bool {
    env::var(key)
        .map(|v| bool_from_str(&v))
        .unwrap_or_default()
}

fn bool_from_str(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case(" yes ", true)]
    #[case("1", true)]
    #[case("false", false)]
    #[case("0", false)]
    #[case("", false)]
    #[case("enabled", false)]
    fn parse_bool_values(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(expected, bool_from_str(value));
    }

    #[test]
    fn undefined_variable_is_false() {
        assert!(!bool_from_env("N8N_TEST_VARIABLE_THAT_IS_NEVER_SET"));
    }
}
