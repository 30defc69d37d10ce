//! Registry identifier parsing.
//!
//! A registry identifier is a string of the form
//! `{12-digit account id}.dkr.ecr.{region}.amazonaws.com`. It is used,
//! unmodified, as a namespace label key, as the suffix of the AWS
//! credentials secret name in the host namespace, and as the pull secret
//! name in each target namespace — the round-trip invariant the reconciler
//! depends on.

use std::sync::LazyLock;

use regex::Regex;

/// Tightened form of the pattern (spec note: the original implementation
/// used a looser `.+` for the region; either is acceptable as long as the
/// same string is reused everywhere).
static REGISTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<account_id>\d{12})\.dkr\.ecr\.(?P<region>[a-z]{2}-[a-z]+-\d+)\.amazonaws\.com$")
        .expect("registry identifier pattern is a fixed, valid regex")
});

/// The parsed components of a registry identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryId<'a> {
    pub identifier: &'a str,
    pub account_id: &'a str,
    pub region: &'a str,
}

/// Returns `true` if `label_key` is shaped like a registry identifier.
pub fn is_registry_label(label_key: &str) -> bool {
    REGISTRY_PATTERN.is_match(label_key)
}

/// Parses `identifier` into its account id and region, or `None` if it does
/// not match the registry identifier pattern.
pub fn parse(identifier: &str) -> Option<RegistryId<'_>> {
    let captures = REGISTRY_PATTERN.captures(identifier)?;
    Some(RegistryId {
        identifier,
        account_id: captures.name("account_id")?.as_str(),
        region: captures.name("region")?.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_well_formed_identifier() {
        let id = parse("123456789012.dkr.ecr.eu-west-1.amazonaws.com").unwrap();
        assert_eq!(id.account_id, "123456789012");
        assert_eq!(id.region, "eu-west-1");
    }

    #[test]
    fn rejects_short_account_id() {
        assert!(!is_registry_label("12345.dkr.ecr.eu-west-1.amazonaws.com"));
    }

    #[test]
    fn rejects_non_registry_label() {
        assert!(!is_registry_label("kubernetes.io/metadata.name"));
    }

    #[test]
    fn round_trip_is_the_same_string_everywhere() {
        // The label key, the credentials-secret suffix, and the pull-secret
        // name are all meant to be this exact string.
        let label_key = "444456781111.dkr.ecr.ap-southeast-2.amazonaws.com";
        let id = parse(label_key).unwrap();
        assert_eq!(id.identifier, label_key);
        let credentials_secret_name = format!("eatr-aws-credentials-{label_key}");
        assert!(credentials_secret_name.ends_with(label_key));
        let pull_secret_name = label_key;
        assert_eq!(pull_secret_name, label_key);
    }
}
