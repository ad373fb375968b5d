use std::fmt;

use crate::types::EntityKind;

/// A partition of the cache, one per cached read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    FindById(EntityKind),
    FindAll(EntityKind),
    FindReleaseFlagByName,
    FindReleaseFlagsByName,
    FindReleaseFlagPilotByPilotExternalId,
    FindPilotsByFeatureFlag,
    FindPilotEntriesByExtId,
    FindReleaseAllowsByReleaseFlags,
    FindTokenBySha512Hex,
}

impl Namespace {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FindById(EntityKind::Flag) => "FindByID:Flag",
            Self::FindById(EntityKind::Pilot) => "FindByID:Pilot",
            Self::FindById(EntityKind::Allow) => "FindByID:Allow",
            Self::FindById(EntityKind::Token) => "FindByID:Token",
            Self::FindAll(EntityKind::Flag) => "FindAll:Flag",
            Self::FindAll(EntityKind::Pilot) => "FindAll:Pilot",
            Self::FindAll(EntityKind::Allow) => "FindAll:Allow",
            Self::FindAll(EntityKind::Token) => "FindAll:Token",
            Self::FindReleaseFlagByName => "FindReleaseFlagByName",
            Self::FindReleaseFlagsByName => "FindReleaseFlagsByName",
            Self::FindReleaseFlagPilotByPilotExternalId => "FindReleaseFlagPilotByPilotExternalID",
            Self::FindPilotsByFeatureFlag => "FindPilotsByFeatureFlag",
            Self::FindPilotEntriesByExtId => "FindPilotEntriesByExtID",
            Self::FindReleaseAllowsByReleaseFlags => "FindReleaseAllowsByReleaseFlags",
            Self::FindTokenBySha512Hex => "FindTokenBySHA512Hex",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Builds an order-independent key out of several parts.
///
/// Each part is length-prefixed, so parts containing the separator cannot
/// collide with a different split of the same text.
pub(crate) fn composite_key<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut parts: Vec<&str> = parts.into_iter().collect();
    parts.sort_unstable();
    parts
        .iter()
        .map(|part| format!("{}:{part}", part.len()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_distinct() {
        let mut namespaces = vec![
            Namespace::FindReleaseFlagByName,
            Namespace::FindReleaseFlagsByName,
            Namespace::FindReleaseFlagPilotByPilotExternalId,
            Namespace::FindPilotsByFeatureFlag,
            Namespace::FindPilotEntriesByExtId,
            Namespace::FindReleaseAllowsByReleaseFlags,
            Namespace::FindTokenBySha512Hex,
        ];
        for kind in EntityKind::ALL {
            namespaces.push(Namespace::FindById(kind));
            namespaces.push(Namespace::FindAll(kind));
        }

        let mut labels: Vec<&str> = namespaces.iter().map(|ns| ns.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), namespaces.len());
    }

    #[test]
    fn test_composite_key_ignores_order() {
        assert_eq!(composite_key(["b", "a"]), composite_key(["a", "b"]));
        assert_eq!(composite_key(["b", "a"]), "1:a,1:b");
        assert_eq!(composite_key([]), "");
    }

    #[test]
    fn test_composite_key_separator_in_part() {
        assert_ne!(composite_key(["a,b"]), composite_key(["a", "b"]));
        assert_ne!(composite_key(["1:a,1:b"]), composite_key(["a", "b"]));
        assert_ne!(composite_key([""]), composite_key([]));
    }
}
