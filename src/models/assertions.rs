//! Publisher assertions: jointly confirmed relationships between businesses.

use serde::{Deserialize, Serialize};

use super::KeyedReference;
use crate::{Error, Result};

/// A claimed relationship between two businesses, identified by the
/// (from, to, keyed reference) tuple. The relationship is visible to inquiry
/// only once the owners of both sides have confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherAssertion {
    pub from_key: String,
    pub to_key: String,
    pub keyed_reference: KeyedReference,
}

impl PublisherAssertion {
    pub fn new(
        from_key: impl Into<String>,
        to_key: impl Into<String>,
        keyed_reference: KeyedReference,
    ) -> Self {
        Self {
            from_key: from_key.into(),
            to_key: to_key.into(),
            keyed_reference,
        }
    }

    /// An assertion must name both businesses and carry a fully populated
    /// keyed reference, tModel key included.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.from_key.is_empty() || self.to_key.is_empty() {
            Some("missing business key")
        } else if self
            .keyed_reference
            .tmodel_key
            .as_deref()
            .unwrap_or_default()
            .is_empty()
        {
            Some("keyed reference is missing its tModel key")
        } else if self.keyed_reference.key_name.is_empty()
            || self.keyed_reference.key_value.is_empty()
        {
            Some("keyed reference is missing its name or value")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::MalformedAssertion {
                from_key: self.from_key.clone(),
                to_key: self.to_key.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Confirmation state of an assertion, derived from its two flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    /// Both owners have confirmed.
    Complete,
    /// The owner of the fromKey business has not confirmed.
    FromKeyIncomplete,
    /// The owner of the toKey business has not confirmed.
    ToKeyIncomplete,
}

impl CompletionStatus {
    /// Classify the two confirmation flags. Dead rows (both false) are pruned
    /// on delete and never observed here, but classify as from-incomplete.
    pub fn classify(from_check: bool, to_check: bool) -> Self {
        match (from_check, to_check) {
            (true, true) => CompletionStatus::Complete,
            (false, _) => CompletionStatus::FromKeyIncomplete,
            (true, false) => CompletionStatus::ToKeyIncomplete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Complete => "status:complete",
            CompletionStatus::FromKeyIncomplete => "status:fromKey_incomplete",
            CompletionStatus::ToKeyIncomplete => "status:toKey_incomplete",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "status:complete" => Some(CompletionStatus::Complete),
            "status:fromKey_incomplete" => Some(CompletionStatus::FromKeyIncomplete),
            "status:toKey_incomplete" => Some(CompletionStatus::ToKeyIncomplete),
            _ => None,
        }
    }
}

/// One assertion touching a publisher's businesses, with its derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionStatusItem {
    pub assertion: PublisherAssertion,
    pub status: CompletionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_all_flag_combinations() {
        assert_eq!(
            CompletionStatus::classify(true, true),
            CompletionStatus::Complete
        );
        assert_eq!(
            CompletionStatus::classify(false, true),
            CompletionStatus::FromKeyIncomplete
        );
        assert_eq!(
            CompletionStatus::classify(true, false),
            CompletionStatus::ToKeyIncomplete
        );
        assert_eq!(
            CompletionStatus::classify(false, false),
            CompletionStatus::FromKeyIncomplete
        );
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            CompletionStatus::Complete,
            CompletionStatus::FromKeyIncomplete,
            CompletionStatus::ToKeyIncomplete,
        ] {
            assert_eq!(CompletionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CompletionStatus::parse("status:bogus"), None);
    }

    #[test]
    fn assertion_without_tmodel_key_is_malformed() {
        let assertion = PublisherAssertion::new(
            "from",
            "to",
            KeyedReference::new("parent-child", "parent"),
        );
        assert!(assertion.validate().is_err());

        let assertion = PublisherAssertion::new(
            "from",
            "to",
            KeyedReference::new("parent-child", "parent")
                .with_tmodel("uuid:807a2c6a-ee22-470d-adc7-e0424a337c03"),
        );
        assert!(assertion.validate().is_ok());
    }

    #[test]
    fn assertion_without_keys_is_malformed() {
        let assertion = PublisherAssertion::new(
            "",
            "to",
            KeyedReference::new("n", "v").with_tmodel("uuid:relationships"),
        );
        assert!(assertion.validate().is_err());
    }
}
