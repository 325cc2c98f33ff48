//! Running candidate key set for predicate narrowing.

/// The key set a predicate sequence is narrowing. `Unconstrained` means no
/// predicate has run yet; once a predicate produces a concrete set, every
/// later predicate restricts its query to that set, so narrowing is monotonic
/// by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSet {
    Unconstrained,
    Keys(Vec<String>),
}

impl CandidateSet {
    /// A concrete empty set: earlier predicates have proven no match exists,
    /// so later predicates short-circuit without touching the store.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, CandidateSet::Keys(keys) if keys.is_empty())
    }

    /// The concrete keys, if any predicate has run.
    pub fn keys(&self) -> Option<&[String]> {
        match self {
            CandidateSet::Unconstrained => None,
            CandidateSet::Keys(keys) => Some(keys),
        }
    }

    pub fn into_keys(self) -> Vec<String> {
        match self {
            CandidateSet::Unconstrained => Vec::new(),
            CandidateSet::Keys(keys) => keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_is_not_exhausted() {
        assert!(!CandidateSet::Unconstrained.is_exhausted());
        assert!(CandidateSet::Unconstrained.keys().is_none());
    }

    #[test]
    fn concrete_empty_set_is_exhausted() {
        assert!(CandidateSet::Keys(vec![]).is_exhausted());
        assert!(!CandidateSet::Keys(vec!["k".into()]).is_exhausted());
    }
}
