//! Uniqueness Oracle
//!
//! Email and phone are unique across all four principal collections.
//! Email comparison ignores case; phone comparison is exact. A probe
//! runs inside the caller's transaction so the check and the write it
//! guards commit (or fail) together.

use async_trait::async_trait;

use super::entity::{Principal, PrincipalKind};
use crate::shared::error::Result;

/// One uniqueness question: does anyone else hold this email or phone?
#[derive(Debug, Clone, Copy, Default)]
pub struct UniquenessProbe<'a> {
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    /// Record being updated; skipped in its own collection
    pub exclude: Option<(PrincipalKind, &'a str)>,
}

impl<'a> UniquenessProbe<'a> {
    pub fn new(email: Option<&'a str>, phone: Option<&'a str>) -> Self {
        Self {
            email: email.filter(|e| !e.trim().is_empty()),
            phone: phone.filter(|p| !p.trim().is_empty()),
            exclude: None,
        }
    }

    /// Probe for every identity field of a principal about to be inserted.
    pub fn for_principal(principal: &'a Principal) -> Self {
        Self::new(principal.email.as_deref(), principal.phone.as_deref())
    }

    pub fn excluding(mut self, kind: PrincipalKind, id: &'a str) -> Self {
        self.exclude = Some((kind, id));
        self
    }

    /// Nothing to check: both clauses absent.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }

    /// Whether `candidate` holds the probed email or phone.
    pub fn matches(&self, candidate: &Principal) -> bool {
        if let Some((kind, id)) = self.exclude {
            if candidate.kind() == kind && candidate.id == id {
                return false;
            }
        }

        let email_hit = match (self.email, candidate.email.as_deref()) {
            (Some(probe), Some(held)) => emails_equal(probe, held),
            _ => false,
        };
        let phone_hit = match (self.phone, candidate.phone.as_deref()) {
            (Some(probe), Some(held)) => probe.trim() == held.trim(),
            _ => false,
        };

        email_hit || phone_hit
    }
}

/// Answers uniqueness probes against the data visible to a session.
#[async_trait]
pub trait UniquenessOracle {
    /// True when any principal in any collection conflicts with `probe`.
    /// Does not say which collection held the conflict.
    async fn exists_conflict(&mut self, probe: &UniquenessProbe<'_>) -> Result<bool>;
}

pub fn emails_equal(a: &str, b: &str) -> bool {
    normalize_email(a) == normalize_email(b)
}

/// Canonical form used for case-insensitive comparison and claim keys.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::entity::{DepartmentProfile, HrManagerProfile, PrincipalProfile};

    fn hr(email: &str, phone: &str) -> Principal {
        let mut p = Principal::new("Hana", PrincipalProfile::HrManager(HrManagerProfile::default()));
        p.email = Some(email.to_string());
        p.phone = Some(phone.to_string());
        p
    }

    #[test]
    fn test_email_match_ignores_case() {
        let held = hr("A@X.com", "111");
        assert!(UniquenessProbe::new(Some("a@x.COM"), None).matches(&held));
        assert!(!UniquenessProbe::new(Some("b@x.com"), None).matches(&held));
    }

    #[test]
    fn test_phone_match_exact() {
        let held = hr("a@x.com", "111");
        assert!(UniquenessProbe::new(None, Some("111")).matches(&held));
        assert!(!UniquenessProbe::new(None, Some("1111")).matches(&held));
    }

    #[test]
    fn test_absent_clauses_never_match() {
        let held = hr("a@x.com", "111");
        let probe = UniquenessProbe::new(None, None);
        assert!(probe.is_empty());
        assert!(!probe.matches(&held));

        let blank = UniquenessProbe::new(Some("  "), Some(""));
        assert!(blank.is_empty());
    }

    #[test]
    fn test_missing_held_fields_never_match() {
        let dept = Principal::new("Ops", PrincipalProfile::Department(DepartmentProfile::default()));
        assert!(!UniquenessProbe::new(Some("a@x.com"), Some("111")).matches(&dept));
    }

    #[test]
    fn test_exclusion_only_skips_self() {
        let held = hr("a@x.com", "111");
        let probe = UniquenessProbe::new(Some("a@x.com"), None);

        assert!(!probe.excluding(PrincipalKind::HrManager, &held.id).matches(&held));
        // Same id in a different collection is not the record being updated
        assert!(probe.excluding(PrincipalKind::Employee, &held.id).matches(&held));
        assert!(probe.excluding(PrincipalKind::HrManager, "other").matches(&held));
    }
}
