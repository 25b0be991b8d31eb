//! Principal Entity
//!
//! One authenticable record: an HR manager, a CEO, a department or an
//! employee. Shared identity fields live on [`Principal`]; what differs
//! per variant lives in [`PrincipalProfile`].

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::tsid::TsidGenerator;

/// Principal variant. Each variant is stored in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalKind {
    HrManager,
    Ceo,
    Department,
    Employee,
}

impl PrincipalKind {
    /// Order in which login searches the collections.
    pub const LOGIN_PRECEDENCE: [PrincipalKind; 4] = [
        PrincipalKind::HrManager,
        PrincipalKind::Ceo,
        PrincipalKind::Department,
        PrincipalKind::Employee,
    ];

    pub const ALL: [PrincipalKind; 4] = Self::LOGIN_PRECEDENCE;

    pub fn collection_name(self) -> &'static str {
        match self {
            PrincipalKind::HrManager => "hrmanagers",
            PrincipalKind::Ceo => "ceos",
            PrincipalKind::Department => "departments",
            PrincipalKind::Employee => "employees",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PrincipalKind::HrManager => "HRManager",
            PrincipalKind::Ceo => "CEO",
            PrincipalKind::Department => "Department",
            PrincipalKind::Employee => "Employee",
        }
    }

    /// URL segment under `/api`.
    pub fn path_segment(self) -> &'static str {
        match self {
            PrincipalKind::HrManager => "hr-managers",
            PrincipalKind::Ceo => "ceos",
            PrincipalKind::Department => "departments",
            PrincipalKind::Employee => "employees",
        }
    }

    /// Variants allowed to administer other principals.
    pub fn is_administrative(self) -> bool {
        matches!(self, PrincipalKind::HrManager | PrincipalKind::Ceo)
    }

    /// Department identity fields are optional; everyone else needs them.
    pub fn requires_contact_identity(self) -> bool {
        !matches!(self, PrincipalKind::Department)
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrincipalStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Benefits {
    pub health_insurance: bool,
    pub retirement_plan: bool,
    pub other_benefits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveDecision {
    pub decision_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    /// Weak reference to a department principal; never validated or cascaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    pub salary: f64,
    pub hire_date: NaiveDate,
    #[serde(default)]
    pub benefits: Benefits,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeoProfile {
    pub company_vision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_meeting_schedule: Option<String>,
    #[serde(default)]
    pub executive_decisions: Vec<ExecutiveDecision>,
}

pub const DEFAULT_HR_ROLE_LABEL: &str = "HR Manager";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrManagerProfile {
    pub role_label: String,
}

impl Default for HrManagerProfile {
    fn default() -> Self {
        Self {
            role_label: DEFAULT_HR_ROLE_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Variant-specific attributes; the tag doubles as the principal kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    content = "attributes",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum PrincipalProfile {
    HrManager(HrManagerProfile),
    Ceo(CeoProfile),
    Department(DepartmentProfile),
    Employee(EmployeeProfile),
}

impl PrincipalProfile {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            PrincipalProfile::HrManager(_) => PrincipalKind::HrManager,
            PrincipalProfile::Ceo(_) => PrincipalKind::Ceo,
            PrincipalProfile::Department(_) => PrincipalKind::Department,
            PrincipalProfile::Employee(_) => PrincipalKind::Employee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "_id")]
    pub id: String,

    /// Full name, or the department name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,

    /// Phone number, or the department contact
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phone: Option<String>,

    /// Argon2id PHC string. Absent on default reads.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password_hash: Option<String>,

    #[serde(default)]
    pub status: PrincipalStatus,

    pub profile: PrincipalProfile,

    /// SHA-256 hex digest of an outstanding reset token
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reset_token_digest: Option<String>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub reset_token_expires_at: Option<DateTime<Utc>>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// New active principal with fresh id and timestamps.
    ///
    /// Field validation lives in [`PrincipalFields`](super::fields::PrincipalFields).
    pub(crate) fn new(name: impl Into<String>, profile: PrincipalProfile) -> Self {
        let now = Utc::now();
        Self {
            id: TsidGenerator::generate(),
            name: name.into(),
            username: None,
            email: None,
            phone: None,
            password_hash: None,
            status: PrincipalStatus::Active,
            profile,
            reset_token_digest: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        self.profile.kind()
    }

    pub fn is_active(&self) -> bool {
        self.status == PrincipalStatus::Active
    }

    pub fn secret_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    /// Replace the stored hash; any outstanding reset token dies with it.
    pub(crate) fn set_secret_hash(&mut self, hash: String) {
        self.password_hash = Some(hash);
        self.clear_reset_token();
        self.touch();
    }

    pub(crate) fn set_reset_token(&mut self, digest: String, expires_at: DateTime<Utc>) {
        self.reset_token_digest = Some(digest);
        self.reset_token_expires_at = Some(expires_at);
        self.touch();
    }

    pub(crate) fn clear_reset_token(&mut self) {
        self.reset_token_digest = None;
        self.reset_token_expires_at = None;
    }

    pub fn reset_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.reset_token_expires_at.map_or(true, |at| at <= now)
    }

    /// Copy without credential material, as returned by default reads.
    pub fn redacted(mut self) -> Self {
        self.password_hash = None;
        self.clear_reset_token();
        self
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// What a login attempt identifies itself with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Phone(String),
}

impl LoginIdentifier {
    /// Anything containing `@` is an email; other non-blank input is a phone.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.contains('@') {
            Some(LoginIdentifier::Email(trimmed.to_string()))
        } else {
            Some(LoginIdentifier::Phone(trimmed.to_string()))
        }
    }

    pub fn matches(&self, principal: &Principal) -> bool {
        match self {
            LoginIdentifier::Email(email) => principal
                .email
                .as_deref()
                .is_some_and(|e| super::uniqueness::emails_equal(e, email)),
            LoginIdentifier::Phone(phone) => principal.phone.as_deref() == Some(phone.as_str()),
        }
    }
}
