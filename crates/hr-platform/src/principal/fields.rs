//! Principal input fields
//!
//! A single map of optional values serves both create and partial update.
//! Timestamps and ids are not part of it, so callers can never set them.

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use super::entity::{
    Address, Benefits, CeoProfile, DepartmentProfile, EmployeeProfile, ExecutiveDecision,
    HrManagerProfile, Principal, PrincipalKind, PrincipalProfile, PrincipalStatus,
    DEFAULT_HR_ROLE_LABEL,
};
use super::uniqueness::emails_equal;
use crate::auth::credential_service::PlainSecret;
use crate::details;
use crate::usecase::UseCaseError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalFields {
    #[serde(alias = "fullName")]
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phoneNumber", alias = "contact")]
    pub phone: Option<String>,
    pub password: Option<PlainSecret>,
    pub status: Option<PrincipalStatus>,

    // Employee
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub department_id: Option<String>,
    pub salary: Option<f64>,
    pub hire_date: Option<NaiveDate>,
    pub benefits: Option<Benefits>,
    pub address: Option<Address>,

    // CEO
    pub company_vision: Option<String>,
    pub board_meeting_schedule: Option<String>,
    pub executive_decisions: Option<Vec<ExecutiveDecision>>,

    // HR manager
    pub role_label: Option<String>,

    // Department
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Whether a write sets a new secret.
///
/// Hashing happens only for `Set`; every other write leaves the stored
/// hash untouched.
#[derive(Debug, Clone)]
pub enum SecretChange {
    Keep,
    Set(PlainSecret),
}

impl PrincipalFields {
    /// Detach the secret from the field map.
    pub fn take_secret_change(&mut self) -> SecretChange {
        match self.password.take() {
            Some(secret) => SecretChange::Set(secret),
            None => SecretChange::Keep,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.provided_fields().is_empty()
    }

    fn provided_fields(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut push = |present: bool, name: &'static str| {
            if present {
                names.push(name);
            }
        };
        push(self.name.is_some(), "name");
        push(self.username.is_some(), "username");
        push(self.email.is_some(), "email");
        push(self.phone.is_some(), "phone");
        push(self.password.is_some(), "password");
        push(self.status.is_some(), "status");
        push(self.first_name.is_some(), "firstName");
        push(self.last_name.is_some(), "lastName");
        push(self.job_title.is_some(), "jobTitle");
        push(self.department_id.is_some(), "departmentId");
        push(self.salary.is_some(), "salary");
        push(self.hire_date.is_some(), "hireDate");
        push(self.benefits.is_some(), "benefits");
        push(self.address.is_some(), "address");
        push(self.company_vision.is_some(), "companyVision");
        push(self.board_meeting_schedule.is_some(), "boardMeetingSchedule");
        push(self.executive_decisions.is_some(), "executiveDecisions");
        push(self.role_label.is_some(), "roleLabel");
        push(self.description.is_some(), "description");
        push(self.location.is_some(), "location");
        names
    }

    /// Fields given that belong to another variant.
    fn foreign_fields(&self, kind: PrincipalKind) -> Vec<&'static str> {
        let own: &[&str] = match kind {
            PrincipalKind::Employee => &[
                "firstName", "lastName", "jobTitle", "departmentId", "salary", "hireDate",
                "benefits", "address",
            ],
            PrincipalKind::Ceo => &["companyVision", "boardMeetingSchedule", "executiveDecisions"],
            PrincipalKind::HrManager => &["roleLabel"],
            PrincipalKind::Department => &["description", "location"],
        };
        const COMMON: &[&str] = &["name", "username", "email", "phone", "password", "status"];

        // An employee's name is always "first last".
        let derived_name = kind == PrincipalKind::Employee;

        self.provided_fields()
            .into_iter()
            .filter(|f| (derived_name && *f == "name") || (!COMMON.contains(f) && !own.contains(f)))
            .collect()
    }

    fn reject_foreign_fields(&self, kind: PrincipalKind) -> Result<(), UseCaseError> {
        let foreign = self.foreign_fields(kind);
        if foreign.is_empty() {
            return Ok(());
        }
        Err(UseCaseError::validation_with_details(
            "FIELD_NOT_APPLICABLE",
            format!("Fields not applicable to {}: {}", kind, foreign.join(", ")),
            details! { "fields" => foreign },
        ))
    }

    fn missing_for_create(&self, kind: PrincipalKind, secret_given: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut require = |value: bool, name: &'static str| {
            if !value {
                missing.push(name);
            }
        };

        if kind == PrincipalKind::Employee {
            require(present(&self.first_name), "firstName");
            require(present(&self.last_name), "lastName");
        } else {
            require(present(&self.name), "name");
        }
        if kind.requires_contact_identity() {
            require(present(&self.username), "username");
            require(present(&self.email), "email");
            require(present(&self.phone), "phone");
        }
        require(secret_given, "password");

        match kind {
            PrincipalKind::Employee => {
                require(present(&self.job_title), "jobTitle");
                require(self.salary.is_some(), "salary");
                require(self.hire_date.is_some(), "hireDate");
            }
            PrincipalKind::Ceo => require(present(&self.company_vision), "companyVision"),
            PrincipalKind::HrManager | PrincipalKind::Department => {}
        }
        missing
    }

    /// Build a new principal of `kind`. The secret must already have been
    /// detached with [`take_secret_change`](Self::take_secret_change).
    pub fn into_principal(
        self,
        kind: PrincipalKind,
        secret_given: bool,
    ) -> Result<Principal, UseCaseError> {
        self.reject_foreign_fields(kind)?;

        let missing = self.missing_for_create(kind, secret_given);
        if !missing.is_empty() {
            return Err(UseCaseError::validation_with_details(
                "MISSING_FIELDS",
                format!("Missing required fields: {}", missing.join(", ")),
                details! { "fields" => missing },
            ));
        }

        let profile = match kind {
            PrincipalKind::Employee => PrincipalProfile::Employee(EmployeeProfile {
                first_name: clean(&self.first_name).unwrap_or_default(),
                last_name: clean(&self.last_name).unwrap_or_default(),
                job_title: clean(&self.job_title).unwrap_or_default(),
                department_id: clean(&self.department_id),
                salary: self.salary.unwrap_or_default(),
                hire_date: self.hire_date.unwrap_or_default(),
                benefits: self.benefits.clone().unwrap_or_default(),
                address: self.address.clone().unwrap_or_default(),
            }),
            PrincipalKind::Ceo => PrincipalProfile::Ceo(CeoProfile {
                company_vision: clean(&self.company_vision).unwrap_or_default(),
                board_meeting_schedule: clean(&self.board_meeting_schedule),
                executive_decisions: self.executive_decisions.clone().unwrap_or_default(),
            }),
            PrincipalKind::HrManager => PrincipalProfile::HrManager(HrManagerProfile {
                role_label: clean(&self.role_label)
                    .unwrap_or_else(|| DEFAULT_HR_ROLE_LABEL.to_string()),
            }),
            PrincipalKind::Department => PrincipalProfile::Department(DepartmentProfile {
                description: clean(&self.description),
                location: clean(&self.location),
            }),
        };

        let name = match &profile {
            PrincipalProfile::Employee(e) => display_name(e),
            _ => clean(&self.name).unwrap_or_default(),
        };

        let mut principal = Principal::new(name, profile);
        principal.username = clean(&self.username);
        principal.email = clean(&self.email);
        principal.phone = clean(&self.phone);
        if let Some(status) = self.status {
            principal.status = status;
        }

        validate(&principal)?;
        Ok(principal)
    }

    /// Email and phone values in this update that differ from what
    /// `current` already holds. Unchanged values need no uniqueness check.
    pub fn changed_identity<'a>(&'a self, current: &Principal) -> (Option<&'a str>, Option<&'a str>) {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .filter(|e| !current.email.as_deref().is_some_and(|held| emails_equal(held, e)));
        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .filter(|p| current.phone.as_deref().map(str::trim) != Some(*p));
        (email, phone)
    }

    /// Partial merge onto an existing principal, then re-validation.
    ///
    /// Empty strings clear optional fields; clearing a required one fails
    /// validation.
    pub fn merge_into(self, principal: &mut Principal) -> Result<(), UseCaseError> {
        let kind = principal.kind();
        self.reject_foreign_fields(kind)?;

        if let Some(name) = &self.name {
            principal.name = name.trim().to_string();
        }
        if self.username.is_some() {
            principal.username = clean(&self.username);
        }
        if self.email.is_some() {
            principal.email = clean(&self.email);
        }
        if self.phone.is_some() {
            principal.phone = clean(&self.phone);
        }
        if let Some(status) = self.status {
            principal.status = status;
        }

        match &mut principal.profile {
            PrincipalProfile::Employee(e) => {
                assign(&mut e.first_name, &self.first_name);
                assign(&mut e.last_name, &self.last_name);
                assign(&mut e.job_title, &self.job_title);
                if self.department_id.is_some() {
                    e.department_id = clean(&self.department_id);
                }
                if let Some(salary) = self.salary {
                    e.salary = salary;
                }
                if let Some(hire_date) = self.hire_date {
                    e.hire_date = hire_date;
                }
                if let Some(benefits) = self.benefits {
                    e.benefits = benefits;
                }
                if let Some(address) = self.address {
                    e.address = address;
                }
                if self.first_name.is_some() || self.last_name.is_some() {
                    principal.name = display_name(e);
                }
            }
            PrincipalProfile::Ceo(c) => {
                assign(&mut c.company_vision, &self.company_vision);
                if self.board_meeting_schedule.is_some() {
                    c.board_meeting_schedule = clean(&self.board_meeting_schedule);
                }
                if let Some(decisions) = self.executive_decisions {
                    c.executive_decisions = decisions;
                }
            }
            PrincipalProfile::HrManager(h) => assign(&mut h.role_label, &self.role_label),
            PrincipalProfile::Department(d) => {
                if self.description.is_some() {
                    d.description = clean(&self.description);
                }
                if self.location.is_some() {
                    d.location = clean(&self.location);
                }
            }
        }

        validate(principal)?;
        principal.touch();
        Ok(())
    }
}

/// Variant constraints that must hold after every create and update.
pub fn validate(principal: &Principal) -> Result<(), UseCaseError> {
    let mut blank = Vec::new();
    if principal.name.trim().is_empty() {
        blank.push("name");
    }
    if principal.kind().requires_contact_identity() {
        if principal.username.is_none() {
            blank.push("username");
        }
        if principal.email.is_none() {
            blank.push("email");
        }
        if principal.phone.is_none() {
            blank.push("phone");
        }
    }
    match &principal.profile {
        PrincipalProfile::Employee(e) => {
            if e.first_name.trim().is_empty() {
                blank.push("firstName");
            }
            if e.last_name.trim().is_empty() {
                blank.push("lastName");
            }
            if e.job_title.trim().is_empty() {
                blank.push("jobTitle");
            }
        }
        PrincipalProfile::Ceo(c) if c.company_vision.trim().is_empty() => {
            blank.push("companyVision")
        }
        PrincipalProfile::HrManager(h) if h.role_label.trim().is_empty() => {
            blank.push("roleLabel")
        }
        _ => {}
    }
    if !blank.is_empty() {
        return Err(UseCaseError::validation_with_details(
            "MISSING_FIELDS",
            format!("Missing required fields: {}", blank.join(", ")),
            details! { "fields" => blank },
        ));
    }

    if let Some(email) = &principal.email {
        if !email_pattern().is_match(email) {
            return Err(UseCaseError::validation_with_details(
                "EMAIL_INVALID",
                "Please provide a valid email",
                details! { "field" => "email" },
            ));
        }
    }
    if let Some(phone) = &principal.phone {
        if !phone_pattern().is_match(phone) {
            return Err(UseCaseError::validation_with_details(
                "PHONE_INVALID",
                "Please provide a valid phone number",
                details! { "field" => "phone" },
            ));
        }
    }
    if let PrincipalProfile::Employee(e) = &principal.profile {
        if !e.salary.is_finite() || e.salary < 0.0 {
            return Err(UseCaseError::validation(
                "SALARY_INVALID",
                "Salary must be a non-negative number",
            ));
        }
    }
    if let PrincipalProfile::Ceo(c) = &principal.profile {
        if c.executive_decisions.iter().any(|d| d.decision_title.trim().is_empty()) {
            return Err(UseCaseError::validation(
                "DECISION_TITLE_REQUIRED",
                "Every executive decision needs a title",
            ));
        }
    }
    Ok(())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+?[0-9][0-9\s().-]*$").expect("phone pattern is valid")
    })
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn assign(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *target = v.trim().to_string();
    }
}

fn display_name(employee: &EmployeeProfile) -> String {
    format!("{} {}", employee.first_name, employee.last_name)
        .trim()
        .to_string()
}
