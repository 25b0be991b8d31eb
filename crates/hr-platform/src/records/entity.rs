//! HR Records
//!
//! Documents that point at an employee by id. The reference is weak:
//! deleting the employee leaves these records in place.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::tsid::TsidGenerator;
use crate::usecase::UseCaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub check_out_time: Option<DateTime<Utc>>,
}

impl Attendance {
    pub fn new(employee_id: impl Into<String>, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            id: TsidGenerator::generate(),
            employee_id: employee_id.into(),
            date,
            status,
            check_in_time: None,
            check_out_time: None,
        }
    }

    pub fn check_in(&mut self, at: DateTime<Utc>) -> Result<(), UseCaseError> {
        if self.status == AttendanceStatus::Absent {
            return Err(UseCaseError::validation(
                "ATTENDANCE_ABSENT",
                "Cannot check in on a day marked absent",
            ));
        }
        if self.check_in_time.is_some() {
            return Err(UseCaseError::validation(
                "ALREADY_CHECKED_IN",
                "Already checked in",
            ));
        }
        self.check_in_time = Some(at);
        Ok(())
    }

    pub fn check_out(&mut self, at: DateTime<Utc>) -> Result<(), UseCaseError> {
        match self.check_in_time {
            None => Err(UseCaseError::validation(
                "NOT_CHECKED_IN",
                "Cannot check out before checking in",
            )),
            Some(check_in) if at < check_in => Err(UseCaseError::validation(
                "CHECK_OUT_BEFORE_CHECK_IN",
                "Check-out time precedes check-in time",
            )),
            Some(_) => {
                self.check_out_time = Some(at);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Deductions {
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub insurance: f64,
}

impl Deductions {
    pub fn total(&self) -> f64 {
        self.tax + self.insurance
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_id: String,
    pub pay_period_start: NaiveDate,
    pub pay_period_end: NaiveDate,
    pub gross_salary: f64,
    pub deductions: Deductions,
    pub net_salary: f64,
}

impl Payroll {
    /// Net salary is always gross minus deductions.
    pub fn new(
        employee_id: impl Into<String>,
        pay_period_start: NaiveDate,
        pay_period_end: NaiveDate,
        gross_salary: f64,
        deductions: Deductions,
    ) -> Result<Self, UseCaseError> {
        if pay_period_end < pay_period_start {
            return Err(UseCaseError::validation(
                "PAY_PERIOD_INVALID",
                "Pay period ends before it starts",
            ));
        }
        if gross_salary < 0.0 || deductions.tax < 0.0 || deductions.insurance < 0.0 {
            return Err(UseCaseError::validation(
                "PAYROLL_NEGATIVE",
                "Salary and deductions must be non-negative",
            ));
        }
        let net_salary = gross_salary - deductions.total();
        if net_salary < 0.0 {
            return Err(UseCaseError::validation(
                "PAYROLL_NEGATIVE",
                "Deductions exceed gross salary",
            ));
        }

        Ok(Self {
            id: TsidGenerator::generate(),
            employee_id: employee_id.into(),
            pay_period_start,
            pay_period_end,
            gross_salary,
            deductions,
            net_salary,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyRequestStatus {
    #[default]
    Requested,
    Approved,
    Denied,
}

/// An employee's request for company property (laptop, badge, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProperty {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_id: String,
    pub property_type: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub request_date: DateTime<Utc>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub approval_date: Option<DateTime<Utc>>,
    pub status: PropertyRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

impl EmployeeProperty {
    pub fn request(
        employee_id: impl Into<String>,
        property_type: impl Into<String>,
    ) -> Result<Self, UseCaseError> {
        let property_type = property_type.into();
        if property_type.trim().is_empty() {
            return Err(UseCaseError::validation(
                "PROPERTY_TYPE_REQUIRED",
                "Property type is required",
            ));
        }
        Ok(Self {
            id: TsidGenerator::generate(),
            employee_id: employee_id.into(),
            property_type,
            request_date: Utc::now(),
            approval_date: None,
            status: PropertyRequestStatus::Requested,
            notes: None,
        })
    }

    pub fn approve(&mut self) -> Result<(), UseCaseError> {
        self.decide(PropertyRequestStatus::Approved)?;
        self.approval_date = Some(Utc::now());
        Ok(())
    }

    pub fn deny(&mut self, notes: Option<String>) -> Result<(), UseCaseError> {
        self.decide(PropertyRequestStatus::Denied)?;
        self.notes = notes;
        Ok(())
    }

    fn decide(&mut self, to: PropertyRequestStatus) -> Result<(), UseCaseError> {
        if self.status != PropertyRequestStatus::Requested {
            return Err(illegal_transition(self.status, to));
        }
        self.status = to;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPostingStatus {
    #[default]
    Open,
    Closed,
    Filled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingLocation {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub floor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub location: PostingLocation,
    pub posted_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub closing_date: Option<NaiveDate>,
    pub status: JobPostingStatus,
}

impl JobPosting {
    pub fn open(
        title: impl Into<String>,
        description: impl Into<String>,
        posted_date: NaiveDate,
    ) -> Result<Self, UseCaseError> {
        let title = title.into();
        let description = description.into();
        if title.trim().is_empty() || description.trim().is_empty() {
            return Err(UseCaseError::validation(
                "POSTING_FIELDS_REQUIRED",
                "A job posting needs a title and a description",
            ));
        }
        Ok(Self {
            id: TsidGenerator::generate(),
            title,
            description,
            requirements: Vec::new(),
            location: PostingLocation::default(),
            posted_date,
            closing_date: None,
            status: JobPostingStatus::Open,
        })
    }

    pub fn close(&mut self, on: NaiveDate) -> Result<(), UseCaseError> {
        self.finish(JobPostingStatus::Closed, on)
    }

    pub fn fill(&mut self, on: NaiveDate) -> Result<(), UseCaseError> {
        self.finish(JobPostingStatus::Filled, on)
    }

    fn finish(&mut self, to: JobPostingStatus, on: NaiveDate) -> Result<(), UseCaseError> {
        if self.status != JobPostingStatus::Open {
            return Err(illegal_transition(self.status, to));
        }
        if on < self.posted_date {
            return Err(UseCaseError::validation(
                "CLOSING_BEFORE_POSTING",
                "Closing date precedes the posting date",
            ));
        }
        self.status = to;
        self.closing_date = Some(on);
        Ok(())
    }
}

fn illegal_transition(from: impl std::fmt::Debug, to: impl std::fmt::Debug) -> UseCaseError {
    UseCaseError::validation(
        "ILLEGAL_STATUS_TRANSITION",
        format!("Cannot move from {:?} to {:?}", from, to),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_attendance_check_in_out() {
        let mut record = Attendance::new("emp-1", day(1), AttendanceStatus::Present);
        let now = Utc::now();

        assert!(record.check_out(now).is_err());
        record.check_in(now).unwrap();
        assert!(record.check_in(now).is_err());
        assert!(record.check_out(now - Duration::hours(1)).is_err());
        record.check_out(now + Duration::hours(8)).unwrap();
    }

    #[test]
    fn test_absent_day_has_no_check_in() {
        let mut record = Attendance::new("emp-1", day(1), AttendanceStatus::Absent);
        assert_eq!(
            record.check_in(Utc::now()).unwrap_err().code(),
            "ATTENDANCE_ABSENT"
        );
    }

    #[test]
    fn test_payroll_net_salary() {
        let payroll = Payroll::new(
            "emp-1",
            day(1),
            day(31),
            5000.0,
            Deductions {
                tax: 800.0,
                insurance: 200.0,
            },
        )
        .unwrap();
        assert_eq!(payroll.net_salary, 4000.0);

        let err = Payroll::new(
            "emp-1",
            day(1),
            day(31),
            100.0,
            Deductions {
                tax: 150.0,
                insurance: 0.0,
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "PAYROLL_NEGATIVE");

        assert!(Payroll::new("emp-1", day(31), day(1), 100.0, Deductions::default()).is_err());
    }

    #[test]
    fn test_property_request_lifecycle() {
        let mut request = EmployeeProperty::request("emp-1", "Laptop").unwrap();
        assert_eq!(request.status, PropertyRequestStatus::Requested);

        request.approve().unwrap();
        assert_eq!(request.status, PropertyRequestStatus::Approved);
        assert!(request.approval_date.is_some());

        let err = request.deny(None).unwrap_err();
        assert_eq!(err.code(), "ILLEGAL_STATUS_TRANSITION");
    }

    #[test]
    fn test_denied_request_keeps_notes() {
        let mut request = EmployeeProperty::request("emp-1", "Badge").unwrap();
        request.deny(Some("Already issued".to_string())).unwrap();
        assert_eq!(request.status, PropertyRequestStatus::Denied);
        assert!(request.approval_date.is_none());
        assert!(request.approve().is_err());
    }

    #[test]
    fn test_job_posting_transitions() {
        let mut posting = JobPosting::open("Engineer", "Builds things", day(1)).unwrap();
        assert!(posting.close(day(1) - Duration::days(1)).is_err());

        posting.fill(day(20)).unwrap();
        assert_eq!(posting.status, JobPostingStatus::Filled);
        assert_eq!(posting.closing_date, Some(day(20)));
        assert!(posting.close(day(21)).is_err());

        assert!(JobPosting::open(" ", "x", day(1)).is_err());
    }
}
