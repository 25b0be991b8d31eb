//! HR Records
//!
//! Attendance, payroll, property requests and job postings, with their
//! status transitions.

pub mod entity;

pub use entity::{
    Attendance, AttendanceStatus, Deductions, EmployeeProperty, JobPosting, JobPostingStatus,
    Payroll, PostingLocation, PropertyRequestStatus,
};
