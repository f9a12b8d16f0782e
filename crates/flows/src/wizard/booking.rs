//! Booking an employee: service and date first, then address and contact.
//! Submit happens on the last step; the created reservation is handed to
//! the payment stage.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use client_core::{ClientError, MarketplaceApi};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Amount, EmployeeId, ServiceId},
    protocol::{ClientContact, Employee, Reservation, ReservationRequest},
};

use super::{merge, optional, trimmed, SubmissionSink, WizardError, WizardSchema};
use crate::{feedback::NoticeContext, validation::RequiredField};

/// Who is being booked and at what hourly rate. Fixed for the life of the
/// wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingContext {
    pub employee: Option<EmployeeId>,
    pub unit_price: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub service_id: String,
    pub start_date: String,
    /// Blank means one hour.
    pub duration_hours: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchedulePatch {
    pub service_id: Option<String>,
    pub start_date: Option<String>,
    pub duration_hours: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub address: String,
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactPatch {
    pub address: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingSections {
    pub context: BookingContext,
    pub schedule: Schedule,
    pub contact: Contact,
}

impl BookingSections {
    pub fn for_employee(employee: &Employee) -> Self {
        Self {
            context: BookingContext {
                employee: Some(employee.id.clone()),
                unit_price: employee.hourly_rate,
            },
            ..Self::default()
        }
    }

    /// Hourly rate times the requested duration.
    pub fn estimated_amount(&self) -> Result<Amount, WizardError> {
        Ok(self.context.unit_price * parse_duration(&self.schedule.duration_hours)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "section", content = "data", rename_all = "camelCase")]
pub enum BookingUpdate {
    Schedule(SchedulePatch),
    Contact(ContactPatch),
}

#[derive(Debug, Clone, Copy)]
pub struct Booking;

impl WizardSchema for Booking {
    type Sections = BookingSections;
    type Update = BookingUpdate;
    type Submission = ReservationRequest;
    type Receipt = Reservation;

    const NAME: &'static str = "booking";
    const TOTAL_STEPS: usize = 2;
    const HAS_CONFIRMATION: bool = false;

    fn required_fields(step: usize, sections: &BookingSections) -> Vec<RequiredField<'_>> {
        match step {
            0 => vec![
                RequiredField::new("serviceId", &sections.schedule.service_id),
                RequiredField::new("startDate", &sections.schedule.start_date),
            ],
            1 => vec![
                RequiredField::new("address", &sections.contact.address),
                RequiredField::new("name", &sections.contact.name),
                RequiredField::new("phone", &sections.contact.phone),
            ],
            _ => Vec::new(),
        }
    }

    fn apply(sections: &mut BookingSections, update: BookingUpdate) {
        match update {
            BookingUpdate::Schedule(patch) => {
                let target = &mut sections.schedule;
                merge(&mut target.service_id, patch.service_id);
                merge(&mut target.start_date, patch.start_date);
                merge(&mut target.duration_hours, patch.duration_hours);
                merge(&mut target.notes, patch.notes);
            }
            BookingUpdate::Contact(patch) => {
                let target = &mut sections.contact;
                merge(&mut target.address, patch.address);
                merge(&mut target.name, patch.name);
                merge(&mut target.phone, patch.phone);
                merge(&mut target.email, patch.email);
            }
        }
    }

    fn submission(sections: &BookingSections) -> Result<ReservationRequest, WizardError> {
        let schedule = &sections.schedule;
        let contact = &sections.contact;
        let duration_hours = parse_duration(&schedule.duration_hours)?;

        Ok(ReservationRequest {
            employee: sections.context.employee.clone(),
            service: optional(&schedule.service_id).map(ServiceId),
            start_date: parse_start_date(&schedule.start_date)?,
            duration_hours,
            address: trimmed(&contact.address),
            client: ClientContact {
                name: trimmed(&contact.name),
                phone: trimmed(&contact.phone),
                email: trimmed(&contact.email),
            },
            notes: optional(&schedule.notes),
            amount: sections.context.unit_price * duration_hours,
        })
    }

    fn notice_context() -> NoticeContext {
        NoticeContext::Booking
    }
}

fn parse_duration(raw: &str) -> Result<u32, WizardError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(1);
    }
    raw.parse::<u32>()
        .ok()
        .filter(|hours| *hours > 0)
        .ok_or_else(|| WizardError::InvalidField {
            field: "durationHours",
            reason: format!("'{raw}' is not a positive number of hours"),
        })
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM` / `YYYY-MM-DD HH:MM` read as UTC.
fn parse_start_date(raw: &str) -> Result<DateTime<Utc>, WizardError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| WizardError::InvalidField {
            field: "startDate",
            reason: format!("'{raw}' is not a date and time"),
        })
}

#[async_trait]
impl<T> SubmissionSink<Booking> for T
where
    T: MarketplaceApi + ?Sized,
{
    async fn deliver(&self, submission: &ReservationRequest) -> Result<Reservation, ClientError> {
        self.create_reservation(submission).await
    }
}
