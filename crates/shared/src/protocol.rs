use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        Amount, EmployeeId, EmployeeStatus, MobileOperator, PaymentId, PaymentMethod,
        ReservationId, ReservationStatus, ReviewId, Role, ServiceId, TicketId, TicketStatus,
        TransactionId, TransactionStatus, UserId,
    },
    error::{ApiError, ErrorCode},
};

/// Uniform response body of the marketplace API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Splits the envelope into its payload or an application error.
    /// `success: true` without `data` yields `Ok(None)`.
    pub fn into_result(self, status: u16) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError {
                code: ErrorCode::Rejected,
                status: Some(status),
                message: self.message.filter(|m| !m.trim().is_empty()),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// A person offering services. The API calls this resource "employers".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(alias = "_id")]
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    pub service: String,
    pub location: String,
    pub hourly_rate: Amount,
    pub status: EmployeeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(alias = "_id")]
    pub id: ServiceId,
    pub name: String,
    pub category: String,
    pub price: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInput {
    pub name: String,
    pub category: String,
    pub price: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    #[serde(rename = "employerId", default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeId>,
    #[serde(rename = "serviceId", default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceId>,
    pub start_date: DateTime<Utc>,
    pub duration_hours: u32,
    pub address: String,
    pub client: ClientContact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(alias = "_id")]
    pub id: ReservationId,
    #[serde(rename = "employerId", default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeId>,
    #[serde(rename = "serviceId", default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceId>,
    pub start_date: DateTime<Utc>,
    pub address: String,
    pub client: ClientContact,
    pub status: ReservationStatus,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate<S> {
    pub status: S,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(alias = "_id")]
    pub id: ReviewId,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    #[serde(rename = "employerId", default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeId>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    #[serde(rename = "employerId", default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeId>,
}

/// Method-specific payer details sent when processing a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentDetails {
    MobileMoney {
        phone: String,
        operator: MobileOperator,
    },
    Card {
        number: String,
        expiry: String,
        cvc: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        holder: Option<String>,
    },
    BankTransfer {
        account_holder: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::MobileMoney { .. } => PaymentMethod::MobileMoney,
            Self::Card { .. } => PaymentMethod::Card,
            Self::BankTransfer { .. } => PaymentMethod::BankTransfer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub reservation_id: ReservationId,
    pub amount: Amount,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(alias = "_id")]
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPaymentRequest {
    pub details: PaymentDetails,
}

/// Acknowledgement of a processed payment. A redirect link means the payer
/// must finish on the provider's page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAck {
    #[serde(alias = "_id")]
    pub payment_id: PaymentId,
    pub status: TransactionStatus,
    #[serde(
        default,
        alias = "paymentUrl",
        alias = "link",
        skip_serializing_if = "Option::is_none"
    )]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkRequest {
    pub reservation_id: ReservationId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    #[serde(alias = "link")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(alias = "_id")]
    pub id: TransactionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    #[serde(alias = "_id")]
    pub id: TicketId,
    pub subject: String,
    pub message: String,
    pub requester_email: String,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub service_type: String,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Amount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub household: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeeperRegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub service_category: String,
    pub years_of_experience: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_employer: Option<String>,
    pub id_document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criminal_record: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    #[serde(alias = "_id")]
    pub id: UserId,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_failure_with_2xx_is_rejected_error() {
        let envelope: ApiEnvelope<Employee> =
            serde_json::from_str(r#"{"success":false,"message":"Employé introuvable"}"#)
                .expect("parse");
        let err = envelope.into_result(200).expect_err("must be rejected");
        assert_eq!(err.code, ErrorCode::Rejected);
        assert_eq!(err.status, Some(200));
        assert_eq!(err.message.as_deref(), Some("Employé introuvable"));
    }

    fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> ApiEnvelope<T> {
        serde_json::from_str(raw).expect("parse envelope")
    }

    #[test]
    fn envelope_without_data_decodes_for_any_payload() {
        let envelope: ApiEnvelope<PaymentAck> = decode(r#"{"success":true}"#);
        assert!(envelope.data.is_none());
        assert!(envelope.into_result(200).expect("success").is_none());

        let envelope: ApiEnvelope<Vec<Employee>> = decode(r#"{"success":true,"data":[]}"#);
        assert_eq!(envelope.data, Some(Vec::new()));
    }

    #[test]
    fn employee_accepts_mongo_style_id() {
        let raw = r#"{
            "_id": "65f0c0ffee",
            "firstName": "Awa",
            "lastName": "Diop",
            "service": "housekeeper",
            "location": "Dakar",
            "hourlyRate": 2500,
            "status": "available"
        }"#;
        let employee: Employee = serde_json::from_str(raw).expect("parse employee");
        assert_eq!(employee.id, EmployeeId::new("65f0c0ffee"));
        assert_eq!(employee.hourly_rate, Amount(2500));
        assert_eq!(employee.full_name(), "Awa Diop");
    }

    #[test]
    fn payment_ack_reads_link_alias() {
        let ack: PaymentAck = serde_json::from_str(
            r#"{"paymentId":"p1","status":"pending","paymentUrl":"https://pay.example/p1"}"#,
        )
        .expect("parse ack");
        assert_eq!(ack.redirect_url.as_deref(), Some("https://pay.example/p1"));
    }

    #[test]
    fn reservation_request_uses_api_field_names() {
        let request = ReservationRequest {
            employee: Some(EmployeeId::new("e1")),
            service: None,
            start_date: DateTime::parse_from_rfc3339("2026-11-02T09:00:00Z")
                .expect("date")
                .with_timezone(&Utc),
            duration_hours: 3,
            address: "Plateau, Dakar".to_string(),
            client: ClientContact {
                name: "Awa Diop".to_string(),
                phone: "771234567".to_string(),
                email: "a@x.com".to_string(),
            },
            notes: None,
            amount: Amount(7500),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["employerId"], "e1");
        assert_eq!(value["durationHours"], 3);
        assert!(value.get("serviceId").is_none());
        assert!(value.get("notes").is_none());
    }
}
