//! Single-form payment for a created reservation.
//!
//! `Idle -> Processing -> {Success | Redirected | Error}`, and `Error -> Idle`
//! on an explicit retry. The reservation id and amount never change, so a
//! failed attempt can be resubmitted without going back through booking.

use async_trait::async_trait;
use client_core::{ClientError, MarketplaceApi};
use crossbeam_channel::Receiver;
use serde::Deserialize;
use shared::{
    domain::{Amount, MobileOperator, PaymentId, PaymentMethod, ReservationId, TransactionStatus},
    protocol::{CreatePaymentRequest, PaymentAck, PaymentDetails},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    events::{EventHub, PaymentEvent},
    feedback::{Notice, NoticeCategory, NoticeContext},
    validation::{is_present, RequiredField},
};

pub const DECLINED_MESSAGE: &str = "The payment was declined; try another method.";

/// What the payer typed. Only the fields of the selected method matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentForm {
    pub method: Option<PaymentMethod>,
    pub phone: String,
    pub operator: MobileOperator,
    pub card_number: String,
    pub card_expiry: String,
    pub card_cvc: String,
    pub card_holder: String,
    pub account_holder: String,
    pub reference: String,
}

impl PaymentForm {
    pub fn mobile_money(phone: impl Into<String>, operator: MobileOperator) -> Self {
        Self {
            method: Some(PaymentMethod::MobileMoney),
            phone: phone.into(),
            operator,
            ..Self::default()
        }
    }

    pub fn card(
        number: impl Into<String>,
        expiry: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            method: Some(PaymentMethod::Card),
            card_number: number.into(),
            card_expiry: expiry.into(),
            card_cvc: cvc.into(),
            ..Self::default()
        }
    }

    pub fn bank_transfer(account_holder: impl Into<String>) -> Self {
        Self {
            method: Some(PaymentMethod::BankTransfer),
            account_holder: account_holder.into(),
            ..Self::default()
        }
    }

    fn required_fields(&self, method: PaymentMethod) -> Vec<RequiredField<'_>> {
        match method {
            PaymentMethod::MobileMoney => vec![RequiredField::new("phone", &self.phone)],
            PaymentMethod::Card => vec![
                RequiredField::new("cardNumber", &self.card_number),
                RequiredField::new("cardExpiry", &self.card_expiry),
                RequiredField::new("cardCvc", &self.card_cvc),
            ],
            PaymentMethod::BankTransfer => {
                vec![RequiredField::new("accountHolder", &self.account_holder)]
            }
        }
    }

    /// Validates the selected method's fields and builds the payer details.
    pub fn details(&self) -> Result<PaymentDetails, PaymentError> {
        let method = self.method.ok_or(PaymentError::MissingMethod)?;
        let missing: Vec<&'static str> = self
            .required_fields(method)
            .into_iter()
            .filter(|field| !field.is_present())
            .map(|field| field.name)
            .collect();
        if !missing.is_empty() {
            return Err(PaymentError::MissingFields { method, missing });
        }

        let optional = |value: &str| is_present(value).then(|| value.trim().to_string());
        Ok(match method {
            PaymentMethod::MobileMoney => PaymentDetails::MobileMoney {
                phone: self.phone.trim().to_string(),
                operator: self.operator,
            },
            PaymentMethod::Card => PaymentDetails::Card {
                number: self.card_number.chars().filter(|c| !c.is_whitespace()).collect(),
                expiry: self.card_expiry.trim().to_string(),
                cvc: self.card_cvc.trim().to_string(),
                holder: optional(&self.card_holder),
            },
            PaymentMethod::BankTransfer => PaymentDetails::BankTransfer {
                account_holder: self.account_holder.trim().to_string(),
                reference: optional(&self.reference),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Idle,
    Processing,
    Success { payment_id: PaymentId },
    /// The payer must finish on the provider's page.
    Redirected { url: String },
    Error { notice: Notice },
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Redirected { .. })
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("no payment method selected")]
    MissingMethod,
    #[error("{} payment is missing: {}", .method.as_str(), .missing.join(", "))]
    MissingFields {
        method: PaymentMethod,
        missing: Vec<&'static str>,
    },
    #[error("a payment can only start from the idle state")]
    NotIdle,
    #[error("no payment is being processed")]
    NotProcessing,
    #[error("retry is only possible after a failed payment")]
    NotInError,
}

impl PaymentError {
    pub fn notice(&self) -> Notice {
        match self {
            Self::MissingFields { missing, .. } => {
                Notice::missing_fields(NoticeContext::Payment, missing)
            }
            other => Notice::new(
                NoticeCategory::Validation,
                NoticeContext::Payment,
                other.to_string(),
            ),
        }
    }
}

/// Everything the gateway needs to create and process one payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSubmission {
    pub request: CreatePaymentRequest,
    pub details: PaymentDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid { payment_id: PaymentId },
    Redirect { url: String },
    Failed { notice: Notice },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn settle(&self, submission: &PaymentSubmission) -> Result<PaymentAck, ClientError>;
}

#[async_trait]
impl<T> PaymentGateway for T
where
    T: MarketplaceApi + ?Sized,
{
    async fn settle(&self, submission: &PaymentSubmission) -> Result<PaymentAck, ClientError> {
        let payment = self.create_payment(&submission.request).await?;
        debug!(payment_id = %payment.id, "payment created");
        self.process_payment(&payment.id, &submission.details).await
    }
}

#[derive(Debug)]
pub struct PaymentController {
    reservation_id: ReservationId,
    amount: Amount,
    method: Option<PaymentMethod>,
    status: PaymentStatus,
    events: EventHub<PaymentEvent>,
}

impl PaymentController {
    pub fn new(reservation_id: ReservationId, amount: Amount) -> Self {
        Self {
            reservation_id,
            amount,
            method: None,
            status: PaymentStatus::Idle,
            events: EventHub::default(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PaymentEvent> {
        self.events.subscribe()
    }

    pub fn reservation_id(&self) -> &ReservationId {
        &self.reservation_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Method of the last attempt that reached `Processing`.
    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn status(&self) -> &PaymentStatus {
        &self.status
    }

    pub fn is_processing(&self) -> bool {
        self.status == PaymentStatus::Processing
    }

    /// `Idle -> Processing`. An incomplete form leaves the controller idle.
    pub fn begin(&mut self, form: &PaymentForm) -> Result<PaymentSubmission, PaymentError> {
        if self.status != PaymentStatus::Idle {
            return Err(PaymentError::NotIdle);
        }
        let details = form.details()?;
        let method = details.method();
        self.method = Some(method);
        self.status = PaymentStatus::Processing;
        info!(
            reservation_id = %self.reservation_id,
            amount = self.amount.francs(),
            method = method.as_str(),
            "processing payment"
        );
        self.events.emit(PaymentEvent::Processing);
        Ok(PaymentSubmission {
            request: CreatePaymentRequest {
                reservation_id: self.reservation_id.clone(),
                amount: self.amount,
                method,
            },
            details,
        })
    }

    /// Leaves `Processing` according to the gateway's answer.
    pub fn complete(
        &mut self,
        result: Result<PaymentAck, ClientError>,
    ) -> Result<PaymentOutcome, PaymentError> {
        if self.status != PaymentStatus::Processing {
            return Err(PaymentError::NotProcessing);
        }
        let outcome = match result {
            Ok(PaymentAck {
                redirect_url: Some(url),
                ..
            }) if !url.trim().is_empty() => {
                info!(
                    reservation_id = %self.reservation_id,
                    %url,
                    "payment continues on provider page"
                );
                self.status = PaymentStatus::Redirected { url: url.clone() };
                self.events.emit(PaymentEvent::Redirected { url: url.clone() });
                PaymentOutcome::Redirect { url }
            }
            Ok(ack) if ack.status == TransactionStatus::Failed => {
                warn!(
                    reservation_id = %self.reservation_id,
                    payment_id = %ack.payment_id,
                    "payment declined"
                );
                self.fail(Notice::new(
                    NoticeCategory::Server,
                    NoticeContext::Payment,
                    DECLINED_MESSAGE,
                ))
            }
            Ok(ack) => {
                info!(
                    reservation_id = %self.reservation_id,
                    payment_id = %ack.payment_id,
                    "payment accepted"
                );
                self.status = PaymentStatus::Success {
                    payment_id: ack.payment_id.clone(),
                };
                self.events.emit(PaymentEvent::Succeeded {
                    payment_id: ack.payment_id.clone(),
                });
                PaymentOutcome::Paid {
                    payment_id: ack.payment_id,
                }
            }
            Err(err) => self.fail(Notice::from_client_error(NoticeContext::Payment, &err)),
        };
        Ok(outcome)
    }

    fn fail(&mut self, notice: Notice) -> PaymentOutcome {
        self.status = PaymentStatus::Error {
            notice: notice.clone(),
        };
        self.events.emit(PaymentEvent::Failed {
            notice: notice.clone(),
        });
        PaymentOutcome::Failed { notice }
    }

    /// `Error -> Idle`, keeping the reservation and amount.
    pub fn retry(&mut self) -> Result<(), PaymentError> {
        if !matches!(self.status, PaymentStatus::Error { .. }) {
            return Err(PaymentError::NotInError);
        }
        self.status = PaymentStatus::Idle;
        self.events.emit(PaymentEvent::Reset);
        Ok(())
    }

    pub async fn pay<G>(
        &mut self,
        gateway: &G,
        form: &PaymentForm,
    ) -> Result<PaymentOutcome, PaymentError>
    where
        G: PaymentGateway + ?Sized,
    {
        let submission = self.begin(form)?;
        let result = gateway.settle(&submission).await;
        self.complete(result)
    }
}

#[cfg(test)]
#[path = "tests/payment_tests.rs"]
mod tests;
