//! Booking to payment hand-off.
//!
//! A `BookingFlow` owns the booking wizard until it creates a reservation,
//! then a payment controller keyed by that reservation. Payment only starts
//! after the reservation exists. A failed payment keeps the reservation so
//! the payer can retry now or resume later.

use std::fmt;

use shared::{
    domain::{Amount, PaymentId, ReservationId},
    protocol::{Employee, Reservation},
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    payment::{PaymentController, PaymentError, PaymentForm, PaymentGateway, PaymentOutcome},
    wizard::{
        booking::{Booking, BookingSections},
        SubmissionSink, WizardController, WizardError,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStage {
    Booking,
    Payment,
    /// Payment continues on the provider's page; nothing left to do here.
    AwaitingRedirect { url: String },
    Done,
}

impl BookingStage {
    fn label(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Payment => "payment",
            Self::AwaitingRedirect { .. } => "awaiting_redirect",
            Self::Done => "done",
        }
    }
}

/// Passed to the completion callback once a reservation is paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingCompletion {
    pub reservation_id: ReservationId,
    pub amount: Amount,
    pub payment_id: PaymentId,
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("not available while in the {actual} stage")]
    WrongStage { actual: &'static str },
}

type CompletionCallback = Box<dyn FnMut(&BookingCompletion) + Send>;

pub struct BookingFlow {
    wizard: WizardController<Booking>,
    payment: Option<PaymentController>,
    reservation: Option<Reservation>,
    stage: BookingStage,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for BookingFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingFlow")
            .field("stage", &self.stage)
            .field("wizard", &self.wizard)
            .field("payment", &self.payment)
            .finish_non_exhaustive()
    }
}

impl BookingFlow {
    pub fn new(employee: &Employee) -> Self {
        Self::with_sections(BookingSections::for_employee(employee))
    }

    pub fn with_sections(sections: BookingSections) -> Self {
        Self {
            wizard: WizardController::with_sections(sections),
            payment: None,
            reservation: None,
            stage: BookingStage::Booking,
            on_complete: None,
        }
    }

    /// Starts directly at payment for a reservation created earlier.
    pub fn resume_payment(reservation: Reservation) -> Self {
        let mut flow = Self::with_sections(BookingSections::default());
        flow.enter_payment(reservation);
        flow
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&BookingCompletion) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn stage(&self) -> &BookingStage {
        &self.stage
    }

    pub fn wizard(&self) -> &WizardController<Booking> {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut WizardController<Booking> {
        &mut self.wizard
    }

    pub fn payment(&self) -> Option<&PaymentController> {
        self.payment.as_ref()
    }

    pub fn payment_mut(&mut self) -> Option<&mut PaymentController> {
        self.payment.as_mut()
    }

    /// The reservation awaiting payment, kept after a failed payment and
    /// cleared once it is paid.
    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    fn wrong_stage(&self) -> HandoffError {
        HandoffError::WrongStage {
            actual: self.stage.label(),
        }
    }

    fn enter_payment(&mut self, reservation: Reservation) {
        debug!(
            reservation_id = %reservation.id,
            amount = reservation.amount.francs(),
            "handing off to payment"
        );
        self.payment = Some(PaymentController::new(
            reservation.id.clone(),
            reservation.amount,
        ));
        self.reservation = Some(reservation);
        self.stage = BookingStage::Payment;
    }

    /// Submits the booking wizard and, on success, opens the payment stage.
    pub async fn submit_booking<K>(&mut self, sink: &K) -> Result<&Reservation, HandoffError>
    where
        K: SubmissionSink<Booking> + ?Sized,
    {
        if self.stage != BookingStage::Booking {
            return Err(self.wrong_stage());
        }
        let reservation = self.wizard.submit(sink).await?;
        info!(reservation_id = %reservation.id, "reservation created");
        self.enter_payment(reservation);
        self.reservation.as_ref().ok_or_else(|| self.wrong_stage())
    }

    pub async fn pay<G>(
        &mut self,
        gateway: &G,
        form: &PaymentForm,
    ) -> Result<PaymentOutcome, HandoffError>
    where
        G: PaymentGateway + ?Sized,
    {
        let payment = self.payment_stage()?;
        let outcome = payment.pay(gateway, form).await?;
        match &outcome {
            PaymentOutcome::Paid { payment_id } => self.finish(payment_id.clone()),
            PaymentOutcome::Redirect { url } => {
                self.stage = BookingStage::AwaitingRedirect { url: url.clone() };
            }
            PaymentOutcome::Failed { .. } => {}
        }
        Ok(outcome)
    }

    pub fn retry_payment(&mut self) -> Result<(), HandoffError> {
        self.payment_stage()?.retry()?;
        Ok(())
    }

    fn payment_stage(&mut self) -> Result<&mut PaymentController, HandoffError> {
        let err = self.wrong_stage();
        match (&self.stage, self.payment.as_mut()) {
            (BookingStage::Payment, Some(payment)) => Ok(payment),
            _ => Err(err),
        }
    }

    fn finish(&mut self, payment_id: PaymentId) {
        let Some(payment) = self.payment.take() else {
            return;
        };
        let completion = BookingCompletion {
            reservation_id: payment.reservation_id().clone(),
            amount: payment.amount(),
            payment_id,
        };
        info!(
            reservation_id = %completion.reservation_id,
            payment_id = %completion.payment_id,
            "booking paid"
        );
        if let Some(callback) = self.on_complete.as_mut() {
            callback(&completion);
        }
        self.wizard.reset();
        self.reservation = None;
        self.stage = BookingStage::Done;
    }

    /// Closes the modals. An unpaid reservation is returned so payment can
    /// be resumed later with [`BookingFlow::resume_payment`].
    pub fn close(&mut self) -> Option<Reservation> {
        let unpaid = match self.stage {
            BookingStage::Payment => self.reservation.take(),
            _ => None,
        };
        self.payment = None;
        self.stage = BookingStage::Done;
        unpaid
    }
}

#[cfg(test)]
#[path = "tests/handoff_tests.rs"]
mod tests;
