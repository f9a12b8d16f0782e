//! UI orchestration for the marketplace: step wizards, payment, the booking
//! hand-off between them, filtered listings and the review carousel.
//!
//! Every controller here is a plain state machine driven by `&mut self`
//! calls from a single event loop. Network work goes through the
//! collaborator traits so the controllers can be exercised without a server.

pub mod carousel;
pub mod dashboard;
pub mod events;
pub mod feedback;
pub mod handoff;
pub mod listing;
pub mod payment;
pub mod validation;
pub mod wizard;

pub use carousel::{Autoplay, AutoplayState, Carousel, SwipeDirection};
pub use dashboard::DashboardStats;
pub use events::{EventHub, PaymentEvent, WizardEvent};
pub use feedback::{Notice, NoticeCategory, NoticeContext};
pub use handoff::{BookingCompletion, BookingFlow, BookingStage, HandoffError};
pub use listing::{FilterField, FilterKey, FilterState, Filterable, ListController, RateRange};
pub use payment::{
    PaymentController, PaymentError, PaymentForm, PaymentGateway, PaymentOutcome, PaymentStatus,
    PaymentSubmission,
};
pub use wizard::{
    booking::Booking, client_registration::ClientRegistration,
    housekeeper_registration::HousekeeperRegistration, StepTransition, SubmissionSink,
    WizardController, WizardError, WizardSchema,
};
