//! Admin dashboard figures computed from fetched collections.

use std::collections::BTreeMap;

use shared::{
    domain::{Amount, ReservationStatus, TicketStatus, TransactionStatus},
    protocol::{Reservation, Review, SupportTicket, Transaction},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub reservations_by_status: BTreeMap<&'static str, usize>,
    /// Sum of successful transactions.
    pub revenue: Amount,
    pub failed_transactions: usize,
    pub open_tickets: usize,
    pub published_reviews: usize,
    /// Mean rating of published reviews.
    pub average_rating: Option<f32>,
}

impl DashboardStats {
    pub fn summarize(
        reservations: &[Reservation],
        transactions: &[Transaction],
        tickets: &[SupportTicket],
        reviews: &[Review],
    ) -> Self {
        let mut reservations_by_status: BTreeMap<&'static str, usize> = ReservationStatus::ALL
            .iter()
            .map(|status| (status.as_str(), 0))
            .collect();
        for reservation in reservations {
            *reservations_by_status
                .entry(reservation.status.as_str())
                .or_default() += 1;
        }

        let revenue = transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Success)
            .map(|tx| tx.amount)
            .sum();
        let failed_transactions = transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Failed)
            .count();

        let open_tickets = tickets
            .iter()
            .filter(|ticket| matches!(ticket.status, TicketStatus::Open | TicketStatus::InProgress))
            .count();

        let published: Vec<&Review> = reviews.iter().filter(|review| !review.archived).collect();
        let average_rating = (!published.is_empty()).then(|| {
            published.iter().map(|review| f32::from(review.rating)).sum::<f32>()
                / published.len() as f32
        });

        Self {
            reservations_by_status,
            revenue,
            failed_transactions,
            open_tickets,
            published_reviews: published.len(),
            average_rating,
        }
    }

    pub fn reservations_with(&self, status: ReservationStatus) -> usize {
        self.reservations_by_status
            .get(status.as_str())
            .copied()
            .unwrap_or(0)
    }
}
