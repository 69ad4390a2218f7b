use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::identity::IdentityRequest;
use super::referrals::ReferralRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::models::bookings::{Booking, BookingNotice, BookingOutcome, BookingStatus, NewBooking};
use crate::models::users::User;
use crate::repositories::bookings::BookingRepository;
use crate::repositories::RepositoryError;
use crate::settings::{Loyalty, ServiceOffering, Settings};
use crate::storage::Store;

pub enum BookingServiceRequest {
    Submit {
        new_booking: NewBooking,
        session: Option<User>,
        response: oneshot::Sender<Result<BookingOutcome, ServiceError>>,
    },
    History {
        user_id: String,
        response: oneshot::Sender<Result<Vec<Booking>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct BookingRequestHandler {
    repository: BookingRepository,
    catalog: Vec<ServiceOffering>,
    loyalty: Loyalty,
    identity_channel: mpsc::Sender<IdentityRequest>,
    referral_channel: mpsc::Sender<ReferralRequest>,
}

impl BookingRequestHandler {
    pub fn new(
        store: Store,
        settings: Settings,
        identity_channel: mpsc::Sender<IdentityRequest>,
        referral_channel: mpsc::Sender<ReferralRequest>,
    ) -> Self {
        let repository = BookingRepository::new(store);

        BookingRequestHandler {
            repository,
            catalog: settings.services,
            loyalty: settings.loyalty,
            identity_channel,
            referral_channel,
        }
    }

    async fn submit(
        &self,
        new_booking: NewBooking,
        session: Option<User>,
    ) -> Result<BookingOutcome, ServiceError> {
        let missing: Vec<&str> = [
            ("name", new_booking.user_name.trim().is_empty()),
            ("service", new_booking.service_id.trim().is_empty()),
            ("date", new_booking.date.trim().is_empty()),
            ("time", new_booking.time.trim().is_empty()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(field, _)| *field)
        .collect();
        if !missing.is_empty() {
            return Err(RepositoryError::IncompleteBooking(missing.join(", ")).into());
        }

        let offering = self
            .catalog
            .iter()
            .find(|s| s.id == new_booking.service_id)
            .ok_or_else(|| RepositoryError::UnknownService(new_booking.service_id.clone()))?;

        let referral_code = new_booking
            .referral_code
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());

        let mut notices = Vec::new();
        let mut final_price = offering.price_in_cents;
        let mut referrer: Option<User> = None;

        // Only guests get the referral discount; an authenticated submitter
        // keeps the full price even with a valid code.
        if session.is_none() {
            if let Some(code) = &referral_code {
                match self.resolve_referrer(code).await? {
                    Some(user) => {
                        final_price =
                            discounted_price(offering.price_in_cents, self.loyalty.guest_discount_percent);
                        notices.push(BookingNotice::DiscountApplied {
                            referrer_name: user.name.clone(),
                            final_price_in_cents: final_price,
                        });
                        referrer = Some(user);
                    }
                    None => notices.push(BookingNotice::InvalidReferralCode),
                }
            }
        }

        let points = points_for(final_price, self.loyalty.points_per_euro);
        let booking = Booking {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_id: match &session {
                Some(user) => user.id.clone(),
                None => format!("guest-{}", Uuid::new_v4().hyphenated()),
            },
            user_name: new_booking.user_name.trim().to_string(),
            service_id: offering.id.clone(),
            service_name: offering.name.clone(),
            price_in_cents: final_price,
            date: new_booking.date,
            time: new_booking.time,
            referral_code_used: referrer.as_ref().and(referral_code),
            points_earned: if session.is_some() { points } else { 0 },
            status: BookingStatus::Confirmed,
            created_at: chrono::Utc::now().naive_utc(),
        };
        self.repository.insert_booking(&booking)?;

        if let Some(user) = &session {
            if booking.points_earned > 0 {
                self.credit_points(&user.id, booking.points_earned).await?;
            }
        }

        if let Some(referrer) = referrer {
            let rewarded = self
                .reward_referral(&referrer.id, &booking.user_id, &booking.user_name)
                .await?;
            notices.push(BookingNotice::ReferrerRewarded {
                referrer_name: rewarded.name,
                points: self.loyalty.referrer_bonus,
            });
        }

        Ok(BookingOutcome { booking, notices })
    }

    async fn history(&self, user_id: &str) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.repository.history_for_user(user_id)?)
    }

    async fn resolve_referrer(&self, code: &str) -> Result<Option<User>, ServiceError> {
        let (referral_tx, referral_rx) = oneshot::channel();

        self.referral_channel
            .send(ReferralRequest::ResolveReferrer {
                code: code.to_string(),
                response: referral_tx,
            })
            .await
            .map_err(|e| ServiceError::Communication("Booking => Referral".to_string(), e.to_string()))?;

        referral_rx
            .await
            .map_err(|e| ServiceError::Communication("Referral => Booking".to_string(), e.to_string()))?
    }

    async fn credit_points(&self, user_id: &str, points: u32) -> Result<User, ServiceError> {
        let (identity_tx, identity_rx) = oneshot::channel();

        self.identity_channel
            .send(IdentityRequest::CreditPoints {
                user_id: user_id.to_string(),
                points,
                response: identity_tx,
            })
            .await
            .map_err(|e| ServiceError::Communication("Booking => Identity".to_string(), e.to_string()))?;

        identity_rx
            .await
            .map_err(|e| ServiceError::Communication("Identity => Booking".to_string(), e.to_string()))?
    }

    async fn reward_referral(
        &self,
        referrer_id: &str,
        referred_user_id: &str,
        referred_user_name: &str,
    ) -> Result<User, ServiceError> {
        let (referral_tx, referral_rx) = oneshot::channel();

        self.referral_channel
            .send(ReferralRequest::RewardReferral {
                referrer_id: referrer_id.to_string(),
                referred_user_id: referred_user_id.to_string(),
                referred_user_name: referred_user_name.to_string(),
                response: referral_tx,
            })
            .await
            .map_err(|e| ServiceError::Communication("Booking => Referral".to_string(), e.to_string()))?;

        referral_rx
            .await
            .map_err(|e| ServiceError::Communication("Referral => Booking".to_string(), e.to_string()))?
    }
}

fn discounted_price(base_in_cents: i64, percent: u32) -> i64 {
    (base_in_cents * (100 - i64::from(percent)) + 50) / 100
}

fn points_for(price_in_cents: i64, points_per_euro: u32) -> u32 {
    ((price_in_cents * i64::from(points_per_euro)) / 100) as u32
}

#[async_trait]
impl RequestHandler<BookingServiceRequest> for BookingRequestHandler {
    async fn handle_request(&self, request: BookingServiceRequest) {
        match request {
            BookingServiceRequest::Submit {
                new_booking,
                session,
                response,
            } => {
                let result = self.submit(new_booking, session).await;
                let _ = response.send(result);
            }
            BookingServiceRequest::History { user_id, response } => {
                let result = self.history(&user_id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct BookingService;

impl BookingService {
    pub fn new() -> Self {
        BookingService {}
    }
}

#[async_trait]
impl Service<BookingServiceRequest, BookingRequestHandler> for BookingService {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_rounds_half_up_to_the_cent() {
        assert_eq!(discounted_price(1500, 10), 1350);
        assert_eq!(discounted_price(1999, 10), 1799); // 1799.1
        assert_eq!(discounted_price(1995, 10), 1796); // 1795.5
    }

    #[test]
    fn points_floor_per_euro_spent() {
        assert_eq!(points_for(1350, 1), 13);
        assert_eq!(points_for(99, 1), 0);
        assert_eq!(points_for(4000, 2), 80);
    }
}
