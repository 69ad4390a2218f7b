use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::users::User;
use crate::repositories::users::UserRepository;
use crate::settings::Loyalty;
use crate::storage::Store;

pub enum ReferralRequest {
    ResolveReferrer {
        code: String,
        response: oneshot::Sender<Result<Option<User>, ServiceError>>,
    },
    // Invoked at most once per qualifying booking; the caller guarantees
    // single invocation, no deduplication happens here.
    RewardReferral {
        referrer_id: String,
        referred_user_id: String,
        referred_user_name: String,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ReferralRequestHandler {
    repository: UserRepository,
}

impl ReferralRequestHandler {
    pub fn new(store: Store, loyalty: Loyalty) -> Self {
        let repository = UserRepository::new(store, loyalty);

        ReferralRequestHandler { repository }
    }

    async fn resolve_referrer(&self, code: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.repository.find_by_referral_code(code)?)
    }

    async fn reward_referral(
        &self,
        referrer_id: &str,
        referred_user_id: &str,
        referred_user_name: &str,
    ) -> Result<User, ServiceError> {
        let referrer =
            self.repository
                .record_referral(referrer_id, referred_user_id, referred_user_name)?;
        log::info!(
            "Credited {} for referring {}.",
            referrer.email,
            referred_user_name
        );

        Ok(referrer)
    }
}

#[async_trait]
impl RequestHandler<ReferralRequest> for ReferralRequestHandler {
    async fn handle_request(&self, request: ReferralRequest) {
        match request {
            ReferralRequest::ResolveReferrer { code, response } => {
                let result = self.resolve_referrer(&code).await;
                let _ = response.send(result);
            }
            ReferralRequest::RewardReferral {
                referrer_id,
                referred_user_id,
                referred_user_name,
                response,
            } => {
                let result = self
                    .reward_referral(&referrer_id, &referred_user_id, &referred_user_name)
                    .await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct ReferralService;

impl ReferralService {
    pub fn new() -> Self {
        ReferralService {}
    }
}

#[async_trait]
impl Service<ReferralRequest, ReferralRequestHandler> for ReferralService {}
