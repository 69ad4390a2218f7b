use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::users::{NewUser, Redemption, RegistrationOutcome, User};
use crate::repositories::users::UserRepository;
use crate::repositories::RepositoryError;
use crate::settings::{Reward, Settings};
use crate::storage::Store;

pub enum IdentityRequest {
    Register {
        new_user: NewUser,
        response: oneshot::Sender<Result<RegistrationOutcome, ServiceError>>,
    },
    Login {
        email: String,
        password: String,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    CurrentSession {
        response: oneshot::Sender<Result<Option<User>, ServiceError>>,
    },
    Logout {
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    CreditPoints {
        user_id: String,
        points: u32,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    RedeemReward {
        user_id: String,
        reward_name: String,
        response: oneshot::Sender<Result<Redemption, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct IdentityRequestHandler {
    repository: UserRepository,
    rewards: Vec<Reward>,
}

impl IdentityRequestHandler {
    pub fn new(store: Store, settings: Settings) -> Self {
        let repository = UserRepository::new(store, settings.loyalty);

        IdentityRequestHandler {
            repository,
            rewards: settings.rewards,
        }
    }

    async fn register(&self, new_user: NewUser) -> Result<RegistrationOutcome, ServiceError> {
        let (user, notices) = self.repository.insert_user(new_user)?;
        self.repository.start_session(&user)?;
        log::info!(
            "Registered {} with referral code {}.",
            user.email,
            user.referral_code
        );

        Ok(RegistrationOutcome { user, notices })
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let user = self
            .repository
            .authenticate(email, password)?
            .ok_or(RepositoryError::InvalidCredentials)?;
        self.repository.start_session(&user)?;

        Ok(user)
    }

    async fn current_session(&self) -> Result<Option<User>, ServiceError> {
        Ok(self.repository.current_session()?)
    }

    async fn logout(&self) -> Result<(), ServiceError> {
        Ok(self.repository.end_session()?)
    }

    async fn credit_points(&self, user_id: &str, points: u32) -> Result<User, ServiceError> {
        Ok(self.repository.credit_points(user_id, points)?)
    }

    async fn redeem_reward(
        &self,
        user_id: &str,
        reward_name: &str,
    ) -> Result<Redemption, ServiceError> {
        let reward = self
            .rewards
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(reward_name))
            .ok_or_else(|| RepositoryError::UnknownReward(reward_name.to_string()))?;

        let user = self.repository.redeem_points(user_id, reward.points)?;
        log::info!("{} redeemed \"{}\".", user.email, reward.name);

        Ok(Redemption {
            reward_name: reward.name.clone(),
            points_spent: reward.points,
            points_remaining: user.loyalty_points,
        })
    }
}

#[async_trait]
impl RequestHandler<IdentityRequest> for IdentityRequestHandler {
    async fn handle_request(&self, request: IdentityRequest) {
        match request {
            IdentityRequest::Register { new_user, response } => {
                let result = self.register(new_user).await;
                let _ = response.send(result);
            }
            IdentityRequest::Login {
                email,
                password,
                response,
            } => {
                let result = self.login(&email, &password).await;
                let _ = response.send(result);
            }
            IdentityRequest::CurrentSession { response } => {
                let result = self.current_session().await;
                let _ = response.send(result);
            }
            IdentityRequest::Logout { response } => {
                let result = self.logout().await;
                let _ = response.send(result);
            }
            IdentityRequest::CreditPoints {
                user_id,
                points,
                response,
            } => {
                let result = self.credit_points(&user_id, points).await;
                let _ = response.send(result);
            }
            IdentityRequest::RedeemReward {
                user_id,
                reward_name,
                response,
            } => {
                let result = self.redeem_reward(&user_id, &reward_name).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct IdentityService;

impl IdentityService {
    pub fn new() -> Self {
        IdentityService {}
    }
}

#[async_trait]
impl Service<IdentityRequest, IdentityRequestHandler> for IdentityService {}
