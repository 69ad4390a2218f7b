use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
    pub referral_code: String,
    pub loyalty_points: u32,
    pub referred_by_code: Option<String>,
    pub referrals_made: Vec<ReferralEvent>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReferralEvent {
    pub referred_user_id: String,
    pub referred_user_name: String,
    pub date: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub referral_code: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegistrationOutcome {
    pub user: User,
    pub notices: Vec<RegistrationNotice>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RegistrationNotice {
    WelcomeBonus { referrer_name: String, points: u32 },
    InvalidReferralCode,
}

#[derive(Clone, Debug, Serialize)]
pub struct Redemption {
    pub reward_name: String,
    pub points_spent: u32,
    pub points_remaining: u32,
}
