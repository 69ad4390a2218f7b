use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub service_id: String,
    pub service_name: String,
    pub price_in_cents: i64,
    pub date: String,
    pub time: String,
    pub referral_code_used: Option<String>,
    pub points_earned: u32,
    pub status: BookingStatus,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewBooking {
    pub user_name: String,
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub referral_code: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub notices: Vec<BookingNotice>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BookingNotice {
    DiscountApplied {
        referrer_name: String,
        final_price_in_cents: i64,
    },
    InvalidReferralCode,
    ReferrerRewarded {
        referrer_name: String,
        points: u32,
    },
}
