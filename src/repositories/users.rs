use chrono::Utc;
use uuid::Uuid;

use super::RepositoryError;
use crate::models::users::{NewUser, ReferralEvent, RegistrationNotice, User};
use crate::settings::Loyalty;
use crate::storage::Store;
use crate::utils;

pub const MIN_PASSWORD_LEN: usize = 6;

const REFERRAL_PREFIX_LEN: usize = 4;
const REFERRAL_SUFFIX_LEN: usize = 4;

#[derive(Clone)]
pub struct UserRepository {
    store: Store,
    loyalty: Loyalty,
}

impl UserRepository {
    pub fn new(store: Store, loyalty: Loyalty) -> Self {
        UserRepository { store, loyalty }
    }

    pub fn insert_user(
        &self,
        new_user: NewUser,
    ) -> Result<(User, Vec<RegistrationNotice>), RepositoryError> {
        let email = new_user.email.trim().to_lowercase();
        let users = self.store.load_users()?;

        if users.iter().any(|u| u.email == email) {
            return Err(RepositoryError::DuplicateEmail);
        }
        if new_user.password.len() < MIN_PASSWORD_LEN {
            return Err(RepositoryError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let mut notices = Vec::new();
        let mut initial_points = 0;
        let mut referred_by_code = None;

        if let Some(code) = normalize_code(new_user.referral_code.as_deref()) {
            match users.iter().find(|u| u.referral_code == code) {
                Some(referrer) => {
                    // The new user gets the welcome bonus; the referrer is
                    // credited later, on the referee's booking.
                    initial_points = self.loyalty.welcome_bonus;
                    notices.push(RegistrationNotice::WelcomeBonus {
                        referrer_name: referrer.name.clone(),
                        points: self.loyalty.welcome_bonus,
                    });
                    referred_by_code = Some(code);
                }
                None => notices.push(RegistrationNotice::InvalidReferralCode),
            }
        }

        let salt = Uuid::new_v4().simple().to_string();
        let user = User {
            id: Uuid::new_v4().hyphenated().to_string(),
            name: new_user.name.trim().to_string(),
            email,
            password_hash: utils::hash_password(&salt, &new_user.password),
            password_salt: salt,
            referral_code: generate_referral_code(&new_user.name, &users),
            loyalty_points: initial_points,
            referred_by_code,
            referrals_made: Vec::new(),
            created_at: Utc::now().naive_utc(),
        };

        let mut users = users;
        users.push(user.clone());
        self.store.save_users(&users)?;

        Ok((user, notices))
    }

    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let email = email.trim().to_lowercase();
        let user = self
            .store
            .load_users()?
            .into_iter()
            .find(|u| u.email == email);

        Ok(user.filter(|u| utils::verify_password(&u.password_salt, password, &u.password_hash)))
    }

    pub fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, RepositoryError> {
        let Some(code) = normalize_code(Some(code)) else {
            return Ok(None);
        };
        Ok(self
            .store
            .load_users()?
            .into_iter()
            .find(|u| u.referral_code == code))
    }

    pub fn credit_points(&self, user_id: &str, points: u32) -> Result<User, RepositoryError> {
        let mut user = self.get(user_id)?;
        user.loyalty_points += points;
        self.persist(&user)?;
        Ok(user)
    }

    pub fn redeem_points(&self, user_id: &str, needed: u32) -> Result<User, RepositoryError> {
        let mut user = self.get(user_id)?;
        if user.loyalty_points < needed {
            return Err(RepositoryError::InsufficientPoints {
                needed,
                available: user.loyalty_points,
            });
        }
        user.loyalty_points -= needed;
        self.persist(&user)?;
        Ok(user)
    }

    pub fn record_referral(
        &self,
        referrer_id: &str,
        referred_user_id: &str,
        referred_user_name: &str,
    ) -> Result<User, RepositoryError> {
        let mut referrer = self.get(referrer_id)?;
        referrer.loyalty_points += self.loyalty.referrer_bonus;
        referrer.referrals_made.push(ReferralEvent {
            referred_user_id: referred_user_id.to_string(),
            referred_user_name: referred_user_name.to_string(),
            date: Utc::now().naive_utc(),
        });
        self.persist(&referrer)?;
        Ok(referrer)
    }

    pub fn start_session(&self, user: &User) -> Result<(), RepositoryError> {
        self.store.save_session(user)?;
        Ok(())
    }

    pub fn end_session(&self) -> Result<(), RepositoryError> {
        self.store.clear_session()?;
        Ok(())
    }

    // The mirror may lag behind the users collection; the collection is
    // authoritative. A session whose user is gone gets cleared.
    pub fn current_session(&self) -> Result<Option<User>, RepositoryError> {
        let Some(session) = self.store.load_session()? else {
            return Ok(None);
        };
        match self.store.get_user(&session.id)? {
            Some(user) => {
                self.store.save_session(&user)?;
                Ok(Some(user))
            }
            None => {
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    // Writes the user back and keeps the persisted session mirror in step
    // when the mutated user is the active session.
    pub fn persist(&self, user: &User) -> Result<(), RepositoryError> {
        self.store.upsert_user(user)?;
        if let Some(session) = self.store.load_session()? {
            if session.id == user.id {
                self.store.save_session(user)?;
            }
        }
        Ok(())
    }

    fn get(&self, user_id: &str) -> Result<User, RepositoryError> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| RepositoryError::UserNotFound(user_id.to_string()))
    }
}

fn normalize_code(code: Option<&str>) -> Option<String> {
    let code = code?.trim().to_uppercase();
    (!code.is_empty()).then_some(code)
}

fn generate_referral_code(name: &str, users: &[User]) -> String {
    let prefix: String = name
        .trim()
        .chars()
        .take(REFERRAL_PREFIX_LEN)
        .collect::<String>()
        .to_uppercase();
    loop {
        let suffix: String = Uuid::new_v4().simple().to_string()[..REFERRAL_SUFFIX_LEN].to_uppercase();
        let code = format!("{prefix}{suffix}");
        if !users.iter().any(|u| u.referral_code == code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> (tempfile::TempDir, UserRepository) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let loyalty = Loyalty {
            referrer_bonus: 50,
            welcome_bonus: 20,
            points_per_euro: 1,
            guest_discount_percent: 10,
        };
        (dir, UserRepository::new(store, loyalty))
    }

    fn new_user(name: &str, email: &str, referral_code: Option<&str>) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
            referral_code: referral_code.map(str::to_string),
        }
    }

    #[test]
    fn registers_with_unique_code_and_authenticates() {
        let (_dir, repo) = repository();
        let (user, notices) = repo.insert_user(new_user("Ana García", "Ana@Example.com", None)).unwrap();

        assert!(notices.is_empty());
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.loyalty_points, 0);
        assert!(user.referral_code.starts_with("ANA"));
        assert_eq!(user.referral_code.len(), "ANA ".len() + 4);

        let authed = repo.authenticate("ana@example.com", "secret123").unwrap();
        assert_eq!(authed.unwrap().id, user.id);
        assert!(repo.authenticate("ana@example.com", "secret124").unwrap().is_none());
    }

    #[test]
    fn rejects_short_password_without_creating_a_user() {
        let (_dir, repo) = repository();
        let mut candidate = new_user("Ana", "ana@example.com", None);
        candidate.password = "short".to_string();

        let err = repo.insert_user(candidate).unwrap_err();
        assert!(matches!(err, RepositoryError::WeakPassword(6)));
        assert!(repo.authenticate("ana@example.com", "short").unwrap().is_none());
    }

    #[test]
    fn rejects_duplicate_email_case_insensitively() {
        let (_dir, repo) = repository();
        repo.insert_user(new_user("Ana", "ana@example.com", None)).unwrap();

        let err = repo.insert_user(new_user("Otra", "ANA@EXAMPLE.COM", None)).unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateEmail));
    }

    #[test]
    fn welcome_bonus_goes_to_the_referee_only() {
        let (_dir, repo) = repository();
        let (ana, _) = repo.insert_user(new_user("Ana", "ana@example.com", None)).unwrap();

        let (luis, notices) = repo
            .insert_user(new_user("Luis", "luis@example.com", Some(ana.referral_code.as_str())))
            .unwrap();

        assert_eq!(luis.loyalty_points, 20);
        assert_eq!(luis.referred_by_code.as_deref(), Some(ana.referral_code.as_str()));
        assert_eq!(
            notices,
            vec![RegistrationNotice::WelcomeBonus {
                referrer_name: "Ana".to_string(),
                points: 20
            }]
        );
        // referrer credit happens on the referee's booking, not here
        assert_eq!(repo.store.get_user(&ana.id).unwrap().unwrap().loyalty_points, 0);
    }

    #[test]
    fn unresolvable_code_still_registers_without_bonus() {
        let (_dir, repo) = repository();
        let (user, notices) = repo
            .insert_user(new_user("Luis", "luis@example.com", Some("NOPE1234")))
            .unwrap();

        assert_eq!(user.loyalty_points, 0);
        assert!(user.referred_by_code.is_none());
        assert_eq!(notices, vec![RegistrationNotice::InvalidReferralCode]);
    }

    #[test]
    fn resolves_codes_after_trim_and_case_normalisation() {
        let (_dir, repo) = repository();
        let (ana, _) = repo.insert_user(new_user("Ana", "ana@example.com", None)).unwrap();

        let lookup = format!("  {}  ", ana.referral_code.to_lowercase());
        let found = repo.find_by_referral_code(&lookup).unwrap();
        assert_eq!(found.unwrap().id, ana.id);
        assert!(repo.find_by_referral_code("   ").unwrap().is_none());
    }

    #[test]
    fn redeeming_checks_the_balance() {
        let (_dir, repo) = repository();
        let (ana, _) = repo.insert_user(new_user("Ana", "ana@example.com", None)).unwrap();
        repo.credit_points(&ana.id, 100).unwrap();

        let err = repo.redeem_points(&ana.id, 150).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InsufficientPoints {
                needed: 150,
                available: 100
            }
        ));
        assert_eq!(repo.store.get_user(&ana.id).unwrap().unwrap().loyalty_points, 100);

        let after = repo.redeem_points(&ana.id, 80).unwrap();
        assert_eq!(after.loyalty_points, 20);
    }

    #[test]
    fn recording_a_referral_credits_and_appends_one_event() {
        let (_dir, repo) = repository();
        let (ana, _) = repo.insert_user(new_user("Ana", "ana@example.com", None)).unwrap();

        let rewarded = repo.record_referral(&ana.id, "guest-123", "Carlos").unwrap();

        assert_eq!(rewarded.loyalty_points, 50);
        assert_eq!(rewarded.referrals_made.len(), 1);
        assert_eq!(rewarded.referrals_made[0].referred_user_name, "Carlos");
        assert_eq!(rewarded.referrals_made[0].referred_user_id, "guest-123");
    }

    #[test]
    fn persist_refreshes_the_active_session_mirror() {
        let (_dir, repo) = repository();
        let (ana, _) = repo.insert_user(new_user("Ana", "ana@example.com", None)).unwrap();
        repo.start_session(&ana).unwrap();

        repo.credit_points(&ana.id, 30).unwrap();
        assert_eq!(repo.current_session().unwrap().unwrap().loyalty_points, 30);

        // a session whose user disappeared is cleared on rehydration
        repo.store.save_users(&[]).unwrap();
        assert!(repo.current_session().unwrap().is_none());
        assert!(repo.store.load_session().unwrap().is_none());
    }
}
