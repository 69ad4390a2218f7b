use std::path::PathBuf;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use tokio::sync::oneshot;

mod models;
mod repositories;
pub mod services;
pub mod settings;
mod storage;
pub mod utils;

use models::bookings::{BookingNotice, NewBooking};
use models::users::{NewUser, RegistrationNotice, User};
use services::bookings::BookingServiceRequest;
use services::identity::IdentityRequest;
use services::ServiceChannels;
use utils::format_eur;

#[derive(Parser)]
#[command(name = "barber-hub", about = "Booking and loyalty desk for the barbershop")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account (optionally with a friend's referral code)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        referral_code: Option<String>,
    },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Close the active session
    Logout,
    /// Show points, referral code, referrals and booking history
    Dashboard,
    /// List bookable services
    Services,
    /// List redeemable rewards
    Rewards,
    /// Book a service; guests may pass a referral code for a discount
    Book {
        #[arg(long)]
        service: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        referral_code: Option<String>,
    },
    /// Redeem loyalty points for a reward
    Redeem {
        #[arg(long)]
        reward: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = settings::Settings::new().expect("Could not load config file.");
    init_logging(&config.log.level);

    let store = storage::Store::open(data_dir(&config)).expect("Could not open record store.");
    let channels = services::start_services(store, config.clone())
        .await
        .expect("Could not start services.");

    run_command(cli.command, &channels, &config).await;
}

fn data_dir(config: &settings::Settings) -> PathBuf {
    if let Some(dir) = &config.storage.data_dir {
        return PathBuf::from(dir);
    }
    ProjectDirs::from("app", "barberhub", "barber-hub")
        .expect("Could not determine data directory.")
        .data_dir()
        .to_path_buf()
}

fn init_logging(level: &str) {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} {t} - {m}{n}")))
        .build();
    let level = level.parse().unwrap_or(log::LevelFilter::Info);
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .expect("Could not build logging config.");
    log4rs::init_config(config).expect("Could not initialise logging.");
}

async fn run_command(command: Command, channels: &ServiceChannels, config: &settings::Settings) {
    match command {
        Command::Register {
            name,
            email,
            password,
            referral_code,
        } => {
            let (tx, rx) = oneshot::channel();
            send(
                &channels.identity,
                IdentityRequest::Register {
                    new_user: NewUser {
                        name,
                        email,
                        password,
                        referral_code,
                    },
                    response: tx,
                },
            )
            .await;
            match rx.await.expect("Identity service dropped the request.") {
                Ok(outcome) => {
                    for notice in &outcome.notices {
                        match notice {
                            RegistrationNotice::WelcomeBonus {
                                referrer_name,
                                points,
                            } => println!(
                                "[*] You used {referrer_name}'s code and earned {points} welcome points."
                            ),
                            RegistrationNotice::InvalidReferralCode => println!(
                                "[!] That referral code is not valid, but your account was created without it."
                            ),
                        }
                    }
                    println!(
                        "[SUCCESS] Welcome, {}! Your referral code is {}.",
                        outcome.user.name, outcome.user.referral_code
                    );
                }
                Err(e) => fail(&format!("Registration failed: {e}.")),
            }
        }
        Command::Login { email, password } => {
            let (tx, rx) = oneshot::channel();
            send(
                &channels.identity,
                IdentityRequest::Login {
                    email,
                    password,
                    response: tx,
                },
            )
            .await;
            match rx.await.expect("Identity service dropped the request.") {
                Ok(user) => println!("[SUCCESS] Logged in as {}.", user.name),
                Err(e) => fail(&format!("Login failed: {e}.")),
            }
        }
        Command::Logout => {
            let (tx, rx) = oneshot::channel();
            send(&channels.identity, IdentityRequest::Logout { response: tx }).await;
            match rx.await.expect("Identity service dropped the request.") {
                Ok(()) => println!("[*] Session closed."),
                Err(e) => fail(&format!("Logout failed: {e}.")),
            }
        }
        Command::Dashboard => {
            let Some(user) = current_session(channels).await else {
                fail("You must log in first.");
                return;
            };
            println!("[*] {} <{}>", user.name, user.email);
            println!("[*] Referral code: {}", user.referral_code);
            println!("[*] Loyalty points: {}", user.loyalty_points);
            println!("[*] Referrals made: {}", user.referrals_made.len());
            for referral in &user.referrals_made {
                println!(
                    "      {} (referred {})",
                    referral.referred_user_name,
                    referral.date.format("%Y-%m-%d")
                );
            }

            let (tx, rx) = oneshot::channel();
            send(
                &channels.bookings,
                BookingServiceRequest::History {
                    user_id: user.id,
                    response: tx,
                },
            )
            .await;
            match rx.await.expect("Booking service dropped the request.") {
                Ok(bookings) if bookings.is_empty() => println!("[*] No bookings yet."),
                Ok(bookings) => {
                    println!("[*] Bookings:");
                    for b in bookings {
                        println!(
                            "      {} on {} at {} - {} ({} points)",
                            b.service_name,
                            b.date,
                            b.time,
                            format_eur(b.price_in_cents),
                            b.points_earned
                        );
                    }
                }
                Err(e) => fail(&format!("Could not load bookings: {e}.")),
            }
        }
        Command::Services => {
            for service in &config.services {
                println!(
                    "[*] {} - {} ({})",
                    service.id,
                    service.name,
                    format_eur(service.price_in_cents)
                );
            }
        }
        Command::Rewards => {
            for reward in &config.rewards {
                println!("[*] {} - {} points", reward.name, reward.points);
            }
        }
        Command::Book {
            service,
            date,
            time,
            name,
            referral_code,
        } => {
            let session = current_session(channels).await;
            let user_name = name
                .or_else(|| session.as_ref().map(|u| u.name.clone()))
                .unwrap_or_default();

            let (tx, rx) = oneshot::channel();
            send(
                &channels.bookings,
                BookingServiceRequest::Submit {
                    new_booking: NewBooking {
                        user_name,
                        service_id: service,
                        date,
                        time,
                        referral_code,
                    },
                    session,
                    response: tx,
                },
            )
            .await;
            match rx.await.expect("Booking service dropped the request.") {
                Ok(outcome) => {
                    let mut discounted = false;
                    for notice in &outcome.notices {
                        match notice {
                            BookingNotice::DiscountApplied {
                                referrer_name,
                                final_price_in_cents,
                            } => {
                                discounted = true;
                                println!(
                                    "[*] {referrer_name}'s code gives you {}% off. Final price: {}.",
                                    config.loyalty.guest_discount_percent,
                                    format_eur(*final_price_in_cents)
                                );
                            }
                            BookingNotice::InvalidReferralCode => println!(
                                "[!] That referral code is not valid. The booking goes through without it."
                            ),
                            BookingNotice::ReferrerRewarded {
                                referrer_name,
                                points,
                            } => println!(
                                "[*] Thanks to your booking, {referrer_name} earned {points} points."
                            ),
                        }
                    }
                    if !discounted {
                        println!(
                            "[SUCCESS] Booking confirmed: {} on {} at {}. Price: {}.",
                            outcome.booking.service_name,
                            outcome.booking.date,
                            outcome.booking.time,
                            format_eur(outcome.booking.price_in_cents)
                        );
                    }
                    if outcome.booking.points_earned > 0 {
                        println!("[*] You earned {} points.", outcome.booking.points_earned);
                    }
                }
                Err(e) => fail(&format!("Booking failed: {e}.")),
            }
        }
        Command::Redeem { reward } => {
            let Some(user) = current_session(channels).await else {
                fail("You must log in to redeem rewards.");
                return;
            };
            let (tx, rx) = oneshot::channel();
            send(
                &channels.identity,
                IdentityRequest::RedeemReward {
                    user_id: user.id,
                    reward_name: reward,
                    response: tx,
                },
            )
            .await;
            match rx.await.expect("Identity service dropped the request.") {
                Ok(redemption) => println!(
                    "[SUCCESS] Redeemed \"{}\" for {} points. {} points left.",
                    redemption.reward_name, redemption.points_spent, redemption.points_remaining
                ),
                Err(e) => fail(&format!("Redemption failed: {e}.")),
            }
        }
    }
}

async fn current_session(channels: &ServiceChannels) -> Option<User> {
    let (tx, rx) = oneshot::channel();
    send(
        &channels.identity,
        IdentityRequest::CurrentSession { response: tx },
    )
    .await;
    match rx.await.expect("Identity service dropped the request.") {
        Ok(session) => session,
        Err(e) => {
            fail(&format!("Could not read the session: {e}."));
            None
        }
    }
}

async fn send<T>(channel: &tokio::sync::mpsc::Sender<T>, request: T) {
    if channel.send(request).await.is_err() {
        fail("Service unavailable.");
    }
}

fn fail(message: &str) {
    eprintln!("[!] {message}");
    std::process::exit(1);
}
