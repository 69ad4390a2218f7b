use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::repositories::RepositoryError;
use crate::settings::Settings;
use crate::storage::Store;

pub mod bookings;
pub mod identity;
pub mod referrals;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] RepositoryError),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub struct ServiceChannels {
    pub identity: mpsc::Sender<identity::IdentityRequest>,
    pub referrals: mpsc::Sender<referrals::ReferralRequest>,
    pub bookings: mpsc::Sender<bookings::BookingServiceRequest>,
}

pub async fn start_services(
    store: Store,
    settings: Settings,
) -> Result<ServiceChannels, anyhow::Error> {
    let (identity_tx, mut identity_rx) = mpsc::channel(512);
    let (referral_tx, mut referral_rx) = mpsc::channel(512);
    let (booking_tx, mut booking_rx) = mpsc::channel(512);

    let mut identity_service = identity::IdentityService::new();
    let mut referral_service = referrals::ReferralService::new();
    let mut booking_service = bookings::BookingService::new();

    log::info!("Starting identity service.");
    let identity_store = store.clone();
    let identity_settings = settings.clone();
    tokio::spawn(async move {
        identity_service
            .run(
                identity::IdentityRequestHandler::new(identity_store, identity_settings),
                &mut identity_rx,
            )
            .await;
    });

    log::info!("Starting referral service.");
    let referral_store = store.clone();
    let referral_loyalty = settings.loyalty.clone();
    tokio::spawn(async move {
        referral_service
            .run(
                referrals::ReferralRequestHandler::new(referral_store, referral_loyalty),
                &mut referral_rx,
            )
            .await;
    });

    log::info!("Starting booking service.");
    let booking_identity_tx = identity_tx.clone();
    let booking_referral_tx = referral_tx.clone();
    tokio::spawn(async move {
        booking_service
            .run(
                bookings::BookingRequestHandler::new(
                    store,
                    settings,
                    booking_identity_tx,
                    booking_referral_tx,
                ),
                &mut booking_rx,
            )
            .await;
    });

    Ok(ServiceChannels {
        identity: identity_tx,
        referrals: referral_tx,
        bookings: booking_tx,
    })
}
