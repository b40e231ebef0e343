use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;

/// Structured notification for one new diary entry, handed to the delivery
/// collaborator. Transient: built during a sync pass, delivered, discarded.
#[derive(Debug, Clone, Serialize)]
pub struct DiaryNotification {
    pub guild_id: i64,
    pub channel_id: i64,
    pub film_title: String,
    pub film_url: String,
    pub rating: Option<i16>,
    /// `rating` rendered on the half-star scale, e.g. `★★★½`.
    pub stars: Option<String>,
    pub liked: bool,
    pub rewatched: bool,
    pub review: Option<String>,
    pub entry_date: NaiveDate,
    pub poster_url: Option<String>,
    pub genres: Vec<String>,
    pub viewer_name: String,
    pub viewer_avatar_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Seam to the chat platform. Delivery failures are the caller's problem to
/// log; the notifier never retries.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn deliver(&self, notification: DiaryNotification) -> Result<(), DeliveryError>;
}

/// Posts notifications as JSON to the chat collaborator's webhook endpoint.
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: DiaryNotification) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&notification)
            .send()
            .await
            .map_err(|err| DeliveryError(err.to_string()))?;

        response
            .error_for_status()
            .map_err(|err| DeliveryError(err.to_string()))?;
        Ok(())
    }
}

/// Renders a 0-10 half-star ordinal as stars: 7 -> `★★★½`, 10 -> `★★★★★`.
pub fn render_stars(rating_out_of_10: i16) -> String {
    let full = (rating_out_of_10 / 2) as usize;
    let half = rating_out_of_10 % 2 == 1;

    let mut stars = "★".repeat(full);
    if half {
        stars.push('½');
    }
    stars
}
