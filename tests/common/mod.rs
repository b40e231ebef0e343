use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use http_body_util::BodyExt;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

use boxdbot::config::AppConfig;
use boxdbot::models::{FollowedUser, MovieWatch};
use boxdbot::notify::{DeliveryError, DiaryNotification, Notifier};
use boxdbot::routes;
use boxdbot::scheduler::ReadySignal;
use boxdbot::source::{
    DiaryEntry, FilmDetails, FilmRef, FilmSource, SourceError, SourceResult, UserProfile,
    WatchedFilm,
};
use boxdbot::state::AppState;
use boxdbot::store::{
    CreateFollowOutcome, FollowStore, StoreResult, WatchChange, WatchStore,
};

/// In-memory stand-in for both persistent stores.
#[derive(Default)]
pub struct MemoryStore {
    follows: Mutex<Vec<FollowedUser>>,
    watches: Mutex<Vec<MovieWatch>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code)]
    pub async fn seed_follow(
        &self,
        guild_id: i64,
        channel_id: i64,
        username: &str,
        watermark: Option<NaiveDate>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.follows.lock().await.push(FollowedUser {
            id,
            guild_id,
            channel_id,
            username: username.to_string(),
            last_entry_date: watermark
                .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc()),
            created_at: Utc::now(),
        });
        id
    }

    #[allow(dead_code)]
    pub async fn watermark_of(&self, follow_id: Uuid) -> Option<DateTime<Utc>> {
        self.follows
            .lock()
            .await
            .iter()
            .find(|follow| follow.id == follow_id)
            .and_then(|follow| follow.last_entry_date)
    }

    #[allow(dead_code)]
    pub async fn watch_rows(&self, username: &str) -> Vec<MovieWatch> {
        self.watches
            .lock()
            .await
            .iter()
            .filter(|watch| watch.username == username)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FollowStore for MemoryStore {
    async fn create_follow(
        &self,
        guild_id: i64,
        channel_id: i64,
        username: &str,
    ) -> StoreResult<CreateFollowOutcome> {
        let mut follows = self.follows.lock().await;
        let exists = follows.iter().any(|follow| {
            follow.guild_id == guild_id
                && follow.channel_id == channel_id
                && follow.username == username
        });
        if exists {
            return Ok(CreateFollowOutcome::AlreadyFollowing);
        }
        follows.push(FollowedUser {
            id: Uuid::new_v4(),
            guild_id,
            channel_id,
            username: username.to_string(),
            last_entry_date: None,
            created_at: Utc::now(),
        });
        Ok(CreateFollowOutcome::Created)
    }

    async fn remove_follow(
        &self,
        guild_id: i64,
        channel_id: i64,
        username: &str,
    ) -> StoreResult<bool> {
        let mut follows = self.follows.lock().await;
        let before = follows.len();
        follows.retain(|follow| {
            !(follow.guild_id == guild_id
                && follow.channel_id == channel_id
                && follow.username == username)
        });
        Ok(follows.len() < before)
    }

    async fn follows_for_channel(
        &self,
        guild_id: i64,
        channel_id: i64,
    ) -> StoreResult<Vec<FollowedUser>> {
        Ok(self
            .follows
            .lock()
            .await
            .iter()
            .filter(|follow| follow.guild_id == guild_id && follow.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn all_follows(&self) -> StoreResult<Vec<FollowedUser>> {
        Ok(self.follows.lock().await.clone())
    }

    async fn distinct_usernames(&self) -> StoreResult<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .follows
            .lock()
            .await
            .iter()
            .filter(|follow| seen.insert(follow.username.clone()))
            .map(|follow| follow.username.clone())
            .collect())
    }

    async fn advance_watermark(
        &self,
        follow_id: Uuid,
        watermark: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut follows = self.follows.lock().await;
        if let Some(follow) = follows.iter_mut().find(|follow| follow.id == follow_id) {
            follow.last_entry_date = Some(watermark);
        }
        Ok(())
    }
}

#[async_trait]
impl WatchStore for MemoryStore {
    async fn watches_for_user(&self, username: &str) -> StoreResult<Vec<MovieWatch>> {
        Ok(self
            .watches
            .lock()
            .await
            .iter()
            .filter(|watch| watch.username == username)
            .cloned()
            .collect())
    }

    async fn apply_changes(&self, username: &str, changes: Vec<WatchChange>) -> StoreResult<()> {
        let mut watches = self.watches.lock().await;
        for change in changes {
            match change {
                WatchChange::Insert(state) => watches.push(MovieWatch {
                    id: Uuid::new_v4(),
                    film_id: state.film_id,
                    username: username.to_string(),
                    rating: state.rating,
                    liked: state.liked,
                    watch_date: state.watch_date,
                    updated_at: Utc::now(),
                }),
                WatchChange::Update(state) => {
                    if let Some(row) = watches
                        .iter_mut()
                        .find(|row| row.film_id == state.film_id && row.username == username)
                    {
                        row.rating = state.rating;
                        row.liked = state.liked;
                        row.watch_date = state.watch_date;
                        row.updated_at = Utc::now();
                    }
                }
            }
        }
        Ok(())
    }

    async fn watchers_of_film(
        &self,
        film_id: &str,
        usernames: &[String],
    ) -> StoreResult<Vec<MovieWatch>> {
        Ok(self
            .watches
            .lock()
            .await
            .iter()
            .filter(|watch| watch.film_id == film_id && usernames.contains(&watch.username))
            .cloned()
            .collect())
    }
}

/// Scripted stand-in for the external site.
#[derive(Default)]
pub struct ScriptedSource {
    pub diaries: Mutex<HashMap<String, Vec<Vec<DiaryEntry>>>>,
    pub watch_lists: Mutex<HashMap<String, HashMap<String, WatchedFilm>>>,
    pub films: Mutex<HashMap<String, FilmDetails>>,
    pub search_results: Mutex<HashMap<String, FilmRef>>,
    pub unavailable_users: Mutex<HashSet<String>>,
    pub unknown_users: Mutex<HashSet<String>>,
    pub watch_list_fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code)]
    pub async fn set_diary(&self, username: &str, pages: Vec<Vec<DiaryEntry>>) {
        self.diaries.lock().await.insert(username.to_string(), pages);
    }

    #[allow(dead_code)]
    pub async fn set_watch_list(&self, username: &str, list: HashMap<String, WatchedFilm>) {
        self.watch_lists
            .lock()
            .await
            .insert(username.to_string(), list);
    }

    #[allow(dead_code)]
    pub async fn set_film(&self, slug: &str, details: FilmDetails) {
        self.films.lock().await.insert(slug.to_string(), details);
    }

    #[allow(dead_code)]
    pub async fn set_search_result(&self, title: &str, film: FilmRef) {
        self.search_results
            .lock()
            .await
            .insert(title.to_string(), film);
    }

    #[allow(dead_code)]
    pub async fn mark_unavailable(&self, username: &str) {
        self.unavailable_users
            .lock()
            .await
            .insert(username.to_string());
    }

    #[allow(dead_code)]
    pub async fn mark_unknown(&self, username: &str) {
        self.unknown_users.lock().await.insert(username.to_string());
    }

    async fn check_user(&self, username: &str) -> SourceResult<()> {
        if self.unknown_users.lock().await.contains(username) {
            return Err(SourceError::UserNotFound(username.to_string()));
        }
        if self.unavailable_users.lock().await.contains(username) {
            return Err(SourceError::Unavailable("scripted outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FilmSource for ScriptedSource {
    async fn user_profile(&self, username: &str) -> SourceResult<UserProfile> {
        self.check_user(username).await?;
        Ok(UserProfile {
            username: username.to_string(),
            display_name: username.to_string(),
            avatar_url: Some(format!("https://avatars.test/{username}.png")),
        })
    }

    async fn diary_page(&self, username: &str, page: u32) -> SourceResult<Vec<DiaryEntry>> {
        self.check_user(username).await?;
        Ok(self
            .diaries
            .lock()
            .await
            .get(username)
            .and_then(|pages| pages.get(page as usize - 1).cloned())
            .unwrap_or_default())
    }

    async fn all_watches(&self, username: &str) -> SourceResult<HashMap<String, WatchedFilm>> {
        self.check_user(username).await?;
        self.watch_list_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .watch_lists
            .lock()
            .await
            .get(username)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_film(&self, title: &str) -> SourceResult<Option<FilmRef>> {
        Ok(self.search_results.lock().await.get(title).cloned())
    }

    async fn film_details(&self, slug: &str) -> SourceResult<FilmDetails> {
        self.films
            .lock()
            .await
            .get(slug)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable(format!("no scripted film `{slug}`")))
    }

    async fn review_text(&self, _review_link: &str) -> SourceResult<Option<String>> {
        Ok(Some("scripted review".to_string()))
    }
}

/// Records deliveries; can be told to reject everything.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<DiaryNotification>>,
    pub reject: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code)]
    pub fn reject_deliveries(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub async fn delivered(&self) -> Vec<DiaryNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: DiaryNotification) -> Result<(), DeliveryError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(DeliveryError("scripted rejection".to_string()));
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

#[allow(dead_code)]
pub fn diary_entry(slug: &str, year: i32, month: u32, day: u32) -> DiaryEntry {
    DiaryEntry {
        film_slug: slug.to_string(),
        film_name: slug.to_string(),
        date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
        rating: Some(8),
        liked: true,
        rewatched: false,
        review_link: None,
    }
}

#[allow(dead_code)]
pub fn film_details(id: &str, slug: &str, title: &str) -> FilmDetails {
    FilmDetails {
        id: id.to_string(),
        title: title.to_string(),
        year: Some(2024),
        poster_url: None,
        genres: vec!["Drama".to_string()],
        url: format!("https://letterboxd.test/film/{slug}/"),
    }
}

/// The full app wired to in-memory fakes, driven through the router.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub source: Arc<ScriptedSource>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    #[allow(dead_code)]
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let source = ScriptedSource::new();
        let notifier = RecordingNotifier::new();

        let config = AppConfig {
            database_url: "postgres://unused".to_string(),
            database_max_pool_size: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            source_base_url: "http://source.test".to_string(),
            delivery_webhook_url: "http://delivery.test/hook".to_string(),
            diary_sync_interval: Duration::from_secs(900),
            watch_reconcile_interval: Duration::from_secs(21600),
        };

        let state = AppState::new(
            config,
            store.clone(),
            store.clone(),
            source.clone(),
            notifier.clone(),
            ReadySignal::new(),
        );

        Self {
            router: routes::create_router(state),
            store,
            source,
            notifier,
        }
    }

    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be json")
        };
        (status, json)
    }
}
