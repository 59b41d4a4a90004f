use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::Serialize;
use shared::{domain::GoodsLinks, error::SubmitError, protocol::MatchResult};
use storage::{Storage, ANALYZE_RESULTS_KEY};
use tokio::{
    sync::{broadcast, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

pub mod analyze;
pub mod member_index;
pub mod probe;
pub mod rotation;

pub use analyze::AnalyzeClient;
pub use member_index::MemberIndex;
pub use probe::{
    CandidateProber, HttpProber, ProbeOutcome, ShowcaseValidator, DEFAULT_PROBE_MAX_CHECK,
    DEFAULT_PROBE_TIMEOUT,
};
pub use rotation::{Rotator, DEFAULT_ROTATION_INTERVAL};

/// How many showcase candidates the fire-and-forget preload warms.
const PRELOAD_CANDIDATE_COUNT: usize = 80;

/// Pinned showcase used when the member resource yields no candidates at
/// all.
const FALLBACK_SHOWCASE: [&str; 3] = [
    "https://goronyan-5628.github.io/member-images/images/nzk_賀喜遥香.jpg",
    "https://goronyan-5628.github.io/member-images/images/szk_森田ひかる.jpg",
    "https://goronyan-5628.github.io/member-images/images/hzk_小坂菜緒.jpg",
];

/// Notifications a rendering surface subscribes to.
#[derive(Debug, Clone)]
pub enum ScreenEvent {
    /// The upload screen's showcase is installed and rotating.
    ShowcaseReady { count: usize },
    AnalyzeCompleted { results: Vec<MatchResult> },
    AnalyzeFailed { message: String },
}

/// Endpoints and tuning for one screen session.
#[derive(Debug, Clone)]
pub struct ScreenOptions {
    pub analyze_base_url: String,
    pub members_url: String,
    pub probe_timeout: Duration,
    pub probe_max_check: usize,
    pub rotation_interval: Duration,
}

impl ScreenOptions {
    pub fn new(analyze_base_url: impl Into<String>, members_url: impl Into<String>) -> Self {
        Self {
            analyze_base_url: analyze_base_url.into(),
            members_url: members_url.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_max_check: DEFAULT_PROBE_MAX_CHECK,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
        }
    }
}

/// Session state behind the upload surface.
///
/// Everything here belongs to one mount: initialized on entry, torn down on
/// navigation away. Nothing is process-global.
pub struct UploadScreen {
    session: Uuid,
    http: reqwest::Client,
    options: ScreenOptions,
    prober: Arc<dyn CandidateProber>,
    validator: ShowcaseValidator,
    analyze: AnalyzeClient,
    store: Storage,
    showcase: RwLock<Vec<String>>,
    left: Rotator,
    right: Rotator,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<ScreenEvent>,
}

impl UploadScreen {
    pub fn new(options: ScreenOptions, store: Storage) -> Arc<Self> {
        let prober: Arc<dyn CandidateProber> = Arc::new(HttpProber::new(reqwest::Client::new()));
        Self::with_prober(options, store, prober)
    }

    /// Build the screen around a custom prober (tests substitute stubs
    /// here; production wiring goes through [`UploadScreen::new`]).
    pub fn with_prober(
        options: ScreenOptions,
        store: Storage,
        prober: Arc<dyn CandidateProber>,
    ) -> Arc<Self> {
        let http = reqwest::Client::new();
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            session: Uuid::new_v4(),
            validator: ShowcaseValidator::with_limits(
                Arc::clone(&prober),
                options.probe_timeout,
                options.probe_max_check,
            ),
            analyze: AnalyzeClient::new(http.clone(), options.analyze_base_url.clone()),
            left: Rotator::new(options.rotation_interval),
            right: Rotator::new(options.rotation_interval),
            http,
            options,
            prober,
            store,
            showcase: RwLock::new(Vec::new()),
            background_tasks: Mutex::new(Vec::new()),
            events,
        })
    }

    /// Enter the screen: index load, candidate validation and rotation all
    /// start in the background. Returns immediately.
    pub async fn mount(self: &Arc<Self>) {
        info!(session = %self.session, "upload screen mounted");
        let screen = Arc::clone(self);
        let task = tokio::spawn(async move { screen.prepare_showcase().await });
        self.background_tasks.lock().await.push(task);
    }

    async fn prepare_showcase(self: Arc<Self>) {
        let index = MemberIndex::load(&self.http, &self.options.members_url).await;
        let candidates = index.candidate_images();

        let showcase = if candidates.is_empty() {
            warn!(session = %self.session, "no showcase candidates, using the pinned fallback set");
            FALLBACK_SHOWCASE.iter().map(|uri| uri.to_string()).collect()
        } else {
            self.spawn_preload(&candidates).await;
            self.validator.validate(&candidates).await
        };

        self.install_showcase(showcase).await;
    }

    async fn install_showcase(&self, showcase: Vec<String>) {
        let (left_seed, right_seed) = decorrelated_seeds(showcase.len());
        self.left.set_list(showcase.clone(), left_seed).await;
        self.right.set_list(showcase.clone(), right_seed).await;

        let count = showcase.len();
        *self.showcase.write().await = showcase;
        let _ = self.events.send(ScreenEvent::ShowcaseReady { count });
    }

    /// Best-effort cache warm of the first few candidates. Outcomes are
    /// ignored; a failure here has no effect on the showcase.
    async fn spawn_preload(&self, candidates: &[String]) {
        let warm: Vec<String> = candidates
            .iter()
            .take(PRELOAD_CANDIDATE_COUNT)
            .cloned()
            .collect();
        let prober = Arc::clone(&self.prober);
        let task = tokio::spawn(async move {
            futures::future::join_all(warm.iter().map(|uri| {
                let prober = Arc::clone(&prober);
                async move {
                    let _ = prober.probe(uri).await;
                }
            }))
            .await;
        });
        self.background_tasks.lock().await.push(task);
    }

    /// Submit the selected photo for analysis.
    ///
    /// On success the result list is persisted for the result screen and
    /// also returned for in-memory navigation. A failure leaves the screen
    /// fully usable; it reaches the surface through the returned error and
    /// the event stream.
    pub async fn submit(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<MatchResult>, SubmitError> {
        match self.analyze.analyze(filename, bytes).await {
            Ok(results) => {
                if let Err(err) = self.store.save_results(ANALYZE_RESULTS_KEY, &results).await {
                    // The in-memory copy still reaches the result screen.
                    warn!(session = %self.session, "failed to persist analysis results: {err:#}");
                }
                let _ = self.events.send(ScreenEvent::AnalyzeCompleted {
                    results: results.clone(),
                });
                Ok(results)
            }
            Err(err) => {
                let _ = self.events.send(ScreenEvent::AnalyzeFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub async fn showcase(&self) -> Vec<String> {
        self.showcase.read().await.clone()
    }

    pub async fn left_image(&self) -> Option<String> {
        self.left.current().await
    }

    pub async fn right_image(&self) -> Option<String> {
        self.right.current().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ScreenEvent> {
        self.events.subscribe()
    }

    /// Leave the screen: cancel background work and stop both panes.
    pub async fn teardown(&self) {
        for task in self.background_tasks.lock().await.drain(..) {
            task.abort();
        }
        self.left.stop().await;
        self.right.stop().await;
        info!(session = %self.session, "upload screen torn down");
    }
}

/// Different, decorrelated start positions for the two panes: the left seed
/// comes from the clock, the right pane runs half a cycle out of phase.
fn decorrelated_seeds(len: usize) -> (usize, usize) {
    if len == 0 {
        return (0, 0);
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos() as usize)
        .unwrap_or(0);
    let left = nanos % len;
    let right = (left + (len + 1) / 2) % len;
    (left, right)
}

/// One renderable result: the analysis match completed from the member
/// index when the endpoint left profile or goods links out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub group: String,
    pub name: String,
    pub image_url: String,
    pub profile_url: Option<String>,
    pub goods: GoodsLinks,
}

/// Share affordances for one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareLinks {
    pub x_url: String,
    pub line_url: String,
}

/// Session state behind the result surface.
pub struct ResultScreen {
    session: Uuid,
    http: reqwest::Client,
    options: ScreenOptions,
    store: Storage,
    index: RwLock<MemberIndex>,
    results: RwLock<Vec<MatchResult>>,
    /// Where the share links send new visitors.
    upload_page_url: String,
}

impl ResultScreen {
    pub fn new(
        options: ScreenOptions,
        store: Storage,
        upload_page_url: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session: Uuid::new_v4(),
            http: reqwest::Client::new(),
            options,
            store,
            index: RwLock::new(MemberIndex::empty()),
            results: RwLock::new(Vec::new()),
            upload_page_url: upload_page_url.into(),
        })
    }

    /// Enter the screen. Navigation state takes precedence over the stored
    /// copy; a missing or invalid stored payload reads as the empty set,
    /// never as an error.
    pub async fn mount(&self, navigation_results: Option<Vec<MatchResult>>) {
        let (index, stored) = tokio::join!(
            MemberIndex::load(&self.http, &self.options.members_url),
            self.load_stored()
        );
        *self.index.write().await = index;

        let results = navigation_results.or(stored).unwrap_or_default();
        info!(session = %self.session, results = results.len(), "result screen mounted");
        *self.results.write().await = results;
    }

    async fn load_stored(&self) -> Option<Vec<MatchResult>> {
        match self.store.load_results(ANALYZE_RESULTS_KEY).await {
            Ok(stored) => stored.map(|entry| entry.results),
            Err(err) => {
                warn!(session = %self.session, "stored results unavailable: {err:#}");
                None
            }
        }
    }

    /// Whether the renderer should offer the way back to the upload screen
    /// instead of cards.
    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }

    /// The cards to render. Profile and goods links missing from a result
    /// fall back to the canonical record under the same normalized name.
    pub async fn cards(&self) -> Vec<ResultCard> {
        let index = self.index.read().await;
        self.results
            .read()
            .await
            .iter()
            .map(|result| {
                let canonical = index.get(&result.name);
                let profile_url = result
                    .profile_url
                    .clone()
                    .or_else(|| canonical.and_then(|member| member.profile_url.clone()));
                let goods = if result.goods.is_empty() {
                    canonical
                        .map(|member| member.marketplace_links())
                        .unwrap_or_default()
                } else {
                    result.goods.clone()
                };
                ResultCard {
                    group: result.group.clone(),
                    name: result.name.clone(),
                    image_url: result.image_url.clone(),
                    profile_url,
                    goods,
                }
            })
            .collect()
    }

    /// Share links for the current result set: X with hashtags, LINE with
    /// text only, both built from the top three matches.
    pub async fn share_links(&self) -> ShareLinks {
        build_share_links(&self.results.read().await, &self.upload_page_url)
    }

    pub async fn teardown(&self) {
        info!(session = %self.session, "result screen torn down");
    }
}

fn build_share_links(results: &[MatchResult], upload_page_url: &str) -> ShareLinks {
    let top3: Vec<&MatchResult> = results.iter().take(3).collect();
    let names = top3
        .iter()
        .map(|result| format!("{}：{}", result.group, result.name))
        .collect::<Vec<_>>()
        .join("、");
    let text = format!("あなたの好きな人は...{names}です。診断はこちらから");

    // Comma-separated names with whitespace removed; the intent URL adds
    // the leading '#' itself.
    let hashtags = top3
        .iter()
        .map(|result| {
            result
                .name
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    let mut tweet_query = url::form_urlencoded::Serializer::new(String::new());
    tweet_query
        .append_pair("text", &text)
        .append_pair("url", upload_page_url);
    if !hashtags.is_empty() {
        tweet_query.append_pair("hashtags", &hashtags);
    }
    let x_url = format!("https://twitter.com/intent/tweet?{}", tweet_query.finish());

    let mut line_query = url::form_urlencoded::Serializer::new(String::new());
    line_query
        .append_pair("url", upload_page_url)
        .append_pair("text", &text);
    let line_url = format!(
        "https://social-plugins.line.me/lineit/share?{}",
        line_query.finish()
    );

    ShareLinks { x_url, line_url }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
