// tests/section_controller.rs
//
// Section switching, the stale-fetch guard, timer-driven rotation and
// teardown. Timer tests run on a paused clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use techscope_carousel::cards::CardKind;
use techscope_carousel::ingest::providers::json_api::JsonApiProvider;
use techscope_carousel::ingest::types::{FeedProvider, RawRecord};
use techscope_carousel::ingest::{FeedAssembler, Section};
use techscope_carousel::normalize::Normalizer;
use techscope_carousel::render::{Frame, Renderer};
use techscope_carousel::rotation::RotationConfig;
use techscope_carousel::SectionController;

const NEWS: &str = r#"{"success": true, "data": [
    {"id": 1, "title": "First story", "content": "First story body with enough detail to be worth a card."},
    {"id": 2, "title": "Second story", "content": "Second story body with enough detail to be worth a card."},
    {"id": 3, "title": "Third story", "content": "Third story body with enough detail to be worth a card."}
]}"#;

const STOCKS: &str = r#"[
    {"symbol": "AAPL", "current_price": 189.84, "change": 2.31, "change_percent": 1.23},
    {"symbol": "MSFT", "current_price": 415.5, "change": -1.82, "change_percent": -0.44}
]"#;

#[derive(Default)]
struct Recorder {
    frames: Mutex<Vec<Frame>>,
}

impl Recorder {
    fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl Renderer for Recorder {
    fn render(&self, frame: &Frame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

/// Holds its fetch until the test opens the gate.
struct Gated {
    gate: Arc<Notify>,
    inner: JsonApiProvider,
}

#[async_trait]
impl FeedProvider for Gated {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        self.gate.notified().await;
        self.inner.fetch().await
    }
    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Takes longer than the refresh period to answer.
struct Slow {
    delay: Duration,
    inner: JsonApiProvider,
}

#[async_trait]
impl FeedProvider for Slow {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch().await
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Panics on the first frame, records the rest.
#[derive(Default)]
struct PanicsOnce {
    fired: AtomicBool,
    rec: Recorder,
}

impl Renderer for PanicsOnce {
    fn render(&self, frame: &Frame) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            panic!("renderer failed");
        }
        self.rec.render(frame);
    }
}

fn fixtures() -> FeedAssembler {
    FeedAssembler::new(
        Arc::new(JsonApiProvider::from_fixture("breaking", "[]")),
        Arc::new(JsonApiProvider::from_fixture("news", NEWS)),
        Arc::new(JsonApiProvider::from_fixture("stocks", STOCKS)),
        Normalizer::default(),
    )
}

fn controller(assembler: FeedAssembler) -> (SectionController, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let c = SectionController::new(assembler, rec.clone(), RotationConfig::default());
    (c, rec)
}

#[tokio::test]
async fn slow_news_fetch_cannot_overwrite_stocks() {
    let gate = Arc::new(Notify::new());
    let assembler = FeedAssembler::new(
        Arc::new(JsonApiProvider::from_fixture("breaking", "[]")),
        Arc::new(Gated {
            gate: gate.clone(),
            inner: JsonApiProvider::from_fixture("news", NEWS),
        }),
        Arc::new(JsonApiProvider::from_fixture("stocks", STOCKS)),
        Normalizer::default(),
    );
    let (c, _rec) = controller(assembler);

    let news_task = c.activate(Section::News);
    let stocks_task = c.activate(Section::Stocks);
    assert!(stocks_task.await.unwrap());

    gate.notify_one();
    assert!(!news_task.await.unwrap(), "superseded fetch must be discarded");

    let f = c.frame().expect("stocks frame");
    assert_eq!(f.section, Section::Stocks);
    assert_eq!(f.kind, CardKind::Quote);
    assert_eq!(f.total, 2);
}

#[tokio::test(start_paused = true)]
async fn frame_is_empty_until_the_feed_lands() {
    let (c, rec) = controller(fixtures());
    assert!(c.frame().is_none());
    assert!(c.next().is_none());

    assert!(c.activate(Section::News).await.unwrap());
    let f = c.frame().unwrap();
    assert_eq!((f.index, f.total), (0, 3));
    assert!(f.state.is_playing);
    assert_eq!(rec.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_controls_render_each_change() {
    let (c, rec) = controller(fixtures());
    c.activate(Section::News).await.unwrap();

    assert_eq!(c.next().unwrap().index, 1);
    assert_eq!(c.next().unwrap().index, 2);
    assert_eq!(c.next().unwrap().index, 0);
    assert_eq!(c.previous().unwrap().index, 2);
    let paused = c.toggle_play().unwrap();
    assert!(!paused.state.is_playing);
    assert_eq!(rec.count(), 6);
}

#[tokio::test(start_paused = true)]
async fn timer_advances_after_one_cycle() {
    let (c, _rec) = controller(fixtures());
    c.activate(Section::News).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let f = c.frame().unwrap();
    assert_eq!(f.index, 0);
    assert!(f.state.progress_fraction > 0.3);

    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(c.frame().unwrap().index, 1);
}

#[tokio::test(start_paused = true)]
async fn paused_rotation_stays_put() {
    let (c, _rec) = controller(fixtures());
    c.activate(Section::Stocks).await.unwrap();
    c.toggle_play();

    tokio::time::sleep(Duration::from_secs(20)).await;
    let f = c.frame().unwrap();
    assert_eq!(f.index, 0);
    assert_eq!(f.state.progress_fraction, 0.0);
}

#[tokio::test(start_paused = true)]
async fn nothing_renders_after_deactivate() {
    let (c, rec) = controller(fixtures());
    c.activate(Section::News).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    c.deactivate();
    let rendered = rec.count();
    tokio::time::sleep(Duration::from_secs(15)).await;

    assert_eq!(rec.count(), rendered);
    assert!(c.frame().is_none());
    assert!(c.active_section().is_none());
    assert!(c.refresh().is_none());
}

#[tokio::test]
async fn deactivate_discards_in_flight_fetch() {
    let gate = Arc::new(Notify::new());
    let assembler = FeedAssembler::new(
        Arc::new(JsonApiProvider::from_fixture("breaking", "[]")),
        Arc::new(JsonApiProvider::from_fixture("news", NEWS)),
        Arc::new(Gated {
            gate: gate.clone(),
            inner: JsonApiProvider::from_fixture("stocks", STOCKS),
        }),
        Normalizer::default(),
    );
    let (c, rec) = controller(assembler);

    let task = c.activate(Section::Stocks);
    c.deactivate();
    gate.notify_one();
    assert!(!task.await.unwrap());
    assert_eq!(rec.count(), 0);
}

#[tokio::test]
async fn refresh_keeps_play_state() {
    let (c, _rec) = controller(fixtures());
    c.activate(Section::News).await.unwrap();
    c.next();
    c.toggle_play();
    let before = c.generation();

    assert!(c.refresh().unwrap().await.unwrap());
    let f = c.frame().unwrap();
    assert!(c.generation() > before);
    assert_eq!(f.index, 0);
    assert!(!f.state.is_playing);
    assert_eq!(f.section, Section::News);
}

#[tokio::test]
async fn switching_sections_keeps_play_state() {
    let (c, _rec) = controller(fixtures());
    c.activate(Section::News).await.unwrap();
    c.toggle_play();

    c.activate(Section::Stocks).await.unwrap();
    let f = c.frame().unwrap();
    assert_eq!(f.kind, CardKind::Quote);
    assert!(!f.state.is_playing);
}

#[tokio::test(start_paused = true)]
async fn periodic_refresh_bumps_generation() {
    let rec = Arc::new(Recorder::default());
    let cfg = RotationConfig {
        refresh_secs: 30,
        ..Default::default()
    };
    let c = SectionController::new(fixtures(), rec, cfg);
    c.activate(Section::Stocks).await.unwrap();
    let g0 = c.generation();

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(c.generation() > g0);
    assert_eq!(c.frame().unwrap().section, Section::Stocks);
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_still_lands_with_short_refresh_period() {
    let assembler = FeedAssembler::new(
        Arc::new(JsonApiProvider::from_fixture("breaking", "[]")),
        Arc::new(JsonApiProvider::from_fixture("news", NEWS)),
        Arc::new(Slow {
            delay: Duration::from_secs(3),
            inner: JsonApiProvider::from_fixture("stocks", STOCKS),
        }),
        Normalizer::default(),
    );
    let rec = Arc::new(Recorder::default());
    let cfg = RotationConfig {
        refresh_secs: 1,
        ..Default::default()
    };
    let c = SectionController::new(assembler, rec.clone(), cfg);

    let _first = c.activate(Section::Stocks);
    tokio::time::sleep(Duration::from_secs(60)).await;

    let f = c.frame().expect("stocks frame");
    assert_eq!(f.section, Section::Stocks);
    assert_eq!(f.kind, CardKind::Quote);
    assert_eq!(f.total, 2);
    assert!(rec.count() > 0);
}

#[tokio::test]
async fn controller_survives_a_panicking_renderer() {
    let renderer = Arc::new(PanicsOnce::default());
    let c = SectionController::new(fixtures(), renderer.clone(), RotationConfig::default());

    let first = c.activate(Section::News).await;
    assert!(first.unwrap_err().is_panic());

    let f = c.frame().expect("cards were installed before the render");
    assert_eq!((f.index, f.total), (0, 3));
    let before = renderer.rec.count();
    assert_eq!(c.next().unwrap().index, 1);
    assert_eq!(renderer.rec.count(), before + 1);

    c.deactivate();
    assert!(c.frame().is_none());
}
