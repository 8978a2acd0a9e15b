// src/controller.rs
//! # Section Controller
//! Composition root for one carousel: activates sections, owns the rotation
//! scheduler and its ticker task, and forwards manual controls.
//!
//! Every mutation of the rotation (ticks, manual navigation, feed reloads)
//! happens under one mutex, so there is a single writer at any time.
//! Fetches are tagged with a generation; an assembled feed is applied only
//! if no newer activation, refresh, or teardown happened while it was in
//! flight.

use metrics::{counter, gauge};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cards::{kind_of, Card};
use crate::ingest::{ensure_metrics_described, FeedAssembler, Section};
use crate::render::{Frame, Renderer};
use crate::rotation::{RotationConfig, RotationScheduler};

pub struct SectionController {
    inner: Arc<Inner>,
}

struct Inner {
    assembler: FeedAssembler,
    renderer: Arc<dyn Renderer>,
    rotation: RotationConfig,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    generation: u64,
    section: Option<Section>,
    /// Empty while the active section is loading.
    cards: Vec<Card>,
    /// Lives from the first activation until deactivation; survives section
    /// switches so the play state carries over.
    scheduler: Option<RotationScheduler>,
    /// Generation of the fetch still running, if any.
    in_flight: Option<u64>,
    ticker: Option<JoinHandle<()>>,
    refresher: Option<JoinHandle<()>>,
}

impl State {
    fn frame(&self) -> Option<Frame> {
        let section = self.section?;
        let scheduler = self.scheduler.as_ref()?;
        let state = scheduler.state();
        let card = self.cards.get(state.current_index)?;
        Some(Frame {
            section,
            generation: self.generation,
            index: state.current_index,
            total: self.cards.len(),
            kind: kind_of(card),
            card: card.clone(),
            state,
        })
    }

    fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        gauge!("carousel_generation").set(self.generation as f64);
        self.generation
    }

    fn stop_tasks(&mut self) {
        if let Some(t) = self.ticker.take() {
            t.abort();
        }
        if let Some(t) = self.refresher.take() {
            t.abort();
        }
    }
}

impl Inner {
    /// A renderer that panicked mid-render leaves the state consistent
    /// (rendering is always the last step), so poisoning is not fatal.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` on the live rotation and render the result. No-op while
    /// nothing is showing.
    fn with_rotation(&self, op: impl FnOnce(&mut RotationScheduler)) -> Option<Frame> {
        let mut st = self.lock();
        if st.cards.is_empty() {
            return None;
        }
        op(st.scheduler.as_mut()?);
        let frame = st.frame()?;
        self.renderer.render(&frame);
        Some(frame)
    }

    fn on_tick(&self, delta: f64) {
        let mut st = self.lock();
        if st.cards.is_empty() {
            return;
        }
        let Some(scheduler) = st.scheduler.as_mut() else {
            return;
        };
        if !scheduler.is_playing() {
            return;
        }
        if scheduler.tick(delta) {
            counter!("rotation_advances_total").increment(1);
        }
        if let Some(frame) = st.frame() {
            self.renderer.render(&frame);
        }
    }

    /// Install an assembled feed if `generation` is still current.
    fn apply(&self, generation: u64, section: Section, cards: Vec<Card>) -> bool {
        let mut st = self.lock();
        if st.generation != generation || st.section != Some(section) {
            counter!("feed_stale_responses_total").increment(1);
            tracing::debug!(
                target: "controller",
                %section,
                generation,
                current = st.generation,
                "discarding stale feed"
            );
            return false;
        }

        let len = cards.len();
        st.in_flight = None;
        st.cards = cards;
        match st.scheduler.as_mut() {
            Some(s) => s.reload(len),
            None => st.scheduler = Some(RotationScheduler::start(len)),
        }
        tracing::info!(target: "controller", %section, generation, cards = len, "feed applied");

        if let Some(frame) = st.frame() {
            self.renderer.render(&frame);
        }
        true
    }
}

impl SectionController {
    pub fn new(
        assembler: FeedAssembler,
        renderer: Arc<dyn Renderer>,
        rotation: RotationConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            inner: Arc::new(Inner {
                assembler,
                renderer,
                rotation: rotation.sanitized(),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Switch to `section`: supersede any in-flight fetch, clear the cards,
    /// and start one assembly. The returned task resolves to `true` if its
    /// result was applied, `false` if something newer superseded it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate(&self, section: Section) -> JoinHandle<bool> {
        let generation = {
            let mut st = self.inner.lock();
            let generation = st.bump_generation();
            st.section = Some(section);
            st.in_flight = Some(generation);
            st.cards.clear();
            if st.ticker.is_none() {
                st.ticker = Some(spawn_ticker(Arc::downgrade(&self.inner), self.inner.rotation));
            }
            if st.refresher.is_none() {
                st.refresher = self
                    .inner
                    .rotation
                    .refresh_period()
                    .map(|period| spawn_refresher(Arc::downgrade(&self.inner), period));
            }
            generation
        };
        tracing::info!(target: "controller", %section, generation, "section activated");
        spawn_fetch(Arc::downgrade(&self.inner), generation, section)
    }

    /// Re-assemble the active section. Current cards stay visible until the
    /// new set lands; play state is preserved. `None` when no section is
    /// active.
    pub fn refresh(&self) -> Option<JoinHandle<bool>> {
        refresh_inner(&self.inner, true)
    }

    /// Leave the current section: stop the timer, drop the rotation, and
    /// invalidate any pending fetch. Nothing renders after this returns
    /// until the next activation.
    pub fn deactivate(&self) {
        let mut st = self.inner.lock();
        let generation = st.bump_generation();
        let section = st.section.take();
        st.cards.clear();
        st.in_flight = None;
        st.scheduler = None;
        st.stop_tasks();
        if let Some(section) = section {
            tracing::info!(target: "controller", %section, generation, "section deactivated");
        }
    }

    pub fn next(&self) -> Option<Frame> {
        self.inner.with_rotation(RotationScheduler::next)
    }

    pub fn previous(&self) -> Option<Frame> {
        self.inner.with_rotation(RotationScheduler::previous)
    }

    pub fn toggle_play(&self) -> Option<Frame> {
        self.inner.with_rotation(RotationScheduler::toggle_play)
    }

    /// What is on screen right now; `None` while loading or inactive.
    pub fn frame(&self) -> Option<Frame> {
        self.inner.lock().frame()
    }

    pub fn active_section(&self) -> Option<Section> {
        self.inner.lock().section
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn rotation_config(&self) -> RotationConfig {
        self.inner.rotation
    }
}

impl Drop for SectionController {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// `supersede = false` leaves a running fetch alone instead of replacing it,
/// so a refresh period shorter than the fetch cannot starve the section.
fn refresh_inner(inner: &Arc<Inner>, supersede: bool) -> Option<JoinHandle<bool>> {
    let (generation, section) = {
        let mut st = inner.lock();
        let section = st.section?;
        if !supersede {
            if let Some(pending) = st.in_flight {
                tracing::debug!(target: "controller", %section, pending, "fetch still running, refresh skipped");
                return None;
            }
        }
        let generation = st.bump_generation();
        st.in_flight = Some(generation);
        (generation, section)
    };
    tracing::debug!(target: "controller", %section, generation, "feed refresh");
    Some(spawn_fetch(Arc::downgrade(inner), generation, section))
}

fn spawn_fetch(inner: Weak<Inner>, generation: u64, section: Section) -> JoinHandle<bool> {
    tokio::spawn(async move {
        // Clone the assembler out so the controller can be dropped mid-fetch.
        let Some(assembler) = inner.upgrade().map(|i| i.assembler.clone()) else {
            return false;
        };
        let cards = assembler.assemble(section).await;
        match inner.upgrade() {
            Some(inner) => inner.apply(generation, section, cards),
            None => false,
        }
    })
}

fn spawn_ticker(inner: Weak<Inner>, cfg: RotationConfig) -> JoinHandle<()> {
    let delta = cfg.tick_delta();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.on_tick(delta);
        }
    })
}

fn spawn_refresher(inner: Weak<Inner>, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            refresh_inner(&inner, false);
        }
    })
}
