#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use playhead::engine::{EngineHandle, ReconciliationEngine};
use playhead::surface::{ElementEvent, MediaElement, RemoteEmbed, RemoteEvent, SurfaceAdapter};
use playhead::{EngineConfig, EngineState};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
struct RemoteMockState {
    current_time: Option<f64>,
    duration: Option<f64>,
    playing: bool,
    /// When false the mock records seeks without moving, simulating a
    /// surface that is slow to jump.
    apply_seeks: bool,
    seek_delays: VecDeque<Duration>,
    seeks: Vec<(u64, bool)>,
    plays: u32,
    pauses: u32,
}

/// Scripted remote embed: the test controls what the "surface" reports.
/// Play/pause emit state-change callbacks like a real embed would.
pub struct MockRemoteEmbed {
    state: Mutex<RemoteMockState>,
    events: mpsc::UnboundedSender<RemoteEvent>,
}

impl MockRemoteEmbed {
    pub fn new(events: mpsc::UnboundedSender<RemoteEvent>) -> Self {
        Self {
            state: Mutex::new(RemoteMockState {
                current_time: Some(0.0),
                duration: Some(600.0),
                apply_seeks: true,
                ..Default::default()
            }),
            events,
        }
    }

    pub fn set_position(&self, seconds: f64) {
        self.state.lock().unwrap().current_time = Some(seconds);
    }

    /// Put the embed into the playing state, emitting the same callback a
    /// real embed fires when playback starts.
    pub fn begin_playing(&self) {
        self.state.lock().unwrap().playing = true;
        let _ = self.events.send(RemoteEvent::StateChange { playing: true });
    }

    pub fn set_apply_seeks(&self, apply: bool) {
        self.state.lock().unwrap().apply_seeks = apply;
    }

    /// Queue a delay consumed by the next `seek_to` call.
    pub fn push_seek_delay(&self, delay: Duration) {
        self.state.lock().unwrap().seek_delays.push_back(delay);
    }

    pub fn seeks(&self) -> Vec<(u64, bool)> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn play_count(&self) -> u32 {
        self.state.lock().unwrap().plays
    }

    pub fn pause_count(&self) -> u32 {
        self.state.lock().unwrap().pauses
    }
}

#[async_trait]
impl RemoteEmbed for MockRemoteEmbed {
    async fn play(&self) -> Result<()> {
        let changed = {
            let mut state = self.state.lock().unwrap();
            state.plays += 1;
            let changed = !state.playing;
            state.playing = true;
            changed
        };
        if changed {
            let _ = self.events.send(RemoteEvent::StateChange { playing: true });
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let changed = {
            let mut state = self.state.lock().unwrap();
            state.pauses += 1;
            let changed = state.playing;
            state.playing = false;
            changed
        };
        if changed {
            let _ = self.events.send(RemoteEvent::StateChange { playing: false });
        }
        Ok(())
    }

    async fn seek_to(&self, seconds: u64, allow_seek_ahead: bool) -> Result<()> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.seeks.push((seconds, allow_seek_ahead));
            state.seek_delays.pop_front()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if state.apply_seeks {
            let clamped = match state.duration {
                Some(duration) => (seconds as f64).min(duration),
                None => seconds as f64,
            };
            state.current_time = Some(clamped);
        }
        Ok(())
    }

    async fn current_time(&self) -> Result<Option<f64>> {
        Ok(self.state.lock().unwrap().current_time)
    }

    async fn duration(&self) -> Result<Option<f64>> {
        Ok(self.state.lock().unwrap().duration)
    }
}

struct ElementState {
    current_time: f64,
    duration: f64,
    paused: bool,
    seeks: Vec<f64>,
    plays: u32,
    pauses: u32,
}

/// Scripted local media element with synchronous, clamping property access.
pub struct ScriptedElement {
    state: Mutex<ElementState>,
    events: mpsc::UnboundedSender<ElementEvent>,
}

impl ScriptedElement {
    pub fn new(events: mpsc::UnboundedSender<ElementEvent>, duration: f64) -> Self {
        Self {
            state: Mutex::new(ElementState {
                current_time: 0.0,
                duration,
                paused: true,
                seeks: Vec::new(),
                plays: 0,
                pauses: 0,
            }),
            events,
        }
    }

    pub fn set_time(&self, seconds: f64) {
        self.state.lock().unwrap().current_time = seconds;
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().unwrap().paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn play_count(&self) -> u32 {
        self.state.lock().unwrap().plays
    }

    pub fn pause_count(&self) -> u32 {
        self.state.lock().unwrap().pauses
    }
}

impl MediaElement for ScriptedElement {
    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        let mut state = self.state.lock().unwrap();
        state.seeks.push(seconds);
        state.current_time = seconds.clamp(0.0, state.duration);
    }

    fn duration(&self) -> Option<f64> {
        Some(self.state.lock().unwrap().duration)
    }

    fn play(&self) {
        let mut state = self.state.lock().unwrap();
        state.plays += 1;
        state.paused = false;
        let _ = self.events.send(ElementEvent::Play);
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.pauses += 1;
        state.paused = true;
        let _ = self.events.send(ElementEvent::Pause);
    }

    fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }
}

/// A running engine over a mock remote embed, already ready.
pub struct RemoteRig {
    pub embed: Arc<MockRemoteEmbed>,
    pub events: mpsc::UnboundedSender<RemoteEvent>,
    pub handle: EngineHandle,
}

pub async fn ready_remote_engine(config: EngineConfig, intended_start: Option<u64>) -> RemoteRig {
    init_logging();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let embed = Arc::new(MockRemoteEmbed::new(events_tx.clone()));
    let adapter = SurfaceAdapter::remote(embed.clone(), events_rx, config.ready_timeout());
    let handle = ReconciliationEngine::spawn(adapter, config, intended_start);

    // Send the readiness callback before awaiting anything, so the paused
    // test clock cannot auto-advance into the init timeout first.
    events_tx
        .send(RemoteEvent::Ready {
            duration_seconds: Some(600),
        })
        .unwrap();
    wait_for_state(&handle, |state| *state == EngineState::Ready).await;

    RemoteRig {
        embed,
        events: events_tx,
        handle,
    }
}

pub async fn wait_for_state(handle: &EngineHandle, want: fn(&EngineState) -> bool) {
    let mut states = handle.state_subscriber();
    if want(&states.current()) {
        return;
    }
    while let Some(state) = states.changed().await {
        if want(&state) {
            return;
        }
    }
    panic!("engine ended before reaching the expected state");
}
