//! Session Runner
//!
//! Drives a [`Session`] from a bar channel and a command channel, dispatches
//! prediction requests to a [`Predictor`] on background tasks, and publishes
//! a fresh [`SessionView`] after every change.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::services::predictor::{PredictionRequest, Predictor};
use crate::services::session::Session;
use crate::types::{
    Bar, IndicatorKind, IndicatorSettings, PatternConfig, PatternFilter, PredictionResult,
    PredictionSettings, SessionId, SessionView,
};

const BAR_BUFFER: usize = 64;
const COMMAND_BUFFER: usize = 16;

/// A change applied to the session through its handle.
#[derive(Debug, Clone)]
pub enum SessionAction {
    /// Historical bars ingested as a single tick. Ignored unless the
    /// session still has the given identity.
    Backfill(SessionId, Vec<Bar>),
    SetPair(String),
    SetPredictionSettings(PredictionSettings),
    SetIndicator(IndicatorKind, IndicatorSettings),
    SetPatternConfig(PatternConfig),
    SetPatternFilter(PatternFilter),
    DismissAlert,
}

struct SessionCommand {
    action: SessionAction,
    reply: oneshot::Sender<Result<SessionView>>,
}

type Completion = (PredictionRequest, Result<PredictionResult>);

/// A live bar and the session identity it was produced for.
type TaggedBar = (SessionId, Bar);

/// Cloneable handle for feeding and controlling a running session.
#[derive(Clone)]
pub struct SessionHandle {
    bars: mpsc::Sender<TaggedBar>,
    commands: mpsc::Sender<SessionCommand>,
    views: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Queue a bar produced for `session`. The runner drops it if the
    /// session has moved to another identity by the time it is dequeued.
    pub async fn send_bar(&self, session: SessionId, bar: Bar) -> Result<()> {
        self.bars
            .send((session, bar))
            .await
            .map_err(|_| AppError::Internal("session runner stopped".to_string()))
    }

    /// Apply an action and wait for the resulting view.
    pub async fn apply(&self, action: SessionAction) -> Result<SessionView> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand { action, reply })
            .await
            .map_err(|_| AppError::Internal("session runner stopped".to_string()))?;

        rx.await
            .map_err(|_| AppError::Internal("session runner dropped command".to_string()))?
    }

    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.views.borrow().clone()
    }

    pub fn session_id(&self) -> SessionId {
        self.views.borrow().session.clone()
    }

    /// Receiver notified on every published view.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.views.clone()
    }
}

/// Owns the session and serializes every mutation of it.
pub struct SessionRunner {
    session: Session,
    predictor: Arc<dyn Predictor>,
    bars: mpsc::Receiver<TaggedBar>,
    commands: mpsc::Receiver<SessionCommand>,
    views: watch::Sender<SessionView>,
    done_tx: mpsc::Sender<Completion>,
    done_rx: mpsc::Receiver<Completion>,
}

impl SessionRunner {
    pub fn new(session: Session, predictor: Arc<dyn Predictor>) -> (Self, SessionHandle) {
        let (bars_tx, bars_rx) = mpsc::channel(BAR_BUFFER);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (views_tx, views_rx) = watch::channel(session.view());
        let (done_tx, done_rx) = mpsc::channel(COMMAND_BUFFER);

        let runner = Self {
            session,
            predictor,
            bars: bars_rx,
            commands: commands_rx,
            views: views_tx,
            done_tx,
            done_rx,
        };
        let handle = SessionHandle {
            bars: bars_tx,
            commands: commands_tx,
            views: views_rx,
        };

        (runner, handle)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until every handle has been dropped.
    pub async fn run(mut self) {
        let id = self.session.id();
        info!("Session runner started for {} generation {}", id.pair, id.generation);

        let mut bars_open = true;
        let mut commands_open = true;

        while bars_open || commands_open {
            tokio::select! {
                bar = self.bars.recv(), if bars_open => match bar {
                    Some((session, bar)) => self.handle_bar(session, bar),
                    None => {
                        debug!("Bar channel closed");
                        bars_open = false;
                    }
                },
                command = self.commands.recv(), if commands_open => match command {
                    Some(SessionCommand { action, reply }) => {
                        let _ = reply.send(self.apply(action));
                    }
                    None => {
                        debug!("Command channel closed");
                        commands_open = false;
                    }
                },
                Some((request, outcome)) = self.done_rx.recv() => {
                    if self.session.complete_prediction(&request, outcome) {
                        self.publish();
                    }
                }
            }
        }

        info!("Session runner stopped");
    }

    fn handle_bar(&mut self, session: SessionId, bar: Bar) {
        if !self.is_current(&session) {
            return;
        }

        match self.session.on_new_bar(bar) {
            Ok(Some(request)) => self.dispatch(request),
            Ok(None) => {}
            // Already logged by the session; nothing changed.
            Err(_) => return,
        }
        self.publish();
    }

    fn dispatch(&self, request: PredictionRequest) {
        let predictor = self.predictor.clone();
        let done = self.done_tx.clone();

        tokio::spawn(async move {
            let outcome = predictor.predict(&request).await;
            if done.send((request, outcome)).await.is_err() {
                debug!("Session runner gone, dropping prediction");
            }
        });
    }

    fn apply(&mut self, action: SessionAction) -> Result<SessionView> {
        match action {
            SessionAction::Backfill(session, bars) => {
                if self.is_current(&session) {
                    if let Some(request) = self.session.backfill(bars) {
                        self.dispatch(request);
                    }
                }
            }
            SessionAction::SetPair(name) => self.session.set_pair(&name)?,
            SessionAction::SetPredictionSettings(settings) => {
                self.session.set_prediction_settings(settings);
            }
            SessionAction::SetIndicator(kind, settings) => {
                self.session.set_indicator(kind, settings)?
            }
            SessionAction::SetPatternConfig(config) => self.session.set_pattern_config(config),
            SessionAction::SetPatternFilter(filter) => self.session.set_pattern_filter(filter),
            SessionAction::DismissAlert => self.session.dismiss_alert(),
        }

        self.publish();
        Ok(self.session.view())
    }

    fn is_current(&self, session: &SessionId) -> bool {
        let current = self.session.id();
        if *session != current {
            debug!(
                "Dropping bars for {} generation {} (now {} generation {})",
                session.pair, session.generation, current.pair, current.generation
            );
            return false;
        }
        true
    }

    fn publish(&self) {
        self.views.send_replace(self.session.view());
    }
}
