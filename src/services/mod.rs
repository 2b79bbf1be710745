pub mod feed;
pub mod indicators;
pub mod patterns;
pub mod predictor;
pub mod runner;
pub mod sampler;
pub mod session;
pub mod window;

pub use feed::TickSimulator;
pub use indicators::{compute_moving_average, compute_oscillator, Indicator, Rsi, Sma};
pub use patterns::{detect, detect_at, detect_latest};
pub use predictor::{
    parse_prediction, HttpPredictor, PredictionRequest, Predictor, UnconfiguredPredictor,
};
pub use runner::{SessionAction, SessionHandle, SessionRunner};
pub use sampler::{Clock, SignalSampler, TickCounter};
pub use session::Session;
pub use window::BarWindow;
