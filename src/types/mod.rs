pub mod bar;
pub mod pattern;
pub mod session;
pub mod signal;

pub use bar::*;
pub use pattern::*;
pub use session::*;
pub use signal::*;
