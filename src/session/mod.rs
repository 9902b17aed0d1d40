mod controller;
mod state;

#[cfg(test)]
mod tests;

pub use controller::{CaptureSessionController, SessionDependencies};
pub use state::{sticker, stickers, SessionMode, SessionPhase, SessionState, Sticker, STICKERS};
