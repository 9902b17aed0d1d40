mod anchors;
mod catalog;
mod glyph;
mod particles;
mod render_loop;
mod renderer;
mod surface;


pub use anchors::{filter_placements, frame_centered_face, placements_for_anchor, GlyphPlacement};
pub use catalog::{ar_filter, ar_filters, Anchor, ArFilterDefinition, AR_FILTERS};
pub use glyph::{painter_from_config, FontGlyphPainter, GlyphPainter, GlyphStroke, SwatchPainter};
pub use particles::{Particle, ParticleSystem, RandomSource, SequenceRandom, StdRandom};
pub use render_loop::{OverlayRenderLoop, RenderInputs};
pub use renderer::{ArRenderer, RenderPath, TickReport};
pub use surface::{OverlaySurface, SharedOverlay};
