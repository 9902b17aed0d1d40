use super::glyph::{GlyphPainter, GlyphStroke};
use crate::detector::DetectedFace;
use crate::geometry::Point;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random numbers in `[0, 1)` for particle spawning
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f32;
}

/// Default source backed by `StdRng`
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_unit(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

/// Replays a fixed sequence, cycling when exhausted
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f32>,
    index: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, index: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.5;
        }
        let value = self.values[self.index % self.values.len()];
        self.index += 1;
        value.clamp(0.0, 0.999_999)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub glyph: &'static str,
    pub size: f32,
}

impl Particle {
    fn integrate(&mut self, gravity: f32) {
        self.x += self.vx;
        self.y += self.vy;
        self.vy += gravity;
    }

    /// Above the top edge or well below the bottom
    pub fn is_out_of_bounds(&self, height: u32) -> bool {
        self.y < -2.0 * self.size || self.y > height as f32 + 2.0 * self.size
    }
}

/// Bounded pool of gravity-driven glyph particles
pub struct ParticleSystem {
    particles: Vec<Particle>,
    gravity: f32,
    rng: Box<dyn RandomSource>,
}

impl ParticleSystem {
    pub fn new(gravity: f32, rng: Box<dyn RandomSource>) -> Self {
        Self {
            particles: Vec::new(),
            gravity,
            rng,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// One new particle rising from the top of each face, up to `cap`
    pub fn spawn_from_faces(&mut self, faces: &[DetectedFace], glyph: &'static str, cap: usize) {
        for face in faces {
            if self.particles.len() >= cap {
                break;
            }
            let origin = face.bbox.at(self.rng.next_unit(), 0.0);
            let size = face.width() * (0.1 + 0.1 * self.rng.next_unit());
            let vx = (self.rng.next_unit() - 0.5) * 2.0;
            let vy = -(1.0 + 2.0 * self.rng.next_unit());
            self.push(origin, vx, vy, glyph, size);
        }
    }

    /// One new particle falling from a random spot along the top band, up to `cap`
    pub fn spawn_in_frame(&mut self, width: u32, height: u32, glyph: &'static str, cap: usize) {
        if self.particles.len() >= cap {
            return;
        }
        let origin = Point::new(
            self.rng.next_unit() * width as f32,
            self.rng.next_unit() * height as f32 * 0.1,
        );
        let size = width as f32 * (0.03 + 0.03 * self.rng.next_unit());
        let vx = (self.rng.next_unit() - 0.5) * 1.0;
        let vy = 0.5 + self.rng.next_unit();
        self.push(origin, vx, vy, glyph, size);
    }

    fn push(&mut self, origin: Point, vx: f32, vy: f32, glyph: &'static str, size: f32) {
        self.particles.push(Particle {
            x: origin.x,
            y: origin.y,
            vx,
            vy,
            glyph,
            size,
        });
    }

    /// Integrate, draw, then cull. Returns the number of particles drawn.
    pub fn step(&mut self, canvas: &mut RgbaImage, painter: &dyn GlyphPainter, accent: [u8; 3]) -> usize {
        for particle in &mut self.particles {
            particle.integrate(self.gravity);
        }

        for particle in &self.particles {
            painter.paint(
                canvas,
                &GlyphStroke {
                    glyph: particle.glyph,
                    center: Point::new(particle.x, particle.y),
                    size: particle.size,
                    opacity: 1.0,
                    accent,
                },
            );
        }
        let drawn = self.particles.len();

        let height = canvas.height();
        self.particles.retain(|particle| !particle.is_out_of_bounds(height));
        drawn
    }
}
