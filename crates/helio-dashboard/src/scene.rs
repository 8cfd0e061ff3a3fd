use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::Rng;

/// Canvas extent in both axes; the sun sits at the origin.
pub const CANVAS_BOUND: f64 = 130.0;
/// First-order smoothing factor for the sun glow (settles within 1/e in
/// roughly ten frames).
pub const GLOW_SMOOTHING: f64 = 0.1;
/// Fixed-rate pulse oscillator step per frame, independent of wall time.
pub const PHASE_STEP: f64 = 0.05;
pub const PULSE_AMPLITUDE: f64 = 3.0;
/// Orbital rate while the speaker is mid-utterance.
pub const SPEAKING_RATE: f64 = 3.0;
/// Orbital rate while the agent process is down.
pub const IDLE_RATE: f64 = 0.3;
/// Chance per frame of plotting one faint background star.
pub const STAR_CHANCE: f64 = 0.02;

/// Immutable orbit descriptor plus the one per-frame mutable angle.
#[derive(Debug, Clone)]
pub struct Body {
    pub name: &'static str,
    pub orbit_radius: f64,
    pub angular_speed: f64,
    pub size: f64,
    pub base_color: u32,
    pub ringed: bool,
    pub angle: f64,
}

impl Body {
    pub fn position(&self) -> (f64, f64) {
        (
            self.angle.cos() * self.orbit_radius,
            self.angle.sin() * self.orbit_radius,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Sun {
    pub disk_radius: f64,
    pub glow_radius: f64,
    pub phase: f64,
}

/// What the scene needs from the session state each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSignals {
    pub speaking: bool,
    pub running: bool,
    pub speed_multiplier: f64,
    pub glow_target: f64,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub sun: Sun,
    pub bodies: Vec<Body>,
    /// One faint star plotted this frame, if the dice said so.
    pub star: Option<(f64, f64)>,
}

impl Scene {
    pub fn new() -> Self {
        let body = |name, orbit_radius, angular_speed, size, base_color, ringed, angle| Body {
            name,
            orbit_radius,
            angular_speed,
            size,
            base_color,
            ringed,
            angle,
        };
        Self {
            sun: Sun {
                disk_radius: 9.0,
                glow_radius: 15.0,
                phase: 0.0,
            },
            bodies: vec![
                body("mercury", 28.0, 0.020, 1.2, 0x9c8e7e, false, 0.0),
                body("venus", 38.0, 0.0155, 1.9, 0xe6c78a, false, 1.1),
                body("earth", 48.0, 0.012, 2.1, 0x5a8dd6, false, 2.4),
                body("mars", 58.0, 0.010, 1.6, 0xc1562f, false, 3.9),
                body("jupiter", 76.0, 0.007, 4.6, 0xd2a679, false, 5.0),
                body("saturn", 92.0, 0.0055, 4.0, 0xe3c98f, true, 0.7),
                body("uranus", 106.0, 0.0042, 3.0, 0x8fd1d6, false, 2.0),
                body("neptune", 120.0, 0.0034, 2.9, 0x4f6dd1, false, 4.4),
            ],
            star: None,
        }
    }

    /// Advance the smoothed and angular quantities by one frame. The sole
    /// writer of body angles.
    pub fn advance(&mut self, signals: &FrameSignals, rng: &mut StdRng) {
        self.star = if rng.random::<f64>() < STAR_CHANCE {
            Some((
                rng.random_range(-CANVAS_BOUND..CANVAS_BOUND),
                rng.random_range(-CANVAS_BOUND..CANVAS_BOUND),
            ))
        } else {
            None
        };

        self.sun.glow_radius += (signals.glow_target - self.sun.glow_radius) * GLOW_SMOOTHING;
        self.sun.phase += PHASE_STEP;

        let rate = if signals.speaking {
            SPEAKING_RATE
        } else if signals.running {
            signals.speed_multiplier
        } else {
            IDLE_RATE
        };
        for body in &mut self.bodies {
            body.angle = (body.angle + body.angular_speed * rate) % TAU;
        }
    }

    /// Pulse modulation applied to the glow and corona radii.
    pub fn pulse_offset(&self) -> f64 {
        self.sun.phase.sin() * PULSE_AMPLITUDE
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn quiet_signals() -> FrameSignals {
        FrameSignals {
            speaking: false,
            running: false,
            speed_multiplier: 1.0,
            glow_target: 15.0,
        }
    }

    #[test]
    fn exactly_one_ringed_body() {
        let scene = Scene::new();
        assert_eq!(scene.bodies.len(), 8);
        let ringed: Vec<&str> = scene
            .bodies
            .iter()
            .filter(|b| b.ringed)
            .map(|b| b.name)
            .collect();
        assert_eq!(ringed, vec!["saturn"]);
    }

    #[test]
    fn orbits_are_distinct_and_inside_the_canvas() {
        let scene = Scene::new();
        for pair in scene.bodies.windows(2) {
            assert!(pair[0].orbit_radius < pair[1].orbit_radius);
        }
        for body in &scene.bodies {
            assert!(body.orbit_radius + body.size < CANVAS_BOUND);
        }
    }

    #[test]
    fn glow_radius_converges_onto_its_target() {
        let mut scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(1);
        let start = scene.sun.glow_radius;
        let target = 35.0;
        let signals = FrameSignals {
            glow_target: target,
            ..quiet_signals()
        };
        for _ in 0..30 {
            scene.advance(&signals, &mut rng);
        }
        // Within 5% of the full excursion after 30 frames of 0.1 smoothing.
        assert!((scene.sun.glow_radius - target).abs() < (target - start).abs() * 0.05);
    }

    #[test]
    fn smoothing_never_overshoots() {
        let mut scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(1);
        let signals = FrameSignals {
            glow_target: 35.0,
            ..quiet_signals()
        };
        let mut previous = scene.sun.glow_radius;
        for _ in 0..200 {
            scene.advance(&signals, &mut rng);
            assert!(scene.sun.glow_radius >= previous);
            assert!(scene.sun.glow_radius <= 35.0);
            previous = scene.sun.glow_radius;
        }
    }

    #[test]
    fn angles_advance_by_speed_times_rate_and_wrap() {
        let mut scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(1);
        let speaking = FrameSignals {
            speaking: true,
            running: true,
            speed_multiplier: 1.7,
            glow_target: 15.0,
        };
        let before: Vec<f64> = scene.bodies.iter().map(|b| b.angle).collect();
        scene.advance(&speaking, &mut rng);
        for (body, start) in scene.bodies.iter().zip(before) {
            let expected = (start + body.angular_speed * SPEAKING_RATE) % TAU;
            assert!((body.angle - expected).abs() < 1e-12);
            assert!(body.angle >= 0.0 && body.angle < TAU);
        }
    }

    #[test]
    fn idle_agent_still_drifts_slowly() {
        let mut scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(1);
        let start = scene.bodies[0].angle;
        scene.advance(&quiet_signals(), &mut rng);
        let expected = start + scene.bodies[0].angular_speed * IDLE_RATE;
        assert!((scene.bodies[0].angle - expected).abs() < 1e-12);
    }

    #[test]
    fn running_agent_uses_the_audio_multiplier() {
        let mut scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(1);
        let signals = FrameSignals {
            speaking: false,
            running: true,
            speed_multiplier: 2.5,
            glow_target: 15.0,
        };
        let start = scene.bodies[2].angle;
        scene.advance(&signals, &mut rng);
        let expected = start + scene.bodies[2].angular_speed * 2.5;
        assert!((scene.bodies[2].angle - expected).abs() < 1e-12);
    }

    #[test]
    fn star_field_is_deterministic_under_a_fixed_seed() {
        let mut first = Scene::new();
        let mut second = Scene::new();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let signals = quiet_signals();
        for _ in 0..500 {
            first.advance(&signals, &mut rng_a);
            second.advance(&signals, &mut rng_b);
            assert_eq!(first.star, second.star);
        }
    }

    #[test]
    fn stars_appear_on_roughly_two_percent_of_frames() {
        let mut scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(7);
        let signals = quiet_signals();
        let mut hits = 0usize;
        for _ in 0..10_000 {
            scene.advance(&signals, &mut rng);
            if scene.star.is_some() {
                hits += 1;
            }
        }
        assert!((100..=350).contains(&hits), "star hits out of band: {hits}");
    }
}
