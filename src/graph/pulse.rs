//! Edge pulse animation state machine.
//!
//! Each edge is either `Inactive` or `Active` since some start time. A
//! pulse's brightness follows a three-phase envelope: linear ramp-up over
//! the first fifth of its duration, full brightness through the middle,
//! linear ramp-down over the last fifth. Time is a caller-supplied seconds
//! value; the crate never reads a clock, so the frame loop (or a test)
//! owns time entirely.

use super::ProximityGraph;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Animation state of a single edge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PulseState {
    #[default]
    Inactive,
    Active {
        /// Clock value at activation.
        started: f64,
    },
}

/// Envelope output for an active edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseSignal {
    /// Brightness in [0, 1].
    Level(f64),
    /// The pulse has run its full duration; the edge deactivates.
    /// Distinct from `Level(0.0)`, which also occurs at ignition.
    Done,
}

/// Fraction of the duration spent ramping up (and, symmetrically, down).
const RAMP_FRACTION: f64 = 0.2;

/// Envelope value for a pulse `elapsed` seconds into its life.
pub fn envelope(elapsed: f64, duration: f64) -> PulseSignal {
    if elapsed >= duration {
        return PulseSignal::Done;
    }
    let progress = (elapsed / duration).max(0.0);
    let level = if progress < RAMP_FRACTION {
        progress / RAMP_FRACTION
    } else if progress < 1.0 - RAMP_FRACTION {
        1.0
    } else {
        (1.0 - progress) / RAMP_FRACTION
    };
    PulseSignal::Level(level)
}

/// Endpoint scale-up applied while a pulse is live.
pub fn node_scale(intensity: f64) -> f64 {
    1.0 + intensity * 0.3
}

/// A live pulse observed during a frame update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseFrame {
    /// Index into the graph's edge list.
    pub edge: usize,
    /// Envelope level this frame.
    pub intensity: f64,
}

impl ProximityGraph {
    /// Activate a uniformly random inactive edge.
    ///
    /// Returns the edge index, or `None` when every edge is already
    /// active (or the graph is empty) - not an error. This does not
    /// enforce any concurrency cap; that is the caller's policy (see
    /// [`PulseClock`]).
    pub fn trigger_pulse(&mut self, now: f64, rng: &mut impl Rng) -> Option<usize> {
        let inactive: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_active())
            .map(|(i, _)| i)
            .collect();
        if inactive.is_empty() {
            return None;
        }
        let chosen = inactive[rng.gen_range(0..inactive.len())];
        self.edges[chosen].state = PulseState::Active { started: now };
        Some(chosen)
    }

    /// Per-frame update: evaluate every active edge's envelope at `now`,
    /// deactivating those whose pulse has completed. Returns the surviving
    /// pulses with their current intensity.
    pub fn advance(&mut self, now: f64, duration: f64) -> Vec<PulseFrame> {
        let mut frames = Vec::new();
        for (index, edge) in self.edges.iter_mut().enumerate() {
            let PulseState::Active { started } = edge.state else {
                continue;
            };
            match envelope(now - started, duration) {
                PulseSignal::Done => edge.state = PulseState::Inactive,
                PulseSignal::Level(intensity) => frames.push(PulseFrame {
                    edge: index,
                    intensity,
                }),
            }
        }
        frames
    }

    /// Number of currently active edges.
    pub fn active_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_active()).count()
    }
}

/// Pulse scheduling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseParams {
    /// Lifetime of one pulse, seconds.
    pub duration: f64,
    /// Minimum gap between trigger attempts, seconds.
    pub trigger_interval: f64,
    /// Ceiling on simultaneously active edges; bounds per-frame work.
    pub max_active: usize,
}

impl Default for PulseParams {
    fn default() -> Self {
        Self {
            duration: 1.0,
            trigger_interval: 0.5,
            max_active: 24,
        }
    }
}

/// Caller-side trigger policy: fires at most one pulse per interval and
/// never lets the active set exceed `max_active`.
#[derive(Debug, Clone)]
pub struct PulseClock {
    params: PulseParams,
    last_trigger: Option<f64>,
}

impl PulseClock {
    pub fn new(params: PulseParams) -> Self {
        Self {
            params,
            last_trigger: None,
        }
    }

    pub fn params(&self) -> &PulseParams {
        &self.params
    }

    /// Call once per frame before `advance`. Triggers a pulse when the
    /// interval has elapsed and the cap allows it.
    pub fn tick(
        &mut self,
        graph: &mut ProximityGraph,
        now: f64,
        rng: &mut impl Rng,
    ) -> Option<usize> {
        if let Some(last) = self.last_trigger {
            if now - last < self.params.trigger_interval {
                return None;
            }
        }
        if graph.active_count() >= self.params.max_active {
            return None;
        }
        let triggered = graph.trigger_pulse(now, rng)?;
        self.last_trigger = Some(now);
        Some(triggered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphParams;
    use crate::holders::{Category, Record};
    use crate::layout::{LayoutGenerator, LayoutParams};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_graph(count: usize) -> ProximityGraph {
        let records: Vec<Record> = (0..count)
            .map(|i| Record {
                address: format!("wallet-{i}"),
                magnitude: 500.0,
                category: Category::Primary,
            })
            .collect();
        let gen = LayoutGenerator::new(LayoutParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(20);
        let points = gen.place_all(&records, &mut rng).unwrap();
        ProximityGraph::build(&points, &GraphParams::default(), &mut rng).unwrap()
    }

    #[test]
    fn envelope_phases() {
        let d = 1.0;
        assert_eq!(envelope(0.0, d), PulseSignal::Level(0.0));
        match envelope(0.1, d) {
            PulseSignal::Level(v) => assert_relative_eq!(v, 0.5),
            PulseSignal::Done => panic!("mid-ramp pulse reported done"),
        }
        assert_eq!(envelope(0.5, d), PulseSignal::Level(1.0));
        match envelope(0.9, d) {
            PulseSignal::Level(v) => assert_relative_eq!(v, 0.5, epsilon = 1e-12),
            PulseSignal::Done => panic!("ramp-down pulse reported done"),
        }
        assert_eq!(envelope(1.0, d), PulseSignal::Done);
        assert_eq!(envelope(2.0, d), PulseSignal::Done);
    }

    #[test]
    fn envelope_scales_with_duration() {
        assert_eq!(envelope(0.25, 0.5), PulseSignal::Level(1.0));
        assert_eq!(envelope(0.5, 0.5), PulseSignal::Done);
    }

    #[test]
    fn trigger_activates_and_saturates_to_none() {
        let mut graph = test_graph(6);
        let mut rng = StdRng::seed_from_u64(21);
        let total = graph.edges().len();
        assert!(total > 0);

        for _ in 0..total {
            assert!(graph.trigger_pulse(0.0, &mut rng).is_some());
        }
        assert_eq!(graph.active_count(), total);
        // All edges active: not an error, just nothing to do.
        assert_eq!(graph.trigger_pulse(0.0, &mut rng), None);
    }

    #[test]
    fn advance_expires_pulses() {
        let mut graph = test_graph(6);
        let mut rng = StdRng::seed_from_u64(22);
        let duration = 1.0;

        let edge = graph.trigger_pulse(10.0, &mut rng).unwrap();

        let frames = graph.advance(10.5, duration);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].edge, edge);
        assert_relative_eq!(frames[0].intensity, 1.0);

        let frames = graph.advance(11.0, duration);
        assert!(frames.is_empty());
        assert_eq!(graph.active_count(), 0);

        // The expired edge can pulse again later.
        assert!(graph.trigger_pulse(12.0, &mut rng).is_some());
    }

    #[test]
    fn clock_enforces_interval_and_cap() {
        let mut graph = test_graph(30);
        let mut rng = StdRng::seed_from_u64(23);
        let params = PulseParams {
            duration: 10.0, // long-lived pulses so the cap binds
            trigger_interval: 0.5,
            max_active: 3,
        };
        let mut clock = PulseClock::new(params);

        assert!(clock.tick(&mut graph, 0.0, &mut rng).is_some());
        // Too soon.
        assert_eq!(clock.tick(&mut graph, 0.2, &mut rng), None);
        assert!(clock.tick(&mut graph, 0.5, &mut rng).is_some());
        assert!(clock.tick(&mut graph, 1.0, &mut rng).is_some());
        // Cap reached.
        assert_eq!(clock.tick(&mut graph, 1.5, &mut rng), None);
        assert_eq!(graph.active_count(), 3);
    }

    #[test]
    fn node_scale_tracks_intensity() {
        assert_relative_eq!(node_scale(0.0), 1.0);
        assert_relative_eq!(node_scale(1.0), 1.3);
    }
}
