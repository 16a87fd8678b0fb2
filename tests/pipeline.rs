//! End-to-end pipeline: records through layout, graph, animation, and SVG.

use nebula::config::NebulaConfig;
use nebula::graph::pulse::PulseClock;
use nebula::graph::ProximityGraph;
use nebula::holders;
use nebula::layout::LayoutGenerator;
use nebula::render::SvgRenderer;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn full_pipeline_produces_bounded_animation() {
    let config = NebulaConfig::default();
    let records = holders::sample(1234, 120);
    let seed = holders::dataset_seed(&records);
    let mut rng = StdRng::seed_from_u64(seed);

    let generator = LayoutGenerator::new(config.layout_params()).unwrap();
    let points = generator.place_all(&records, &mut rng).unwrap();
    assert_eq!(points.len(), records.len());
    assert!(points.iter().all(|p| p.position.is_finite()));

    let mut graph = ProximityGraph::build(&points, &config.graph_params(), &mut rng).unwrap();
    assert!(!graph.is_empty());
    for edge in graph.edges() {
        assert_eq!(
            points[edge.a as usize].category,
            points[edge.b as usize].category,
            "edge crossed categories"
        );
    }

    let pulse_params = config.pulse_params();
    let duration = pulse_params.duration;
    let max_active = pulse_params.max_active;
    let mut clock = PulseClock::new(pulse_params);

    // Three simulated seconds at 60 fps.
    let mut fired = 0;
    for frame in 0..180u32 {
        let now = frame as f64 / 60.0;
        if clock.tick(&mut graph, now, &mut rng).is_some() {
            fired += 1;
        }
        let pulses = graph.advance(now, duration);
        assert!(graph.active_count() <= max_active);
        for pulse in &pulses {
            assert!(
                (0.0..=1.0).contains(&pulse.intensity),
                "intensity {} out of range",
                pulse.intensity
            );
        }

        if frame == 90 {
            let svg = SvgRenderer::new(512, 512).render(&points, &graph, &pulses);
            assert!(svg.contains("<svg"));
            assert!(svg.matches("<circle").count() >= points.len());
        }
    }

    // One pulse per half second, minus the first-frame offset.
    assert!(fired >= 5, "only {fired} pulses fired in three seconds");
}

#[test]
fn regenerating_a_layout_redraws_the_jitter() {
    let config = NebulaConfig::default();
    let records = holders::sample(99, 40);
    let generator = LayoutGenerator::new(config.layout_params()).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let first = generator.place_all(&records, &mut rng).unwrap();
    let second = generator.place_all(&records, &mut rng).unwrap();

    // Coordinates move between generations, shells do not.
    assert!(first
        .iter()
        .zip(&second)
        .any(|(a, b)| a.position != b.position));
    for index in 0..records.len() {
        assert_eq!(
            generator.shell_index(index, records.len()).unwrap(),
            generator.shell_index(index, records.len()).unwrap()
        );
    }
}
