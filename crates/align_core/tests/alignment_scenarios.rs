//! End-to-end alignment of a synthetic household population through the
//! public API only.

use align_core::{
    seeded_rng, AlignError, AlignmentConfig, AlignmentSettings, LogitScaling, LogitScalingBinary,
    LogitScalingStrict, MultiProbabilityFns, MultiplicativeScaling, OutcomeClosure, ProbabilityFns,
    ResamplingAlignment, ResamplingConfig, ResamplingWeightedAlignment, Sidewalk, SortByDifference,
    Weighted,
};
use rand::{Rng, RngCore};
use rand_distr::{Beta, Distribution};

#[derive(Debug, Clone)]
struct Household {
    region: u8,
    p_move: f64,
    moved: bool,
    tenure: Vec<f64>,
    weight: f64,
}

impl Weighted for Household {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// Re-draws `moved` from the household's own probability.
struct Moving;

impl OutcomeClosure<Household> for Moving {
    fn outcome(&self, agent: &Household) -> bool {
        agent.moved
    }

    fn resample(&self, agent: &mut Household, rng: &mut dyn RngCore) {
        agent.moved = rng.gen::<f64>() < agent.p_move;
    }
}

fn households(n: usize, seed: u64) -> Vec<Household> {
    let mut rng = seeded_rng(seed);
    let beta = Beta::new(2.0, 5.0).unwrap();
    (0..n)
        .map(|i| {
            let p_move: f64 = beta.sample(&mut rng);
            let owner: f64 = rng.gen_range(0.1..0.8);
            let social: f64 = rng.gen_range(0.0..(1.0 - owner));
            Household {
                region: (i % 3) as u8,
                p_move,
                moved: rng.gen::<f64>() < p_move,
                tenure: vec![owner, social, 1.0 - owner - social],
                weight: rng.gen_range(0.5..3.0),
            }
        })
        .collect()
}

fn move_probability() -> ProbabilityFns<impl Fn(&Household) -> f64, impl Fn(&mut Household, f64)> {
    ProbabilityFns::new(|h: &Household| h.p_move, |h: &mut Household, p| h.p_move = p)
}

fn tenure(
) -> MultiProbabilityFns<impl Fn(&Household) -> Vec<f64>, impl Fn(&mut Household, Vec<f64>)> {
    MultiProbabilityFns::new(|h: &Household| h.tenure.clone(), |h: &mut Household, p| h.tenure = p)
}

#[test]
fn resampling_aligns_one_region_only() {
    let mut population = households(600, 1);
    let before: Vec<bool> = population.iter().map(|h| h.moved).collect();
    let north: &dyn Fn(&Household) -> bool = &|h| h.region == 0;

    let report = ResamplingAlignment::default()
        .align_share(&mut population, Some(north), &Moving, 0.4, &mut seeded_rng(2))
        .unwrap();

    assert!(report.converged, "{}", report.summary());
    let selected: Vec<&Household> = population.iter().filter(|h| h.region == 0).collect();
    let moved = selected.iter().filter(|h| h.moved).count() as f64;
    assert!((moved - 0.4 * selected.len() as f64).abs() <= 1.0);
    for (h, was) in population.iter().zip(before) {
        if h.region != 0 {
            assert_eq!(h.moved, was);
        }
    }
}

#[test]
fn resampling_is_reproducible_for_a_seed() {
    let run = |seed| {
        let mut population = households(300, 5);
        ResamplingAlignment::default()
            .align_count(&mut population, None, &Moving, 120, &mut seeded_rng(seed))
            .unwrap();
        population.iter().map(|h| h.moved).collect::<Vec<_>>()
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn weighted_resampling_matches_weighted_share() {
    let mut population = households(800, 3);
    let config = ResamplingConfig::default().with_warnings(false);
    let report = ResamplingWeightedAlignment::new(config)
        .align_share(&mut population, None, &Moving, 0.35, &mut seeded_rng(4))
        .unwrap();

    let total: f64 = population.iter().map(|h| h.weight).sum();
    let moved: f64 = population.iter().filter(|h| h.moved).map(|h| h.weight).sum();
    // Within one agent's weight of the target
    assert!((moved - 0.35 * total).abs() <= 3.0, "{}", report.summary());
}

#[test]
fn allocation_methods_produce_binary_outcomes() {
    let closure = move_probability();

    let mut population = households(250, 6);
    SortByDifference.align(&mut population, None, &closure, 0.2, &mut seeded_rng(7)).unwrap();
    assert_eq!(population.iter().filter(|h| h.p_move == 1.0).count(), 50);
    assert!(population.iter().all(|h| h.p_move == 0.0 || h.p_move == 1.0));

    let mut population = households(250, 6);
    let report = Sidewalk
        .align(&mut population, None, &closure, Some(0.2), &mut seeded_rng(7))
        .unwrap();
    assert_eq!(population.iter().filter(|h| h.p_move == 1.0).count(), 50);
    assert!(report.error < 1e-9);
}

#[test]
fn scaling_then_logit_agree_on_the_mean() {
    let closure = move_probability();

    let mut scaled = households(400, 8);
    MultiplicativeScaling.align(&mut scaled, None, &closure, 0.25).unwrap();
    let mean = scaled.iter().map(|h| h.p_move).sum::<f64>() / 400.0;
    assert!((mean - 0.25).abs() < 1e-9);

    let mut logit = households(400, 8);
    let config = AlignmentConfig::new(500, 1e-10).with_warnings(false);
    let report = LogitScalingBinary::new(config)
        .align_weighted(&mut logit, None, &closure, 0.25)
        .unwrap();
    assert!(report.converged);
    let total: f64 = logit.iter().map(|h| h.weight).sum();
    let weighted = logit.iter().map(|h| h.p_move * h.weight).sum::<f64>() / total;
    assert!((weighted - 0.25).abs() < 1e-6);
    assert!(logit.iter().all(|h| (0.0..=1.0).contains(&h.p_move)));
}

#[test]
fn tenure_choice_matches_margins() {
    let targets = [0.55, 0.15, 0.30];
    let closure = tenure();
    let config = AlignmentConfig::new(1000, 1e-10).with_warnings(false);

    for strict in [false, true] {
        let mut population = households(300, 9);
        let result = if strict {
            LogitScalingStrict::new(config.clone())
                .align_weighted(&mut population, None, &closure, &targets)
        } else {
            LogitScaling::new(config.clone())
                .align_weighted(&mut population, None, &closure, &targets)
        };
        assert!(result.unwrap().converged);

        let total: f64 = population.iter().map(|h| h.weight).sum();
        for (k, target) in targets.iter().enumerate() {
            let share = population.iter().map(|h| h.tenure[k] * h.weight).sum::<f64>() / total;
            assert!((share - target).abs() < 1e-4, "choice {}: {} vs {}", k, share, target);
        }
        for h in &population {
            assert!((h.tenure.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}

#[test]
fn strict_failure_leaves_population_untouched() {
    let mut population = households(50, 10);
    let before: Vec<Vec<f64>> = population.iter().map(|h| h.tenure.clone()).collect();
    let config = AlignmentConfig::new(1, 1e-15).with_warnings(false);

    let err = LogitScalingStrict::new(config)
        .align(&mut population, None, &tenure(), &[0.1, 0.1, 0.8])
        .unwrap_err();
    assert!(matches!(err, AlignError::NotConverged { .. }));
    for (h, row) in population.iter().zip(before) {
        assert_eq!(h.tenure, row);
    }
}

#[test]
fn settings_drive_algorithms() {
    let settings = AlignmentSettings::from_json(
        r#"{
            "scaling": { "max_iterations": 250, "precision": 1e-8, "warnings_enabled": false },
            "resampling": { "max_attempts": 5000, "final_attempts": 10 }
        }"#,
    )
    .unwrap();
    assert_eq!(settings.scaling.max_iterations, 250);
    assert_eq!(settings.resampling.max_attempts, Some(5000));

    let mut population = households(100, 12);
    let report = LogitScalingBinary::new(settings.scaling)
        .align(&mut population, None, &move_probability(), 0.5)
        .unwrap();
    assert!(report.converged);
    assert!(report.iterations <= 250);
}
