//! Property checks over randomly generated networks.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use trm_core::conditions::OffersService;
use trm_core::iteration::{power_iterate, uniform};
use trm_core::models::EigenTrustState;
use trm_core::{
    from_xml, to_xml, EigenTrust, GenerationConfig, IterationSettings, Network, NetworkFlags,
    SearchCondition, ServiceProfile, TrustMatrix,
};
use trm_events::{compute_outcomes, Outcome, Satisfaction, Service};

fn temperature() -> Service {
    Service::new(1, "Temperature")
}

fn config(num_sensors: usize, range_factor: f64) -> GenerationConfig {
    GenerationConfig {
        num_sensors,
        prob_client: 0.3,
        range_factor,
        max_distance: 100.0,
        profiles: vec![ServiceProfile {
            service: temperature(),
            prob_offer: 0.5,
            prob_goodness: 0.6,
        }],
        flags: NetworkFlags::default(),
    }
}

#[test]
fn test_generated_adjacency_is_symmetric() {
    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let net: Network<()> = Network::generate(&config(40, 0.2), &mut rng);
        for sensor in net.sensors() {
            assert!(!sensor.is_neighbor(sensor.id));
            for &n in &sensor.neighbors {
                assert!(net.sensor(n).unwrap().is_neighbor(sensor.id), "seed {}", seed);
                assert!(net.distance(sensor.id, n).unwrap() <= net.radio_range());
            }
        }
    }
}

#[test]
fn test_paths_stop_at_the_first_match() {
    let condition = OffersService::new(temperature());
    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let net: Network<()> = Network::generate(&config(50, 0.15), &mut rng);

        for client in net.active_clients() {
            for path in net.find_paths(client, &condition) {
                assert_eq!(path.source(), client);
                net.validate_path(&path).unwrap();
                let target = net.sensor(path.target()).unwrap();
                assert!(condition.matches(&net, target));
                for &id in path.intermediates() {
                    assert!(!condition.matches(&net, net.sensor(id).unwrap()));
                }
                let mut sensors = path.sensors().to_vec();
                sensors.sort_unstable();
                sensors.dedup();
                assert_eq!(sensors.len(), path.sensors().len(), "{} revisits a sensor", path);
            }
        }
    }
}

#[test]
fn test_global_trust_sums_to_one() {
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..20 {
        let n = rng.gen_range(2..12);
        let ids: Vec<u32> = (1..=n).collect();
        let mut matrix = TrustMatrix::new(ids.clone());
        for &i in &ids {
            for &j in &ids {
                if rng.gen_bool(0.4) {
                    matrix.set(i, j, rng.gen::<f64>());
                }
            }
        }
        let prior = uniform(ids.len());
        matrix.normalize_rows(&prior);

        let settings = IterationSettings {
            alpha: rng.gen_range(0.05..0.95),
            epsilon: 1e-6,
            max_iterations: 50,
        };
        let (trust, _) = power_iterate(&matrix, &prior, &prior, settings, "property");
        assert!((trust.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(trust.iter().all(|&t| t >= 0.0));
    }
}

#[test]
fn test_eigentrust_prior_on_generated_network() {
    let mut rng = SmallRng::seed_from_u64(9);
    let net: Network<EigenTrustState> = Network::generate(&config(30, 0.3), &mut rng);
    let prior = EigenTrust::prior(&net);
    assert_eq!(prior.len(), 30);
    assert!((prior.iter().sum::<f64>() - 1.0).abs() < 1e-12);
}

#[test]
fn test_power_iteration_terminates_for_any_alpha() {
    for alpha in [0.01, 0.15, 0.5, 0.99] {
        let mut matrix = TrustMatrix::new(vec![1, 2, 3]);
        matrix.set(1, 2, 1.0);
        matrix.set(2, 3, 1.0);
        matrix.set(3, 1, 1.0);
        let (scores, convergence) = power_iterate(
            &matrix,
            &[1.0, 0.0, 0.0],
            &[0.2, 0.3, 0.5],
            IterationSettings {
                alpha,
                epsilon: 1e-12,
                max_iterations: 200,
            },
            "property",
        );
        assert!(convergence.iterations <= 200);
        assert!(scores.iter().all(|&s| s >= 0.0));
    }
}

#[test]
fn test_compute_outcomes_laws() {
    let mut rng = SmallRng::seed_from_u64(5);
    assert!(compute_outcomes(&[], &mut rng).is_none());

    let single = Outcome::single(Satisfaction::interval(0.7, 0.0, 1.0), 3);
    assert_eq!(compute_outcomes(&[single.clone()], &mut rng), Some(single));
}

#[test]
fn test_outcome_mean_is_associative() {
    let mut rng = SmallRng::seed_from_u64(6);
    let outcomes: Vec<Outcome> = (0..6)
        .map(|i| Outcome::single(Satisfaction::interval(i as f64 / 5.0, 0.0, 1.0), i + 1))
        .collect();

    let all = compute_outcomes(&outcomes, &mut rng).unwrap();
    let left = compute_outcomes(&outcomes[..2], &mut rng).unwrap();
    let right = compute_outcomes(&outcomes[2..], &mut rng).unwrap();
    let split = compute_outcomes(&[left, right], &mut rng).unwrap();

    assert!((all.avg_satisfaction - split.avg_satisfaction).abs() < 1e-12);
    assert!((all.avg_path_length - split.avg_path_length).abs() < 1e-12);
    assert_eq!(all.transactions, split.transactions);
}

#[test]
fn test_generated_network_survives_xml() {
    let mut rng = SmallRng::seed_from_u64(13);
    let net: Network<()> = Network::generate(&config(25, 0.25), &mut rng);
    let loaded: Network<()> = from_xml(&to_xml(&net).unwrap()).unwrap();

    assert_eq!(loaded.len(), net.len());
    for sensor in net.sensors() {
        let copy = loaded.sensor(sensor.id).unwrap();
        assert_eq!(copy.services, sensor.services);
        assert_eq!(copy.neighbors.len(), sensor.neighbors.len());
    }
}
