//! Collusion
//!
//! When a network's collusion flag is set, malicious sensors report full
//! satisfaction or trust about other malicious sensors and none about
//! everyone else. Honest sensors report the realized value.

use trm_events::Service;

use crate::conditions::{Malicious, SearchCondition};
use crate::topology::{Network, SensorId};

/// True when `reporter` lies in its reports about `service`.
pub fn is_colluding<S>(network: &Network<S>, reporter: SensorId, service: &Service) -> bool {
    if !network.flags.collusion {
        return false;
    }
    network.sensor(reporter).map_or(false, |s| {
        !s.is_privileged() && Malicious::new(service.clone()).matches(network, s)
    })
}

/// True when `subject` is a malicious server for `service`.
pub fn is_malicious<S>(network: &Network<S>, subject: SensorId, service: &Service) -> bool {
    network
        .sensor(subject)
        .map_or(false, |s| Malicious::new(service.clone()).matches(network, s))
}

/// Opinion `reporter` gives about `subject`, given its honest opinion.
pub fn reported_opinion<S>(
    network: &Network<S>,
    reporter: SensorId,
    subject: SensorId,
    service: &Service,
    honest: f64,
) -> f64 {
    if is_colluding(network, reporter, service) {
        if is_malicious(network, subject, service) {
            1.0
        } else {
            0.0
        }
    } else {
        honest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::topology::{NetworkFlags, Sensor};
    use trm_events::OfferedService;

    fn temperature() -> Service {
        Service::new(1, "Temperature")
    }

    fn network(collusion: bool) -> Network<()> {
        let mut net = Network::new(10.0).with_flags(NetworkFlags {
            collusion,
            ..Default::default()
        });
        for (id, goodness) in [(1, 0.0), (2, 0.1), (3, 1.0)] {
            net.add_sensor(
                Sensor::new(id, Position::default())
                    .with_client(true)
                    .with_service(OfferedService::relay())
                    .with_service(OfferedService::new(temperature(), goodness)),
            )
            .unwrap();
        }
        net
    }

    #[test]
    fn test_honest_without_flag() {
        let net = network(false);
        assert_eq!(reported_opinion(&net, 1, 3, &temperature(), 0.7), 0.7);
    }

    #[test]
    fn test_colluders_favour_each_other() {
        let net = network(true);
        let service = temperature();
        assert_eq!(reported_opinion(&net, 1, 2, &service, 0.0), 1.0);
        assert_eq!(reported_opinion(&net, 1, 3, &service, 1.0), 0.0);
        // Benevolent reporters stay honest
        assert_eq!(reported_opinion(&net, 3, 1, &service, 0.2), 0.2);
    }

    #[test]
    fn test_privileged_sensors_do_not_collude() {
        let net = network(true);
        net.sensor(1).unwrap().set_privileged(true);
        assert!(!is_colluding(&net, 1, &temperature()));
    }
}
