//! Search Conditions
//!
//! Predicates classifying a sensor, used as targets of path search.
//!
//! For a given service, `Malicious`, `Benevolent` and `Relay` partition the
//! servers: relays offer exactly one service, the others offer the service
//! plus at least one more and are split by goodness.

use trm_events::{Service, BENEVOLENCE_THRESHOLD};

use crate::topology::{Network, Sensor, SensorId};

/// A predicate over a sensor of `network`.
pub trait SearchCondition<S> {
    fn matches(&self, network: &Network<S>, sensor: &Sensor<S>) -> bool;
}

impl<S, F> SearchCondition<S> for F
where
    F: Fn(&Network<S>, &Sensor<S>) -> bool,
{
    fn matches(&self, network: &Network<S>, sensor: &Sensor<S>) -> bool {
        self(network, sensor)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IsClient;

impl<S> SearchCondition<S> for IsClient {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.client
    }
}

/// Any sensor offering at least one service.
#[derive(Debug, Clone, Copy)]
pub struct IsServer;

impl<S> SearchCondition<S> for IsServer {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.is_server()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Active;

impl<S> SearchCondition<S> for Active {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.active
    }
}

#[derive(Debug, Clone)]
pub struct OffersService {
    pub service: Service,
}

impl OffersService {
    pub fn new(service: Service) -> Self {
        Self { service }
    }
}

impl<S> SearchCondition<S> for OffersService {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.offers(&self.service)
    }
}

/// Offers the service with goodness >= 0.5 and is not a pure relay.
#[derive(Debug, Clone)]
pub struct Benevolent {
    pub service: Service,
}

impl Benevolent {
    pub fn new(service: Service) -> Self {
        Self { service }
    }
}

impl<S> SearchCondition<S> for Benevolent {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.services.len() > 1
            && sensor
                .goodness(&self.service)
                .map_or(false, |g| g >= BENEVOLENCE_THRESHOLD)
    }
}

/// Offers the service with goodness < 0.5 and is not a pure relay.
#[derive(Debug, Clone)]
pub struct Malicious {
    pub service: Service,
}

impl Malicious {
    pub fn new(service: Service) -> Self {
        Self { service }
    }
}

impl<S> SearchCondition<S> for Malicious {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.services.len() > 1
            && sensor
                .goodness(&self.service)
                .map_or(false, |g| g < BENEVOLENCE_THRESHOLD)
    }
}

/// Offers exactly one service.
#[derive(Debug, Clone, Copy)]
pub struct Relay;

impl<S> SearchCondition<S> for Relay {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.is_relay_only()
    }
}

/// Pre-trusted peer, power node or RSU.
#[derive(Debug, Clone, Copy)]
pub struct Privileged;

impl<S> SearchCondition<S> for Privileged {
    fn matches(&self, _: &Network<S>, sensor: &Sensor<S>) -> bool {
        sensor.is_privileged()
    }
}

/// At most `max_hops` away from `origin`.
#[derive(Debug, Clone, Copy)]
pub struct WithinHops {
    pub origin: SensorId,
    pub max_hops: usize,
}

impl WithinHops {
    pub fn new(origin: SensorId, max_hops: usize) -> Self {
        Self { origin, max_hops }
    }
}

impl<S> SearchCondition<S> for WithinHops {
    fn matches(&self, network: &Network<S>, sensor: &Sensor<S>) -> bool {
        network
            .distance_in_hops(self.origin, sensor.id)
            .map_or(false, |hops| hops <= self.max_hops)
    }
}

#[derive(Debug, Clone)]
pub struct And<A, B>(pub A, pub B);

impl<S, A: SearchCondition<S>, B: SearchCondition<S>> SearchCondition<S> for And<A, B> {
    fn matches(&self, network: &Network<S>, sensor: &Sensor<S>) -> bool {
        self.0.matches(network, sensor) && self.1.matches(network, sensor)
    }
}

#[derive(Debug, Clone)]
pub struct Not<A>(pub A);

impl<S, A: SearchCondition<S>> SearchCondition<S> for Not<A> {
    fn matches(&self, network: &Network<S>, sensor: &Sensor<S>) -> bool {
        !self.0.matches(network, sensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use trm_events::OfferedService;

    fn temperature() -> Service {
        Service::new(1, "Temperature")
    }

    fn network() -> Network<()> {
        let mut net = Network::new(10.0);
        net.add_sensor(Sensor::new(1, Position::default()).with_client(true))
            .unwrap();
        net.add_sensor(Sensor::new(2, Position::default()).with_service(OfferedService::relay()))
            .unwrap();
        net.add_sensor(
            Sensor::new(3, Position::default())
                .with_service(OfferedService::relay())
                .with_service(OfferedService::new(temperature(), 0.5)),
        )
        .unwrap();
        net.add_sensor(
            Sensor::new(4, Position::default())
                .with_service(OfferedService::relay())
                .with_service(OfferedService::new(temperature(), 0.49)),
        )
        .unwrap();
        net.link(1, 2).unwrap();
        net.link(2, 3).unwrap();
        net.link(3, 4).unwrap();
        net
    }

    #[test]
    fn test_server_classes_partition_servers() {
        let net = network();
        let service = temperature();
        for sensor in net.servers() {
            let classes = [
                Benevolent::new(service.clone()).matches(&net, sensor),
                Malicious::new(service.clone()).matches(&net, sensor),
                Relay.matches(&net, sensor),
            ];
            assert_eq!(classes.iter().filter(|&&c| c).count(), 1, "sensor {}", sensor.id);
        }
    }

    #[test]
    fn test_threshold_classification() {
        let net = network();
        let service = temperature();
        let s3 = net.sensor(3).unwrap();
        let s4 = net.sensor(4).unwrap();
        assert!(Benevolent::new(service.clone()).matches(&net, s3));
        assert!(Malicious::new(service).matches(&net, s4));
    }

    #[test]
    fn test_within_hops() {
        let net = network();
        let near = WithinHops::new(1, 2);
        assert!(near.matches(&net, net.sensor(3).unwrap()));
        assert!(!near.matches(&net, net.sensor(4).unwrap()));
    }

    #[test]
    fn test_combinators_and_closures() {
        let net = network();
        let cond = And(IsServer, Not(Relay));
        assert!(!cond.matches(&net, net.sensor(2).unwrap()));
        assert!(cond.matches(&net, net.sensor(3).unwrap()));

        let even = |_: &Network<()>, s: &Sensor<()>| s.id % 2 == 0;
        assert_eq!(net.find_paths(1, &even).len(), 1);
        assert!(IsClient.matches(&net, net.sensor(1).unwrap()));
    }
}
