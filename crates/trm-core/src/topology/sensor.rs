//! Sensor
//!
//! A network node. Topology fields are only written while the network is
//! held exclusively; everything a concurrent client may touch lives behind
//! the per-sensor state lock or in the privileged flag.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use trm_events::{OfferedService, Service};

use crate::geometry::Position;
use crate::transaction::TransactionWindow;

/// Sensor identifier. Ids are unique within a network and start at 1.
pub type SensorId = u32;

/// Mutable per-sensor state shared between concurrently running clients.
#[derive(Debug, Clone, Default)]
pub struct SensorState<S> {
    /// Cumulative transmitted distance (energy proxy)
    pub transmitted_distance: f64,
    /// Transactions this sensor requested as a client
    pub given: TransactionWindow,
    /// Transactions this sensor served
    pub received: TransactionWindow,
    /// Model-specific extension state
    pub ext: S,
}

impl<S: Default> SensorState<S> {
    pub fn new(window_size: usize) -> Self {
        Self {
            transmitted_distance: 0.0,
            given: TransactionWindow::new(window_size),
            received: TransactionWindow::new(window_size),
            ext: S::default(),
        }
    }
}

#[derive(Debug)]
pub struct Sensor<S> {
    pub id: SensorId,
    pub position: Position,
    /// Ids of adjacent sensors, kept symmetric by the owning network
    pub neighbors: Vec<SensorId>,
    /// False while asleep in dynamic mode
    pub active: bool,
    pub client: bool,
    /// Offered services; non-empty for every server
    pub services: Vec<OfferedService>,
    privileged: AtomicBool,
    state: Mutex<SensorState<S>>,
}

impl<S: Default> Sensor<S> {
    pub fn new(id: SensorId, position: Position) -> Self {
        Self {
            id,
            position,
            neighbors: Vec::new(),
            active: true,
            client: false,
            services: Vec::new(),
            privileged: AtomicBool::new(false),
            state: Mutex::new(SensorState::default()),
        }
    }

    pub fn with_client(mut self, client: bool) -> Self {
        self.client = client;
        self
    }

    pub fn with_service(mut self, offer: OfferedService) -> Self {
        self.offer(offer);
        self
    }

    /// Resets shared state, keeping topology and services.
    pub fn reset_state(&mut self, window_size: usize) {
        *self.state.get_mut() = SensorState::new(window_size);
        self.privileged.store(false, Ordering::Relaxed);
    }
}

impl<S> Sensor<S> {
    pub fn is_server(&self) -> bool {
        !self.services.is_empty()
    }

    /// Adds an offering, replacing any previous offering of the same service.
    pub fn offer(&mut self, offer: OfferedService) {
        match self.services.iter_mut().find(|o| o.service == offer.service) {
            Some(existing) => *existing = offer,
            None => self.services.push(offer),
        }
    }

    pub fn offered(&self, service: &Service) -> Option<&OfferedService> {
        self.services.iter().find(|o| &o.service == service)
    }

    pub fn offers(&self, service: &Service) -> bool {
        self.offered(service).is_some()
    }

    pub fn goodness(&self, service: &Service) -> Option<f64> {
        self.offered(service).map(|o| o.goodness)
    }

    /// Sets goodness for an offered service. Returns false when the service
    /// is not offered.
    pub fn set_goodness(&mut self, service: &Service, goodness: f64) -> bool {
        match self.services.iter_mut().find(|o| &o.service == service) {
            Some(offer) => {
                offer.goodness = goodness.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// True when the sensor offers exactly one service.
    pub fn is_relay_only(&self) -> bool {
        self.services.len() == 1
    }

    pub fn is_neighbor(&self, other: SensorId) -> bool {
        self.neighbors.contains(&other)
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged.load(Ordering::Relaxed)
    }

    /// Marks the sensor as pre-trusted peer, power node or RSU.
    pub fn set_privileged(&self, privileged: bool) {
        self.privileged.store(privileged, Ordering::Relaxed);
    }

    /// Locks the shared state. Never hold two sensor locks at once.
    pub fn lock(&self) -> MutexGuard<'_, SensorState<S>> {
        self.state.lock()
    }

    pub fn state_mut(&mut self) -> &mut SensorState<S> {
        self.state.get_mut()
    }

    pub fn transmitted_distance(&self) -> f64 {
        self.state.lock().transmitted_distance
    }

    /// Adds `distance` to the transmitted-distance counter.
    pub fn add_transmitted(&self, distance: f64) {
        self.state.lock().transmitted_distance += distance;
    }
}

impl<S: Clone> Clone for Sensor<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            position: self.position,
            neighbors: self.neighbors.clone(),
            active: self.active,
            client: self.client,
            services: self.services.clone(),
            privileged: AtomicBool::new(self.is_privileged()),
            state: Mutex::new(self.state.lock().clone()),
        }
    }
}
