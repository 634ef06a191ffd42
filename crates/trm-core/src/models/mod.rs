//! Trust Models
//!
//! EigenTrust, PeerTrust, PowerTrust and TRIP.

pub mod eigentrust;
pub mod peertrust;
pub mod powertrust;
pub mod trip;

pub use eigentrust::{EigenTrust, EigenTrustParams, EigenTrustState};
pub use peertrust::{PeerTrust, PeerTrustParams};
pub use powertrust::{PowerTrust, PowerTrustParams, PowerTrustState};
pub use trip::{Trip, TripParams, TripState, WeightTable};

use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::topology::{Network, Path};

/// Trust below this is treated as zero.
pub const ZERO_TRUST: f64 = 1e-6;

/// Number of privileged sensors for a percentage of `population`: rounded,
/// at least one when the percentage is positive, never more than `available`.
pub(crate) fn privileged_count(percentage: f64, population: usize, available: usize) -> usize {
    if percentage <= 0.0 {
        return 0;
    }
    let k = (percentage * population as f64).round() as usize;
    k.max(1).min(available)
}

/// Charges a request and response along every gathered path.
pub(crate) fn charge_requests<S>(
    network: &Network<S>,
    ledger: &mut EnergyLedger,
    paths: &[Path],
) -> Result<()> {
    for path in paths {
        ledger.charge_round_trip(network, path)?;
    }
    Ok(())
}
