pub mod fake_provider;

use fake_provider::FakeProvider;
use vitalstats::{Config, VitalStatsService};

/// Build a service over a fresh fake provider, returning a handle to the fake.
pub fn service_with(config: &Config, cores: usize) -> (VitalStatsService, FakeProvider) {
    let fake = FakeProvider::new(cores);
    let service = VitalStatsService::new(config, Box::new(fake.clone()))
        .expect("service should start");
    (service, fake)
}
