use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::types::{Provider, ProviderKind};

/// Streaming entries considered per region.
pub const STREAM_PER_REGION: usize = 3;
/// Rental entries considered per region.
pub const RENT_PER_REGION: usize = 2;
/// Providers kept per movie across all regions.
pub const MAX_PROVIDERS: usize = 6;

pub const DEFAULT_REGIONS: [&str; 5] = ["US", "GB", "IN", "CA", "AU"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchProvidersResponse {
    #[serde(default)]
    pub results: HashMap<String, RegionAvailability>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionAvailability {
    #[serde(default)]
    pub flatrate: Vec<WatchProviderEntry>,
    #[serde(default)]
    pub rent: Vec<WatchProviderEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchProviderEntry {
    pub provider_id: u64,
    pub provider_name: String,
    pub logo_path: Option<String>,
}

/// Unions availability across `regions`, visited in order.
///
/// Each region contributes at most [`STREAM_PER_REGION`] streaming and
/// [`RENT_PER_REGION`] rental entries; a provider id already taken from an
/// earlier region (or kind) is skipped, and collection stops at
/// [`MAX_PROVIDERS`].
pub fn aggregate_providers<S: AsRef<str>>(
    response: &WatchProvidersResponse,
    regions: &[S],
) -> Vec<Provider> {
    let mut providers = Vec::with_capacity(MAX_PROVIDERS);
    let mut seen = HashSet::new();

    'regions: for region in regions {
        let region = region.as_ref();
        let Some(availability) = response.results.get(region) else {
            continue;
        };

        let offers = availability
            .flatrate
            .iter()
            .take(STREAM_PER_REGION)
            .map(|entry| (entry, ProviderKind::Stream))
            .chain(
                availability
                    .rent
                    .iter()
                    .take(RENT_PER_REGION)
                    .map(|entry| (entry, ProviderKind::Rent)),
            );

        for (entry, kind) in offers {
            if providers.len() == MAX_PROVIDERS {
                break 'regions;
            }
            if !seen.insert(entry.provider_id) {
                continue;
            }
            providers.push(Provider {
                id: entry.provider_id,
                name: entry.provider_name.clone(),
                region: region.to_string(),
                kind,
                logo_path: entry.logo_path.clone(),
            });
        }
    }

    providers
}
