use rand::Rng;

const STATION_CODES: [&str; 12] = [
    "OSL", "HAM", "KNO", "TRD", "BRG", "SKI", "HRS", "GJO", "LIL", "KRS", "DRA", "TON",
];

/// A fixed observing site used by the synthetic dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSite {
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Scatters `count` stations around a centre. Codes beyond the named set are
/// numbered.
pub fn station_sites<R: Rng>(
    rng: &mut R,
    count: usize,
    center_lat: f64,
    center_lng: f64,
    spread_deg: f64,
) -> Vec<StationSite> {
    (0..count)
        .map(|index| {
            let code = STATION_CODES
                .get(index)
                .map(|code| code.to_string())
                .unwrap_or_else(|| format!("S{:02}", index));
            // Round to the precision stations are published with.
            let latitude = round4(center_lat + rng.gen_range(-spread_deg..spread_deg));
            let longitude = round4(center_lng + rng.gen_range(-spread_deg..spread_deg) * 2.0);
            StationSite {
                code,
                latitude,
                longitude,
            }
        })
        .collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
