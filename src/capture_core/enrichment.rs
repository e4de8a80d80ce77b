//! Geographic and organizational enrichment of addresses
//!
//! Every address gets an `EnrichmentInfo`, never an error:
//! - private/link-local/malformed → fixed `Private` sentinel, no lookup
//! - lookup hit without coordinates → `0,0` and city `Unknown (NoGeo)`
//! - lookup miss or failure → `Unknown` sentinel, reported as `Degraded`

use super::classifier::{classify, AddressClass};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

pub const PRIVATE_COUNTRY: &str = "Private";
pub const PRIVATE_CITY: &str = "LAN";
pub const PRIVATE_ORG: &str = "Private Network";
pub const UNKNOWN: &str = "Unknown";
pub const NO_GEO_CITY: &str = "Unknown (NoGeo)";

/// Resolved context for one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentInfo {
    pub country: String,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    /// `AS<number>`
    pub asn: Option<String>,
    pub org: Option<String>,
}

impl EnrichmentInfo {
    pub fn private() -> Self {
        Self {
            country: PRIVATE_COUNTRY.to_string(),
            city: PRIVATE_CITY.to_string(),
            lat: 0.0,
            lon: 0.0,
            asn: None,
            org: Some(PRIVATE_ORG.to_string()),
        }
    }

    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            city: NO_GEO_CITY.to_string(),
            lat: 0.0,
            lon: 0.0,
            asn: None,
            org: None,
        }
    }

    /// True when the address was placed on the map (non-zero coordinates)
    pub fn is_geolocated(&self) -> bool {
        (self.lat != 0.0 || self.lon != 0.0) && self.city != NO_GEO_CITY
    }
}

/// Outcome of one enrichment, so callers can see degradation
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Resolved(EnrichmentInfo),
    Degraded(EnrichmentInfo),
}

impl Enrichment {
    pub fn info(&self) -> &EnrichmentInfo {
        match self {
            Enrichment::Resolved(info) | Enrichment::Degraded(info) => info,
        }
    }

    pub fn into_info(self) -> EnrichmentInfo {
        match self {
            Enrichment::Resolved(info) | Enrichment::Degraded(info) => info,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Enrichment::Degraded(_))
    }
}

/// City-level lookup result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityHit {
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// ASN lookup result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsnHit {
    pub number: Option<u32>,
    pub organization: Option<String>,
}

#[derive(Debug)]
pub enum LookupError {
    NotFound(IpAddr),
    Dataset(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::NotFound(ip) => write!(f, "address not found: {}", ip),
            LookupError::Dataset(e) => write!(f, "dataset error: {}", e),
        }
    }
}

impl std::error::Error for LookupError {}

/// Local-dataset lookups (no network I/O)
pub trait GeoLookup: Send + Sync {
    fn city(&self, ip: IpAddr) -> Result<CityHit, LookupError>;
    fn asn(&self, ip: IpAddr) -> Result<AsnHit, LookupError>;
}

/// Enrichment engine over a `GeoLookup`
pub struct GeoEnricher {
    lookup: Box<dyn GeoLookup>,
}

impl GeoEnricher {
    pub fn new(lookup: Box<dyn GeoLookup>) -> Self {
        Self { lookup }
    }

    pub fn enrich(&self, address: &str) -> Enrichment {
        if classify(address) == AddressClass::Private {
            return Enrichment::Resolved(EnrichmentInfo::private());
        }

        // classify() already proved the address parses
        let ip: IpAddr = match address.trim().parse() {
            Ok(ip) => ip,
            Err(_) => return Enrichment::Resolved(EnrichmentInfo::private()),
        };

        let lookups = self
            .lookup
            .city(ip)
            .and_then(|city| self.lookup.asn(ip).map(|asn| (city, asn)));

        match lookups {
            Ok((city, asn)) => Enrichment::Resolved(build_info(city, asn)),
            Err(e) => {
                log::warn!("[GeoIP Lookup Failed] {} → {}", ip, e);
                Enrichment::Degraded(EnrichmentInfo::unknown())
            }
        }
    }
}

fn build_info(city: CityHit, asn: AsnHit) -> EnrichmentInfo {
    let country = city.country.unwrap_or_else(|| UNKNOWN.to_string());
    let asn_label = asn.number.filter(|n| *n != 0).map(|n| format!("AS{}", n));
    let org = Some(asn.organization.unwrap_or_else(|| UNKNOWN.to_string()));

    match (city.latitude, city.longitude) {
        (Some(lat), Some(lon)) => EnrichmentInfo {
            country,
            city: city.city.unwrap_or_else(|| UNKNOWN.to_string()),
            lat,
            lon,
            asn: asn_label,
            org,
        },
        _ => EnrichmentInfo {
            country,
            city: NO_GEO_CITY.to_string(),
            lat: 0.0,
            lon: 0.0,
            asn: asn_label,
            org,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeLookup {
        cities: HashMap<IpAddr, CityHit>,
        asns: HashMap<IpAddr, AsnHit>,
        calls: Arc<AtomicUsize>,
    }

    impl GeoLookup for FakeLookup {
        fn city(&self, ip: IpAddr) -> Result<CityHit, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cities.get(&ip).cloned().ok_or(LookupError::NotFound(ip))
        }

        fn asn(&self, ip: IpAddr) -> Result<AsnHit, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.asns.get(&ip).cloned().ok_or(LookupError::NotFound(ip))
        }
    }

    fn google() -> IpAddr {
        "8.8.8.8".parse().unwrap()
    }

    fn enricher_with(lookup: FakeLookup) -> GeoEnricher {
        GeoEnricher::new(Box::new(lookup))
    }

    #[test]
    fn test_private_sentinel_without_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let enricher = enricher_with(FakeLookup {
            calls: calls.clone(),
            ..Default::default()
        });

        for addr in ["192.168.1.5", "10.1.2.3", "fe80::1", "bogus"] {
            let result = enricher.enrich(addr);
            assert_eq!(result, Enrichment::Resolved(EnrichmentInfo::private()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_full_hit() {
        let mut lookup = FakeLookup::default();
        lookup.cities.insert(
            google(),
            CityHit {
                country: Some("United States".into()),
                city: Some("Mountain View".into()),
                latitude: Some(37.386),
                longitude: Some(-122.0838),
            },
        );
        lookup.asns.insert(
            google(),
            AsnHit {
                number: Some(15169),
                organization: Some("GOOGLE".into()),
            },
        );

        let info = enricher_with(lookup).enrich("8.8.8.8").into_info();

        assert_eq!(info.country, "United States");
        assert_eq!(info.city, "Mountain View");
        assert_eq!(info.asn.as_deref(), Some("AS15169"));
        assert_eq!(info.org.as_deref(), Some("GOOGLE"));
        assert!(info.is_geolocated());
    }

    #[test]
    fn test_missing_coordinates_uses_no_geo() {
        let mut lookup = FakeLookup::default();
        lookup.cities.insert(
            google(),
            CityHit {
                country: Some("United States".into()),
                city: Some("Mountain View".into()),
                latitude: None,
                longitude: Some(-122.0),
            },
        );
        lookup.asns.insert(google(), AsnHit::default());

        let result = enricher_with(lookup).enrich("8.8.8.8");
        assert!(!result.is_degraded());

        let info = result.into_info();
        assert_eq!(info.country, "United States");
        assert_eq!(info.city, NO_GEO_CITY);
        assert_eq!((info.lat, info.lon), (0.0, 0.0));
        assert_eq!(info.asn, None);
        assert_eq!(info.org.as_deref(), Some(UNKNOWN));
        assert!(!info.is_geolocated());
    }

    #[test]
    fn test_partial_names_fall_back_to_unknown() {
        let mut lookup = FakeLookup::default();
        lookup.cities.insert(
            google(),
            CityHit {
                latitude: Some(37.0),
                longitude: Some(-95.0),
                ..Default::default()
            },
        );
        lookup.asns.insert(google(), AsnHit::default());

        let info = enricher_with(lookup).enrich("8.8.8.8").into_info();
        assert_eq!(info.country, UNKNOWN);
        assert_eq!(info.city, UNKNOWN);
        assert_eq!(info.lat, 37.0);
    }

    #[test]
    fn test_lookup_failure_is_degraded() {
        let mut lookup = FakeLookup::default();
        // city hit but asn miss still fails the pair
        lookup.cities.insert(google(), CityHit::default());

        let enricher = enricher_with(lookup);
        for addr in ["8.8.8.8", "1.1.1.1"] {
            let result = enricher.enrich(addr);
            assert_eq!(result, Enrichment::Degraded(EnrichmentInfo::unknown()));
        }
    }

    #[test]
    fn test_enrich_is_deterministic() {
        let mut lookup = FakeLookup::default();
        lookup.cities.insert(
            google(),
            CityHit {
                country: Some("United States".into()),
                city: None,
                latitude: Some(37.751),
                longitude: Some(-97.822),
            },
        );
        lookup.asns.insert(
            google(),
            AsnHit {
                number: Some(15169),
                organization: None,
            },
        );
        let enricher = enricher_with(lookup);

        assert_eq!(enricher.enrich("8.8.8.8"), enricher.enrich("8.8.8.8"));
    }
}
