//! MaxMind GeoLite2 datasets (City + ASN) backing `GeoLookup`
//!
//! Both files are loaded fully into memory once at startup; a missing or
//! corrupt file is fatal for the runtime.

use super::enrichment::{AsnHit, CityHit, GeoLookup, LookupError};
use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::net::IpAddr;
use std::path::Path;

pub struct MaxMindLookup {
    city_reader: Reader<Vec<u8>>,
    asn_reader: Reader<Vec<u8>>,
}

impl MaxMindLookup {
    pub fn open(
        city_db: impl AsRef<Path>,
        asn_db: impl AsRef<Path>,
    ) -> Result<Self, LookupError> {
        let city_reader = open_dataset(city_db.as_ref())?;
        let asn_reader = open_dataset(asn_db.as_ref())?;

        log::info!(
            "🌍 GeoIP datasets loaded: {} ({}), {} ({})",
            city_db.as_ref().display(),
            city_reader.metadata.database_type,
            asn_db.as_ref().display(),
            asn_reader.metadata.database_type
        );

        Ok(Self {
            city_reader,
            asn_reader,
        })
    }
}

fn open_dataset(path: &Path) -> Result<Reader<Vec<u8>>, LookupError> {
    Reader::open_readfile(path)
        .map_err(|e| LookupError::Dataset(format!("{}: {}", path.display(), e)))
}

fn lookup_error(ip: IpAddr, err: MaxMindDBError) -> LookupError {
    match err {
        MaxMindDBError::AddressNotFoundError(_) => LookupError::NotFound(ip),
        other => LookupError::Dataset(other.to_string()),
    }
}

fn english_name(names: Option<std::collections::BTreeMap<&str, &str>>) -> Option<String> {
    names
        .and_then(|names| names.get("en").map(|name| name.to_string()))
        .filter(|name| !name.is_empty())
}

impl GeoLookup for MaxMindLookup {
    fn city(&self, ip: IpAddr) -> Result<CityHit, LookupError> {
        let record: geoip2::City = self
            .city_reader
            .lookup(ip)
            .map_err(|e| lookup_error(ip, e))?;

        let location = record.location;
        Ok(CityHit {
            country: english_name(record.country.and_then(|c| c.names)),
            city: english_name(record.city.and_then(|c| c.names)),
            latitude: location.as_ref().and_then(|l| l.latitude),
            longitude: location.as_ref().and_then(|l| l.longitude),
        })
    }

    fn asn(&self, ip: IpAddr) -> Result<AsnHit, LookupError> {
        let record: geoip2::Asn = self
            .asn_reader
            .lookup(ip)
            .map_err(|e| lookup_error(ip, e))?;

        Ok(AsnHit {
            number: record.autonomous_system_number,
            organization: record
                .autonomous_system_organization
                .map(|org| org.to_string()),
        })
    }
}
