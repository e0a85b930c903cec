//! Geolocation of proxy exit addresses using an MMDB database

use crate::error::{Error, Result};
use maxminddb::{geoip2, Reader};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;

/// Geographic location of an exit address, as written to JSON output
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GeoLocation {
    /// ISO 3166-1 alpha-2 country code (e.g., "US", "CN")
    pub country_code: Option<String>,
    /// Country name in English
    pub country: Option<String>,
    /// City name in English
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Timezone (e.g., "America/New_York")
    pub timezone: Option<String>,
}

impl GeoLocation {
    /// Check if the location has any meaningful data
    pub fn is_empty(&self) -> bool {
        self.country_code.is_none() && self.country.is_none() && self.city.is_none()
    }
}

/// Looks up exit addresses in a MaxMind City database
#[derive(Clone)]
pub struct GeoLocator {
    reader: Arc<Reader<Vec<u8>>>,
}

impl GeoLocator {
    /// Open an MMDB file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = Reader::open_readfile(path).map_err(|e| Error::Geo(e.to_string()))?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Location of `ip`, or `None` when the database has no usable record
    pub fn lookup(&self, ip: Ipv4Addr) -> Result<Option<GeoLocation>> {
        let lookup_result = self
            .reader
            .lookup(IpAddr::V4(ip))
            .map_err(|e| Error::Geo(e.to_string()))?;

        let city: Option<geoip2::City> = lookup_result
            .decode()
            .map_err(|e| Error::Geo(e.to_string()))?;
        let Some(city) = city else {
            return Ok(None);
        };

        let location = GeoLocation {
            country_code: city.country.iso_code.map(String::from),
            country: city.country.names.english.map(String::from),
            city: city.city.names.english.map(String::from),
            latitude: city.location.latitude,
            longitude: city.location.longitude,
            timezone: city.location.time_zone.map(String::from),
        };
        Ok((!location.is_empty()).then_some(location))
    }
}
