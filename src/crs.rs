use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A coordinate reference system identifier, normalized to `AUTHORITY:CODE`
/// in upper case (e.g. `EPSG:4326`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(String);

/// WGS 84 longitude/latitude, the default for point datasets and GeoJSON.
pub const WGS84: &str = "EPSG:4326";

static AUTHORITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"AUTHORITY\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#).expect("valid regex")
});

static URN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^urn:ogc:def:crs:([a-z]+):[^:]*:(\w+)$").expect("valid regex")
});

impl Crs {
    pub fn epsg(code: u32) -> Self { Self(format!("EPSG:{code}")) }

    pub fn wgs84() -> Self { Self(WGS84.to_string()) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }

    /// Numeric EPSG code, if this is an EPSG identifier.
    pub fn epsg_code(&self) -> Option<u32> {
        self.0.strip_prefix("EPSG:").and_then(|code| code.parse().ok())
    }

    /// Whether coordinates are longitude/latitude degrees.
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg_code(), Some(4326 | 4269 | 4258 | 4283 | 4617 | 4674))
    }

    /// Identify the CRS declared by a shapefile `.prj` (ESRI WKT).
    ///
    /// Uses the outermost `AUTHORITY["EPSG", n]` when present, which is always
    /// the last one in the string. ESRI-flavored WKT often carries no authority,
    /// so bare geographic systems are recognized by datum name.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        if let Some(code) = AUTHORITY.captures_iter(wkt).last().and_then(|c| c[1].parse().ok()) {
            return Some(Self::epsg(code));
        }
        let wkt = wkt.trim();
        if !wkt.starts_with("GEOGCS") { return None }

        let upper = wkt.to_ascii_uppercase();
        if upper.contains("WGS_1984") || upper.contains("WGS 84") || upper.contains("WGS84") {
            Some(Self::epsg(4326))
        } else if upper.contains("NORTH_AMERICAN_1983") || upper.contains("NAD83") {
            Some(Self::epsg(4269))
        } else {
            None
        }
    }
}

impl FromStr for Crs {
    type Err = Error;

    /// Accepts `EPSG:4326`, `epsg:4326`, `urn:ogc:def:crs:EPSG::4326` and `OGC:CRS84`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(caps) = URN.captures(s) {
            return format!("{}:{}", &caps[1], &caps[2]).parse();
        }

        let (authority, code) = s.split_once(':')
            .ok_or_else(|| Error::Config(format!("CRS {s:?} is not of the form AUTHORITY:CODE")))?;
        let (authority, code) = (authority.trim().to_ascii_uppercase(), code.trim().to_ascii_uppercase());
        if authority.is_empty() || code.is_empty() {
            return Err(Error::Config(format!("CRS {s:?} is not of the form AUTHORITY:CODE")));
        }

        match (authority.as_str(), code.as_str()) {
            ("OGC", "CRS84") | ("OGC", "1.3:CRS84") => Ok(Self::wgs84()),
            _ => Ok(Self(format!("{authority}:{code}"))),
        }
    }
}

impl TryFrom<String> for Crs {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self { crs.0 }
}

impl Default for Crs {
    fn default() -> Self { Self::wgs84() }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}
