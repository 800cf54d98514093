//! Reference systems, ellipsoids and coordinate transforms

pub mod ellipsoid;
pub mod transform;
#[cfg(feature = "gdal")]
pub mod osr;

pub use ellipsoid::Ellipsoid;
pub use transform::{
    AffineTransform, ConcatenatedTransform, CoordinateTransform, IdentityTransform,
    Proj4Transform, ProjRegistry, TransformRegistry,
};
#[cfg(feature = "gdal")]
pub use osr::OsrTransformRegistry;

use crate::types::{AngularUnit, LengthUnit, VolumeError, VolumeResult};
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use std::fmt;

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";
const WEB_MERCATOR_PROJ4: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// Kind of coordinate system behind a reference system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CrsKind {
    /// Ellipsoidal (longitude, latitude)
    Geographic {
        ellipsoid: Ellipsoid,
        angular_unit: AngularUnit,
    },
    /// Map projection with a flat Cartesian coordinate system
    Projected {
        ellipsoid: Ellipsoid,
        linear_unit: LengthUnit,
    },
    /// Local flat Cartesian system with no datum
    Engineering { linear_unit: LengthUnit },
    /// Anything else (geocentric, vertical, unknown)
    Other,
}

/// A 2-D coordinate reference system.
///
/// Geographic systems use (longitude, latitude) axis order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSystem {
    pub name: String,
    pub epsg: Option<u32>,
    pub kind: CrsKind,
    /// Original WKT definition when the system came from a catalogue or OSR
    pub wkt: Option<String>,
    /// PROJ.4 definition, required by [`ProjRegistry`]
    pub proj4: Option<String>,
}

impl ReferenceSystem {
    fn with_kind(name: &str, kind: CrsKind) -> Self {
        Self {
            name: name.to_string(),
            epsg: None,
            kind,
            wkt: None,
            proj4: None,
        }
    }

    pub fn geographic(name: &str, ellipsoid: Ellipsoid) -> Self {
        Self::with_kind(
            name,
            CrsKind::Geographic {
                ellipsoid,
                angular_unit: AngularUnit::Degree,
            },
        )
    }

    pub fn projected(name: &str, ellipsoid: Ellipsoid, linear_unit: LengthUnit) -> Self {
        Self::with_kind(name, CrsKind::Projected { ellipsoid, linear_unit })
    }

    pub fn engineering(name: &str, linear_unit: LengthUnit) -> Self {
        Self::with_kind(name, CrsKind::Engineering { linear_unit })
    }

    pub fn with_epsg(mut self, code: u32) -> Self {
        self.epsg = Some(code);
        self
    }

    pub fn with_proj4(mut self, definition: &str) -> Self {
        self.proj4 = Some(definition.to_string());
        self
    }

    pub fn wgs84() -> Self {
        Self::geographic("WGS 84", Ellipsoid::WGS84)
            .with_epsg(4326)
            .with_proj4(WGS84_PROJ4)
    }

    pub fn web_mercator() -> Self {
        Self::projected("WGS 84 / Pseudo-Mercator", Ellipsoid::WGS84, LengthUnit::Metre)
            .with_epsg(3857)
            .with_proj4(WEB_MERCATOR_PROJ4)
    }

    /// Describe a PROJ.4 definition.
    ///
    /// `+proj=longlat` gives a geographic system in degrees, `+proj=geocent`
    /// and definitions with an unknown ellipsoid give [`CrsKind::Other`],
    /// anything else is projected in the unit given by `+units`/`+to_meter`.
    pub fn from_proj4(name: &str, definition: &str) -> VolumeResult<Self> {
        let proj = Proj::from_proj_string(definition).map_err(|e| {
            VolumeError::UnsupportedReferenceSystem(format!("{}: {}", name, e))
        })?;

        let kind = match Ellipsoid::from_proj4(definition) {
            _ if proj.is_geocent() => CrsKind::Other,
            Some(ellipsoid) if proj.is_latlong() => CrsKind::Geographic {
                ellipsoid,
                angular_unit: AngularUnit::Degree,
            },
            Some(ellipsoid) => CrsKind::Projected {
                ellipsoid,
                linear_unit: LengthUnit::from_metres_per_unit(proj.to_meter()),
            },
            None => {
                log::warn!("No known ellipsoid in '{}' ({})", definition, name);
                CrsKind::Other
            }
        };

        Ok(Self::with_kind(name, kind).with_proj4(definition))
    }

    /// Look up a reference system in the `crs-definitions` EPSG database
    pub fn from_epsg(code: u32) -> Option<Self> {
        let def = u16::try_from(code).ok().and_then(crs_definitions::from_code)?;
        let name = name_from_wkt(def.wkt).unwrap_or_else(|| format!("EPSG:{}", code));
        match Self::from_proj4(&name, def.proj4) {
            Ok(mut crs) => {
                crs.epsg = Some(code);
                crs.wkt = Some(def.wkt.to_string());
                Some(crs)
            }
            Err(e) => {
                log::warn!("EPSG:{} has no usable definition: {}", code, e);
                None
            }
        }
    }

    /// Resolve an EPSG code or fail, through OSR when built with GDAL
    #[cfg(feature = "gdal")]
    pub fn resolve_epsg(code: u32) -> VolumeResult<Self> {
        let srs = gdal::spatial_ref::SpatialRef::from_epsg(code).map_err(|e| {
            log::debug!("OSR does not know EPSG:{}: {}", code, e);
            VolumeError::UnknownEpsg(code)
        })?;
        let mut crs = Self::from_spatial_ref(&srs)?;
        crs.epsg = Some(code);
        Ok(crs)
    }

    /// Resolve an EPSG code or fail
    #[cfg(not(feature = "gdal"))]
    pub fn resolve_epsg(code: u32) -> VolumeResult<Self> {
        Self::from_epsg(code).ok_or(VolumeError::UnknownEpsg(code))
    }

    /// Identifier used in logs and error messages
    pub fn identifier(&self) -> String {
        match self.epsg {
            Some(code) => format!("EPSG:{}", code),
            None => self.name.clone(),
        }
    }

    /// Whether both describe the same coordinate system, ignoring metadata
    pub fn is_equivalent(&self, other: &ReferenceSystem) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => match (&self.wkt, &other.wkt) {
                (Some(a), Some(b)) if a == b => true,
                _ => self.name == other.name && self.kind == other.kind,
            },
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic { .. })
    }

    /// Whether coordinates live on a flat Cartesian plane
    pub fn is_cartesian(&self) -> bool {
        matches!(self.kind, CrsKind::Projected { .. } | CrsKind::Engineering { .. })
    }
}

/// Name of the outermost WKT node, e.g. `PROJCS["WGS 84 / UTM zone 33N",...`
pub(crate) fn name_from_wkt(wkt: &str) -> Option<String> {
    let start = wkt.find("[\"")? + 2;
    let len = wkt[start..].find('"')?;
    Some(wkt[start..start + len].to_string())
}

impl fmt::Display for ReferenceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "{} (EPSG:{})", self.name, code),
            None => write!(f, "{}", self.name),
        }
    }
}
