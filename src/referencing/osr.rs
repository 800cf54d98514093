//! OGR/OSR-backed reference systems and transforms

use super::{
    name_from_wkt, CoordinateTransform, CrsKind, Ellipsoid, IdentityTransform, ReferenceSystem,
    TransformRegistry,
};
use crate::types::{AngularUnit, LengthUnit, VolumeError, VolumeResult};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use std::fmt;
use std::sync::Mutex;

impl ReferenceSystem {
    /// Build a reference system description from an OSR spatial reference
    pub fn from_spatial_ref(srs: &SpatialRef) -> VolumeResult<Self> {
        let wkt = srs.to_wkt().ok();
        let name = wkt
            .as_deref()
            .and_then(name_from_wkt)
            .unwrap_or_else(|| "unnamed".to_string());
        let epsg = srs.auth_code().ok().and_then(|code| u32::try_from(code).ok());

        let kind = if srs.is_geographic() {
            CrsKind::Geographic {
                ellipsoid: ellipsoid_of(srs)?,
                angular_unit: angular_unit_of(srs.angular_units()),
            }
        } else if srs.is_projected() {
            CrsKind::Projected {
                ellipsoid: ellipsoid_of(srs)?,
                linear_unit: LengthUnit::from_metres_per_unit(srs.linear_units()),
            }
        } else {
            CrsKind::Other
        };

        let proj4 = srs.to_proj4().ok().filter(|def| !def.trim().is_empty());

        Ok(Self {
            name,
            epsg,
            kind,
            wkt,
            proj4,
        })
    }

    /// Re-create the OSR spatial reference, traditional GIS axis order
    pub fn to_spatial_ref(&self) -> VolumeResult<SpatialRef> {
        let srs = match (&self.wkt, self.epsg, &self.proj4) {
            (Some(wkt), _, _) => SpatialRef::from_wkt(wkt)?,
            (None, Some(code), _) => SpatialRef::from_epsg(code)?,
            (None, None, Some(def)) => SpatialRef::from_proj4(def)?,
            (None, None, None) => {
                return Err(VolumeError::UnsupportedReferenceSystem(format!(
                    "{} has no WKT, EPSG or PROJ.4 definition",
                    self.name
                )))
            }
        };
        srs.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
        Ok(srs)
    }
}

fn ellipsoid_of(srs: &SpatialRef) -> VolumeResult<Ellipsoid> {
    Ok(Ellipsoid::from_semi_axes(srs.semi_major()?, srs.semi_minor()?))
}

fn angular_unit_of(radians_per_unit: f64) -> AngularUnit {
    let degree = std::f64::consts::PI / 180.0;
    if (radians_per_unit - 1.0).abs() < 1e-12 {
        AngularUnit::Radian
    } else if (radians_per_unit - std::f64::consts::PI / 200.0).abs() < 1e-12 {
        AngularUnit::Grad
    } else {
        if (radians_per_unit - degree).abs() > 1e-12 {
            log::warn!("Unrecognised angular unit ({} rad), assuming degrees", radians_per_unit);
        }
        AngularUnit::Degree
    }
}

struct OsrHandle(CoordTransform);

// SAFETY: an OGR coordinate transformation may be used from any thread as
// long as calls are not concurrent; every use goes through the mutex below.
unsafe impl Send for OsrHandle {}

/// Point transform delegating to `OCTTransform`
pub struct OsrTransform {
    handle: Mutex<OsrHandle>,
    label: String,
}

impl fmt::Debug for OsrTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsrTransform").field("label", &self.label).finish()
    }
}

impl CoordinateTransform for OsrTransform {
    fn transform(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)> {
        let mut xs = [x];
        let mut ys = [y];
        let mut zs = [0.0];
        {
            let guard = self.handle.lock().map_err(|_| {
                VolumeError::TransformFailed(format!("{}: poisoned transform lock", self.label))
            })?;
            guard
                .0
                .transform_coords(&mut xs, &mut ys, &mut zs)
                .map_err(|e| VolumeError::TransformFailed(format!("{}: {}", self.label, e)))?;
        }
        if xs[0].is_finite() && ys[0].is_finite() {
            Ok((xs[0], ys[0]))
        } else {
            Err(VolumeError::TransformFailed(format!(
                "{}: non-finite result for ({}, {})",
                self.label, x, y
            )))
        }
    }
}

/// Registry resolving any pair of reference systems OSR knows about
#[derive(Debug, Clone, Copy, Default)]
pub struct OsrTransformRegistry;

impl TransformRegistry for OsrTransformRegistry {
    fn find_transform(
        &self,
        source: &ReferenceSystem,
        target: &ReferenceSystem,
    ) -> VolumeResult<Box<dyn CoordinateTransform>> {
        if source.is_equivalent(target) {
            return Ok(Box::new(IdentityTransform));
        }

        let unresolved = || VolumeError::TransformResolution {
            source_crs: source.identifier(),
            target_crs: target.identifier(),
        };
        let src = source.to_spatial_ref().map_err(|_| unresolved())?;
        let dst = target.to_spatial_ref().map_err(|_| unresolved())?;
        let ct = CoordTransform::new(&src, &dst).map_err(|e| {
            log::debug!("OSR could not relate {} and {}: {}", source, target, e);
            unresolved()
        })?;

        Ok(Box::new(OsrTransform {
            handle: Mutex::new(OsrHandle(ct)),
            label: format!("{} -> {}", source.identifier(), target.identifier()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spatial_ref_description() {
        let srs = SpatialRef::from_epsg(32633).unwrap();
        let crs = ReferenceSystem::from_spatial_ref(&srs).unwrap();
        assert_eq!(crs.epsg, Some(32633));
        assert!(crs.is_cartesian());
        match crs.kind {
            CrsKind::Projected { ellipsoid, linear_unit } => {
                assert_relative_eq!(ellipsoid.a, Ellipsoid::WGS84.a);
                assert_eq!(linear_unit, LengthUnit::Metre);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_geographic_to_utm() {
        let registry = OsrTransformRegistry;
        let wgs84 = ReferenceSystem::wgs84();
        let utm = ReferenceSystem::resolve_epsg(32633).unwrap();
        assert!(utm.proj4.is_some());
        let t = registry.find_transform(&wgs84, &utm).unwrap();
        // central meridian of zone 33 maps to the false easting
        let (x, _y) = t.transform(15.0, 45.0).unwrap();
        assert_relative_eq!(x, 500_000.0, epsilon = 1e-3);
    }
}
