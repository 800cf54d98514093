use super::{CrsKind, ReferenceSystem};
use crate::types::{AngularUnit, GeoTransform, VolumeError, VolumeResult};
use proj4rs::proj::Proj;
use std::fmt::{self, Debug};

/// A two-dimensional point transform.
///
/// A failure on any single point is reported as an error and must not be
/// silently skipped by callers.
pub trait CoordinateTransform: Debug + Send + Sync {
    fn transform(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)>;

    fn is_identity(&self) -> bool {
        false
    }
}

fn check_finite(x: f64, y: f64, what: &str) -> VolumeResult<(f64, f64)> {
    if x.is_finite() && y.is_finite() {
        Ok((x, y))
    } else {
        Err(VolumeError::TransformFailed(format!(
            "{} produced a non-finite coordinate ({}, {})",
            what, x, y
        )))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn transform(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)> {
        Ok((x, y))
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Affine grid-to-CRS transform built from a `GeoTransform`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    geo: GeoTransform,
}

impl AffineTransform {
    pub fn new(geo: GeoTransform) -> Self {
        Self { geo }
    }

    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo
    }

    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        self.geo.apply(x, y)
    }

    pub fn inverse(&self) -> VolumeResult<AffineTransform> {
        let g = &self.geo;
        if !g.is_invertible() {
            return Err(VolumeError::TransformFailed(format!(
                "grid-to-CRS transform is singular: {:?}",
                g
            )));
        }
        let det = g.determinant();
        Ok(AffineTransform::new(GeoTransform {
            top_left_x: (g.rotation_x * g.top_left_y - g.pixel_height * g.top_left_x) / det,
            pixel_width: g.pixel_height / det,
            rotation_x: -g.rotation_x / det,
            top_left_y: (g.rotation_y * g.top_left_x - g.pixel_width * g.top_left_y) / det,
            rotation_y: -g.rotation_y / det,
            pixel_height: g.pixel_width / det,
        }))
    }
}

impl CoordinateTransform for AffineTransform {
    fn transform(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)> {
        let (tx, ty) = self.apply(x, y);
        check_finite(tx, ty, "affine transform")
    }
}

/// Applies `first` and then `second`
#[derive(Debug)]
pub struct ConcatenatedTransform {
    first: Box<dyn CoordinateTransform>,
    second: Box<dyn CoordinateTransform>,
}

impl ConcatenatedTransform {
    pub fn new(first: Box<dyn CoordinateTransform>, second: Box<dyn CoordinateTransform>) -> Self {
        Self { first, second }
    }

    /// Concatenate, dropping identity steps
    pub fn create(
        first: Box<dyn CoordinateTransform>,
        second: Box<dyn CoordinateTransform>,
    ) -> Box<dyn CoordinateTransform> {
        if second.is_identity() {
            first
        } else if first.is_identity() {
            second
        } else {
            Box::new(Self::new(first, second))
        }
    }
}

impl CoordinateTransform for ConcatenatedTransform {
    fn transform(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)> {
        let (ix, iy) = self.first.transform(x, y)?;
        self.second.transform(ix, iy)
    }

    fn is_identity(&self) -> bool {
        self.first.is_identity() && self.second.is_identity()
    }
}

/// Angular unit change between two geographic systems on the same ellipsoid
#[derive(Debug, Clone, Copy)]
pub struct AngularUnitConversion {
    from: AngularUnit,
    to: AngularUnit,
}

impl CoordinateTransform for AngularUnitConversion {
    fn transform(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)> {
        let lon = self.to.from_degrees(self.from.to_degrees(x));
        let lat = self.to.from_degrees(self.from.to_degrees(y));
        check_finite(lon, lat, "angular unit conversion")
    }
}

/// Point transform between two PROJ.4 definitions, evaluated by proj4rs.
///
/// proj4rs works in radians on geographic systems; the angular unit of
/// each side is converted on the way in and out.
pub struct Proj4Transform {
    source: Proj,
    target: Proj,
    source_unit: Option<AngularUnit>,
    target_unit: Option<AngularUnit>,
    label: String,
}

impl Proj4Transform {
    pub fn new(source: &ReferenceSystem, target: &ReferenceSystem) -> VolumeResult<Self> {
        let label = format!("{} -> {}", source.identifier(), target.identifier());
        let (source_proj, source_unit) = parse_definition(source)?;
        let (target_proj, target_unit) = parse_definition(target)?;
        Ok(Self {
            source: source_proj,
            target: target_proj,
            source_unit,
            target_unit,
            label,
        })
    }
}

/// The proj4rs projection of `crs` and, if it is lon/lat, its angular unit
fn parse_definition(crs: &ReferenceSystem) -> VolumeResult<(Proj, Option<AngularUnit>)> {
    let definition = crs.proj4.as_deref().ok_or_else(|| {
        VolumeError::UnsupportedReferenceSystem(format!("{} has no PROJ.4 definition", crs))
    })?;
    let proj = Proj::from_proj_string(definition)
        .map_err(|e| VolumeError::UnsupportedReferenceSystem(format!("{}: {}", crs, e)))?;
    let unit = match crs.kind {
        CrsKind::Geographic { angular_unit, .. } => angular_unit,
        _ => AngularUnit::Degree,
    };
    let latlong = proj.is_latlong();
    Ok((proj, latlong.then_some(unit)))
}

impl Debug for Proj4Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proj4Transform").field("label", &self.label).finish()
    }
}

impl CoordinateTransform for Proj4Transform {
    fn transform(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)> {
        let mut point = match self.source_unit {
            Some(unit) => (unit.to_degrees(x).to_radians(), unit.to_degrees(y).to_radians(), 0.0),
            None => (x, y, 0.0),
        };
        proj4rs::transform::transform(&self.source, &self.target, &mut point).map_err(|e| {
            VolumeError::TransformFailed(format!("{} at ({}, {}): {}", self.label, x, y, e))
        })?;
        let (tx, ty) = match self.target_unit {
            Some(unit) => (
                unit.from_degrees(point.0.to_degrees()),
                unit.from_degrees(point.1.to_degrees()),
            ),
            None => (point.0, point.1),
        };
        check_finite(tx, ty, &self.label)
    }
}

/// Finds a coordinate transform between two reference systems
pub trait TransformRegistry: Send + Sync {
    fn find_transform(
        &self,
        source: &ReferenceSystem,
        target: &ReferenceSystem,
    ) -> VolumeResult<Box<dyn CoordinateTransform>>;
}

/// Registry backed by proj4rs.
///
/// Any two systems carrying a PROJ.4 definition are related through
/// proj4rs. Systems without one only relate to equivalent systems, or to
/// geographic systems on the same ellipsoid through an angular unit change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjRegistry;

impl ProjRegistry {
    fn unresolved(source: &ReferenceSystem, target: &ReferenceSystem) -> VolumeError {
        VolumeError::TransformResolution {
            source_crs: source.identifier(),
            target_crs: target.identifier(),
        }
    }
}

impl TransformRegistry for ProjRegistry {
    fn find_transform(
        &self,
        source: &ReferenceSystem,
        target: &ReferenceSystem,
    ) -> VolumeResult<Box<dyn CoordinateTransform>> {
        if source.is_equivalent(target) {
            return Ok(Box::new(IdentityTransform));
        }

        if source.proj4.is_some() && target.proj4.is_some() {
            return match Proj4Transform::new(source, target) {
                Ok(t) => Ok(Box::new(t)),
                Err(e) => {
                    log::debug!("proj4rs could not relate {} and {}: {}", source, target, e);
                    Err(Self::unresolved(source, target))
                }
            };
        }

        match (&source.kind, &target.kind) {
            (
                CrsKind::Geographic { ellipsoid: e1, angular_unit: u1 },
                CrsKind::Geographic { ellipsoid: e2, angular_unit: u2 },
            ) if e1 == e2 => {
                if u1 == u2 {
                    Ok(Box::new(IdentityTransform))
                } else {
                    Ok(Box::new(AngularUnitConversion { from: *u1, to: *u2 }))
                }
            }
            _ => Err(Self::unresolved(source, target)),
        }
    }
}
