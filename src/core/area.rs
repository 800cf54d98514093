use crate::referencing::{AffineTransform, CrsKind, Ellipsoid, ReferenceSystem};
use crate::types::{AngularUnit, GeoTransform, VolumeError, VolumeResult};

/// Ground footprint, in square metres, of one integration sub-step.
///
/// Chosen once per computation from the kind of the raster reference system.
#[derive(Debug, Clone, Copy)]
pub enum AreaCalculator {
    /// Flat coordinate system: every sub-step covers the same area
    Cartesian { step_area: f64 },
    /// Ellipsoidal coordinates: area measured per sample with geodesics
    Geographic {
        grid_to_crs: AffineTransform,
        ellipsoid: Ellipsoid,
        angular_unit: AngularUnit,
        half_step: f64,
    },
}

impl AreaCalculator {
    pub fn new(
        crs: &ReferenceSystem,
        geo_transform: &GeoTransform,
        sub_step: f64,
    ) -> VolumeResult<Self> {
        if !(sub_step.is_finite() && sub_step > 0.0) {
            return Err(VolumeError::InvalidParameter(format!(
                "sub-step must be positive, got {}",
                sub_step
            )));
        }

        match crs.kind {
            CrsKind::Projected { linear_unit, .. } | CrsKind::Engineering { linear_unit } => {
                let (res_x, res_y) = geo_transform.resolution();
                let step_x = linear_unit.to_metres((res_x * sub_step).abs());
                let step_y = linear_unit.to_metres((res_y * sub_step).abs());
                let step_area = step_x * step_y;
                log::debug!(
                    "Cartesian footprint: {:.6} m x {:.6} m = {:.6} m² per sample",
                    step_x,
                    step_y,
                    step_area
                );
                Ok(AreaCalculator::Cartesian { step_area })
            }
            CrsKind::Geographic { ellipsoid, angular_unit } => {
                log::debug!(
                    "Geographic footprint on ellipsoid a={} f={}",
                    ellipsoid.a,
                    ellipsoid.f
                );
                Ok(AreaCalculator::Geographic {
                    grid_to_crs: AffineTransform::new(*geo_transform),
                    ellipsoid,
                    angular_unit,
                    half_step: sub_step / 2.0,
                })
            }
            CrsKind::Other => Err(VolumeError::UnsupportedReferenceSystem(format!(
                "{} is neither geographic nor Cartesian",
                crs
            ))),
        }
    }

    /// Area in m² of the sub-step centred on grid position `(x, y)`
    pub fn compute_step_area(&self, x: f64, y: f64) -> VolumeResult<f64> {
        match self {
            AreaCalculator::Cartesian { step_area } => Ok(*step_area),
            AreaCalculator::Geographic {
                grid_to_crs,
                ellipsoid,
                angular_unit,
                half_step,
            } => {
                let geodesic = |(x1, y1): (f64, f64), (x2, y2): (f64, f64)| -> VolumeResult<f64> {
                    let (lon1, lat1) = grid_to_crs.apply(x1, y1);
                    let (lon2, lat2) = grid_to_crs.apply(x2, y2);
                    ellipsoid.orthodromic_distance(
                        angular_unit.to_degrees(lon1),
                        angular_unit.to_degrees(lat1),
                        angular_unit.to_degrees(lon2),
                        angular_unit.to_degrees(lat2),
                    )
                };
                let dist_x = geodesic((x - half_step, y), (x + half_step, y))?;
                let dist_y = geodesic((x, y - half_step), (x, y + half_step))?;
                Ok(dist_x * dist_y)
            }
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, AreaCalculator::Geographic { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LengthUnit;
    use approx::assert_relative_eq;

    #[test]
    fn test_cartesian_area_is_constant() {
        let crs = ReferenceSystem::engineering("site", LengthUnit::Metre);
        let gt = GeoTransform::north_up(0.0, 100.0, 2.0, -3.0);
        let calc = AreaCalculator::new(&crs, &gt, 0.25).unwrap();
        assert!(!calc.is_geographic());
        assert_relative_eq!(calc.compute_step_area(0.125, 0.125).unwrap(), 0.375);
        assert_relative_eq!(calc.compute_step_area(50.0, -7.0).unwrap(), 0.375);
    }

    #[test]
    fn test_cartesian_area_converts_units() {
        let crs = ReferenceSystem::projected("feet grid", Ellipsoid::GRS80, LengthUnit::Foot);
        let gt = GeoTransform::north_up(0.0, 0.0, 4.0, -4.0);
        let calc = AreaCalculator::new(&crs, &gt, 0.25).unwrap();
        let area = calc.compute_step_area(0.0, 0.0).unwrap();
        assert_relative_eq!(area, 0.3048 * 0.3048, epsilon = 1e-15);
    }

    #[test]
    fn test_geographic_area_near_equator() {
        // one-degree cells straddling the equator
        let gt = GeoTransform::north_up(0.0, 1.0, 1.0, -1.0);
        let calc = AreaCalculator::new(&ReferenceSystem::wgs84(), &gt, 0.25).unwrap();
        assert!(calc.is_geographic());

        let area = calc.compute_step_area(0.125, 1.0).unwrap();
        let expected = (111_319.490_793 * 0.25) * (110_574.388_6 * 0.25);
        assert_relative_eq!(area, expected, max_relative = 1e-4);
    }

    #[test]
    fn test_geographic_area_shrinks_with_latitude() {
        let gt = GeoTransform::north_up(0.0, 80.0, 1.0, -1.0);
        let calc = AreaCalculator::new(&ReferenceSystem::wgs84(), &gt, 0.25).unwrap();
        let north = calc.compute_step_area(0.5, 0.5).unwrap();
        let south = calc.compute_step_area(0.5, 70.5).unwrap();
        assert!(north < south / 4.0);
    }

    #[test]
    fn test_geographic_area_in_radians() {
        let mut crs = ReferenceSystem::geographic("lonlat rad", Ellipsoid::WGS84);
        crs.kind = CrsKind::Geographic {
            ellipsoid: Ellipsoid::WGS84,
            angular_unit: AngularUnit::Radian,
        };
        let deg = 1f64.to_radians();
        let gt_rad = GeoTransform::north_up(0.0, deg, deg, -deg);
        let gt_deg = GeoTransform::north_up(0.0, 1.0, 1.0, -1.0);
        let rad = AreaCalculator::new(&crs, &gt_rad, 0.25).unwrap();
        let degs = AreaCalculator::new(&ReferenceSystem::wgs84(), &gt_deg, 0.25).unwrap();
        assert_relative_eq!(
            rad.compute_step_area(0.125, 0.375).unwrap(),
            degs.compute_step_area(0.125, 0.375).unwrap(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_unsupported_reference_system() {
        let mut crs = ReferenceSystem::wgs84();
        crs.kind = CrsKind::Other;
        let gt = GeoTransform::north_up(0.0, 0.0, 1.0, -1.0);
        assert!(matches!(
            AreaCalculator::new(&crs, &gt, 0.25),
            Err(VolumeError::UnsupportedReferenceSystem(_))
        ));
        assert!(matches!(
            AreaCalculator::new(&ReferenceSystem::wgs84(), &gt, 0.0),
            Err(VolumeError::InvalidParameter(_))
        ));
    }
}
