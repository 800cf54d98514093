//! demvolume: volume integration between a digital elevation model and a
//! ceiling altitude, restricted to a polygonal region.
//!
//! Elevations are sampled sixteen times per cell, projected into the
//! region's reference system for the containment test, and weighted by the
//! ground footprint of each sample (flat for projected grids, geodesic for
//! geographic ones).

pub mod types;
pub mod referencing;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    AngularUnit, ElevationTransform, Envelope, GeoTransform, LengthUnit, VolumeError, VolumeResult,
};
pub use referencing::{CrsKind, Ellipsoid, ProjRegistry, ReferenceSystem, TransformRegistry};
pub use io::{ElevationGrid, MemoryRaster, RasterSource};
pub use crate::core::{Region, RegionGeometry, VolumeCalculator, VolumeParams};

#[cfg(feature = "gdal")]
pub use io::GdalDemSource;
#[cfg(feature = "gdal")]
pub use referencing::OsrTransformRegistry;

/// Volume in m³ between `band` of `source` and the slab from
/// `ground_altitude` to `z_ceiling`, inside `region`.
///
/// `region_crs` takes precedence over any reference system the region
/// carries. Transforms are resolved with proj4rs, or with OSR when the
/// `gdal` feature is enabled.
pub fn compute_volume(
    source: &dyn RasterSource,
    band: usize,
    region: &dyn RegionGeometry,
    region_crs: Option<ReferenceSystem>,
    ground_altitude: f64,
    z_ceiling: f64,
) -> VolumeResult<f64> {
    let params = VolumeParams {
        ground_altitude,
        z_ceiling,
        band,
        region_crs,
        ..Default::default()
    };
    default_calculator().compute_volume(source, region, &params)
}

#[cfg(feature = "gdal")]
fn default_calculator() -> VolumeCalculator {
    VolumeCalculator::with_registry(Box::new(OsrTransformRegistry))
}

#[cfg(not(feature = "gdal"))]
fn default_calculator() -> VolumeCalculator {
    VolumeCalculator::new()
}
