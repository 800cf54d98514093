use super::area::AreaCalculator;
use super::containment::{ContainmentFilter, RegionGeometry};
use super::integrator::{VerticalWindow, VolumeIntegrator, SUB_STEP};
use super::pipeline::{transform_envelope, CoordinatePipeline, ResolutionChain};
use crate::io::{BandElevation, PixelWindow, RasterSource};
use crate::referencing::{ProjRegistry, ReferenceSystem, TransformRegistry};
use crate::types::{LengthUnit, VolumeError, VolumeResult};
use serde::{Deserialize, Serialize};

/// Parameters for one volume computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeParams {
    /// Ground reference altitude in metres
    pub ground_altitude: f64,
    /// Ceiling altitude in metres
    pub z_ceiling: f64,
    /// Zero-based band index
    pub band: usize,
    /// Reference system of the region, overriding anything the region carries
    pub region_crs: Option<ReferenceSystem>,
    /// Sum sample rows on the rayon pool
    pub parallel: bool,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            ground_altitude: 0.0,
            z_ceiling: 0.0,
            band: 0,
            region_crs: None,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl VolumeParams {
    pub fn new(ground_altitude: f64, z_ceiling: f64) -> Self {
        Self {
            ground_altitude,
            z_ceiling,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> VolumeResult<()> {
        if !self.ground_altitude.is_finite() {
            return Err(VolumeError::InvalidParameter(format!(
                "ground altitude must be finite, got {}",
                self.ground_altitude
            )));
        }
        if !self.z_ceiling.is_finite() {
            return Err(VolumeError::InvalidParameter(format!(
                "ceiling altitude must be finite, got {}",
                self.z_ceiling
            )));
        }
        Ok(())
    }

    pub fn vertical_window(&self) -> VerticalWindow {
        VerticalWindow::new(self.ground_altitude, self.z_ceiling)
    }
}

/// Volume between a DEM and a ceiling altitude over a region
pub struct VolumeCalculator {
    registry: Box<dyn TransformRegistry>,
}

impl Default for VolumeCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeCalculator {
    /// Calculator resolving transforms with proj4rs
    pub fn new() -> Self {
        Self::with_registry(Box::new(ProjRegistry))
    }

    pub fn with_registry(registry: Box<dyn TransformRegistry>) -> Self {
        Self { registry }
    }

    /// Compute the volume, in cubic metres, enclosed between the terrain of
    /// `params.band` and the slab `[ground_altitude, z_ceiling]`, restricted
    /// to `region`.
    ///
    /// Terrain on the wrong side of the ground reference contributes nothing;
    /// columns taller than the slab are capped at its thickness.
    pub fn compute_volume(
        &self,
        source: &dyn RasterSource,
        region: &dyn RegionGeometry,
        params: &VolumeParams,
    ) -> VolumeResult<f64> {
        params.validate()?;

        let band_count = source.band_count();
        if params.band >= band_count {
            return Err(VolumeError::InvalidParameter(format!(
                "band {} out of range (raster has {} band(s))",
                params.band, band_count
            )));
        }
        let region_env = region
            .envelope()
            .ok_or_else(|| VolumeError::InvalidParameter("region geometry is empty".to_string()))?;

        let window = params.vertical_window();
        if window.is_degenerate() {
            log::info!("Ceiling equals ground altitude ({}), volume is zero", window.z_ceiling);
            return Ok(0.0);
        }

        let raster_crs = source.reference_system();
        let region_crs = ResolutionChain::new()
            .then("override", || params.region_crs.clone())
            .then("region geometry", || region.reference_system())
            .try_then("region metadata", || region.embedded_reference_system())
            .then("raster", || raster_crs.clone())
            .resolve()?
            .ok_or(VolumeError::UnresolvedReferenceSystem)?;
        let raster_crs = match raster_crs {
            Some(crs) => crs,
            None => {
                log::warn!(
                    "Raster has no reference system, assuming the region's ({})",
                    region_crs
                );
                region_crs.clone()
            }
        };

        let to_raster = self.registry.find_transform(&region_crs, &raster_crs)?;
        let raster_env = transform_envelope(&region_env, to_raster.as_ref())?;
        let pixel_window =
            PixelWindow::covering(&raster_env, &source.geo_transform(), source.size())?;
        if pixel_window.is_empty() {
            log::info!("Region does not overlap the raster, volume is zero");
            return Ok(0.0);
        }
        let grid = source.read_window(&pixel_window, params.band)?;

        let elevation = grid
            .elevation
            .clone()
            .or_else(|| source.elevation_transform(params.band))
            .ok_or(VolumeError::MissingElevationTransform { band: params.band })?;
        let unit = elevation_unit(&elevation)?;

        let pipeline = CoordinatePipeline::new(
            grid.grid_to_crs(),
            &raster_crs,
            &region_crs,
            self.registry.as_ref(),
        )?;
        let area = AreaCalculator::new(&raster_crs, &grid.geo_transform, SUB_STEP)?;
        log::info!(
            "Integrating {}x{} window at offset ({}, {}) in {} ({} footprint)",
            pixel_window.width,
            pixel_window.height,
            pixel_window.col_off,
            pixel_window.row_off,
            raster_crs,
            if area.is_geographic() { "geographic" } else { "Cartesian" }
        );

        let integrator = VolumeIntegrator::new(
            &grid,
            elevation.transform,
            unit,
            &pipeline,
            ContainmentFilter::new(region),
            area,
            window,
        )?;
        let volume = integrator.integrate(params.parallel)?;

        log::info!("Volume: {:.3} m³", volume);
        Ok(volume)
    }
}

fn elevation_unit(elevation: &BandElevation) -> VolumeResult<LengthUnit> {
    match elevation.unit.as_deref() {
        None => {
            log::warn!("Elevation band declares no unit, assuming metres");
            Ok(LengthUnit::Metre)
        }
        Some(symbol) => LengthUnit::parse(symbol).ok_or_else(|| {
            VolumeError::InvalidParameter(format!("elevation unit '{}' is not a length", symbol))
        }),
    }
}
