use super::raster::{BandElevation, ElevationGrid, PixelWindow, RasterSource};
use crate::referencing::ReferenceSystem;
use crate::types::{ElevationTransform, GeoTransform, VolumeError, VolumeResult};
use gdal::Dataset;
use ndarray::Array2;
use std::path::Path;

/// Digital Elevation Model backed by any raster GDAL can open
pub struct GdalDemSource {
    dataset: Dataset,
    geo_transform: GeoTransform,
    reference_system: Option<ReferenceSystem>,
    size: (usize, usize),
    band_count: usize,
}

impl GdalDemSource {
    pub fn open<P: AsRef<Path>>(dem_path: P) -> VolumeResult<Self> {
        log::info!("Opening DEM: {}", dem_path.as_ref().display());

        let dataset = Dataset::open(dem_path.as_ref())?;
        let geo_transform = GeoTransform::from_gdal(dataset.geo_transform()?);
        let size = dataset.raster_size();
        let band_count = dataset.raster_count() as usize;

        let reference_system = match dataset.spatial_ref() {
            Ok(srs) => Some(ReferenceSystem::from_spatial_ref(&srs)?),
            Err(e) => {
                log::warn!("DEM has no usable spatial reference: {}", e);
                None
            }
        };

        log::debug!("DEM size: {}x{}, {} band(s)", size.0, size.1, band_count);
        log::debug!("DEM geotransform: {:?}", geo_transform);
        if let Some(crs) = &reference_system {
            log::debug!("DEM reference system: {}", crs);
        }

        Ok(Self {
            dataset,
            geo_transform,
            reference_system,
            size,
            band_count,
        })
    }

    fn band_index(&self, band: usize) -> VolumeResult<isize> {
        if band >= self.band_count {
            return Err(VolumeError::InvalidParameter(format!(
                "band {} out of range (0..{})",
                band, self.band_count
            )));
        }
        Ok((band + 1) as isize)
    }
}

impl RasterSource for GdalDemSource {
    fn size(&self) -> (usize, usize) {
        self.size
    }

    fn band_count(&self) -> usize {
        self.band_count
    }

    fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    fn reference_system(&self) -> Option<ReferenceSystem> {
        self.reference_system.clone()
    }

    fn elevation_transform(&self, band: usize) -> Option<BandElevation> {
        let index = self.band_index(band).ok()?;
        let rasterband = self.dataset.rasterband(index).ok()?;
        let scale = rasterband.scale().unwrap_or(1.0);
        let offset = rasterband.offset().unwrap_or(0.0);
        let unit = rasterband.unit();
        Some(BandElevation {
            transform: ElevationTransform::new(scale, offset),
            unit: if unit.trim().is_empty() { None } else { Some(unit) },
        })
    }

    fn read_window(&self, window: &PixelWindow, band: usize) -> VolumeResult<ElevationGrid> {
        let index = self.band_index(band)?;
        let (width, height) = self.size;
        if window.col_off + window.width > width || window.row_off + window.height > height {
            return Err(VolumeError::InvalidParameter(format!(
                "window {:?} exceeds raster size {}x{}",
                window, width, height
            )));
        }

        let rasterband = self.dataset.rasterband(index)?;
        let nodata = rasterband.no_data_value();
        let buffer = rasterband.read_as::<f64>(
            (window.col_off as isize, window.row_off as isize),
            (window.width, window.height),
            (window.width, window.height),
            None,
        )?;

        let mut data = Array2::from_shape_vec((window.height, window.width), buffer.data)
            .map_err(|e| {
                VolumeError::InvalidParameter(format!("Failed to reshape DEM window: {}", e))
            })?;
        if let Some(nodata) = nodata {
            let mut void_count = 0usize;
            data.mapv_inplace(|v| {
                if v == nodata {
                    void_count += 1;
                    f64::NAN
                } else {
                    v
                }
            });
            if void_count > 0 {
                log::debug!("Window contains {} no-data pixel(s)", void_count);
            }
        }

        Ok(ElevationGrid {
            data,
            geo_transform: self.geo_transform.shifted(window.col_off, window.row_off),
            reference_system: self.reference_system.clone(),
            elevation: self.elevation_transform(band),
        })
    }
}
