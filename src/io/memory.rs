use super::raster::{BandElevation, ElevationGrid, PixelWindow, RasterSource};
use crate::referencing::ReferenceSystem;
use crate::types::{GeoTransform, VolumeError, VolumeResult};
use ndarray::{s, Array2};
use num_traits::AsPrimitive;

/// Raster held entirely in memory, one `Array2` per band (`[row, col]`)
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    bands: Vec<Array2<f64>>,
    elevation: Vec<Option<BandElevation>>,
    geo_transform: GeoTransform,
    reference_system: Option<ReferenceSystem>,
    nodata: Option<f64>,
}

impl MemoryRaster {
    /// Single-band raster whose samples are already elevations in metres
    pub fn new<T: AsPrimitive<f64>>(data: &Array2<T>, geo_transform: GeoTransform) -> Self {
        Self {
            bands: vec![data.mapv(|v| v.as_())],
            elevation: vec![Some(BandElevation::metres())],
            geo_transform,
            reference_system: None,
            nodata: None,
        }
    }

    pub fn with_reference_system(mut self, crs: ReferenceSystem) -> Self {
        self.reference_system = Some(crs);
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Append a band, which must match the shape of the first one
    pub fn with_band<T: AsPrimitive<f64>>(
        mut self,
        data: &Array2<T>,
        elevation: Option<BandElevation>,
    ) -> VolumeResult<Self> {
        if data.dim() != self.bands[0].dim() {
            return Err(VolumeError::InvalidParameter(format!(
                "band shape {:?} does not match raster shape {:?}",
                data.dim(),
                self.bands[0].dim()
            )));
        }
        self.bands.push(data.mapv(|v| v.as_()));
        self.elevation.push(elevation);
        Ok(self)
    }

    /// Replace the raw-to-elevation mapping of an existing band
    pub fn with_elevation(
        mut self,
        band: usize,
        elevation: Option<BandElevation>,
    ) -> VolumeResult<Self> {
        let slot = self.elevation.get_mut(band).ok_or_else(|| {
            VolumeError::InvalidParameter(format!("band {} does not exist", band))
        })?;
        *slot = elevation;
        Ok(self)
    }
}

impl RasterSource for MemoryRaster {
    fn size(&self) -> (usize, usize) {
        let (rows, cols) = self.bands[0].dim();
        (cols, rows)
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    fn reference_system(&self) -> Option<ReferenceSystem> {
        self.reference_system.clone()
    }

    fn elevation_transform(&self, band: usize) -> Option<BandElevation> {
        self.elevation.get(band).cloned().flatten()
    }

    fn read_window(&self, window: &PixelWindow, band: usize) -> VolumeResult<ElevationGrid> {
        let data = self.bands.get(band).ok_or_else(|| {
            VolumeError::InvalidParameter(format!(
                "band {} out of range (0..{})",
                band,
                self.bands.len()
            ))
        })?;
        let (width, height) = self.size();
        if window.col_off + window.width > width || window.row_off + window.height > height {
            return Err(VolumeError::InvalidParameter(format!(
                "window {:?} exceeds raster size {}x{}",
                window, width, height
            )));
        }

        let mut view = data
            .slice(s![
                window.row_off..window.row_off + window.height,
                window.col_off..window.col_off + window.width
            ])
            .to_owned();
        if let Some(nodata) = self.nodata {
            view.mapv_inplace(|v| if v == nodata { f64::NAN } else { v });
        }

        Ok(ElevationGrid {
            data: view,
            geo_transform: self.geo_transform.shifted(window.col_off, window.row_off),
            reference_system: self.reference_system.clone(),
            elevation: self.elevation_transform(band),
        })
    }
}
