use crate::referencing::{AffineTransform, ReferenceSystem};
use crate::types::{ElevationTransform, Envelope, GeoTransform, VolumeError, VolumeResult};
use ndarray::Array2;

/// Pixel-space read window, `[col_off, col_off + width) x [row_off, row_off + height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Window covering the part of `envelope` (raster CRS) that lies on a
    /// raster of `size = (width, height)` cells.
    ///
    /// Fractional pixel bounds are widened outward; the result is clipped
    /// to the raster extent and may be empty.
    pub fn covering(
        envelope: &Envelope,
        geo_transform: &GeoTransform,
        size: (usize, usize),
    ) -> VolumeResult<Self> {
        if !envelope.is_finite() {
            return Err(VolumeError::InvalidParameter(format!(
                "envelope is not finite: {:?}",
                envelope
            )));
        }
        let to_pixel = AffineTransform::new(*geo_transform).inverse()?;
        let corners = [
            (envelope.min_x, envelope.min_y),
            (envelope.max_x, envelope.min_y),
            (envelope.max_x, envelope.max_y),
            (envelope.min_x, envelope.max_y),
        ];
        let pixel_env = Envelope::from_points(corners.iter().map(|&(x, y)| to_pixel.apply(x, y)))
            .ok_or_else(|| VolumeError::InvalidParameter("empty envelope".to_string()))?;

        let (width, height) = size;
        let clip = |v: f64, max: usize| -> usize {
            if v <= 0.0 {
                0
            } else if v >= max as f64 {
                max
            } else {
                v as usize
            }
        };
        let col_min = clip(pixel_env.min_x.floor(), width);
        let col_max = clip(pixel_env.max_x.ceil(), width);
        let row_min = clip(pixel_env.min_y.floor(), height);
        let row_max = clip(pixel_env.max_y.ceil(), height);

        Ok(Self {
            col_off: col_min,
            row_off: row_min,
            width: col_max.saturating_sub(col_min),
            height: row_max.saturating_sub(row_min),
        })
    }
}

/// Raw-to-elevation mapping and unit symbol of one band
#[derive(Debug, Clone, PartialEq)]
pub struct BandElevation {
    pub transform: ElevationTransform,
    /// Unit symbol as declared by the source (`"m"`, `"ft"`, ...)
    pub unit: Option<String>,
}

impl BandElevation {
    pub fn metres() -> Self {
        Self {
            transform: ElevationTransform::IDENTITY,
            unit: Some("m".to_string()),
        }
    }
}

/// A materialised raster window ready for integration.
///
/// `data` is indexed `[row, col]`; no-data samples are stored as NaN.
/// `geo_transform` maps window-local grid coordinates (cell corners) to
/// the raster reference system.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    pub data: Array2<f64>,
    pub geo_transform: GeoTransform,
    pub reference_system: Option<ReferenceSystem>,
    pub elevation: Option<BandElevation>,
}

impl ElevationGrid {
    /// `(width, height)` in cells
    pub fn size(&self) -> (usize, usize) {
        let (rows, cols) = self.data.dim();
        (cols, rows)
    }

    pub fn grid_to_crs(&self) -> AffineTransform {
        AffineTransform::new(self.geo_transform)
    }
}

/// Source of elevation rasters with windowed access
pub trait RasterSource {
    /// `(width, height)` in cells
    fn size(&self) -> (usize, usize);

    fn band_count(&self) -> usize;

    /// Grid-to-CRS transform anchored at cell corners
    fn geo_transform(&self) -> GeoTransform;

    fn reference_system(&self) -> Option<ReferenceSystem>;

    /// Raw-to-elevation mapping of `band`, `None` if the band has none
    fn elevation_transform(&self, band: usize) -> Option<BandElevation>;

    /// Materialise a pixel window of one band
    fn read_window(&self, window: &PixelWindow, band: usize) -> VolumeResult<ElevationGrid>;

    fn resolution(&self) -> (f64, f64) {
        self.geo_transform().resolution()
    }

    /// Full extent in the raster reference system
    fn envelope(&self) -> Envelope {
        let gt = self.geo_transform();
        let (w, h) = self.size();
        let (w, h) = (w as f64, h as f64);
        let corners = [gt.apply(0.0, 0.0), gt.apply(w, 0.0), gt.apply(w, h), gt.apply(0.0, h)];
        Envelope::from_points(corners).unwrap_or(Envelope::new(
            gt.top_left_x,
            gt.top_left_y,
            gt.top_left_x,
            gt.top_left_y,
        ))
    }

    /// Read the window covering `envelope`, given in the raster reference system
    fn read_envelope(&self, envelope: &Envelope, band: usize) -> VolumeResult<ElevationGrid> {
        let window = PixelWindow::covering(envelope, &self.geo_transform(), self.size())?;
        log::debug!("Envelope {:?} maps to pixel window {:?}", envelope, window);
        self.read_window(&window, band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_inside_raster() {
        let gt = GeoTransform::north_up(0.0, 10.0, 1.0, -1.0);
        let env = Envelope::new(2.5, 3.0, 5.0, 7.2);
        let window = PixelWindow::covering(&env, &gt, (10, 10)).unwrap();
        assert_eq!(
            window,
            PixelWindow { col_off: 2, row_off: 2, width: 3, height: 5 }
        );
    }

    #[test]
    fn test_window_is_clipped() {
        let gt = GeoTransform::north_up(0.0, 4.0, 1.0, -1.0);
        let env = Envelope::new(-10.0, -10.0, 2.0, 20.0);
        let window = PixelWindow::covering(&env, &gt, (4, 4)).unwrap();
        assert_eq!(
            window,
            PixelWindow { col_off: 0, row_off: 0, width: 2, height: 4 }
        );
    }

    #[test]
    fn test_read_envelope_from_source() {
        use crate::io::MemoryRaster;

        let data = Array2::from_shape_fn((6, 8), |(r, c)| (r * 8 + c) as f64);
        let raster = MemoryRaster::new(&data, GeoTransform::north_up(100.0, 60.0, 10.0, -10.0));
        assert_eq!(raster.envelope(), Envelope::new(100.0, 0.0, 180.0, 60.0));
        assert_eq!(raster.resolution(), (10.0, 10.0));

        let grid = raster.read_envelope(&Envelope::new(125.0, 25.0, 138.0, 48.0), 0).unwrap();
        assert_eq!(grid.size(), (2, 3));
        // window starts at col 2, row 1
        assert_eq!(grid.data[[0, 0]], 10.0);
        assert_eq!(grid.geo_transform.apply(0.0, 0.0), (120.0, 50.0));
    }

    #[test]
    fn test_disjoint_window_is_empty() {
        let gt = GeoTransform::north_up(0.0, 4.0, 1.0, -1.0);
        let env = Envelope::new(100.0, 100.0, 110.0, 110.0);
        let window = PixelWindow::covering(&env, &gt, (4, 4)).unwrap();
        assert!(window.is_empty());
    }
}
