//! Raster sources for elevation data

pub mod raster;
pub mod memory;
#[cfg(feature = "gdal")]
pub mod dem;

pub use raster::{BandElevation, ElevationGrid, PixelWindow, RasterSource};
pub use memory::MemoryRaster;
#[cfg(feature = "gdal")]
pub use dem::GdalDemSource;
