//! Python extension module `_core`

use crate::core::{Region, VolumeCalculator, VolumeParams};
use crate::io::MemoryRaster;
use crate::referencing::ReferenceSystem;
use crate::types::{GeoTransform, LengthUnit, VolumeError};
use numpy::PyReadonlyArray2;
use pyo3::prelude::*;

fn to_py_err(e: VolumeError) -> PyErr {
    match e {
        VolumeError::InvalidParameter(_)
        | VolumeError::UnresolvedReferenceSystem
        | VolumeError::UnknownEpsg(_) => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
        }
        _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e)),
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compute_volume, m)?)?;
    Ok(())
}

/// Volume in m³ between an elevation array and `z_ceiling` inside a polygon.
///
/// `geo_transform` uses GDAL coefficient order. The polygon ring shares the
/// raster's reference system, `epsg` if given, otherwise a local metric grid.
#[pyfunction]
#[pyo3(signature = (
    elevation,
    geo_transform,
    region,
    z_ceiling,
    ground_altitude=0.0,
    epsg=None,
    nodata=None
))]
fn compute_volume(
    py: Python<'_>,
    elevation: PyReadonlyArray2<'_, f64>,
    geo_transform: [f64; 6],
    region: Vec<(f64, f64)>,
    z_ceiling: f64,
    ground_altitude: f64,
    epsg: Option<u32>,
    nodata: Option<f64>,
) -> PyResult<f64> {
    let crs = match epsg {
        Some(code) => ReferenceSystem::resolve_epsg(code).map_err(to_py_err)?,
        None => ReferenceSystem::engineering("local grid", LengthUnit::Metre),
    };

    let data = elevation.as_array().to_owned();
    let mut raster = MemoryRaster::new(&data, GeoTransform::from_gdal(geo_transform))
        .with_reference_system(crs);
    if let Some(nodata) = nodata {
        raster = raster.with_nodata(nodata);
    }
    let region = Region::from_exterior(region);
    let params = VolumeParams::new(ground_altitude, z_ceiling);

    py.allow_threads(move || VolumeCalculator::new().compute_volume(&raster, &region, &params))
        .map_err(to_py_err)
}
