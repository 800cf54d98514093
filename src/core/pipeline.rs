use crate::referencing::{
    AffineTransform, ConcatenatedTransform, CoordinateTransform, ReferenceSystem, TransformRegistry,
};
use crate::types::{Envelope, VolumeError, VolumeResult};

/// Points reprojected along each edge of an envelope
pub const ENVELOPE_POINTS_PER_EDGE: usize = 21;

type Candidate<'a> = Box<dyn Fn() -> VolumeResult<Option<ReferenceSystem>> + 'a>;

/// Ordered list of places a reference system may come from.
///
/// `resolve` returns the first candidate that yields one. A candidate that
/// fails stops the resolution with its error.
pub struct ResolutionChain<'a> {
    candidates: Vec<(&'static str, Candidate<'a>)>,
}

impl<'a> ResolutionChain<'a> {
    pub fn new() -> Self {
        Self { candidates: Vec::new() }
    }

    pub fn then<F>(self, label: &'static str, candidate: F) -> Self
    where
        F: Fn() -> Option<ReferenceSystem> + 'a,
    {
        self.try_then(label, move || Ok(candidate()))
    }

    pub fn try_then<F>(mut self, label: &'static str, candidate: F) -> Self
    where
        F: Fn() -> VolumeResult<Option<ReferenceSystem>> + 'a,
    {
        self.candidates.push((label, Box::new(candidate)));
        self
    }

    pub fn resolve(&self) -> VolumeResult<Option<ReferenceSystem>> {
        for (label, candidate) in &self.candidates {
            if let Some(crs) = candidate()? {
                log::debug!("Reference system {} taken from {}", crs, label);
                return Ok(Some(crs));
            }
        }
        Ok(None)
    }
}

impl Default for ResolutionChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Grid -> region transform: grid-to-CRS affine followed by the raster
/// CRS -> region CRS transform.
#[derive(Debug)]
pub struct CoordinatePipeline {
    grid_to_region: Box<dyn CoordinateTransform>,
}

impl CoordinatePipeline {
    pub fn new(
        grid_to_crs: AffineTransform,
        raster_crs: &ReferenceSystem,
        region_crs: &ReferenceSystem,
        registry: &dyn TransformRegistry,
    ) -> VolumeResult<Self> {
        let crs_to_region = registry.find_transform(raster_crs, region_crs)?;
        if crs_to_region.is_identity() {
            log::debug!("Raster and region share reference system {}", region_crs);
        } else {
            log::debug!("Projecting grid samples from {} to {}", raster_crs, region_crs);
        }
        Ok(Self {
            grid_to_region: ConcatenatedTransform::create(Box::new(grid_to_crs), crs_to_region),
        })
    }

    /// Grid position to region coordinates. Any failure is fatal.
    #[inline]
    pub fn project(&self, x: f64, y: f64) -> VolumeResult<(f64, f64)> {
        self.grid_to_region.transform(x, y)
    }
}

/// Reproject `envelope` through `transform`, sampling
/// [`ENVELOPE_POINTS_PER_EDGE`] points along each edge so curved edges are
/// covered
pub fn transform_envelope(
    envelope: &Envelope,
    transform: &dyn CoordinateTransform,
) -> VolumeResult<Envelope> {
    if transform.is_identity() {
        return Ok(*envelope);
    }
    let points = envelope
        .densified_boundary(ENVELOPE_POINTS_PER_EDGE)
        .into_iter()
        .map(|(x, y)| transform.transform(x, y))
        .collect::<VolumeResult<Vec<_>>>()?;
    Envelope::from_points(points)
        .ok_or_else(|| VolumeError::TransformFailed("envelope has no sample points".to_string()))
}
