use crate::referencing::ReferenceSystem;
use crate::types::{Envelope, VolumeResult};
use geo::{BoundingRect, Contains, LineString, MultiPolygon, Point, Polygon, Rect};

/// A 2-D area of interest the volume is restricted to
pub trait RegionGeometry: Sync {
    /// Bounding envelope in the region's own coordinates, `None` if empty
    fn envelope(&self) -> Option<Envelope>;

    /// Strict point-in-area test, `(x, y)` in the region's coordinates
    fn contains(&self, x: f64, y: f64) -> bool;

    /// Reference system attached to the geometry, if any
    fn reference_system(&self) -> Option<ReferenceSystem> {
        None
    }

    /// Reference system recoverable from metadata embedded in the geometry
    /// itself (e.g. an SRID). Metadata that is present but names no known
    /// system is an error.
    fn embedded_reference_system(&self) -> VolumeResult<Option<ReferenceSystem>> {
        Ok(None)
    }
}

/// Polygonal region backed by a `geo::MultiPolygon`
#[derive(Debug, Clone)]
pub struct Region {
    geometry: MultiPolygon<f64>,
    reference_system: Option<ReferenceSystem>,
    srid: Option<u32>,
}

impl Region {
    pub fn new<G: Into<MultiPolygon<f64>>>(geometry: G) -> Self {
        Self {
            geometry: geometry.into(),
            reference_system: None,
            srid: None,
        }
    }

    /// Axis-aligned rectangle
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let rect = Rect::new((min_x, min_y), (max_x, max_y));
        Self::new(rect.to_polygon())
    }

    /// Polygon without holes; the ring is closed if needed
    pub fn from_exterior(points: Vec<(f64, f64)>) -> Self {
        Self::new(Polygon::new(LineString::from(points), vec![]))
    }

    pub fn empty() -> Self {
        Self::new(MultiPolygon::<f64>(vec![]))
    }

    pub fn with_reference_system(mut self, crs: ReferenceSystem) -> Self {
        self.reference_system = Some(crs);
        self
    }

    /// Attach an EPSG SRID, as carried by geometries read from WKB/PostGIS
    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn srid(&self) -> Option<u32> {
        self.srid
    }
}

impl RegionGeometry for Region {
    fn envelope(&self) -> Option<Envelope> {
        self.geometry
            .bounding_rect()
            .map(|r| Envelope::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(&Point::new(x, y))
    }

    fn reference_system(&self) -> Option<ReferenceSystem> {
        self.reference_system.clone()
    }

    fn embedded_reference_system(&self) -> VolumeResult<Option<ReferenceSystem>> {
        self.srid.map(ReferenceSystem::resolve_epsg).transpose()
    }
}

/// Per-sample containment test against a region, with an envelope
/// pre-check. Points must already be in the region reference system.
pub struct ContainmentFilter<'a> {
    region: &'a dyn RegionGeometry,
    envelope: Option<Envelope>,
}

impl<'a> ContainmentFilter<'a> {
    pub fn new(region: &'a dyn RegionGeometry) -> Self {
        Self {
            region,
            envelope: region.envelope(),
        }
    }

    #[inline]
    pub fn contains(&self, (x, y): (f64, f64)) -> bool {
        match &self.envelope {
            Some(env) if x >= env.min_x && x <= env.max_x && y >= env.min_y && y <= env.max_y => {
                self.region.contains(x, y)
            }
            _ => false,
        }
    }
}
