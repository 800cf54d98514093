use serde::{Deserialize, Serialize};

/// Planimetric bounding envelope in some reference system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Smallest envelope holding every point, `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Self> {
        let mut env: Option<Envelope> = None;
        for (x, y) in points {
            env = Some(match env {
                None => Envelope { min_x: x, min_y: y, max_x: x, max_y: y },
                Some(e) => Envelope {
                    min_x: e.min_x.min(x),
                    min_y: e.min_y.min(y),
                    max_x: e.max_x.max(x),
                    max_y: e.max_y.max(y),
                },
            });
        }
        env
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Boundary points for reprojection: `points_per_edge` evenly spaced
    /// points along each edge, corners included, walked counter-clockwise
    /// from `(min_x, min_y)`.
    pub fn densified_boundary(&self, points_per_edge: usize) -> Vec<(f64, f64)> {
        let n = points_per_edge.max(2) - 1;
        let lerp = |a: f64, b: f64, i: usize| a + (b - a) * (i as f64 / n as f64);
        let mut points = Vec::with_capacity(4 * n);
        for i in 0..n {
            points.push((lerp(self.min_x, self.max_x, i), self.min_y));
        }
        for i in 0..n {
            points.push((self.max_x, lerp(self.min_y, self.max_y, i)));
        }
        for i in 0..n {
            points.push((lerp(self.max_x, self.min_x, i), self.max_y));
        }
        for i in 0..n {
            points.push((self.min_x, lerp(self.max_y, self.min_y, i)));
        }
        points
    }
}

/// Geospatial transformation parameters (GDAL coefficient ordering)
///
/// Maps a grid position `(col, row)` anchored at the cell corner to
/// `(x, y)` in the raster reference system:
/// `x = top_left_x + col * pixel_width + row * rotation_x`,
/// `y = top_left_y + col * rotation_y + row * pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform without rotation terms
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height,
        }
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Ground size of one cell along grid x and grid y, in CRS units
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.pixel_width.hypot(self.rotation_y),
            self.rotation_x.hypot(self.pixel_height),
        )
    }

    /// Same transform re-anchored at grid offset `(col_off, row_off)`
    pub fn shifted(&self, col_off: usize, row_off: usize) -> Self {
        let (x, y) = self.apply(col_off as f64, row_off as f64);
        Self {
            top_left_x: x,
            top_left_y: y,
            ..*self
        }
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.top_left_x + col * self.pixel_width + row * self.rotation_x,
            self.top_left_y + col * self.rotation_y + row * self.pixel_height,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y
    }

    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det != 0.0
    }
}

/// Unit of a linear measure, stored as its factor to metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LengthUnit {
    Metre,
    Kilometre,
    Foot,
    UsSurveyFoot,
    Other { to_metres: f64 },
}

impl LengthUnit {
    pub fn to_metres_factor(&self) -> f64 {
        match self {
            LengthUnit::Metre => 1.0,
            LengthUnit::Kilometre => 1000.0,
            LengthUnit::Foot => 0.3048,
            LengthUnit::UsSurveyFoot => 1200.0 / 3937.0,
            LengthUnit::Other { to_metres } => *to_metres,
        }
    }

    pub fn to_metres(&self, value: f64) -> f64 {
        value * self.to_metres_factor()
    }

    /// Unit from its length in metres, e.g. as reported by OSR or PROJ
    pub fn from_metres_per_unit(metres_per_unit: f64) -> Self {
        [
            LengthUnit::Metre,
            LengthUnit::Kilometre,
            LengthUnit::Foot,
            LengthUnit::UsSurveyFoot,
        ]
        .into_iter()
        .find(|unit| {
            let factor = unit.to_metres_factor();
            (factor - metres_per_unit).abs() < 1e-12 * factor
        })
        .unwrap_or(LengthUnit::Other {
            to_metres: metres_per_unit,
        })
    }

    /// Parse a unit symbol as found in raster band metadata.
    /// Returns `None` when the symbol is not a length.
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol.trim().to_lowercase().as_str() {
            "m" | "metre" | "meter" | "metres" | "meters" => Some(LengthUnit::Metre),
            "km" | "kilometre" | "kilometer" => Some(LengthUnit::Kilometre),
            "ft" | "foot" | "feet" | "international foot" => Some(LengthUnit::Foot),
            "us-ft" | "ftus" | "us survey foot" | "foot_us" => Some(LengthUnit::UsSurveyFoot),
            "cm" | "centimetre" | "centimeter" => Some(LengthUnit::Other { to_metres: 0.01 }),
            "mm" | "millimetre" | "millimeter" => Some(LengthUnit::Other { to_metres: 0.001 }),
            "dm" | "decimetre" | "decimeter" => Some(LengthUnit::Other { to_metres: 0.1 }),
            _ => None,
        }
    }
}

/// Unit of an angular measure, stored as its factor to degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AngularUnit {
    Degree,
    Radian,
    Grad,
}

impl AngularUnit {
    pub fn to_degrees(&self, value: f64) -> f64 {
        match self {
            AngularUnit::Degree => value,
            AngularUnit::Radian => value.to_degrees(),
            AngularUnit::Grad => value * 0.9,
        }
    }

    pub fn from_degrees(&self, degrees: f64) -> f64 {
        match self {
            AngularUnit::Degree => degrees,
            AngularUnit::Radian => degrees.to_radians(),
            AngularUnit::Grad => degrees / 0.9,
        }
    }
}

/// Raw-sample to geophysical-value mapping of one band (`value = raw * scale + offset`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationTransform {
    pub scale: f64,
    pub offset: f64,
}

impl ElevationTransform {
    pub const IDENTITY: Self = Self { scale: 1.0, offset: 0.0 };

    pub fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

/// Error types for volume computation
#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unable to resolve a reference system for the region")]
    UnresolvedReferenceSystem,

    #[error("Unknown reference system EPSG:{0}")]
    UnknownEpsg(u32),

    #[error("No coordinate transform from {source_crs} to {target_crs}")]
    TransformResolution {
        source_crs: String,
        target_crs: String,
    },

    #[error("Band {band} has no raw-to-elevation transform")]
    MissingElevationTransform { band: usize },

    #[error("Unsupported reference system: {0}")]
    UnsupportedReferenceSystem(String),

    #[error("Coordinate transform failed: {0}")]
    TransformFailed(String),

    #[error("Interpolation error: {0}")]
    Interpolation(String),

    #[error("Geodesic computation error: {0}")]
    Geodesic(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for volume operations
pub type VolumeResult<T> = Result<T, VolumeError>;
