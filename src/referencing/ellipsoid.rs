use crate::types::{VolumeError, VolumeResult};
use serde::{Deserialize, Serialize};

/// Reference ellipsoid defined by semi-major axis (metres) and flattening
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub a: f64,
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    pub const GRS80: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };

    pub const AIRY_1830: Self = Self {
        a: 6_377_563.396,
        f: 1.0 / 299.324_964_6,
    };

    pub const INTERNATIONAL_1924: Self = Self {
        a: 6_378_388.0,
        f: 1.0 / 297.0,
    };

    pub const CLARKE_1866: Self = Self {
        a: 6_378_206.4,
        f: 1.0 / 294.978_698_2,
    };

    pub const CLARKE_1880_IGN: Self = Self {
        a: 6_378_249.2,
        f: 1.0 / 293.466_021_293_626_9,
    };

    pub const BESSEL_1841: Self = Self {
        a: 6_377_397.155,
        f: 1.0 / 299.152_812_8,
    };

    pub const KRASSOVSKY_1940: Self = Self {
        a: 6_378_245.0,
        f: 1.0 / 298.3,
    };

    pub const fn new(a: f64, f: f64) -> Self {
        Self { a, f }
    }

    pub const fn sphere(radius: f64) -> Self {
        Self { a: radius, f: 0.0 }
    }

    pub fn from_semi_axes(a: f64, b: f64) -> Self {
        Self { a, f: (a - b) / a }
    }

    /// Ellipsoid by its PROJ short name (`+ellps=`)
    pub fn from_proj_name(name: &str) -> Option<Self> {
        let ellipsoid = match name {
            "WGS84" => Self::WGS84,
            "GRS80" => Self::GRS80,
            "WGS72" => Self::new(6_378_135.0, 1.0 / 298.26),
            "GRS67" => Self::new(6_378_160.0, 1.0 / 298.247_167_427),
            "aust_SA" => Self::new(6_378_160.0, 1.0 / 298.25),
            "airy" => Self::AIRY_1830,
            "mod_airy" => Self::from_semi_axes(6_377_340.189, 6_356_034.446),
            "intl" => Self::INTERNATIONAL_1924,
            "clrk66" => Self::CLARKE_1866,
            "clrk80" => Self::new(6_378_249.145, 1.0 / 293.4663),
            "clrk80ign" => Self::CLARKE_1880_IGN,
            "bessel" => Self::BESSEL_1841,
            "bess_nam" => Self::new(6_377_483.865, 1.0 / 299.152_812_8),
            "krass" => Self::KRASSOVSKY_1940,
            "helmert" => Self::new(6_378_200.0, 1.0 / 298.3),
            "evrst30" => Self::new(6_377_276.345, 1.0 / 300.8017),
            _ => return None,
        };
        Some(ellipsoid)
    }

    /// Ellipsoid named by a PROJ datum (`+datum=`)
    pub fn from_proj_datum(datum: &str) -> Option<Self> {
        let ellps = match datum {
            "WGS84" => "WGS84",
            "GGRS87" | "NAD83" => "GRS80",
            "NAD27" => "clrk66",
            "potsdam" | "hermannskogel" | "ch1903" | "s_jtsk" | "gunung_segara" => "bessel",
            "carthage" => "clrk80ign",
            "ire65" => "mod_airy",
            "nzgd49" | "rassadiran" | "rnb72" => "intl",
            "OSGB36" | "osni52" => "airy",
            "beduaram" => "clrk80",
            _ => return None,
        };
        Self::from_proj_name(ellps)
    }

    /// Ellipsoid of a PROJ.4 definition string.
    ///
    /// Explicit axes (`+a`, `+b`, `+rf`, `+f`, `+R`) take precedence over
    /// `+ellps`, which takes precedence over `+datum`.
    pub fn from_proj4(definition: &str) -> Option<Self> {
        let param = |key: &str| proj4_param(definition, key);
        let number = |key: &str| param(key).and_then(|v| v.parse::<f64>().ok());

        if let Some(radius) = number("R") {
            return Some(Self::sphere(radius));
        }
        let named = param("ellps")
            .and_then(Self::from_proj_name)
            .or_else(|| param("datum").and_then(Self::from_proj_datum));
        match number("a") {
            Some(a) => {
                if let Some(b) = number("b") {
                    Some(Self::from_semi_axes(a, b))
                } else if let Some(rf) = number("rf") {
                    Some(Self::new(a, if rf == 0.0 { 0.0 } else { 1.0 / rf }))
                } else if let Some(f) = number("f") {
                    Some(Self::new(a, f))
                } else {
                    named.map(|e| Self::new(a, e.f))
                }
            }
            None => named,
        }
    }

    /// Semi-minor axis
    #[inline]
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.f)
    }

    /// First eccentricity squared
    #[inline]
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// Geodesic distance in metres between two points given in decimal degrees
    /// (longitude, latitude), using Vincenty's inverse formula.
    pub fn orthodromic_distance(
        &self,
        lon1: f64,
        lat1: f64,
        lon2: f64,
        lat2: f64,
    ) -> VolumeResult<f64> {
        const MAX_ITER: usize = 200;
        const TOLERANCE: f64 = 1e-12;

        if !(lon1.is_finite() && lat1.is_finite() && lon2.is_finite() && lat2.is_finite()) {
            return Err(VolumeError::Geodesic(format!(
                "non-finite position ({}, {}) -> ({}, {})",
                lon1, lat1, lon2, lat2
            )));
        }
        if lat1.abs() > 90.0 || lat2.abs() > 90.0 {
            return Err(VolumeError::Geodesic(format!(
                "latitude out of range: {} / {}",
                lat1, lat2
            )));
        }

        let a = self.a;
        let f = self.f;
        let b = self.b();

        let l = (lon2 - lon1).to_radians();
        let u1 = ((1.0 - f) * lat1.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * lat2.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut converged = false;
        let mut sin_sigma = 0.0;
        let mut cos_sigma = 0.0;
        let mut sigma = 0.0;
        let mut cos_sq_alpha = 0.0;
        let mut cos_2sigma_m = 0.0;

        for _ in 0..MAX_ITER {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            sin_sigma = ((cos_u2 * sin_lambda).powi(2)
                + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
            .sqrt();

            if sin_sigma == 0.0 {
                // coincident points
                return Ok(0.0);
            }

            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            cos_2sigma_m = if cos_sq_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            } else {
                // equatorial line
                0.0
            };

            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let lambda_prev = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

            if (lambda - lambda_prev).abs() < TOLERANCE {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(VolumeError::Geodesic(format!(
                "Vincenty inverse did not converge between ({}, {}) and ({}, {})",
                lon1, lat1, lon2, lat2
            )));
        }

        let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
        let big_a =
            1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        let delta_sigma = big_b
            * sin_sigma
            * (cos_2sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                        - big_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

        Ok(b * big_a * (sigma - delta_sigma))
    }
}

/// Value of `+key=value` in a PROJ.4 string; `Some("")` for a bare `+key`
pub(crate) fn proj4_param<'a>(definition: &'a str, key: &str) -> Option<&'a str> {
    definition.split_whitespace().find_map(|token| {
        let token = token.strip_prefix('+')?;
        match token.split_once('=') {
            Some((k, v)) if k == key => Some(v),
            None if token == key => Some(""),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_coincident_points() {
        let d = Ellipsoid::WGS84.orthodromic_distance(12.5, 41.9, 12.5, 41.9).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_one_degree_along_equator() {
        // a * pi / 180
        let d = Ellipsoid::WGS84.orthodromic_distance(0.0, 0.0, 1.0, 0.0).unwrap();
        assert_relative_eq!(d, 111_319.490_793, epsilon = 1e-3);
    }

    #[test]
    fn test_one_degree_of_meridian_at_equator() {
        let d = Ellipsoid::WGS84.orthodromic_distance(0.0, -0.5, 0.0, 0.5).unwrap();
        assert_relative_eq!(d, 110_574.4, epsilon = 1.0);
    }

    #[test]
    fn test_flinders_peak_to_buninyong() {
        // Reference line from Vincenty (1975), GRS80 / WGS84
        let lat1 = -(37.0 + 57.0 / 60.0 + 3.72030 / 3600.0);
        let lon1 = 144.0 + 25.0 / 60.0 + 29.52440 / 3600.0;
        let lat2 = -(37.0 + 39.0 / 60.0 + 10.15610 / 3600.0);
        let lon2 = 143.0 + 55.0 / 60.0 + 35.38390 / 3600.0;
        let d = Ellipsoid::GRS80.orthodromic_distance(lon1, lat1, lon2, lat2).unwrap();
        assert_relative_eq!(d, 54_972.271, epsilon = 1e-2);
    }

    #[test]
    fn test_sphere_matches_great_circle() {
        let r = 6_371_000.0;
        let d = Ellipsoid::sphere(r).orthodromic_distance(0.0, 0.0, 90.0, 0.0).unwrap();
        assert_relative_eq!(d, r * std::f64::consts::FRAC_PI_2, max_relative = 1e-12);
    }

    #[test]
    fn test_ellipsoid_from_proj4() {
        let utm = "+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs";
        assert_eq!(Ellipsoid::from_proj4(utm), Some(Ellipsoid::WGS84));

        let ed50 = "+proj=utm +zone=31 +ellps=intl +towgs84=-87,-98,-121,0,0,0,0 +units=m";
        assert_eq!(Ellipsoid::from_proj4(ed50), Some(Ellipsoid::INTERNATIONAL_1924));

        let bng = "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +datum=OSGB36 +units=m";
        assert_eq!(Ellipsoid::from_proj4(bng), Some(Ellipsoid::AIRY_1830));

        let merc = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +units=m";
        assert_eq!(Ellipsoid::from_proj4(merc), Some(Ellipsoid::sphere(6_378_137.0)));

        let custom = "+proj=longlat +a=6378000 +rf=300 +no_defs";
        let e = Ellipsoid::from_proj4(custom).unwrap();
        assert_relative_eq!(e.f, 1.0 / 300.0);

        assert!(Ellipsoid::from_proj4("+proj=longlat +ellps=unknown").is_none());
    }

    #[test]
    fn test_proj4_param() {
        let def = "+proj=longlat +datum=WGS84 +no_defs";
        assert_eq!(proj4_param(def, "proj"), Some("longlat"));
        assert_eq!(proj4_param(def, "no_defs"), Some(""));
        assert_eq!(proj4_param(def, "ellps"), None);
    }

    #[test]
    fn test_invalid_latitude_is_rejected() {
        let result = Ellipsoid::WGS84.orthodromic_distance(0.0, 91.0, 0.0, 0.0);
        assert!(matches!(result, Err(VolumeError::Geodesic(_))));
    }
}
