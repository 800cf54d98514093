use approx::assert_relative_eq;
use demvolume::referencing::{CoordinateTransform, ProjRegistry};
use demvolume::{
    Ellipsoid, GeoTransform, LengthUnit, MemoryRaster, ReferenceSystem, Region, TransformRegistry,
    VolumeCalculator, VolumeError, VolumeParams,
};
use ndarray::Array2;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Metres spanned by `d_lon` x `d_lat` degrees around latitude `lat` on WGS 84
fn lonlat_box_area(lat: f64, d_lon: f64, d_lat: f64) -> f64 {
    let e = Ellipsoid::WGS84;
    let phi = lat.to_radians();
    let w = (1.0 - e.e2() * phi.sin().powi(2)).sqrt();
    let n = e.a / w;
    let m = e.a * (1.0 - e.e2()) / w.powi(3);
    (d_lon.to_radians() * n * phi.cos()) * (d_lat.to_radians() * m)
}

/// 20x20 cells of 0.01° over lon 10.0..10.2, lat 45.0..45.2
fn alpine_raster(elevation: f64) -> MemoryRaster {
    let gt = GeoTransform::north_up(10.0, 45.2, 0.01, -0.01);
    MemoryRaster::new(&Array2::from_elem((20, 20), elevation), gt)
        .with_reference_system(ReferenceSystem::wgs84())
}

/// 4x4 cells of 10 m in UTM zone 33N at 3 m
fn utm_raster() -> MemoryRaster {
    let utm = ReferenceSystem::from_epsg(32633).expect("EPSG:32633 missing from catalogue");
    let gt = GeoTransform::north_up(500_000.0, 5_000_040.0, 10.0, -10.0);
    MemoryRaster::new(&Array2::from_elem((4, 4), 3.0), gt).with_reference_system(utm)
}

fn to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    ProjRegistry
        .find_transform(&ReferenceSystem::wgs84(), &ReferenceSystem::web_mercator())
        .and_then(|t| t.transform(lon, lat))
        .expect("mercator projection failed")
}

#[test]
fn test_cartesian_geographic_consistency() {
    init();
    let calculator = VolumeCalculator::new();
    let params = VolumeParams::new(0.0, 10.0);

    // 10x10 cells of 0.001° at the equator
    let gt = GeoTransform::north_up(0.0, 0.01, 0.001, -0.001);
    let geographic = MemoryRaster::new(&Array2::from_elem((10, 10), 5.0), gt)
        .with_reference_system(ReferenceSystem::wgs84());
    let geo_region = Region::rectangle(0.0, 0.0, 0.01, 0.01);
    let geo_volume = calculator
        .compute_volume(&geographic, &geo_region, &params)
        .expect("geographic computation failed");

    // same physical extent on a flat metric grid
    let dx = 111.319_490_8;
    let dy = 110.574_272_7;
    let gt = GeoTransform::north_up(0.0, 10.0 * dy, dx, -dy);
    let projected = MemoryRaster::new(&Array2::from_elem((10, 10), 5.0), gt)
        .with_reference_system(ReferenceSystem::engineering("equator grid", LengthUnit::Metre));
    let flat_region = Region::rectangle(0.0, 0.0, 10.0 * dx, 10.0 * dy);
    let flat_volume = calculator
        .compute_volume(&projected, &flat_region, &params)
        .expect("cartesian computation failed");

    println!("Geographic: {:.3} m³, Cartesian: {:.3} m³", geo_volume, flat_volume);
    assert_relative_eq!(geo_volume, flat_volume, max_relative = 1e-3);
}

#[test]
fn test_geographic_volume_matches_ellipsoid_area() {
    init();
    let raster = alpine_raster(4.0);
    let region = Region::rectangle(10.05, 45.05, 10.15, 45.15)
        .with_reference_system(ReferenceSystem::wgs84());
    let volume = VolumeCalculator::new()
        .compute_volume(&raster, &region, &VolumeParams::new(0.0, 10.0))
        .expect("volume computation failed");

    let expected = 4.0 * lonlat_box_area(45.1, 0.1, 0.1);
    assert_relative_eq!(volume, expected, max_relative = 1e-3);
}

#[test]
fn test_mercator_region_over_geographic_raster() {
    init();
    let raster = alpine_raster(4.0);
    let calculator = VolumeCalculator::new();
    let params = VolumeParams::new(0.0, 10.0);

    let (min_x, min_y) = to_mercator(10.05, 45.05);
    let (max_x, max_y) = to_mercator(10.15, 45.15);
    let mercator_region = Region::rectangle(min_x, min_y, max_x, max_y)
        .with_reference_system(ReferenceSystem::web_mercator());
    let lonlat_region = Region::rectangle(10.05, 45.05, 10.15, 45.15);

    let through_mercator = calculator
        .compute_volume(&raster, &mercator_region, &params)
        .expect("mercator region failed");
    let direct = calculator
        .compute_volume(&raster, &lonlat_region, &params)
        .expect("geographic region failed");
    assert!(direct > 0.0);
    assert_relative_eq!(through_mercator, direct, max_relative = 1e-9);
}

#[test]
fn test_region_srid_and_override() {
    init();
    let raster = alpine_raster(4.0);
    let calculator = VolumeCalculator::new();

    let (min_x, min_y) = to_mercator(10.05, 45.05);
    let (max_x, max_y) = to_mercator(10.15, 45.15);
    let baseline = calculator
        .compute_volume(
            &raster,
            &Region::rectangle(min_x, min_y, max_x, max_y)
                .with_reference_system(ReferenceSystem::web_mercator()),
            &VolumeParams::new(0.0, 10.0),
        )
        .expect("baseline failed");

    // SRID embedded in the geometry
    let with_srid = Region::rectangle(min_x, min_y, max_x, max_y).with_srid(3857);
    let volume = calculator
        .compute_volume(&raster, &with_srid, &VolumeParams::new(0.0, 10.0))
        .expect("SRID region failed");
    assert_relative_eq!(volume, baseline, max_relative = 1e-12);

    // explicit override beats the geometry's own reference system
    let mislabelled = Region::rectangle(min_x, min_y, max_x, max_y)
        .with_reference_system(ReferenceSystem::wgs84());
    let params = VolumeParams {
        region_crs: Some(ReferenceSystem::web_mercator()),
        ..VolumeParams::new(0.0, 10.0)
    };
    let volume = calculator
        .compute_volume(&raster, &mislabelled, &params)
        .expect("override failed");
    assert_relative_eq!(volume, baseline, max_relative = 1e-12);
}

#[test]
fn test_unresolvable_transform() {
    init();
    let raster = alpine_raster(4.0);
    let region = Region::rectangle(0.0, 0.0, 1.0, 1.0)
        .with_reference_system(ReferenceSystem::engineering("mine survey", LengthUnit::Metre));
    let result =
        VolumeCalculator::new().compute_volume(&raster, &region, &VolumeParams::new(0.0, 10.0));
    match result {
        Err(VolumeError::TransformResolution { source_crs, target_crs }) => {
            assert_eq!(source_crs, "mine survey");
            assert_eq!(target_crs, "EPSG:4326");
        }
        other => panic!("expected a transform resolution error, got {:?}", other),
    }
}

#[test]
fn test_geographic_region_over_utm_raster() {
    init();
    let raster = utm_raster();
    // a lon/lat box comfortably containing the whole raster
    let region = Region::rectangle(14.99, 45.10, 15.01, 45.20)
        .with_reference_system(ReferenceSystem::wgs84());
    let volume = VolumeCalculator::new()
        .compute_volume(&raster, &region, &VolumeParams::new(0.0, 5.0))
        .expect("volume computation failed");
    assert_relative_eq!(volume, 4800.0, max_relative = 1e-9);
}

#[test]
fn test_national_grid_region_over_utm_raster() {
    init();
    let raster = utm_raster();
    let laea = ReferenceSystem::from_epsg(3035).expect("EPSG:3035 missing from catalogue");
    let to_laea = ProjRegistry
        .find_transform(&ReferenceSystem::from_epsg(32633).expect("EPSG:32633 missing"), &laea)
        .expect("no UTM -> LAEA transform");

    // the raster footprint expressed in LAEA Europe, padded by a metre
    let corners: Vec<(f64, f64)> = [
        (500_000.0, 5_000_000.0),
        (500_040.0, 5_000_000.0),
        (500_040.0, 5_000_040.0),
        (500_000.0, 5_000_040.0),
    ]
    .iter()
    .map(|&(x, y)| to_laea.transform(x, y).expect("projection failed"))
    .collect();
    let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min) - 1.0;
    let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min) - 1.0;
    let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max) + 1.0;
    let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max) + 1.0;

    let region = Region::rectangle(min_x, min_y, max_x, max_y).with_srid(3035);
    let volume = VolumeCalculator::new()
        .compute_volume(&raster, &region, &VolumeParams::new(0.0, 5.0))
        .expect("volume computation failed");
    assert_relative_eq!(volume, 4800.0, max_relative = 1e-9);
}

#[test]
fn test_region_srid_is_not_read_as_raster_coordinates() {
    init();
    let utm = ReferenceSystem::from_epsg(32633).expect("EPSG:32633 missing from catalogue");
    let gt = GeoTransform::north_up(500_000.0, 5_000_004.0, 1.0, -1.0);
    let raster = MemoryRaster::new(&Array2::from_elem((4, 4), 3.0), gt).with_reference_system(utm);
    let params = VolumeParams::new(0.0, 5.0);
    let calculator = VolumeCalculator::new();

    // UTM-looking numbers tagged as LAEA Europe lie far outside the raster
    let region = Region::rectangle(500_000.0, 5_000_000.0, 500_004.0, 5_000_004.0).with_srid(3035);
    match calculator.compute_volume(&raster, &region, &params) {
        Ok(volume) => assert_eq!(volume, 0.0),
        Err(e) => assert!(matches!(e, VolumeError::TransformFailed(_)), "unexpected error {}", e),
    }

    // an SRID nobody knows is an error rather than a fallback to the raster system
    let region =
        Region::rectangle(500_000.0, 5_000_000.0, 500_004.0, 5_000_004.0).with_srid(999_999);
    let result = calculator.compute_volume(&raster, &region, &params);
    assert!(matches!(result, Err(VolumeError::UnknownEpsg(999_999))), "{:?}", result);

    let untagged = Region::rectangle(500_000.0, 5_000_000.0, 500_004.0, 5_000_004.0);
    let volume = calculator.compute_volume(&raster, &untagged, &params).expect("untagged failed");
    assert_relative_eq!(volume, 48.0, epsilon = 1e-9);
}

#[test]
fn test_unsupported_raster_reference_system() {
    init();
    let mut crs = ReferenceSystem::engineering("geocentric", LengthUnit::Metre);
    crs.kind = demvolume::CrsKind::Other;
    let gt = GeoTransform::north_up(0.0, 4.0, 1.0, -1.0);
    let raster = MemoryRaster::new(&Array2::from_elem((4, 4), 3.0), gt).with_reference_system(crs);
    let region = Region::rectangle(0.0, 0.0, 4.0, 4.0);
    let result =
        VolumeCalculator::new().compute_volume(&raster, &region, &VolumeParams::new(0.0, 5.0));
    assert!(matches!(result, Err(VolumeError::UnsupportedReferenceSystem(_))));
}
