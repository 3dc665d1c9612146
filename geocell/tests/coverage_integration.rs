//! Integration tests for coverage construction and optimization.
//!
//! These tests verify the public coverage contract end to end:
//! - Rasterized rectangles against hand-checked cell counts
//! - Sibling group collapse thresholds
//! - Antimeridian rectangle splitting
//! - Optimize idempotence and area growth
//! - Normalization as a canonical form

use geocell::coverage::Coverage;
use geocell::hhcode;
use geocell::raster;

fn children_of(prefix: &str, keep: usize) -> Coverage {
    let mut coverage = Coverage::new();
    for digit in 0..keep {
        let (cell, resolution) = hhcode::from_hex(&format!("{}{:x}", prefix, digit)).unwrap();
        coverage.add_cell(resolution, cell);
    }
    coverage
}

#[test]
fn test_unit_square_covers_one_coarse_cell() {
    let mut coverage = Coverage::new();
    raster::cover_rectangle((0.0, 0.0), (1.0, 1.0), 4, &mut coverage);

    assert_eq!(coverage.cell_count(), 1);
    assert!(coverage.contains(4, hhcode::from_lat_lon(0.5, 0.5)));
}

#[test]
fn test_full_sibling_group_collapses() {
    let mut coverage = children_of("b57", 16);
    coverage.optimize(0);

    let (parent, parent_resolution) = hhcode::from_hex("b57").unwrap();
    assert_eq!(coverage.sorted_cells(), vec![(parent_resolution, parent)]);
}

#[test]
fn test_partial_sibling_group_stays_put() {
    let mut coverage = children_of("b57", 15);
    coverage.optimize(0);

    assert_eq!(coverage.cell_count_at(8), 15);
    assert_eq!(coverage.cell_count_at(6), 0);
}

#[test]
fn test_antimeridian_rectangle_is_the_union_of_its_halves() {
    let mut crossing = Coverage::new();
    raster::cover_rectangle((10.0, 170.0), (20.0, -170.0), 8, &mut crossing);

    let mut halves = Coverage::new();
    raster::cover_rectangle((10.0, 170.0), (20.0, 180.0), 8, &mut halves);
    raster::cover_rectangle((10.0, -180.0), (20.0, -170.0), 8, &mut halves);

    assert!(!crossing.is_empty());
    assert_eq!(crossing, halves);
}

#[test]
fn test_optimize_is_idempotent() {
    let vertices = [
        (hhcode::lat_to_unit(0.0), hhcode::lon_to_unit(0.0)),
        (hhcode::lat_to_unit(0.0), hhcode::lon_to_unit(4.0)),
        (hhcode::lat_to_unit(3.0), hhcode::lon_to_unit(5.0)),
        (hhcode::lat_to_unit(4.0), hhcode::lon_to_unit(1.0)),
    ];

    for thresholds in [0u64, 0x2222_2222_2222_2222] {
        let mut coverage = Coverage::new();
        raster::cover_polygon(&vertices, 12, &mut coverage);

        coverage.optimize(thresholds);
        let once = coverage.clone();
        coverage.optimize(thresholds);

        assert_eq!(coverage, once);
    }
}

#[test]
fn test_optimize_never_shrinks_the_area() {
    let vertices = [
        (hhcode::lat_to_unit(0.0), hhcode::lon_to_unit(0.0)),
        (hhcode::lat_to_unit(0.0), hhcode::lon_to_unit(4.0)),
        (hhcode::lat_to_unit(3.0), hhcode::lon_to_unit(5.0)),
        (hhcode::lat_to_unit(4.0), hhcode::lon_to_unit(1.0)),
    ];

    let mut coverage = Coverage::new();
    raster::cover_polygon(&vertices, 12, &mut coverage);
    let area = coverage.area();

    // Full groups replace sixteen children by an equal parent
    coverage.optimize(0);
    assert_eq!(coverage.area(), area);

    // Partial groups round the coverage up to whole parents
    coverage.optimize(0x4444_4444_4444_4444);
    assert!(coverage.area() >= area);
}

#[test]
fn test_equal_regions_normalize_to_identical_cells() {
    let (parent, parent_resolution) = hhcode::from_hex("b5").unwrap();
    let mut coarse = Coverage::new();
    coarse.add_cell(parent_resolution, parent);

    let mut fine = children_of("b5", 16);

    coarse.normalize(8);
    fine.normalize(8);

    assert_eq!(coarse, fine);
    assert_eq!(coarse.cell_count_at(8), 256);
}

#[test]
fn test_mixed_resolutions_report_ordered_cardinalities() {
    let mut coverage = Coverage::new();
    let (a, ra) = hhcode::from_hex("b5").unwrap();
    let (b, rb) = hhcode::from_hex("1234").unwrap();
    let (c, rc) = hhcode::from_hex("123456").unwrap();
    coverage.add_cell(ra, a);
    coverage.add_cell(rb, b);
    coverage.add_cell(rc, c);

    assert_eq!(coverage.resolutions(), vec![4, 8, 12]);
    assert_eq!(coverage.cardinalities(), vec![(4, 1), (8, 1), (12, 1)]);
    assert_eq!(coverage.cell_count(), 3);
}
