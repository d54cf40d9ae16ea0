//! Spherical distance, planar projections, convex hull, and point-in-triangle
//! predicates (spec §4.1).

use crate::portal::{Portal, ProjectedPortal};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two (lon, lat) pairs, in radians, via the
/// Vincenty formula for an ellipsoid with equal major/minor axes.
pub fn great_circle_distance_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let dlon = (lon2 - lon1).abs();
    let (sin_lat1, cos_lat1) = (lat1.sin(), lat1.cos());
    let (sin_lat2, cos_lat2) = (lat2.sin(), lat2.cos());
    let (sin_dlon, cos_dlon) = (dlon.sin(), dlon.cos());

    let a = cos_lat2 * sin_dlon;
    let b = cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon;
    let numer = (a * a + b * b).sqrt();
    let denom = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;
    let angle = numer.atan2(denom);
    EARTH_RADIUS_M * angle
}

/// N x N matrix of integer metres, symmetric, zero on the diagonal.
pub fn distance_matrix(portals: &[Portal]) -> Vec<Vec<i64>> {
    let n = portals.len();
    let rad: Vec<(f64, f64)> = portals
        .iter()
        .map(|p| (p.lon.to_radians(), p.lat.to_radians()))
        .collect();
    let mut out = vec![vec![0i64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = great_circle_distance_m(rad[i].0, rad[i].1, rad[j].0, rad[j].1);
            let d = d.round() as i64;
            out[i][j] = d;
            out[j][i] = d;
        }
    }
    out
}

/// Gnomonic projection centred on the bounding-box midpoint of all portals.
/// Only correct for regions small enough that all portals lie in one
/// hemisphere relative to the centre.
pub fn gnomonic_proj(portals: &[Portal]) -> Vec<(f64, f64)> {
    let rad: Vec<(f64, f64)> = portals
        .iter()
        .map(|p| (p.lon.to_radians(), p.lat.to_radians()))
        .collect();
    let (lon_min, lon_max) = min_max(rad.iter().map(|p| p.0));
    let (lat_min, lat_max) = min_max(rad.iter().map(|p| p.1));
    let lon_c = lon_min + (lon_max - lon_min) / 2.0;
    let lat_c = lat_min + (lat_max - lat_min) / 2.0;
    let (sin_c, cos_c) = (lat_c.sin(), lat_c.cos());

    rad.iter()
        .map(|&(lon, lat)| {
            let (sin_lat, cos_lat) = (lat.sin(), lat.cos());
            let cos_cdist = sin_c * sin_lat + cos_c * cos_lat * (lon - lon_c).cos();
            let x = EARTH_RADIUS_M * cos_lat * (lon - lon_c).sin() / cos_cdist;
            let y = EARTH_RADIUS_M * (cos_c * sin_lat - sin_c * cos_lat * (lon - lon_c).cos())
                / cos_cdist;
            (x, y)
        })
        .collect()
}

/// Web-mercator projection for a 640x640 canvas, plus the zoom level and
/// centre (lon, lat in degrees) an external renderer would need. Used only
/// by the rendering collaborator (spec §3); not consumed by the core
/// pipeline itself.
pub fn web_mercator_proj(portals: &[Portal]) -> (Vec<(f64, f64)>, u32, (f64, f64)) {
    use std::f64::consts::PI;

    let rad: Vec<(f64, f64)> = portals
        .iter()
        .map(|p| (p.lon.to_radians(), p.lat.to_radians()))
        .collect();
    let mut xy: Vec<(f64, f64)> = rad
        .iter()
        .map(|&(lon, lat)| {
            let x = 256.0 / (2.0 * PI) * (lon + PI);
            let y = 256.0 / (2.0 * PI) * (PI - ((PI / 4.0 + lat / 2.0).tan()).ln());
            (x, y)
        })
        .collect();

    let xmin = xy.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let ymax = xy.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    for p in xy.iter_mut() {
        p.0 -= xmin;
        p.1 = ymax - p.1;
    }

    let mut zoom = 1u32;
    for z in (1..=20).rev() {
        let scale = 2f64.powi(z);
        let xmax = xy.iter().map(|p| p.0 * scale).fold(f64::NEG_INFINITY, f64::max);
        let ymax2 = xy.iter().map(|p| p.1 * scale).fold(f64::NEG_INFINITY, f64::max);
        if xmax < 640.0 && ymax2 < 640.0 {
            zoom = z as u32;
            break;
        }
    }
    let scale = 2f64.powi(zoom as i32);
    for p in xy.iter_mut() {
        p.0 *= scale;
        p.1 *= scale;
    }
    let xmax = xy.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let ymax2 = xy.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let xpad = (640.0 - xmax) / 2.0;
    let ypad = (640.0 - ymax2) / 2.0;
    for p in xy.iter_mut() {
        p.0 += xpad;
        p.1 += ypad;
    }

    let center_lon = (PI / 128.0) * ((320.0 - xpad) / scale + xmin) - PI;
    let center_lon = center_lon.to_degrees();
    let center_lat_merc = PI - (PI / 128.0) * (ymax - (320.0 - ypad) / scale);
    let center_lat = (2.0 * center_lat_merc.exp().atan() - PI / 2.0).to_degrees();

    (xy, zoom, (center_lon, center_lat))
}

pub fn project_all(portals: &[Portal]) -> Vec<ProjectedPortal> {
    let gno = gnomonic_proj(portals);
    let (mer, _zoom, _center) = web_mercator_proj(portals);
    gno.into_iter()
        .zip(mer)
        .map(|(gnomonic, mercator)| ProjectedPortal { gnomonic, mercator })
        .collect()
}

fn min_max(it: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in it {
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
    }
    (lo, hi)
}

/// Convex hull of gnomonic points via the Andrew monotone-chain algorithm.
/// Returns the portal indices in counter-clockwise order around the hull.
/// Collinear boundary points are excluded (strict turns only).
pub fn convex_hull(points: &[(f64, f64)]) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }
    let mut idx: Vec<usize> = (0..n).collect();
    idx.sort_by(|&a, &b| {
        points[a]
            .0
            .partial_cmp(&points[b].0)
            .unwrap()
            .then(points[a].1.partial_cmp(&points[b].1).unwrap())
    });

    let cross = |o: usize, a: usize, b: usize| -> f64 {
        (points[a].0 - points[o].0) * (points[b].1 - points[o].1)
            - (points[a].1 - points[o].1) * (points[b].0 - points[o].0)
    };

    let mut lower: Vec<usize> = Vec::new();
    for &p in &idx {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<usize> = Vec::new();
    for &p in idx.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Strictly-interior point-in-triangle test via signed barycentric
/// coordinates (spec §4.1). Boundary points classify as non-interior.
pub fn point_in_triangle(p: (f64, f64), v0: (f64, f64), v1: (f64, f64), v2: (f64, f64)) -> bool {
    let area = 0.5
        * (-v1.1 * v2.0 + v0.1 * (-v1.0 + v2.0) + v0.0 * (v1.1 - v2.1) + v1.0 * v2.1);
    if area == 0.0 {
        return false;
    }
    let sign = if area < 0.0 { -1.0 } else { 1.0 };
    let s = sign
        * (v0.1 * v2.0 - v0.0 * v2.1 + (v2.1 - v0.1) * p.0 + (v0.0 - v2.0) * p.1);
    let t = sign
        * (v0.0 * v1.1 - v0.1 * v1.0 + (v0.1 - v1.1) * p.0 + (v1.0 - v0.0) * p.1);
    s > 0.0 && t > 0.0 && (s + t) < 2.0 * area * sign
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_matrix_is_symmetric_and_zero_diagonal() {
        let portals = vec![
            Portal::new("a", 0.0, 0.0),
            Portal::new("b", 0.01, 0.01),
            Portal::new("c", -0.01, 0.02),
        ];
        let d = distance_matrix(&portals);
        for i in 0..3 {
            assert_eq!(d[i][i], 0);
            for j in 0..3 {
                assert_eq!(d[i][j], d[j][i]);
            }
        }
        assert!(d[0][1] > 0);
    }

    #[test]
    fn gnomonic_round_trip_within_1km_is_accurate_to_1m() {
        // Portals within ~1km of the bounding-box centroid: gnomonic chord
        // distance should match great-circle distance to within 1 metre.
        let portals = vec![
            Portal::new("center", 0.0, 0.0),
            Portal::new("near", 0.005, 0.003),
        ];
        let gno = gnomonic_proj(&portals);
        let planar = ((gno[0].0 - gno[1].0).powi(2) + (gno[0].1 - gno[1].1).powi(2)).sqrt();
        let rad0 = (portals[0].lon.to_radians(), portals[0].lat.to_radians());
        let rad1 = (portals[1].lon.to_radians(), portals[1].lat.to_radians());
        let sphere = great_circle_distance_m(rad0.0, rad0.1, rad1.0, rad1.1);
        assert!((planar - sphere).abs() < 1.0, "planar={planar} sphere={sphere}");
    }

    #[test]
    fn convex_hull_of_square_is_its_four_corners() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.5, 0.5)];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&4));
    }

    #[test]
    fn point_in_triangle_classifies_center_as_interior() {
        let v0 = (0.0, 0.0);
        let v1 = (10.0, 0.0);
        let v2 = (0.0, 10.0);
        assert!(point_in_triangle((2.0, 2.0), v0, v1, v2));
        assert!(!point_in_triangle((20.0, 20.0), v0, v1, v2));
        // boundary (on edge v0-v1) is non-interior
        assert!(!point_in_triangle((5.0, 0.0), v0, v1, v2));
    }
}
