//! Mask vectorization
//!
//! Turns each connected mask component into a polygon by tracing its
//! exterior boundary along cell edges, and attaches the site measurements
//! downstream consumers rank by: area, perimeter and compactness.
//!
//! Interior holes are not traced; a polygon is an exterior ring. A
//! component held together only by diagonal adjacency yields one polygon
//! per edge-connected part, so the reported areas always cover every
//! masked cell.

use std::collections::{HashMap, HashSet, VecDeque};

use geo::{Area, Centroid};
use geo_types::{Coord, Geometry, LineString, Polygon};
use tracing::debug;

use crate::change::label_components;
use wastelens_core::geo::AreaOfInterest;
use wastelens_core::raster::Mask;
use wastelens_core::vector::{AttributeValue, Feature, FeatureCollection};
use wastelens_core::{Error, Result};

/// Parameters for vectorization
#[derive(Debug, Clone, Default)]
pub struct VectorizeParams {
    /// Drop sites whose polygon area falls below this, in square metres
    pub min_area_m2: f64,
}

/// Vectorize a mask into polygon features in the mask's metric grid.
///
/// Each feature carries `area_m2`, `area_ha`, `perimeter_m`,
/// `compactness` (4πA/P², 1 for a circle, π/4 for a square) and the metric
/// centroid. Feature ids are stable per run, ordered by raster scan order
/// of the components.
pub fn vectorize_mask(mask: &Mask, params: &VectorizeParams) -> Result<FeatureCollection> {
    let (labels, count) = label_components(mask);
    let (rows, cols) = mask.shape();
    debug!(components = count, "vectorizing mask");

    let mut cells_by_label: Vec<Vec<(usize, usize)>> = vec![Vec::new(); count];
    for row in 0..rows {
        for col in 0..cols {
            let label = unsafe { labels.get_unchecked(row, col) };
            if label > 0 {
                cells_by_label[label as usize - 1].push((row, col));
            }
        }
    }

    let gt = mask.transform();
    let to_xy = |vr: i64, vc: i64| Coord {
        x: gt.origin_x + vc as f64 * gt.pixel_width,
        y: gt.origin_y + vr as f64 * gt.pixel_height,
    };

    let mut collection = FeatureCollection::new();
    let mut site_n = 0usize;
    for cells in &cells_by_label {
        for part in edge_connected_parts(cells) {
            let Some(ring) = exterior_ring(&part) else {
                continue;
            };

            let coords: Vec<Coord<f64>> = ring.iter().map(|&(vr, vc)| to_xy(vr, vc)).collect();
            let polygon = Polygon::new(LineString::from(coords), vec![]);

            let area_m2 = polygon.unsigned_area();
            if area_m2 < params.min_area_m2 {
                continue;
            }
            let perimeter_m = ring_length(polygon.exterior());
            let compactness = if perimeter_m > 0.0 {
                4.0 * std::f64::consts::PI * area_m2 / (perimeter_m * perimeter_m)
            } else {
                0.0
            };
            let centroid = polygon
                .centroid()
                .ok_or_else(|| Error::Algorithm("degenerate site polygon".into()))?;

            site_n += 1;
            let mut feature = Feature::new(Geometry::Polygon(polygon));
            feature.id = Some(format!("site-{site_n}"));
            feature.set_property("area_m2", AttributeValue::Float(area_m2));
            feature.set_property("area_ha", AttributeValue::Float(area_m2 / 10_000.0));
            feature.set_property("perimeter_m", AttributeValue::Float(perimeter_m));
            feature.set_property("compactness", AttributeValue::Float(compactness));
            feature.set_property("centroid_x", AttributeValue::Float(centroid.x()));
            feature.set_property("centroid_y", AttributeValue::Float(centroid.y()));
            collection.push(feature);
        }
    }
    Ok(collection)
}

/// Split a cell set into its 4-connected (edge-adjacent) parts
fn edge_connected_parts(cells: &[(usize, usize)]) -> Vec<Vec<(usize, usize)>> {
    let set: HashSet<(usize, usize)> = cells.iter().copied().collect();
    let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(cells.len());
    let mut parts = Vec::new();

    for &cell in cells {
        if !seen.insert(cell) {
            continue;
        }
        let mut part = vec![cell];
        let mut queue = VecDeque::from([cell]);
        while let Some((r, c)) = queue.pop_front() {
            let neighbors = [
                (r.wrapping_sub(1), c),
                (r + 1, c),
                (r, c.wrapping_sub(1)),
                (r, c + 1),
            ];
            for n in neighbors {
                if set.contains(&n) && seen.insert(n) {
                    part.push(n);
                    queue.push_back(n);
                }
            }
        }
        parts.push(part);
    }
    parts
}

/// Convert a metric feature collection to geographic coordinates.
///
/// Polygon vertices and centroids move from grid metres to lon/lat;
/// measurements stay metric. Adds `centroid_lon`/`centroid_lat` from the
/// metric centroid.
pub fn to_geographic(collection: &FeatureCollection, aoi: &AreaOfInterest) -> Result<FeatureCollection> {
    let mut out = FeatureCollection::new();
    for feature in collection.iter() {
        let Geometry::Polygon(polygon) = &feature.geometry else {
            return Err(Error::UnsupportedDataType(
                "only polygon features can be reprojected".into(),
            ));
        };
        let map_ring = |ring: &LineString<f64>| -> LineString<f64> {
            ring.coords()
                .map(|c| {
                    let (lon, lat) = aoi.to_lonlat(c.x, c.y);
                    Coord { x: lon, y: lat }
                })
                .collect()
        };
        let mapped = Polygon::new(
            map_ring(polygon.exterior()),
            polygon.interiors().iter().map(map_ring).collect(),
        );

        let mut geographic = Feature::new(Geometry::Polygon(mapped));
        geographic.id = feature.id.clone();
        geographic.properties = feature.properties.clone();
        if let (Some(AttributeValue::Float(x)), Some(AttributeValue::Float(y))) = (
            feature.get_property("centroid_x"),
            feature.get_property("centroid_y"),
        ) {
            let (lon, lat) = aoi.to_lonlat(*x, *y);
            geographic.set_property("centroid_lon", AttributeValue::Float(lon));
            geographic.set_property("centroid_lat", AttributeValue::Float(lat));
        }
        geographic.properties.remove("centroid_x");
        geographic.properties.remove("centroid_y");
        out.push(geographic);
    }
    Ok(out)
}

/// Trace the exterior boundary of a cell set, returning lattice vertices
/// (row, col) of the closed ring.
///
/// Boundary edges are oriented with the interior on the right, then
/// stitched preferring the tightest (rightmost) turn so pinch vertices
/// resolve deterministically. Of all closed loops (exterior plus holes),
/// the one enclosing the largest area is the exterior.
fn exterior_ring(cells: &[(usize, usize)]) -> Option<Vec<(i64, i64)>> {
    if cells.is_empty() {
        return None;
    }
    let cell_set: HashSet<(i64, i64)> = cells
        .iter()
        .map(|&(r, c)| (r as i64, c as i64))
        .collect();

    // Directed edges start → end, keyed by start vertex
    let mut edges: HashMap<(i64, i64), Vec<(i64, i64)>> = HashMap::new();
    let mut edge_count = 0usize;
    for &(r, c) in &cell_set {
        if !cell_set.contains(&(r - 1, c)) {
            edges.entry((r, c)).or_default().push((r, c + 1));
            edge_count += 1;
        }
        if !cell_set.contains(&(r, c + 1)) {
            edges.entry((r, c + 1)).or_default().push((r + 1, c + 1));
            edge_count += 1;
        }
        if !cell_set.contains(&(r + 1, c)) {
            edges.entry((r + 1, c + 1)).or_default().push((r + 1, c));
            edge_count += 1;
        }
        if !cell_set.contains(&(r, c - 1)) {
            edges.entry((r + 1, c)).or_default().push((r, c));
            edge_count += 1;
        }
    }

    let mut best_ring: Option<(f64, Vec<(i64, i64)>)> = None;
    while edge_count > 0 {
        // Start a new loop from any vertex that still has an outgoing edge
        let (&start, _) = edges.iter().find(|(_, v)| !v.is_empty())?;
        let mut ring = vec![start];
        let mut current = start;
        let mut dir: Option<(i64, i64)> = None;

        loop {
            let outgoing = edges.get_mut(&current)?;
            let next = match dir {
                None => outgoing.pop()?,
                Some((dr, dc)) => {
                    // preference: right turn, straight, left turn
                    let prefs = [(dc, -dr), (dr, dc), (-dc, dr)];
                    let mut chosen = None;
                    for want in prefs {
                        if let Some(pos) = outgoing
                            .iter()
                            .position(|&(er, ec)| (er - current.0, ec - current.1) == want)
                        {
                            chosen = Some(outgoing.swap_remove(pos));
                            break;
                        }
                    }
                    chosen?
                }
            };
            edge_count -= 1;
            dir = Some((next.0 - current.0, next.1 - current.1));
            current = next;
            ring.push(current);
            if current == start {
                break;
            }
        }

        let area = shoelace_abs(&ring);
        if best_ring.as_ref().map(|(a, _)| area > *a).unwrap_or(true) {
            best_ring = Some((area, ring));
        }
    }
    best_ring.map(|(_, ring)| ring)
}

/// Absolute shoelace area of a closed lattice ring, in cells
fn shoelace_abs(ring: &[(i64, i64)]) -> f64 {
    let mut sum = 0i64;
    for pair in ring.windows(2) {
        let (r0, c0) = pair[0];
        let (r1, c1) = pair[1];
        sum += c0 * r1 - c1 * r0;
    }
    (sum as f64 / 2.0).abs()
}

fn ring_length(ring: &LineString<f64>) -> f64 {
    ring.lines()
        .map(|line| {
            let dx = line.end.x - line.start.x;
            let dy = line.end.y - line.start.y;
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wastelens_core::raster::Raster;
    use wastelens_core::GeoTransform;

    fn mask_with(rows: usize, cols: usize, set: &[(usize, usize)]) -> Mask {
        let mut m: Mask = Raster::filled(rows, cols, f64::NAN);
        m.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        for &(r, c) in set {
            m.set(r, c, 1.0).unwrap();
        }
        m
    }

    fn float_prop(feature: &Feature, key: &str) -> f64 {
        match feature.get_property(key) {
            Some(AttributeValue::Float(v)) => *v,
            other => panic!("missing float property {key}: {other:?}"),
        }
    }

    #[test]
    fn test_square_block_measurements() {
        // 5x5 block on a 10 m grid: 2500 m^2, 200 m perimeter
        let mut set = Vec::new();
        for r in 2..7 {
            for c in 3..8 {
                set.push((r, c));
            }
        }
        let mask = mask_with(10, 12, &set);

        let fc = vectorize_mask(&mask, &VectorizeParams::default()).unwrap();
        assert_eq!(fc.len(), 1);
        let site = &fc.features[0];
        assert_relative_eq!(float_prop(site, "area_m2"), 2500.0);
        assert_relative_eq!(float_prop(site, "area_ha"), 0.25);
        assert_relative_eq!(float_prop(site, "perimeter_m"), 200.0);
        assert_relative_eq!(
            float_prop(site, "compactness"),
            std::f64::consts::FRAC_PI_4,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_compactness_scale_invariant() {
        let single = mask_with(6, 6, &[(2, 2)]);
        let mut set = Vec::new();
        for r in 1..4 {
            for c in 1..4 {
                set.push((r, c));
            }
        }
        let block = mask_with(6, 6, &set);

        let a = vectorize_mask(&single, &VectorizeParams::default()).unwrap();
        let b = vectorize_mask(&block, &VectorizeParams::default()).unwrap();
        assert_relative_eq!(
            float_prop(&a.features[0], "compactness"),
            float_prop(&b.features[0], "compactness"),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_two_components_two_features() {
        let mask = mask_with(10, 10, &[(1, 1), (1, 2), (7, 7), (7, 8), (8, 7)]);
        let fc = vectorize_mask(&mask, &VectorizeParams::default()).unwrap();
        assert_eq!(fc.len(), 2);

        let total: f64 = fc.iter().map(|f| float_prop(f, "area_m2")).sum();
        assert_relative_eq!(total, 500.0);
    }

    #[test]
    fn test_l_shape_perimeter() {
        // L of 3 cells: area 300 m^2, perimeter 80 m
        let mask = mask_with(6, 6, &[(2, 2), (3, 2), (3, 3)]);
        let fc = vectorize_mask(&mask, &VectorizeParams::default()).unwrap();
        let site = &fc.features[0];
        assert_relative_eq!(float_prop(site, "area_m2"), 300.0);
        assert_relative_eq!(float_prop(site, "perimeter_m"), 80.0);
    }

    #[test]
    fn test_diagonal_component_keeps_full_area() {
        // two cells sharing only a corner: one 8-connected component,
        // vectorized as two polygons covering both cells
        let mask = mask_with(6, 6, &[(2, 2), (3, 3)]);
        let fc = vectorize_mask(&mask, &VectorizeParams::default()).unwrap();
        assert_eq!(fc.len(), 2);

        let total: f64 = fc.iter().map(|f| float_prop(f, "area_m2")).sum();
        assert_relative_eq!(total, 200.0);
    }

    #[test]
    fn test_hole_not_traced() {
        // ring of cells around an empty center: polygon area counts the hole
        let mut set = Vec::new();
        for r in 1..4 {
            for c in 1..4 {
                if (r, c) != (2, 2) {
                    set.push((r, c));
                }
            }
        }
        let mask = mask_with(6, 6, &set);
        let fc = vectorize_mask(&mask, &VectorizeParams::default()).unwrap();
        assert_eq!(fc.len(), 1);
        // exterior ring covers the full 3x3 footprint
        assert_relative_eq!(float_prop(&fc.features[0], "area_m2"), 900.0);
    }

    #[test]
    fn test_min_area_filter() {
        let mask = mask_with(10, 10, &[(1, 1), (5, 5), (5, 6), (6, 5), (6, 6)]);
        let fc = vectorize_mask(&mask, &VectorizeParams { min_area_m2: 200.0 }).unwrap();
        assert_eq!(fc.len(), 1);
        assert_relative_eq!(float_prop(&fc.features[0], "area_m2"), 400.0);
    }

    #[test]
    fn test_geographic_conversion() {
        let aoi = AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, 0.0).unwrap();
        let mask = mask_with(10, 10, &[(5, 5)]);
        let metric = vectorize_mask(&mask, &VectorizeParams::default()).unwrap();
        let geographic = to_geographic(&metric, &aoi).unwrap();

        let site = &geographic.features[0];
        let lon = float_prop(site, "centroid_lon");
        let lat = float_prop(site, "centroid_lat");
        assert!(lon > aoi.min_lon && lon < aoi.max_lon);
        assert!(lat > aoi.min_lat && lat < aoi.max_lat);
        // measurements stay metric
        assert_relative_eq!(float_prop(site, "area_m2"), 100.0);
        assert!(site.get_property("centroid_x").is_none());
    }
}
