use geo::{BoundingRect, Coord, MultiPolygon, Point, Rect};
use rstar::{RTree, AABB};

use crate::{crs::Crs, geom::BoundingBox};

/// A collection of region MultiPolygons with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
    crs: Option<Crs>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty MultiPolygons are kept but never indexed.
    pub(crate) fn new(shapes: Vec<MultiPolygon<f64>>, crs: Option<Crs>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, polygon)| Some(BoundingBox::new(i, polygon.bounding_rect()?)))
                    .collect()
            ),
            shapes,
            crs,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// The declared CRS, if known.
    #[inline] pub(crate) fn crs(&self) -> Option<&Crs> { self.crs.as_ref() }

    #[inline] pub(crate) fn set_crs(&mut self, crs: Option<Crs>) { self.crs = crs }

    /// Indices of polygons whose bounding box covers `point`, in ascending order.
    pub(crate) fn candidates(&self, point: &Point<f64>) -> Vec<usize> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut indices: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(BoundingBox::idx)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Compute the bounding rectangle of all MultiPolygons.
    pub(crate) fn bounds(&self) -> Option<Rect<f64>> {
        self.shapes.iter()
            .filter_map(|polygon| polygon.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                }
            ))
    }
}
