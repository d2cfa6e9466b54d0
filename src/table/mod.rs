mod points;
mod regions;

pub use points::{load_points, InvalidCoordinates, PointOptions, PointTable};
pub use regions::{load_regions, RegionOptions, RegionTable};
