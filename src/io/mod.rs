mod frame;
mod geojson;
mod records;
mod shp;

pub(crate) use frame::*;
pub(crate) use self::geojson::*;
pub(crate) use records::*;
pub(crate) use shp::*;
