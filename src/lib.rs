#![doc = "choromap public API"]
//! Spatially join point observations to region polygons, average a value
//! per region, and map the result as a choropleth.
//!
//! The stages are plain functions over owned tables:
//! [`load_points`] and [`load_regions`] read the inputs, [`spatial_join`]
//! and [`aggregate_mean`] combine them, and [`Choropleth`] renders the
//! aggregate over the regions' GeoJSON [`Document`]. [`pipeline::run`]
//! chains them from a [`Config`].
mod common;
mod geom;
mod io;

pub mod config;
pub mod crs;
pub mod error;
pub mod join;
pub mod pipeline;
pub mod render;
pub mod table;

#[doc(inline)]
pub use config::Config;

#[doc(inline)]
pub use crs::Crs;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use join::{aggregate_mean, spatial_join, Aggregate, AggregateRow, JoinOptions, JoinedTable, Predicate};

#[doc(inline)]
pub use pipeline::Report;

#[doc(inline)]
pub use render::{Choropleth, CredentialChain, CredentialSource, Document, EnvToken, Figure, FileToken, RenderOptions, StaticToken};

#[doc(inline)]
pub use table::{load_points, load_regions, InvalidCoordinates, PointOptions, PointTable, RegionOptions, RegionTable};

/// Write a table (e.g. [`Aggregate::to_dataframe`]) as CSV, JSON or JSON Lines,
/// chosen by the file extension.
pub fn write_table(path: &std::path::Path, df: &polars::frame::DataFrame) -> Result<()> {
    io::write_frame(path, df)
}
