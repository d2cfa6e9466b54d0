mod choropleth;
mod credentials;
mod document;
pub mod svg;

pub use choropleth::{Choropleth, Figure, RenderOptions, PLOTLY_CDN};
pub use credentials::{
    CredentialChain, CredentialSource, EnvToken, FileToken, StaticToken,
    DEFAULT_TOKEN_ENV, DEFAULT_TOKEN_FILE,
};
pub use document::{Document, PROPERTIES};
pub use svg::write_svg;
