pub mod binder;
pub mod colors;
pub mod data;
pub mod document;
pub mod error;
pub mod events;
pub mod map;
pub mod names;
pub mod normalize;
pub mod selection;
pub mod svg;

pub use data::*;
pub use error::{ColorError, RenderError, SvgError};
pub use events::*;
pub use map::{Caption, CountriesMap, MapOptions};
pub use names::{CountryNameTable, CountryNames, NoNames};
pub use normalize::{Bounds, DrawableCountries, DrawableCountry};
pub use selection::{Selection, SelectionExtra};
