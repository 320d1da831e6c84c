use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::colors::ColorScale;
use crate::document::{MapDocument, NodeId};
use crate::normalize::{DrawableCountries, DrawableCountry};

/// Class shared by every country element of the base map.
pub const COUNTRY_CLASS: &str = "countryxx";
/// Class of the landmass sub-paths a country may be composed of.
pub const LAND_CLASS: &str = "landxx";
/// Id of the background element.
pub const OCEAN_ID: &str = "ocean";

const STROKE_WIDTH: &str = "0.1%";
const STROKE_WIDTH_HOVERED: &str = "0.2%";
const STROKE_COLOR: &str = "#afafaf";
const STROKE_COLOR_HOVERED: &str = "#888";

/// Resolved fill colors for one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub no_data: String,
    pub exception: String,
    pub scale: ColorScale,
    pub background: String,
}

impl Palette {
    pub fn fill_for(&self, country: Option<&DrawableCountry>) -> String {
        match country {
            None => self.no_data.clone(),
            Some(country) if country.is_exception() => self.exception.clone(),
            Some(country) => self.scale.color_at(country.percentage).to_hex(),
        }
    }
}

/// How many country elements received each kind of fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BindSummary {
    pub in_range: usize,
    pub exceptions: usize,
    pub no_data: usize,
}

/// Paint the background and every country element, and mark country elements
/// for hover highlighting.
pub fn bind(doc: &mut MapDocument, countries: &DrawableCountries, palette: &Palette) -> BindSummary {
    let root = doc.root();
    if let Some(style) = doc.style_mut(root) {
        style.set("background-color", palette.background.as_str());
    }
    if let Some(ocean) = doc.find_by_id(OCEAN_ID)
        && let Some(style) = doc.style_mut(ocean)
    {
        style.set("fill", palette.background.as_str());
    }

    let mut summary = BindSummary::default();
    for node in doc.elements_with_class(COUNTRY_CLASS) {
        let country = doc
            .element_id(node)
            .and_then(|id| countries.get(&id.to_lowercase()));
        match country {
            None => summary.no_data += 1,
            Some(country) if country.is_exception() => summary.exceptions += 1,
            Some(_) => summary.in_range += 1,
        }
        let fill = palette.fill_for(country);
        if let Some(element) = doc.element_mut(node) {
            element.style.set("fill", fill);
            element.hover_bound = true;
        }
    }

    debug!(
        in_range = summary.in_range,
        exceptions = summary.exceptions,
        no_data = summary.no_data,
        "bound country fills"
    );
    summary
}

/// Nearest hover-bound element at or above `node`.
pub fn hover_target(doc: &MapDocument, node: NodeId) -> Option<NodeId> {
    doc.closest(node, |doc, id| doc.element(id).is_some_and(|e| e.hover_bound))
}

/// Apply (or revert) the hover stroke on `node` and all of its landmass
/// sub-paths. Values are absolute, so repeated calls are idempotent.
pub fn set_hovered(doc: &mut MapDocument, node: NodeId, hovered: bool) {
    let (width, color) = if hovered {
        (STROKE_WIDTH_HOVERED, STROKE_COLOR_HOVERED)
    } else {
        (STROKE_WIDTH, STROKE_COLOR)
    };
    let targets = std::iter::once(node).chain(doc.descendants_with_class(node, LAND_CLASS));
    let targets: Vec<NodeId> = targets.collect();
    for target in targets {
        if let Some(style) = doc.style_mut(target) {
            style.set("stroke-width", width);
            style.set("stroke", color);
        }
    }
}
