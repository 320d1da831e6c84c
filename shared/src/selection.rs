use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binder::{COUNTRY_CLASS, OCEAN_ID};
use crate::data::{CountriesData, CountryExtraData, CountryValue, ExtraValue, find_country};
use crate::document::{MapDocument, NodeId};
use crate::events::ChartSelectEvent;
use crate::names::CountryNames;
use crate::normalize::DrawableCountries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionExtra {
    pub key: String,
    pub val: ExtraValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Uppercased country code.
    pub country_id: String,
    pub country_name: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Vec<SelectionExtra>>,
}

/// Re-shape extra fields as ordered key/value pairs; `None` when there are none.
pub fn extra_pairs(extra: Option<&CountryExtraData>) -> Option<Vec<SelectionExtra>> {
    let extra = extra.filter(|extra| !extra.is_empty())?;
    Some(
        extra
            .iter()
            .map(|(key, val)| SelectionExtra {
                key: key.clone(),
                val: val.clone(),
            })
            .collect(),
    )
}

/// Holds the currently selected country, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionController {
    selection: Option<Selection>,
}

impl SelectionController {
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn clear(&mut self) {
        self.selection = None;
    }

    /// Resolve a click on `target` against the latest render state.
    ///
    /// The target is walked up to the nearest country element. Clicks on the
    /// background, outside any country, or on a country without data clear
    /// the selection.
    pub fn click(
        &mut self,
        doc: &MapDocument,
        target: Option<NodeId>,
        countries: &DrawableCountries,
        names: &dyn CountryNames,
    ) -> ChartSelectEvent {
        let hit = target
            .filter(|&node| doc.element_id(node) != Some(OCEAN_ID))
            .and_then(|node| doc.closest_with_class(node, COUNTRY_CLASS))
            .and_then(|node| doc.element_id(node))
            .and_then(|id| countries.get(&id.to_lowercase()).map(|country| (id, country)));

        let Some((id, country)) = hit else {
            if self.selection.take().is_some() {
                debug!("selection cleared");
            }
            return ChartSelectEvent::deselected();
        };

        let country_id = id.to_uppercase();
        let extra = extra_pairs(country.data.extra.as_ref());
        debug!(country = %country_id, "country selected");
        self.selection = Some(Selection {
            country_name: names.display_name(&country_id),
            country_id: country_id.clone(),
            extra: extra.clone(),
        });

        ChartSelectEvent {
            selected: true,
            value: country.data.numeric_value(),
            country: country_id,
            extra,
        }
    }

    /// Raw value of the selected country in `data`, looked up on every call
    /// so that data updates show through for an existing selection.
    pub fn selection_value(&self, data: &CountriesData) -> Option<CountryValue> {
        let selection = self.selection.as_ref()?;
        find_country(data, &selection.country_id)?.value.clone()
    }
}
