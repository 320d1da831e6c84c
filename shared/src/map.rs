use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binder::{self, BindSummary, Palette};
use crate::colors::{Color, ColorScale};
use crate::data::{CountriesData, CountryValue};
use crate::document::{MapDocument, NodeId};
use crate::error::RenderError;
use crate::events::{ChartErrorEvent, ChartEvent, ChartSelectEvent};
use crate::names::{CountryNames, NoNames};
use crate::normalize::{Bounds, DrawableCountries, Normalized, normalize};
use crate::selection::{Selection, SelectionController};
use crate::svg;

/// Configuration surface of the map, everything except the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub country_label: String,
    pub value_label: String,
    pub show_caption: bool,
    pub caption_below: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_color: String,
    pub max_color: String,
    pub background_color: String,
    pub no_data_color: String,
    pub exception_color: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            country_label: "Country".into(),
            value_label: "Value".into(),
            show_caption: true,
            caption_below: true,
            min_value: None,
            max_value: None,
            min_color: "oklch(100% 0 0)".into(),
            max_color: "oklch(55% 0.25 25)".into(),
            background_color: "white".into(),
            no_data_color: "#CFCFCF".into(),
            exception_color: "#FFEE58".into(),
        }
    }
}

impl MapOptions {
    /// Resolve the palette. Scale endpoints must parse; the flat fills are
    /// passed through as given.
    pub fn palette(&self) -> Result<Palette, RenderError> {
        let endpoint = |option: &'static str, text: &str| {
            Color::parse(text).map_err(|source| RenderError::InvalidColor { option, source })
        };
        Ok(Palette {
            no_data: self.no_data_color.clone(),
            exception: self.exception_color.clone(),
            scale: ColorScale::new(
                endpoint("min_color", &self.min_color)?,
                endpoint("max_color", &self.max_color)?,
            ),
            background: self.background_color.clone(),
        })
    }
}

/// Text shown next to the map for the selected country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub country_label: String,
    pub value_label: String,
    pub country_id: String,
    pub country_name: String,
    pub value: Option<CountryValue>,
    pub below: bool,
}

/// A choropleth world map: data in, painted document and events out.
///
/// Every change to data, options or the document triggers a full render
/// pass; nothing is patched incrementally.
#[derive(Debug, Clone)]
pub struct CountriesMap<N = NoNames> {
    data: CountriesData,
    options: MapOptions,
    document: Option<MapDocument>,
    normalized: Normalized,
    selection: SelectionController,
    loading: bool,
    last_error: Option<ChartErrorEvent>,
    summary: Option<BindSummary>,
    names: N,
}

impl Default for CountriesMap<NoNames> {
    fn default() -> Self {
        Self::new(NoNames)
    }
}

impl<N: CountryNames> CountriesMap<N> {
    pub fn new(names: N) -> Self {
        Self {
            data: CountriesData::new(),
            options: MapOptions::default(),
            document: None,
            normalized: Normalized::default(),
            selection: SelectionController::default(),
            loading: true,
            last_error: None,
            summary: None,
            names,
        }
    }

    pub fn data(&self) -> &CountriesData {
        &self.data
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn document(&self) -> Option<&MapDocument> {
        self.document.as_ref()
    }

    pub fn countries(&self) -> &DrawableCountries {
        &self.normalized.countries
    }

    pub fn bounds(&self) -> Bounds {
        self.normalized.bounds
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&ChartErrorEvent> {
        self.last_error.as_ref()
    }

    pub fn summary(&self) -> Option<BindSummary> {
        self.summary
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.selection()
    }

    pub fn set_data(&mut self, data: CountriesData) -> ChartEvent {
        self.data = data;
        self.recompute()
    }

    pub fn set_options(&mut self, options: MapOptions) -> ChartEvent {
        self.options = options;
        self.recompute()
    }

    pub fn attach_document(&mut self, document: MapDocument) -> ChartEvent {
        self.document = Some(document);
        self.recompute()
    }

    /// Run a full render pass. Failures are reported as an error event and
    /// never propagated; the loading flag is cleared either way.
    pub fn recompute(&mut self) -> ChartEvent {
        self.loading = true;
        let result = self.render_pass();
        self.loading = false;
        match result {
            Ok(summary) => {
                debug!(
                    countries = self.normalized.countries.len(),
                    min = self.normalized.bounds.min,
                    max = self.normalized.bounds.max,
                    "render pass complete"
                );
                self.summary = Some(summary);
                self.last_error = None;
                ChartEvent::Ready
            }
            Err(e) => {
                warn!(error = %e, "render pass failed");
                let event = e.to_chart_error();
                self.last_error = Some(event.clone());
                ChartEvent::Error(event)
            }
        }
    }

    fn render_pass(&mut self) -> Result<BindSummary, RenderError> {
        self.normalized = normalize(&self.data, self.options.min_value, self.options.max_value);
        let palette = self.options.palette()?;
        let document = self
            .document
            .as_mut()
            .ok_or(RenderError::DocumentUnavailable)?;
        Ok(binder::bind(document, &self.normalized.countries, &palette))
    }

    pub fn click(&mut self, target: Option<NodeId>) -> ChartSelectEvent {
        let Some(document) = self.document.as_ref() else {
            self.selection.clear();
            return ChartSelectEvent::deselected();
        };
        self.selection
            .click(document, target, &self.normalized.countries, &self.names)
    }

    /// Click the element with the given `id` attribute; unknown ids behave like
    /// a click outside every country.
    pub fn click_element(&mut self, element_id: Option<&str>) -> ChartSelectEvent {
        let target = element_id.and_then(|id| self.document.as_ref()?.find_by_id(id));
        self.click(target)
    }

    /// Apply pointer-enter / pointer-leave to the hover-bound element at or
    /// above `target`. Returns the element that changed, if any.
    pub fn hover(&mut self, target: NodeId, hovered: bool) -> Option<NodeId> {
        let document = self.document.as_mut()?;
        let bound = binder::hover_target(document, target)?;
        binder::set_hovered(document, bound, hovered);
        Some(bound)
    }

    pub fn pointer_enter(&mut self, target: NodeId) -> Option<NodeId> {
        self.hover(target, true)
    }

    pub fn pointer_leave(&mut self, target: NodeId) -> Option<NodeId> {
        self.hover(target, false)
    }

    /// Hover by `id` attribute. Returns the id of the highlighted element.
    pub fn hover_element(&mut self, element_id: &str, hovered: bool) -> Option<String> {
        let target = self.document.as_ref()?.find_by_id(element_id)?;
        let bound = self.hover(target, hovered)?;
        self.document
            .as_ref()
            .and_then(|document| document.element_id(bound))
            .map(str::to_owned)
    }

    /// Value of the selected country in the current data.
    pub fn selection_value(&self) -> Option<CountryValue> {
        self.selection.selection_value(&self.data)
    }

    pub fn caption(&self) -> Option<Caption> {
        if !self.options.show_caption {
            return None;
        }
        let selection = self.selection.selection()?;
        Some(Caption {
            country_label: self.options.country_label.clone(),
            value_label: self.options.value_label.clone(),
            country_id: selection.country_id.clone(),
            country_name: selection.country_name.clone(),
            value: self.selection_value(),
            below: self.options.caption_below,
        })
    }

    pub fn to_svg(&self) -> Option<String> {
        self.document.as_ref().map(svg::to_svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CountryData;
    use crate::events::{ChartErrorCode, ChartErrorId};
    use crate::names::CountryNameTable;

    const WORLD: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <rect id="ocean" width="10" height="10"/>
  <g id="fr" class="landxx countryxx"><path class="landxx" d="M0 0"/></g>
  <path id="de" class="landxx countryxx" d="M1 1"/>
  <path id="xx" class="landxx countryxx" d="M2 2"/>
  <path id="it" class="landxx countryxx" d="M3 3"/>
</svg>"#;

    fn world() -> MapDocument {
        svg::parse(WORLD).expect("fixture svg should parse")
    }

    fn sample_data() -> CountriesData {
        let mut data = CountriesData::new();
        data.insert("Fr".into(), CountryData::new(10));
        data.insert("DE".into(), CountryData::new(90));
        data.insert("XX".into(), CountryData::new("n/a"));
        data
    }

    fn fill(map: &CountriesMap<impl CountryNames>, id: &str) -> Option<String> {
        let document = map.document()?;
        let node = document.find_by_id(id)?;
        document.style(node)?.get("fill").map(str::to_owned)
    }

    #[test]
    fn starts_loading_and_unselected() {
        let map = CountriesMap::default();
        assert!(map.is_loading());
        assert!(map.selection().is_none());
        assert!(map.caption().is_none());
        assert!(map.to_svg().is_none());
    }

    #[test]
    fn render_without_document_reports_loading_error() {
        let mut map = CountriesMap::default();
        let event = map.set_data(sample_data());

        let ChartEvent::Error(error) = event else {
            panic!("expected error event, got {event:?}");
        };
        assert_eq!(error.id, ChartErrorId::Code(ChartErrorCode::Loading));
        assert_eq!(error.message, "Could not load");
        assert!(!map.is_loading());
        assert_eq!(map.last_error(), Some(&error));
        assert_eq!(map.bounds(), Bounds { min: 10.0, max: 90.0 });
    }

    #[test]
    fn attaching_document_renders_and_clears_error() {
        let mut map = CountriesMap::default();
        map.set_data(sample_data());

        assert_eq!(map.attach_document(world()), ChartEvent::Ready);
        assert!(!map.is_loading());
        assert!(map.last_error().is_none());
        assert_eq!(
            map.summary(),
            Some(BindSummary {
                in_range: 2,
                exceptions: 1,
                no_data: 1
            })
        );
        assert_eq!(fill(&map, "fr").as_deref(), Some("#ffffff"));
        assert_eq!(fill(&map, "xx").as_deref(), Some("#FFEE58"));
        assert_eq!(fill(&map, "it").as_deref(), Some("#CFCFCF"));
    }

    #[test]
    fn invalid_scale_color_fails_the_pass() {
        let mut map = CountriesMap::default();
        map.attach_document(world());

        let event = map.set_options(MapOptions {
            max_color: "not-a-color".into(),
            ..MapOptions::default()
        });
        let ChartEvent::Error(error) = event else {
            panic!("expected error event, got {event:?}");
        };
        assert!(
            error
                .detailed_message
                .as_deref()
                .is_some_and(|m| m.contains("max_color"))
        );

        assert_eq!(map.set_options(MapOptions::default()), ChartEvent::Ready);
    }

    #[test]
    fn option_changes_repaint_everything() {
        let mut map = CountriesMap::default();
        map.set_data(sample_data());
        map.attach_document(world());

        map.set_options(MapOptions {
            min_value: Some(0.0),
            max_value: Some(0.0),
            no_data_color: "#000000".into(),
            exception_color: "#111111".into(),
            ..MapOptions::default()
        });

        assert_eq!(map.bounds().range(), 1.0);
        assert_eq!(map.countries()["fr"].percentage, 100.0);
        assert_eq!(fill(&map, "it").as_deref(), Some("#000000"));
        assert_eq!(fill(&map, "xx").as_deref(), Some("#111111"));
    }

    #[test]
    fn data_changes_replace_resolved_map_wholesale() {
        let mut map = CountriesMap::default();
        map.attach_document(world());
        map.set_data(sample_data());
        assert!(map.countries().contains_key("xx"));

        let mut next = CountriesData::new();
        next.insert("it".into(), CountryData::new(3));
        map.set_data(next);

        assert_eq!(map.countries().len(), 1);
        assert!(!map.countries().contains_key("xx"));
        assert_eq!(fill(&map, "xx").as_deref(), Some("#CFCFCF"));
    }

    #[test]
    fn selection_round_trip_through_element_ids() {
        let names: CountryNameTable = [("FR", "France")].into_iter().collect();
        let mut map = CountriesMap::new(names);
        let mut data = CountriesData::new();
        data.insert("FR".into(), CountryData::new(42));
        map.set_data(data);
        map.attach_document(world());

        let selected = map.click_element(Some("fr"));
        assert_eq!(
            selected,
            ChartSelectEvent {
                selected: true,
                value: Some(42.0),
                country: "FR".into(),
                extra: None,
            }
        );
        let caption = map.caption().expect("caption for selected country");
        assert_eq!(caption.country_name, "France");
        assert_eq!(caption.value, Some(CountryValue::Number(42.0)));
        assert_eq!(caption.country_label, "Country");
        assert!(caption.below);

        let cleared = map.click_element(Some("ocean"));
        assert_eq!(cleared, ChartSelectEvent::deselected());
        assert!(map.caption().is_none());
        assert_eq!(map.selection_value(), None);
    }

    #[test]
    fn selection_value_follows_live_data() {
        let mut map = CountriesMap::default();
        map.attach_document(world());
        map.set_data(sample_data());
        map.click_element(Some("de"));
        assert_eq!(map.selection_value(), Some(CountryValue::Number(90.0)));

        let mut next = sample_data();
        next.insert("DE".into(), CountryData::new(55));
        map.set_data(next);
        assert_eq!(map.selection_value(), Some(CountryValue::Number(55.0)));
    }

    #[test]
    fn unknown_or_missing_targets_deselect() {
        let mut map = CountriesMap::default();
        map.set_data(sample_data());
        map.attach_document(world());

        map.click_element(Some("de"));
        assert!(!map.click_element(Some("nowhere")).selected);
        map.click_element(Some("de"));
        assert!(!map.click_element(None).selected);
        map.click_element(Some("de"));
        assert!(!map.click_element(Some("it")).selected);
        assert!(map.selection().is_none());
    }

    #[test]
    fn click_without_document_deselects() {
        let mut map = CountriesMap::default();
        assert_eq!(map.click(None), ChartSelectEvent::deselected());
    }

    #[test]
    fn hidden_caption_is_absent() {
        let mut map = CountriesMap::default();
        map.set_data(sample_data());
        map.attach_document(world());
        map.set_options(MapOptions {
            show_caption: false,
            ..MapOptions::default()
        });
        map.click_element(Some("de"));
        assert!(map.selection().is_some());
        assert!(map.caption().is_none());
    }

    #[test]
    fn hover_by_sub_path_highlights_the_country() {
        let mut map = CountriesMap::default();
        map.attach_document(world());

        let document = map.document().expect("attached");
        let fr = document.find_by_id("fr").expect("fr");
        let land = document.children(fr)[0];

        assert_eq!(map.pointer_enter(land), Some(fr));
        let style = map.document().and_then(|d| d.style(land)).cloned();
        assert_eq!(style.as_ref().and_then(|s| s.get("stroke")), Some("#888"));

        assert_eq!(map.pointer_leave(land), Some(fr));
        let style = map.document().and_then(|d| d.style(fr)).cloned();
        assert_eq!(style.as_ref().and_then(|s| s.get("stroke-width")), Some("0.1%"));

        assert_eq!(map.hover_element("de", true).as_deref(), Some("de"));
        assert_eq!(map.hover_element("ocean", true), None);
    }

    #[test]
    fn serialized_map_contains_fills() {
        let mut map = CountriesMap::default();
        map.set_data(sample_data());
        map.attach_document(world());

        let svg = map.to_svg().expect("document attached");
        assert!(svg.contains(r#"<path id="xx" class="landxx countryxx" d="M2 2" style="fill:#FFEE58"/>"#));
        assert!(svg.contains(r#"<rect id="ocean" width="10" height="10" style="fill:white"/>"#));
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" style="background-color:white">"#));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: MapOptions =
            serde_json::from_str(r##"{"min_value": 5, "max_color": "#ff0000"}"##)
                .expect("parse options");
        assert_eq!(options.min_value, Some(5.0));
        assert_eq!(options.max_color, "#ff0000");
        assert_eq!(options.no_data_color, "#CFCFCF");
        assert!(options.show_caption);
    }
}
