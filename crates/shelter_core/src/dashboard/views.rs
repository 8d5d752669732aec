//! Derived dashboard views.
//!
//! # Responsibility
//! - Compute each rendered surface from the table and interaction state.
//! - Convert edit-form text back into a typed `UpdateSet`.
//!
//! # Invariants
//! - Derivations are pure and never fail.
//! - Positions are indices into the filtered view, not into the table.
//! - Missing or malformed coordinates fall back to a fixed marker.

use crate::dashboard::graph::Derivation;
use crate::dashboard::state::{DashboardState, FilterSelection, TableSort};
use crate::dashboard::theme::{self, input_style, Palette, StyleMap, TableStyles, ThemeStyles};
use crate::model::record::{
    FieldValue, Record, UpdateSet, ANIMAL_TYPE_FIELD, BREED_FIELD, LATITUDE_FIELD,
    LONGITUDE_FIELD, NAME_FIELD,
};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const PAGE_SIZE: usize = 15;
pub const TOP_BREEDS: usize = 10;
pub const CHART_HEIGHT: u32 = 400;
pub const FALLBACK_LATITUDE: f64 = 30.75;
pub const FALLBACK_LONGITUDE: f64 = -97.48;
pub const FALLBACK_LABEL: &str = "Unknown";
pub const MAP_ZOOM: u8 = 13;

/// Table indices of the rows that pass the filter, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilteredView {
    rows: Vec<usize>,
}

impl FilteredView {
    pub fn derive(table: &[Record], filter: &FilterSelection, sort: Option<&TableSort>) -> Self {
        let mut rows: Vec<usize> = table
            .iter()
            .enumerate()
            .filter(|(_, record)| filter.admits(record))
            .map(|(index, _)| index)
            .collect();
        if let Some(sort) = sort {
            // Stable sort keeps table order among equal keys.
            rows.sort_by(|left, right| sort.compare(&table[*left], &table[*right]));
        }
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Table index of the row shown at `position`.
    pub fn table_index(&self, position: usize) -> Option<usize> {
        self.rows.get(position).copied()
    }

    /// View position of the row stored at `table_index`, if it passes the filter.
    pub fn position_of(&self, table_index: usize) -> Option<usize> {
        self.rows.iter().position(|row| *row == table_index)
    }

    pub fn record<'t>(&self, table: &'t [Record], position: usize) -> Option<&'t Record> {
        self.table_index(position).and_then(|index| table.get(index))
    }

    pub fn records<'a>(&'a self, table: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        self.rows.iter().filter_map(|index| table.get(*index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: usize,
    pub color: &'static str,
}

/// Row, breed and type counts over the filtered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatSummary {
    pub count: usize,
    pub breeds: usize,
    pub types: usize,
    pub cards: Vec<StatCard>,
    pub card_background: &'static str,
    pub label_color: &'static str,
}

impl StatSummary {
    pub fn derive(table: &[Record], view: &FilteredView, palette: &Palette) -> Self {
        let count = view.len();
        let breeds = distinct_count(view.records(table), BREED_FIELD);
        let types = distinct_count(view.records(table), ANIMAL_TYPE_FIELD);
        Self {
            count,
            breeds,
            types,
            cards: vec![
                StatCard {
                    label: "Total Animals",
                    value: count,
                    color: palette.primary,
                },
                StatCard {
                    label: "Breeds",
                    value: breeds,
                    color: palette.secondary,
                },
                StatCard {
                    label: "Types",
                    value: types,
                    color: palette.accent,
                },
            ],
            card_background: palette.card,
            label_color: palette.text_secondary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartEntry {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartLayout {
    pub title: &'static str,
    pub height: u32,
    pub paper_bgcolor: &'static str,
    pub plot_bgcolor: &'static str,
    pub font_color: &'static str,
}

impl ChartLayout {
    fn new(title: &'static str, palette: &Palette) -> Self {
        Self {
            title,
            height: CHART_HEIGHT,
            paper_bgcolor: palette.card,
            plot_bgcolor: palette.card,
            font_color: palette.text,
        }
    }
}

/// Frequency chart; empty `entries` renders as "No data".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartView {
    pub entries: Vec<ChartEntry>,
    pub layout: ChartLayout,
}

impl ChartView {
    /// Top breeds by count.
    pub fn breeds(table: &[Record], view: &FilteredView, palette: &Palette) -> Self {
        Self {
            entries: frequencies(view.records(table), BREED_FIELD, Some(TOP_BREEDS)),
            layout: ChartLayout::new("Top 10 Breeds", palette),
        }
    }

    /// Full `animal_type` distribution.
    pub fn types(table: &[Record], view: &FilteredView, palette: &Palette) -> Self {
        Self {
            entries: frequencies(view.records(table), ANIMAL_TYPE_FIELD, None),
            layout: ChartLayout::new("Animal Types", palette),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Position in the filtered view.
    pub position: usize,
    pub record: Record,
}

/// One page of the filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    pub selected: Option<usize>,
    pub styles: TableStyles,
}

impl TablePage {
    /// Out-of-range pages clamp to the last page.
    pub fn derive(
        table: &[Record],
        view: &FilteredView,
        page: usize,
        selected: Option<usize>,
        palette: &Palette,
    ) -> Self {
        let page_count = page_count(view.len());
        let page = page.min(page_count.saturating_sub(1));
        let start = page * PAGE_SIZE;
        let rows = (start..view.len().min(start + PAGE_SIZE))
            .filter_map(|position| {
                view.record(table, position).map(|record| TableRow {
                    position,
                    record: record.clone(),
                })
            })
            .collect();

        Self {
            page,
            page_count,
            page_size: PAGE_SIZE,
            total_rows: view.len(),
            columns: columns(table),
            rows,
            selected: selected.filter(|position| *position < view.len()),
            styles: TableStyles::for_palette(palette),
        }
    }
}

/// Number of pages needed for `rows`; an empty view still has one page.
pub fn page_count(rows: usize) -> usize {
    rows.div_ceil(PAGE_SIZE).max(1)
}

/// Sorted union of field names across the table.
pub fn columns(table: &[Record]) -> Vec<String> {
    table
        .iter()
        .flat_map(|record| record.fields())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub breed: String,
    pub zoom: u8,
    /// Coordinates are the fixed fallback.
    pub fallback: bool,
}

impl MapMarker {
    pub fn fallback() -> Self {
        Self {
            latitude: FALLBACK_LATITUDE,
            longitude: FALLBACK_LONGITUDE,
            name: FALLBACK_LABEL.to_string(),
            breed: FALLBACK_LABEL.to_string(),
            zoom: MAP_ZOOM,
            fallback: true,
        }
    }

    /// Marker for the selected row, or the fallback.
    pub fn derive(table: &[Record], view: &FilteredView, selected: Option<usize>) -> Self {
        let Some(record) = selected.and_then(|position| view.record(table, position)) else {
            return Self::fallback();
        };
        Self::for_record(record)
    }

    pub fn for_record(record: &Record) -> Self {
        let coordinate = |field: &str| record.get(field).and_then(FieldValue::as_number);
        match (coordinate(LATITUDE_FIELD), coordinate(LONGITUDE_FIELD)) {
            (Some(latitude), Some(longitude)) => Self {
                latitude,
                longitude,
                name: record
                    .text(NAME_FIELD)
                    .unwrap_or_else(|| FALLBACK_LABEL.to_string()),
                breed: record
                    .text(BREED_FIELD)
                    .unwrap_or_else(|| FALLBACK_LABEL.to_string()),
                zoom: MAP_ZOOM,
                fallback: false,
            },
            _ => {
                debug!("event=map_marker module=dashboard status=fallback reason=bad_coordinates");
                Self::fallback()
            }
        }
    }
}

/// Sorted distinct breeds among rows of the selected types.
pub fn breed_options(table: &[Record], filter: &FilterSelection) -> Vec<String> {
    sorted_distinct(
        table
            .iter()
            .filter(|record| filter.admits_type(record)),
        BREED_FIELD,
    )
}

/// Sorted distinct animal types in the table.
pub fn type_options(table: &[Record]) -> Vec<String> {
    sorted_distinct(table.iter(), ANIMAL_TYPE_FIELD)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditField {
    pub field: String,
    pub label: String,
    pub value: String,
    pub style: StyleMap,
}

/// Edit modal contents; closed when there is no edit target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditForm {
    pub open: bool,
    pub fields: Vec<EditField>,
    pub label_color: &'static str,
}

impl EditForm {
    pub fn derive(target: Option<&Record>, palette: &Palette) -> Self {
        let fields = target
            .map(|record| {
                record
                    .iter()
                    .map(|(field, value)| EditField {
                        field: field.clone(),
                        label: title_label(field),
                        value: value.to_string(),
                        style: input_style(palette),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            open: target.is_some(),
            fields,
            label_color: palette.text,
        }
    }
}

/// `age_upon_outcome` becomes `Age Upon Outcome`.
pub fn title_label(field: &str) -> String {
    let mut label = String::with_capacity(field.len());
    let mut in_word = false;
    for ch in field.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if in_word {
                label.extend(ch.to_lowercase());
            } else {
                label.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            label.push(ch);
            in_word = false;
        }
    }
    label
}

/// Builds the update set from submitted form text.
///
/// Only fields of `target` whose value changed are kept; the original
/// scalar type is restored when the text parses as it.
pub fn update_from_form(target: &Record, submitted: &BTreeMap<String, String>) -> UpdateSet {
    let mut update = UpdateSet::new();
    for (field, text) in submitted {
        let Some(original) = target.get(field) else {
            debug!("event=edit_form module=dashboard status=skipped field={field} reason=unknown_field");
            continue;
        };
        let value = original.coerce_text(text);
        if &value != original {
            update.insert(field.clone(), value);
        }
    }
    update
}

/// Every derived surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    pub filtered: FilteredView,
    pub stats: StatSummary,
    pub breed_chart: ChartView,
    pub type_chart: ChartView,
    pub table: TablePage,
    pub map: MapMarker,
    pub breed_options: Vec<String>,
    pub type_options: Vec<String>,
    pub edit_form: EditForm,
    pub theme: ThemeStyles,
}

impl DashboardViews {
    pub fn compute(state: &DashboardState) -> Self {
        let table = state.table();
        let palette = theme::palette(state.is_dark());
        let filtered = FilteredView::derive(table, state.filter(), state.sort());
        Self {
            stats: StatSummary::derive(table, &filtered, palette),
            breed_chart: ChartView::breeds(table, &filtered, palette),
            type_chart: ChartView::types(table, &filtered, palette),
            table: TablePage::derive(table, &filtered, state.page(), state.selection(), palette),
            map: MapMarker::derive(table, &filtered, state.selection()),
            breed_options: breed_options(table, state.filter()),
            type_options: type_options(table),
            edit_form: EditForm::derive(state.edit_target(), palette),
            theme: ThemeStyles::for_theme(state.is_dark()),
            filtered,
        }
    }

    /// Recomputes one derivation; inputs it reads must already be current.
    pub fn recompute(&mut self, derivation: Derivation, state: &DashboardState) -> ViewFragment {
        let table = state.table();
        let palette = theme::palette(state.is_dark());
        match derivation {
            Derivation::FilteredView => {
                self.filtered = FilteredView::derive(table, state.filter(), state.sort());
                ViewFragment::FilteredView(self.filtered.clone())
            }
            Derivation::Stats => {
                self.stats = StatSummary::derive(table, &self.filtered, palette);
                ViewFragment::Stats(self.stats.clone())
            }
            Derivation::BreedChart => {
                self.breed_chart = ChartView::breeds(table, &self.filtered, palette);
                ViewFragment::BreedChart(self.breed_chart.clone())
            }
            Derivation::TypeChart => {
                self.type_chart = ChartView::types(table, &self.filtered, palette);
                ViewFragment::TypeChart(self.type_chart.clone())
            }
            Derivation::TablePage => {
                self.table = TablePage::derive(
                    table,
                    &self.filtered,
                    state.page(),
                    state.selection(),
                    palette,
                );
                ViewFragment::TablePage(self.table.clone())
            }
            Derivation::MapMarker => {
                self.map = MapMarker::derive(table, &self.filtered, state.selection());
                ViewFragment::MapMarker(self.map.clone())
            }
            Derivation::BreedOptions => {
                self.breed_options = breed_options(table, state.filter());
                ViewFragment::BreedOptions(self.breed_options.clone())
            }
            Derivation::TypeOptions => {
                self.type_options = type_options(table);
                ViewFragment::TypeOptions(self.type_options.clone())
            }
            Derivation::EditForm => {
                self.edit_form = EditForm::derive(state.edit_target(), palette);
                ViewFragment::EditForm(self.edit_form.clone())
            }
            Derivation::ThemeStyles => {
                self.theme = ThemeStyles::for_theme(state.is_dark());
                ViewFragment::ThemeStyles(self.theme.clone())
            }
        }
    }
}

/// A recomputed surface as sent to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum ViewFragment {
    FilteredView(FilteredView),
    Stats(StatSummary),
    BreedChart(ChartView),
    TypeChart(ChartView),
    TablePage(TablePage),
    MapMarker(MapMarker),
    BreedOptions(Vec<String>),
    TypeOptions(Vec<String>),
    EditForm(EditForm),
    ThemeStyles(ThemeStyles),
}

impl ViewFragment {
    pub fn derivation(&self) -> Derivation {
        match self {
            Self::FilteredView(_) => Derivation::FilteredView,
            Self::Stats(_) => Derivation::Stats,
            Self::BreedChart(_) => Derivation::BreedChart,
            Self::TypeChart(_) => Derivation::TypeChart,
            Self::TablePage(_) => Derivation::TablePage,
            Self::MapMarker(_) => Derivation::MapMarker,
            Self::BreedOptions(_) => Derivation::BreedOptions,
            Self::TypeOptions(_) => Derivation::TypeOptions,
            Self::EditForm(_) => Derivation::EditForm,
            Self::ThemeStyles(_) => Derivation::ThemeStyles,
        }
    }
}

fn distinct_count<'a>(records: impl Iterator<Item = &'a Record>, field: &str) -> usize {
    records
        .filter_map(|record| record.text(field))
        .collect::<BTreeSet<_>>()
        .len()
}

fn sorted_distinct<'a>(records: impl Iterator<Item = &'a Record>, field: &str) -> Vec<String> {
    records
        .filter_map(|record| record.text(field))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Counts by descending frequency; ties keep first-encountered order.
fn frequencies<'a>(
    records: impl Iterator<Item = &'a Record>,
    field: &str,
    limit: Option<usize>,
) -> Vec<ChartEntry> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<ChartEntry> = Vec::new();
    for label in records.filter_map(|record| record.text(field)) {
        match positions.get(&label) {
            Some(position) => entries[*position].count += 1,
            None => {
                positions.insert(label.clone(), entries.len());
                entries.push(ChartEntry { label, count: 1 });
            }
        }
    }
    entries.sort_by(|left, right| right.count.cmp(&left.count));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}
