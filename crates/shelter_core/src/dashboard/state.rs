//! Mutable dashboard state and its transitions.
//!
//! # Responsibility
//! - Own the in-memory table, filter, sort, page, selection, edit target
//!   and theme flag.
//! - Report which state inputs each transition actually changed.
//!
//! # Invariants
//! - Transitions that change nothing report an empty set.
//! - Changing the filter or sort clears the selection and returns to page 0.
//! - The edit target is a snapshot; later table patches do not touch it.
//! - A table patch keeps the selection on the same record, or clears it.

use crate::dashboard::graph::StateInput;
use crate::dashboard::views::FilteredView;
use crate::model::record::{
    FieldValue, Query, Record, UpdateSet, ANIMAL_TYPE_FIELD, BREED_FIELD,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// State inputs touched by one transition.
pub type Changes = BTreeSet<StateInput>;

/// Multi-select filter; an empty dimension does not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub types: BTreeSet<String>,
    pub breeds: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new<T, B>(types: T, breeds: B) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            breeds: breeds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.breeds.is_empty()
    }

    pub fn admits(&self, record: &Record) -> bool {
        self.admits_type(record) && admits(&self.breeds, record, BREED_FIELD)
    }

    /// Type dimension only; drives the breed options.
    pub fn admits_type(&self, record: &Record) -> bool {
        admits(&self.types, record, ANIMAL_TYPE_FIELD)
    }
}

fn admits(allowed: &BTreeSet<String>, record: &Record, field: &str) -> bool {
    allowed.is_empty()
        || record
            .text(field)
            .is_some_and(|value| allowed.contains(&value))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSort {
    pub column: String,
    pub descending: bool,
}

impl TableSort {
    pub fn new(column: impl Into<String>, descending: bool) -> Self {
        Self {
            column: column.into(),
            descending,
        }
    }

    /// Missing fields sort with nulls.
    pub fn compare(&self, left: &Record, right: &Record) -> Ordering {
        let null = FieldValue::Null;
        let left = left.get(&self.column).unwrap_or(&null);
        let right = right.get(&self.column).unwrap_or(&null);
        let ordering = left.sort_cmp(right);
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    table: Vec<Record>,
    filter: FilterSelection,
    sort: Option<TableSort>,
    page: usize,
    selection: Option<usize>,
    edit_target: Option<Record>,
    dark: bool,
}

impl DashboardState {
    pub fn new(table: Vec<Record>) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    pub fn table(&self) -> &[Record] {
        &self.table
    }

    pub fn filter(&self) -> &FilterSelection {
        &self.filter
    }

    pub fn sort(&self) -> Option<&TableSort> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Selected position in the filtered view.
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn edit_target(&self) -> Option<&Record> {
        self.edit_target.as_ref()
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn set_filter(&mut self, filter: FilterSelection) -> Changes {
        if self.filter == filter {
            return Changes::new();
        }
        self.filter = filter;
        let mut changes = Changes::from([StateInput::Filter]);
        changes.extend(self.clear_position());
        changes
    }

    pub fn reset_filters(&mut self) -> Changes {
        self.set_filter(FilterSelection::default())
    }

    pub fn sort_by(&mut self, sort: Option<TableSort>) -> Changes {
        if self.sort == sort {
            return Changes::new();
        }
        self.sort = sort;
        let mut changes = Changes::from([StateInput::Sort]);
        changes.extend(self.clear_position());
        changes
    }

    pub fn set_page(&mut self, page: usize) -> Changes {
        if self.page == page {
            return Changes::new();
        }
        self.page = page;
        Changes::from([StateInput::Page])
    }

    /// Out-of-range positions select nothing.
    pub fn select_row(&mut self, position: Option<usize>, view: &FilteredView) -> Changes {
        let position = position.filter(|position| *position < view.len());
        if self.selection == position {
            return Changes::new();
        }
        self.selection = position;
        Changes::from([StateInput::Selection])
    }

    /// Snapshots the record at `position`; a missing or stale position is a no-op.
    pub fn select_for_edit(&mut self, position: Option<usize>, view: &FilteredView) -> Changes {
        let Some(record) = position.and_then(|position| view.record(&self.table, position)) else {
            return Changes::new();
        };
        if self.edit_target.as_ref() == Some(record) {
            return Changes::new();
        }
        self.edit_target = Some(record.clone());
        Changes::from([StateInput::EditTarget])
    }

    pub fn cancel_edit(&mut self) -> Changes {
        match self.edit_target.take() {
            Some(_) => Changes::from([StateInput::EditTarget]),
            None => Changes::new(),
        }
    }

    /// Removes and returns the edit target for a commit.
    pub fn take_edit_target(&mut self) -> Option<Record> {
        self.edit_target.take()
    }

    /// Merges `update` into the first row matching `query`.
    ///
    /// The selection follows the selected record to its new view position,
    /// and is cleared when the patch moves that record out of the view.
    pub fn patch_row(&mut self, query: &Query, update: &UpdateSet) -> Changes {
        let selected = self
            .selection
            .and_then(|position| self.current_view().table_index(position));
        let patched = self
            .table
            .iter_mut()
            .find(|record| record.matches(query))
            .is_some_and(|record| record.merge(update));
        if !patched {
            return Changes::new();
        }

        let mut changes = Changes::from([StateInput::Table]);
        let position = selected.and_then(|index| self.current_view().position_of(index));
        if position != self.selection {
            self.selection = position;
            changes.insert(StateInput::Selection);
        }
        changes
    }

    pub fn set_theme(&mut self, dark: bool) -> Changes {
        if self.dark == dark {
            return Changes::new();
        }
        self.dark = dark;
        Changes::from([StateInput::Theme])
    }

    pub fn toggle_theme(&mut self) -> Changes {
        self.set_theme(!self.dark)
    }

    fn current_view(&self) -> FilteredView {
        FilteredView::derive(&self.table, &self.filter, self.sort.as_ref())
    }

    fn clear_position(&mut self) -> Changes {
        let mut changes = Changes::new();
        if self.selection.take().is_some() {
            changes.insert(StateInput::Selection);
        }
        if self.page != 0 {
            self.page = 0;
            changes.insert(StateInput::Page);
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::{Changes, DashboardState, FilterSelection, TableSort};
    use crate::dashboard::graph::StateInput;
    use crate::dashboard::views::FilteredView;
    use crate::model::record::{FieldValue, Query, Record, UpdateSet};

    fn state() -> DashboardState {
        DashboardState::new(vec![
            Record::new()
                .with("animal_id", "A1")
                .with("animal_type", "Dog")
                .with("breed", "Beagle"),
            Record::new()
                .with("animal_id", "A2")
                .with("animal_type", "Cat")
                .with("breed", "Tabby"),
        ])
    }

    fn view(state: &DashboardState) -> FilteredView {
        FilteredView::derive(state.table(), state.filter(), state.sort())
    }

    #[test]
    fn filter_change_clears_selection_and_page() {
        let mut state = state();
        let current = view(&state);
        state.select_row(Some(1), &current);
        state.set_page(2);

        let changes = state.set_filter(FilterSelection::new(["Dog"], Vec::<String>::new()));
        assert_eq!(
            changes,
            Changes::from([StateInput::Filter, StateInput::Page, StateInput::Selection])
        );
        assert_eq!(state.selection(), None);
        assert_eq!(state.page(), 0);

        assert!(state
            .set_filter(FilterSelection::new(["Dog"], Vec::<String>::new()))
            .is_empty());
        assert_eq!(state.reset_filters(), Changes::from([StateInput::Filter]));
        assert!(state.filter().is_empty());
    }

    #[test]
    fn select_row_ignores_out_of_range() {
        let mut state = state();
        let current = view(&state);
        assert!(state.select_row(Some(5), &current).is_empty());
        assert_eq!(state.selection(), None);
        assert_eq!(
            state.select_row(Some(0), &current),
            Changes::from([StateInput::Selection])
        );
    }

    #[test]
    fn select_for_edit_requires_a_valid_position() {
        let mut state = state();
        let current = view(&state);
        assert!(state.select_for_edit(None, &current).is_empty());
        assert!(state.select_for_edit(Some(9), &current).is_empty());

        state.select_for_edit(Some(1), &current);
        assert_eq!(
            state.edit_target().and_then(|r| r.text("animal_id")),
            Some("A2".to_string())
        );
        assert_eq!(state.cancel_edit(), Changes::from([StateInput::EditTarget]));
        assert!(state.cancel_edit().is_empty());
    }

    #[test]
    fn sort_change_resets_position() {
        let mut state = state();
        let current = view(&state);
        state.select_row(Some(0), &current);
        let changes = state.sort_by(Some(TableSort::new("breed", true)));
        assert!(changes.contains(&StateInput::Sort));
        assert!(changes.contains(&StateInput::Selection));
        assert!(state.sort_by(Some(TableSort::new("breed", true))).is_empty());
    }

    #[test]
    fn patch_row_merges_into_first_match_only() {
        let mut state = state();
        let changes = state.patch_row(
            &Query::new().with("animal_id", "A1"),
            &UpdateSet::new().with("breed", "Mixed"),
        );
        assert_eq!(changes, Changes::from([StateInput::Table]));
        assert_eq!(
            state.table()[0].get("breed"),
            Some(&FieldValue::Text("Mixed".into()))
        );
        assert!(state
            .patch_row(
                &Query::new().with("animal_id", "A9"),
                &UpdateSet::new().with("breed", "Mixed"),
            )
            .is_empty());
    }

    #[test]
    fn patch_row_keeps_selection_on_the_reordered_record() {
        let mut state = state();
        state.sort_by(Some(TableSort::new("breed", false)));
        let current = view(&state);
        state.select_row(Some(0), &current);

        let changes = state.patch_row(
            &Query::new().with("animal_id", "A1"),
            &UpdateSet::new().with("breed", "Zebu"),
        );

        assert_eq!(
            changes,
            Changes::from([StateInput::Table, StateInput::Selection])
        );
        assert_eq!(state.selection(), Some(1));
        let selected = view(&state).record(state.table(), 1).cloned();
        assert_eq!(
            selected.and_then(|record| record.text("animal_id")),
            Some("A1".to_string())
        );
    }

    #[test]
    fn patch_row_leaves_unmoved_selection_alone() {
        let mut state = state();
        let current = view(&state);
        state.select_row(Some(1), &current);
        let changes = state.patch_row(
            &Query::new().with("animal_id", "A1"),
            &UpdateSet::new().with("breed", "Mixed"),
        );
        assert_eq!(changes, Changes::from([StateInput::Table]));
        assert_eq!(state.selection(), Some(1));
    }

    #[test]
    fn theme_toggle_flips_flag() {
        let mut state = state();
        assert!(state.set_theme(false).is_empty());
        assert_eq!(state.toggle_theme(), Changes::from([StateInput::Theme]));
        assert!(state.is_dark());
    }
}
