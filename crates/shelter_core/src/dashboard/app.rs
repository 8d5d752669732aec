//! Dashboard event dispatcher.
//!
//! # Responsibility
//! - Own the repository, the state and the cached derived views.
//! - Apply one event, then recompute exactly the affected derivations.
//! - Persist edit commits through `AnimalRepository::update`.
//!
//! # Invariants
//! - Events are applied one at a time; callers serialize access.
//! - A commit always clears the edit target, whatever the store returned.
//! - Under `PatchPolicy::Unconditional` the local row is patched even when
//!   the store matched nothing; every unconfirmed commit is logged.

use crate::dashboard::graph::{DependencyGraph, GraphError, StateInput};
use crate::dashboard::state::{Changes, DashboardState, FilterSelection, TableSort};
use crate::dashboard::views::{update_from_form, DashboardViews, ViewFragment};
use crate::model::record::UpdateSet;
use crate::repo::collection::UpdateCounts;
use crate::repo::shelter_repo::AnimalRepository;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// When a committed edit is applied to the in-memory table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchPolicy {
    /// Always patch after the store call.
    #[default]
    Unconditional,
    /// Patch only when the store reports at least one modified record.
    ConfirmedOnly,
}

impl PatchPolicy {
    pub fn allows_patch(self, confirmed: bool) -> bool {
        match self {
            Self::Unconditional => true,
            Self::ConfirmedOnly => confirmed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unconditional => "unconditional",
            Self::ConfirmedOnly => "confirmed",
        }
    }
}

impl FromStr for PatchPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unconditional" => Ok(Self::Unconditional),
            "confirmed" | "confirmed_only" => Ok(Self::ConfirmedOnly),
            other => Err(format!("unknown patch policy `{other}`")),
        }
    }
}

/// One user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    SetFilter {
        #[serde(default)]
        types: Vec<String>,
        #[serde(default)]
        breeds: Vec<String>,
    },
    ResetFilters,
    SelectRow {
        #[serde(default)]
        index: Option<usize>,
    },
    SortBy {
        #[serde(default)]
        column: Option<String>,
        #[serde(default)]
        descending: bool,
    },
    SetPage {
        page: usize,
    },
    SelectForEdit {
        #[serde(default)]
        row: Option<usize>,
    },
    CancelEdit,
    CommitEdit {
        update: UpdateSet,
    },
    SetTheme {
        dark: bool,
    },
    ToggleTheme,
}

impl DashboardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetFilter { .. } => "set_filter",
            Self::ResetFilters => "reset_filters",
            Self::SelectRow { .. } => "select_row",
            Self::SortBy { .. } => "sort_by",
            Self::SetPage { .. } => "set_page",
            Self::SelectForEdit { .. } => "select_for_edit",
            Self::CancelEdit => "cancel_edit",
            Self::CommitEdit { .. } => "commit_edit",
            Self::SetTheme { .. } => "set_theme",
            Self::ToggleTheme => "toggle_theme",
        }
    }
}

/// State inputs an event changed and the fragments recomputed for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub changed: Vec<StateInput>,
    pub fragments: Vec<ViewFragment>,
}

pub struct Dashboard<R: AnimalRepository> {
    repo: R,
    state: DashboardState,
    views: DashboardViews,
    graph: DependencyGraph,
    policy: PatchPolicy,
}

impl<R: AnimalRepository> Dashboard<R> {
    /// Reads the whole collection once and derives every view.
    pub fn load(repo: R, policy: PatchPolicy) -> Result<Self, GraphError> {
        let graph = DependencyGraph::dashboard()?;
        let table = repo.read(None);
        if table.is_empty() {
            warn!("event=dashboard_load module=dashboard status=empty records=0");
        } else {
            info!(
                "event=dashboard_load module=dashboard status=ok records={} policy={}",
                table.len(),
                policy.as_str()
            );
        }

        let state = DashboardState::new(table);
        let views = DashboardViews::compute(&state);
        Ok(Self {
            repo,
            state,
            views,
            graph,
            policy,
        })
    }

    pub fn views(&self) -> &DashboardViews {
        &self.views
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn table_len(&self) -> usize {
        self.state.table().len()
    }

    pub fn policy(&self) -> PatchPolicy {
        self.policy
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Releases the repository connection.
    pub fn close(&mut self) {
        self.repo.close();
    }

    /// Applies one event and recomputes the derivations it affects.
    pub fn dispatch(&mut self, event: DashboardEvent) -> DispatchOutcome {
        let name = event.name();
        let changes = self.apply(event);
        let affected = self.graph.affected(&changes);
        let fragments: Vec<ViewFragment> = affected
            .iter()
            .map(|derivation| self.views.recompute(*derivation, &self.state))
            .collect();

        debug!(
            "event=dashboard_dispatch module=dashboard status=ok kind={} changed={} recomputed={}",
            name,
            changes.len(),
            fragments.len()
        );
        DispatchOutcome {
            changed: changes.into_iter().collect(),
            fragments,
        }
    }

    /// Commits submitted edit-form text; no-op without an edit target.
    pub fn submit_edit_form(&mut self, values: &BTreeMap<String, String>) -> DispatchOutcome {
        let Some(target) = self.state.edit_target() else {
            debug!("event=edit_submit module=dashboard status=skipped reason=no_edit_target");
            return DispatchOutcome::default();
        };
        let update = update_from_form(target, values);
        self.dispatch(DashboardEvent::CommitEdit { update })
    }

    fn apply(&mut self, event: DashboardEvent) -> Changes {
        match event {
            DashboardEvent::SetFilter { types, breeds } => {
                self.state.set_filter(FilterSelection::new(types, breeds))
            }
            DashboardEvent::ResetFilters => self.state.reset_filters(),
            DashboardEvent::SelectRow { index } => {
                self.state.select_row(index, &self.views.filtered)
            }
            DashboardEvent::SortBy { column, descending } => self
                .state
                .sort_by(column.map(|column| TableSort::new(column, descending))),
            DashboardEvent::SetPage { page } => self.state.set_page(page),
            DashboardEvent::SelectForEdit { row } => {
                self.state.select_for_edit(row, &self.views.filtered)
            }
            DashboardEvent::CancelEdit => self.state.cancel_edit(),
            DashboardEvent::CommitEdit { update } => self.commit_edit(&update),
            DashboardEvent::SetTheme { dark } => self.state.set_theme(dark),
            DashboardEvent::ToggleTheme => self.state.toggle_theme(),
        }
    }

    fn commit_edit(&mut self, update: &UpdateSet) -> Changes {
        let Some(target) = self.state.take_edit_target() else {
            debug!("event=edit_commit module=dashboard status=skipped reason=no_edit_target");
            return Changes::new();
        };
        let mut changes = Changes::from([StateInput::EditTarget]);

        let Some(query) = target.identity_query() else {
            warn!("event=edit_commit module=dashboard status=skipped reason=no_identity_field");
            return changes;
        };
        if update.is_empty() {
            debug!("event=edit_commit module=dashboard status=skipped reason=no_changes");
            return changes;
        }

        let counts = self.repo.update(&query, Some(update));
        let confirmed = counts.is_some_and(|counts| counts.modified_count >= 1);
        if !confirmed {
            let UpdateCounts {
                matched_count,
                modified_count,
            } = counts.unwrap_or_default();
            warn!(
                "event=edit_commit module=dashboard status=unconfirmed store_ok={} matched={} modified={} policy={}",
                counts.is_some(),
                matched_count,
                modified_count,
                self.policy.as_str()
            );
        }

        if self.policy.allows_patch(confirmed) {
            changes.extend(self.state.patch_row(&query, update));
        }
        info!(
            "event=edit_commit module=dashboard status=ok confirmed={} fields={}",
            confirmed,
            update.len()
        );
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::{Dashboard, DashboardEvent, PatchPolicy};
    use crate::dashboard::graph::{Derivation, StateInput};
    use crate::dashboard::views::ViewFragment;
    use crate::model::record::{FieldValue, Query, Record, UpdateSet};
    use crate::repo::collection::UpdateCounts;
    use crate::repo::shelter_repo::{AnimalRepository, ArgumentError};
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct RecordingRepo {
        records: Vec<Record>,
        update_result: Option<UpdateCounts>,
        updates: RefCell<Vec<(Query, Option<UpdateSet>)>>,
        closed: bool,
    }

    impl RecordingRepo {
        fn new(records: Vec<Record>, update_result: Option<UpdateCounts>) -> Self {
            Self {
                records,
                update_result,
                updates: RefCell::new(Vec::new()),
                closed: false,
            }
        }
    }

    impl AnimalRepository for RecordingRepo {
        fn create(&self, record: Option<&Record>) -> Result<bool, ArgumentError> {
            record.map(|_| true).ok_or(ArgumentError::EmptyInput)
        }

        fn read(&self, _query: Option<&Query>) -> Vec<Record> {
            self.records.clone()
        }

        fn update(&self, query: &Query, update: Option<&UpdateSet>) -> Option<UpdateCounts> {
            self.updates
                .borrow_mut()
                .push((query.clone(), update.cloned()));
            self.update_result
        }

        fn delete(&self, query: Option<&Query>) -> Result<bool, ArgumentError> {
            query.map(|_| false).ok_or(ArgumentError::EmptyQuery)
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new()
                .with("animal_id", "A1")
                .with("animal_type", "Dog")
                .with("breed", "Beagle"),
            Record::new()
                .with("animal_id", "A2")
                .with("animal_type", "Cat")
                .with("breed", "Tabby"),
        ]
    }

    fn modified(count: u64) -> Option<UpdateCounts> {
        Some(UpdateCounts {
            matched_count: count,
            modified_count: count,
        })
    }

    fn dashboard(
        update_result: Option<UpdateCounts>,
        policy: PatchPolicy,
    ) -> Dashboard<RecordingRepo> {
        Dashboard::load(RecordingRepo::new(records(), update_result), policy).unwrap()
    }

    #[test]
    fn filter_event_updates_view_stats_and_breed_chart() {
        let mut dashboard = dashboard(modified(1), PatchPolicy::Unconditional);
        let outcome = dashboard.dispatch(DashboardEvent::SetFilter {
            types: vec!["Dog".into()],
            breeds: vec![],
        });

        assert_eq!(outcome.changed, vec![StateInput::Filter]);
        assert!(outcome
            .fragments
            .iter()
            .all(|fragment| fragment.derivation() != Derivation::EditForm));

        let views = dashboard.views();
        assert_eq!(views.filtered.len(), 1);
        assert_eq!(
            (views.stats.count, views.stats.breeds, views.stats.types),
            (1, 1, 1)
        );
        assert_eq!(views.breed_chart.entries.len(), 1);
        assert_eq!(views.breed_chart.entries[0].label, "Beagle");
        assert_eq!(views.breed_chart.entries[0].count, 1);
        assert_eq!(views.breed_options, vec!["Beagle"]);
    }

    #[test]
    fn commit_edit_updates_store_and_patches_table() {
        let mut dashboard = dashboard(modified(1), PatchPolicy::Unconditional);
        dashboard.dispatch(DashboardEvent::SelectForEdit { row: Some(0) });
        assert!(dashboard.views().edit_form.open);

        let outcome = dashboard.dispatch(DashboardEvent::CommitEdit {
            update: UpdateSet::new().with("breed", "Mixed"),
        });

        assert_eq!(
            dashboard.repository().updates.borrow().as_slice(),
            &[(
                Query::new().with("animal_id", "A1"),
                Some(UpdateSet::new().with("breed", "Mixed"))
            )]
        );
        assert_eq!(
            dashboard.state().table()[0].get("breed"),
            Some(&FieldValue::Text("Mixed".into()))
        );
        assert!(dashboard.state().edit_target().is_none());
        assert!(!dashboard.views().edit_form.open);
        assert!(outcome.changed.contains(&StateInput::Table));
        assert!(outcome
            .fragments
            .iter()
            .any(|fragment| matches!(fragment, ViewFragment::BreedChart(_))));
    }

    #[test]
    fn confirmed_only_policy_skips_patch_when_nothing_modified() {
        let mut dashboard = dashboard(modified(0), PatchPolicy::ConfirmedOnly);
        dashboard.dispatch(DashboardEvent::SelectForEdit { row: Some(0) });
        let outcome = dashboard.dispatch(DashboardEvent::CommitEdit {
            update: UpdateSet::new().with("breed", "Mixed"),
        });

        assert_eq!(outcome.changed, vec![StateInput::EditTarget]);
        assert_eq!(
            dashboard.state().table()[0].get("breed"),
            Some(&FieldValue::Text("Beagle".into()))
        );
        assert!(dashboard.state().edit_target().is_none());
    }

    #[test]
    fn unconditional_policy_patches_even_on_store_failure() {
        let mut dashboard = dashboard(None, PatchPolicy::Unconditional);
        dashboard.dispatch(DashboardEvent::SelectForEdit { row: Some(1) });
        dashboard.dispatch(DashboardEvent::CommitEdit {
            update: UpdateSet::new().with("breed", "Siamese"),
        });
        assert_eq!(
            dashboard.state().table()[1].text("breed").as_deref(),
            Some("Siamese")
        );
    }

    #[test]
    fn commit_that_leaves_the_view_clears_the_selection() {
        let mut records = records();
        records.insert(
            1,
            Record::new()
                .with("animal_id", "A3")
                .with("animal_type", "Dog")
                .with("breed", "Beagle"),
        );
        let repo = RecordingRepo::new(records, modified(1));
        let mut dashboard = Dashboard::load(repo, PatchPolicy::Unconditional).unwrap();
        dashboard.dispatch(DashboardEvent::SetFilter {
            types: vec![],
            breeds: vec!["Beagle".into()],
        });
        dashboard.dispatch(DashboardEvent::SelectRow { index: Some(0) });
        dashboard.dispatch(DashboardEvent::SelectForEdit { row: Some(0) });
        assert_eq!(dashboard.views().table.selected, Some(0));

        let outcome = dashboard.dispatch(DashboardEvent::CommitEdit {
            update: UpdateSet::new().with("breed", "Mixed"),
        });

        assert!(outcome.changed.contains(&StateInput::Selection));
        assert_eq!(dashboard.state().selection(), None);
        assert_eq!(dashboard.views().filtered.len(), 1);
        assert_eq!(dashboard.views().table.selected, None);

        dashboard.dispatch(DashboardEvent::SelectForEdit { row: Some(0) });
        assert_eq!(
            dashboard
                .state()
                .edit_target()
                .and_then(|record| record.text("animal_id")),
            Some("A3".to_string())
        );
    }

    #[test]
    fn commit_without_edit_target_is_a_no_op() {
        let mut dashboard = dashboard(modified(1), PatchPolicy::Unconditional);
        let outcome = dashboard.dispatch(DashboardEvent::CommitEdit {
            update: UpdateSet::new().with("breed", "Mixed"),
        });
        assert!(outcome.changed.is_empty());
        assert!(outcome.fragments.is_empty());
        assert!(dashboard.repository().updates.borrow().is_empty());
    }

    #[test]
    fn select_for_edit_without_row_is_a_no_op() {
        let mut dashboard = dashboard(modified(1), PatchPolicy::Unconditional);
        let outcome = dashboard.dispatch(DashboardEvent::SelectForEdit { row: None });
        assert!(outcome.changed.is_empty());
        assert!(dashboard.state().edit_target().is_none());
    }

    #[test]
    fn theme_toggle_recomputes_only_themed_views() {
        let mut dashboard = dashboard(modified(1), PatchPolicy::Unconditional);
        let outcome = dashboard.dispatch(DashboardEvent::ToggleTheme);
        let recomputed: Vec<Derivation> = outcome
            .fragments
            .iter()
            .map(ViewFragment::derivation)
            .collect();
        assert!(!recomputed.contains(&Derivation::FilteredView));
        assert!(!recomputed.contains(&Derivation::MapMarker));
        assert!(recomputed.contains(&Derivation::ThemeStyles));
        assert!(dashboard.views().theme.dark);
    }

    #[test]
    fn submit_edit_form_converts_text_and_commits() {
        let mut dashboard = dashboard(modified(1), PatchPolicy::Unconditional);
        dashboard.dispatch(DashboardEvent::SelectForEdit { row: Some(0) });

        let values: BTreeMap<String, String> = [("animal_id", "A1"), ("breed", "Mixed")]
            .into_iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect();
        dashboard.submit_edit_form(&values);

        let updates = dashboard.repository().updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1, Some(UpdateSet::new().with("breed", "Mixed")));
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: DashboardEvent =
            serde_json::from_str(r#"{"type":"set_filter","types":["Dog"]}"#).unwrap();
        assert_eq!(
            event,
            DashboardEvent::SetFilter {
                types: vec!["Dog".into()],
                breeds: vec![],
            }
        );
        let event: DashboardEvent =
            serde_json::from_str(r#"{"type":"commit_edit","update":{"breed":"Mixed"}}"#).unwrap();
        assert_eq!(
            event,
            DashboardEvent::CommitEdit {
                update: UpdateSet::new().with("breed", "Mixed")
            }
        );
    }

    #[test]
    fn patch_policy_parses_config_values() {
        assert_eq!("confirmed".parse::<PatchPolicy>(), Ok(PatchPolicy::ConfirmedOnly));
        assert_eq!(" Unconditional ".parse::<PatchPolicy>(), Ok(PatchPolicy::Unconditional));
        assert!("sometimes".parse::<PatchPolicy>().is_err());
    }

    #[test]
    fn close_releases_repository() {
        let mut dashboard = dashboard(modified(1), PatchPolicy::Unconditional);
        dashboard.close();
        assert!(dashboard.repository().closed);
    }
}
