//! Configuration sessions: which IK branches can reach the link's current
//! pose, and switching the body onto one of them.
//!
//! A session goes `Empty → Populated → Trialed` and back to `Empty` on
//! reset. Trials run under the kit's exclusive session; every trial starts
//! from the captured body state, and the body is restored afterwards.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use nalgebra::Isometry3;
use tracing::{debug, warn};

use linkpose_ik::{BodyStateSnapshot, ConfigurationHandler, LinkKinematicsKitPtr};

use crate::edit::solve_in_edit;

/// Label shown when no configuration information is available.
pub const UNAVAILABLE_LABEL: &str = "-----";

const ORDINAL_HEADER: &str = "No";
const UNNAMED_TITLE: &str = "Joint-space configuration";

/// Label for the live configuration: the state labels of `types`,
/// interleaved by target, without repeats, joined with `-`.
pub fn configuration_label(handler: &dyn ConfigurationHandler, types: &[i32]) -> String {
    let all_labels: Vec<Vec<String>> = types
        .iter()
        .map(|&type_id| handler.configuration_state_names(type_id))
        .collect();
    let max_len = all_labels.iter().map(Vec::len).max().unwrap_or(0);

    let mut seen = HashSet::new();
    let mut parts: Vec<&str> = Vec::new();
    for i in 0..max_len {
        for label in all_labels.iter().filter_map(|labels| labels.get(i)) {
            if seen.insert(label.as_str()) {
                parts.push(label);
            }
        }
    }
    parts.join("-")
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One row of the configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationCandidate {
    ordinal: usize,
    type_id: i32,
    labels: Vec<String>,
    feasible: bool,
}

impl ConfigurationCandidate {
    /// 1-based position in the handler's declaration order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    /// State label per configuration target.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Whether the last trial solved within joint limits.
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    fn compare(&self, other: &Self, column: usize) -> Ordering {
        if column == 0 {
            return self.ordinal.cmp(&other.ordinal);
        }
        self.label_in_column(column)
            .cmp(other.label_in_column(column))
            .then(self.ordinal.cmp(&other.ordinal))
    }

    fn label_in_column(&self, column: usize) -> &str {
        column
            .checked_sub(1)
            .and_then(|i| self.labels.get(i))
            .map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing bound.
    Empty,
    /// Rows built, no trial run yet.
    Populated,
    /// Feasibility computed for the captured reference pose.
    Trialed,
}

// ---------------------------------------------------------------------------
// ConfigurationResolver
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ConfigurationResolver {
    kit: Option<LinkKinematicsKitPtr>,
    handler: Option<Rc<dyn ConfigurationHandler>>,
    title: String,
    headers: Vec<String>,
    rows: Vec<ConfigurationCandidate>,
    reference_pose: Option<Isometry3<f32>>,
    snapshot: Option<BodyStateSnapshot>,
    sorted: Option<(usize, SortOrder)>,
    feasible_only: bool,
    trialed: bool,
}

impl ConfigurationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to `Empty`. The feasible-only filter is kept.
    pub fn reset(&mut self) {
        self.kit = None;
        self.handler = None;
        self.title.clear();
        self.headers.clear();
        self.rows.clear();
        self.reference_pose = None;
        self.snapshot = None;
        self.sorted = None;
        self.trialed = false;
    }

    pub fn state(&self) -> SessionState {
        if self.kit.is_none() {
            SessionState::Empty
        } else if self.trialed {
            SessionState::Trialed
        } else {
            SessionState::Populated
        }
    }

    /// Bind `kit` and build one row per configuration type of its
    /// handler, then run the trials.
    ///
    /// Returns `false`, leaving the session empty, when the kit offers no
    /// configuration handler.
    pub fn update_configuration_types(&mut self, kit: &LinkKinematicsKitPtr) -> bool {
        self.reset();

        let Some(handler) = kit.configuration_handler() else {
            debug!(link = kit.link_name(), "no configuration handler");
            return false;
        };

        let name = handler.joint_path_name();
        self.title = if name.is_empty() {
            UNNAMED_TITLE.to_owned()
        } else {
            format!("{name} configuration")
        };

        self.headers = std::iter::once(ORDINAL_HEADER.to_owned())
            .chain(handler.configuration_target_names())
            .collect();

        self.rows = (0..handler.num_configuration_types())
            .filter_map(|index| {
                let type_id = handler.configuration_type_id(index)?;
                Some(ConfigurationCandidate {
                    ordinal: index + 1,
                    type_id,
                    labels: handler.configuration_state_names(type_id),
                    feasible: false,
                })
            })
            .collect();

        let body = kit.body();
        self.reference_pose = body.link_pose(kit.link());
        self.snapshot = Some(body.store_state());
        self.kit = Some(Rc::clone(kit));
        self.handler = Some(handler);

        self.update_configuration_states();
        true
    }

    /// Recapture the reference pose and body state, then try every row's
    /// configuration against that pose.
    ///
    /// A row is feasible when the solve succeeds and every joint ends
    /// within its limits. The body is left exactly as it was.
    pub fn update_configuration_states(&mut self) -> bool {
        let Some(kit) = self.kit.clone() else {
            debug!("configuration trials requested without a session");
            return false;
        };
        if self.rows.is_empty() {
            return false;
        }

        let body = kit.body();
        let Some(reference) = body.link_pose(kit.link()) else {
            return false;
        };
        let snapshot = body.store_state();

        let session = match kit.begin_exclusive() {
            Ok(session) => session,
            Err(err) => {
                warn!(link = kit.link_name(), %err, "configuration trials skipped");
                return false;
            }
        };

        for row in &mut self.rows {
            body.restore_state(&snapshot);
            let solved = session.set_preferred_configuration_type(row.type_id)
                && session.solve(&reference)
                && session.joints_within_limits();
            debug!(type_id = row.type_id, feasible = solved, "configuration trial");
            row.feasible = solved;
        }

        drop(session);
        body.restore_state(&snapshot);

        self.reference_pose = Some(reference);
        self.snapshot = Some(snapshot);
        self.trialed = true;
        true
    }

    pub fn kit(&self) -> Option<&LinkKinematicsKitPtr> {
        self.kit.as_ref()
    }

    pub fn handler(&self) -> Option<&Rc<dyn ConfigurationHandler>> {
        self.handler.as_ref()
    }

    /// "<joint path name> configuration", or "Joint-space configuration"
    /// for an unnamed path. Empty while no session is bound.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// `"No"` followed by one header per configuration target.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All rows in display order.
    pub fn rows(&self) -> &[ConfigurationCandidate] {
        &self.rows
    }

    /// Rows in display order, without infeasible ones when the
    /// feasible-only filter is on.
    pub fn visible_rows(&self) -> Vec<&ConfigurationCandidate> {
        self.rows
            .iter()
            .filter(|row| !self.feasible_only || row.feasible)
            .collect()
    }

    pub fn row(&self, type_id: i32) -> Option<&ConfigurationCandidate> {
        self.rows.iter().find(|row| row.type_id == type_id)
    }

    /// Link pose the last trials were run against.
    pub fn reference_pose(&self) -> Option<&Isometry3<f32>> {
        self.reference_pose.as_ref()
    }

    pub fn snapshot(&self) -> Option<&BodyStateSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_feasible_only(&self) -> bool {
        self.feasible_only
    }

    pub fn set_feasible_only(&mut self, on: bool) {
        self.feasible_only = on;
    }

    pub fn sort_state(&self) -> Option<(usize, SortOrder)> {
        self.sorted
    }

    /// Sort rows by a column. A new column sorts ascending; the same
    /// column again flips the order. Column 0 orders by ordinal, others by
    /// label text.
    pub fn sort_by_column(&mut self, column: usize) -> Option<SortOrder> {
        if column >= self.headers.len() {
            return None;
        }
        let order = match self.sorted {
            Some((last, SortOrder::Ascending)) if last == column => SortOrder::Descending,
            _ => SortOrder::Ascending,
        };
        self.rows.sort_by(|a, b| {
            let ordering = a.compare(b, column);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        self.sorted = Some((column, order));
        Some(order)
    }

    /// Solve the link's live pose once with `type_id` preferred, as a body
    /// edit. The preference does not outlast the solve.
    pub fn apply_configuration(&self, type_id: i32) -> bool {
        let Some(kit) = &self.kit else {
            debug!(type_id, "configuration applied without a session");
            return false;
        };
        if self.row(type_id).is_none() {
            return false;
        }
        let body = kit.body();
        let Some(live) = body.link_pose(kit.link()) else {
            return false;
        };

        let session = match kit.begin_exclusive() {
            Ok(session) => session,
            Err(err) => {
                warn!(link = kit.link_name(), %err, "configuration not applied");
                return false;
            }
        };
        if !session.set_preferred_configuration_type(type_id) {
            return false;
        }
        let solved = solve_in_edit(
            body,
            || session.solve(&live),
            || session.calc_remaining_part_forward_kinematics(),
        );
        debug!(type_id, solved, "configuration applied");
        solved
    }

    /// Put the body back to the state captured by the last trials.
    pub fn cancel(&self) -> bool {
        let (Some(kit), Some(snapshot)) = (&self.kit, &self.snapshot) else {
            return false;
        };
        let body = kit.body();
        body.restore_state(snapshot);
        body.notify_kinematic_state_change();
        true
    }
}

impl std::fmt::Debug for ConfigurationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationResolver")
            .field("state", &self.state())
            .field("title", &self.title)
            .field("rows", &self.rows)
            .field("sorted", &self.sorted)
            .field("feasible_only", &self.feasible_only)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
