//! Work item resources

use super::{Base, Contributor, Iteration, ProjectArea, Ref, Resource, TeamArea};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A work item (defect, task, story...)
///
/// Only the commonly used properties are typed here; the full set,
/// extensions included, is available on the materialized [`Object`](crate::Object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkItem {
    #[serde(flatten)]
    pub base: Base,
    /// Number shown in the UI
    pub id: i64,
    pub summary: String,
    pub description: String,
    pub tags: String,
    pub creation_date: Option<DateTime<FixedOffset>>,
    pub resolution_date: Option<DateTime<FixedOffset>>,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub planned_start_date: Option<DateTime<FixedOffset>>,
    pub planned_end_date: Option<DateTime<FixedOffset>>,
    /// Estimate in milliseconds
    pub duration: i64,
    pub time_spent: i64,
    pub corrected_estimate: i64,
    pub creator: Option<Ref<Contributor>>,
    pub owner: Option<Ref<Contributor>>,
    pub resolver: Option<Ref<Contributor>>,
    pub subscriptions: Vec<Ref<Contributor>>,
    pub category: Option<Ref<Category>>,
    pub project_area: Option<Ref<ProjectArea>>,
    pub team_area: Option<Ref<TeamArea>>,
    pub target: Option<Ref<Iteration>>,
    pub found_in: Option<Ref<Deliverable>>,
    pub state: Option<State>,
    pub severity: Option<Literal>,
    pub priority: Option<Literal>,
    pub comments: Vec<Comment>,
    pub parent: Option<Ref<WorkItem>>,
    pub children: Vec<Ref<WorkItem>>,
    pub blocks: Vec<Ref<WorkItem>>,
    pub depends_on: Vec<Ref<WorkItem>>,
    pub related: Vec<Ref<WorkItem>>,
    pub time_sheet_entries: Vec<Ref<TimeSheetEntry>>,
}

impl Resource for WorkItem {
    const TYPE_NAME: &'static str = "WorkItem";
}

/// Filed-against category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    #[serde(flatten)]
    pub base: Base,
    pub id: String,
    pub name: String,
    pub description: String,
    pub qualified_name: String,
}

impl Resource for Category {
    const TYPE_NAME: &'static str = "Category";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub creation_date: Option<DateTime<FixedOffset>>,
    pub content: String,
    pub edited: bool,
    pub creator: Option<Ref<Contributor>>,
}

/// Release a work item was found in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deliverable {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    pub description: String,
    pub creation_date: Option<DateTime<FixedOffset>>,
    pub project_area: Option<Ref<ProjectArea>>,
}

impl Resource for Deliverable {
    const TYPE_NAME: &'static str = "Deliverable";
}

/// Enumeration literal, e.g. a severity or priority
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Literal {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    pub id: String,
    pub name: String,
    /// "open", "inprogress" or "closed"
    pub group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeSheetEntry {
    #[serde(flatten)]
    pub base: Base,
    pub start_date: Option<DateTime<FixedOffset>>,
    /// Milliseconds
    pub time_spent: i64,
    pub work_type: String,
    pub time_code: String,
    pub time_code_id: String,
    pub work_item: Option<Ref<WorkItem>>,
}

impl Resource for TimeSheetEntry {
    const TYPE_NAME: &'static str = "TimeSheetEntry";
}
