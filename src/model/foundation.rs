//! Foundation resources: project areas, team areas, contributors and
//! iterations.

use super::{Base, Ref, Resource};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A user of the repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contributor {
    #[serde(flatten)]
    pub base: Base,
    /// Human-readable name (e.g. "James Moody")
    pub name: String,
    pub email_address: String,
    /// Login id, unique in the application
    pub user_id: String,
}

impl Resource for Contributor {
    const TYPE_NAME: &'static str = "Contributor";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectArea {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    pub team_members: Vec<Ref<Contributor>>,
    pub team_area_hierarchy: Vec<TeamAreaHierarchyRecord>,
    pub development_lines: Vec<Ref<DevelopmentLine>>,
    pub project_development_line: Option<Ref<DevelopmentLine>>,
    pub roles: Vec<Role>,
    pub role_assignments: Vec<RoleAssignment>,
    pub all_team_areas: Vec<Ref<TeamArea>>,
}

impl Resource for ProjectArea {
    const TYPE_NAME: &'static str = "ProjectArea";
}

/// Parent/children entry of the team area tree of a project area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamAreaHierarchyRecord {
    pub parent: Option<Ref<TeamArea>>,
    pub children: Vec<Ref<TeamArea>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamArea {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    /// Name including all parent team areas
    pub qualified_name: String,
    pub team_members: Vec<Ref<Contributor>>,
    pub project_area: Option<Ref<ProjectArea>>,
    pub roles: Vec<Role>,
    pub role_assignments: Vec<RoleAssignment>,
    pub parent_team_area: Option<Ref<TeamArea>>,
}

impl Resource for TeamArea {
    const TYPE_NAME: &'static str = "TeamArea";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Iteration {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    pub id: String,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub parent: Option<Ref<Iteration>>,
    pub children: Vec<Ref<Iteration>>,
    pub development_line: Option<Ref<DevelopmentLine>>,
    pub has_deliverable: bool,
}

impl Resource for Iteration {
    const TYPE_NAME: &'static str = "Iteration";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevelopmentLine {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub iterations: Vec<Ref<Iteration>>,
    pub project_area: Option<Ref<ProjectArea>>,
    pub current_iteration: Option<Ref<Iteration>>,
}

impl Resource for DevelopmentLine {
    const TYPE_NAME: &'static str = "DevelopmentLine";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleAssignment {
    pub contributor: Option<Ref<Contributor>>,
    pub contributor_roles: Vec<Role>,
}
