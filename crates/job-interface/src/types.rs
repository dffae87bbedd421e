use std::fmt;
use std::str::FromStr;

use http::HeaderMap;
use manta_utils::ensure;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::JobClientError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PhaseType {
    /// Runs once per input object
    Map,
    /// Runs over the concatenated output of the previous phase
    Reduce,
}

/// One stage of a job. Phases are fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    pub exec: String,
    /// Objects made available to the task before `exec` runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<String>>,
    /// Command run once before `exec`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,
    /// Memory in MiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Disk in GiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
    /// Number of reducers, reduce phases only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl Phase {
    pub fn new(phase_type: PhaseType, exec: impl Into<String>) -> Self {
        Self { phase_type, exec: exec.into(), assets: None, init: None, memory: None, disk: None, count: None }
    }

    pub fn map(exec: impl Into<String>) -> Self {
        Self::new(PhaseType::Map, exec)
    }

    pub fn reduce(exec: impl Into<String>) -> Self {
        Self::new(PhaseType::Reduce, exec)
    }

    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_init(mut self, init: impl Into<String>) -> Self {
        self.init = Some(init.into());
        self
    }

    pub fn with_memory(mut self, memory: u64) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_disk(mut self, disk: u64) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    fn validate(&self, index: usize) -> Result<(), JobClientError> {
        ensure!(
            !self.exec.trim().is_empty(),
            JobClientError::validation(format!("phase {index} ({}) has an empty exec command", self.phase_type))
        );
        ensure!(
            self.count.is_none() || self.phase_type == PhaseType::Reduce,
            JobClientError::validation(format!("phase {index} sets count, which only reduce phases accept"))
        );
        ensure!(self.count != Some(0), JobClientError::validation(format!("phase {index} sets count to 0")));
        ensure!(self.memory != Some(0), JobClientError::validation(format!("phase {index} sets memory to 0")));
        ensure!(self.disk != Some(0), JobClientError::validation(format!("phase {index} sets disk to 0")));
        if let Some(assets) = &self.assets {
            ensure!(
                assets.iter().all(|asset| !asset.trim().is_empty()),
                JobClientError::validation(format!("phase {index} lists an empty asset path"))
            );
        }
        Ok(())
    }
}

/// Parses `map:<command>` or `reduce:<command>`.
impl FromStr for Phase {
    type Err = JobClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, exec) = s
            .split_once(':')
            .ok_or_else(|| JobClientError::validation(format!("phase {s:?} is not of the form <map|reduce>:<command>")))?;
        let phase_type = PhaseType::from_str(kind.trim().to_lowercase().as_str())
            .map_err(|_| JobClientError::validation(format!("unknown phase type {:?}", kind.trim())))?;
        let phase = Phase::new(phase_type, exec.trim());
        phase.validate(0)?;
        Ok(phase)
    }
}

/// Body of a job creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    pub name: String,
    pub phases: Vec<Phase>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, phases: Vec<Phase>) -> Self {
        Self { name: name.into(), phases }
    }

    pub fn validate(&self) -> Result<(), JobClientError> {
        ensure!(!self.phases.is_empty(), JobClientError::validation("a job needs at least one phase"));
        self.phases.iter().enumerate().try_for_each(|(index, phase)| phase.validate(index))
    }
}

/// Job state as observed by the client.
///
/// `queued` and `running` are in progress; every other value is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Running,
    Done,
    Cancelled,
    Other(String),
}

impl JobState {
    pub fn from_wire(state: &str) -> Self {
        match state {
            "queued" => JobState::Queued,
            "running" => JobState::Running,
            "done" => JobState::Done,
            "cancelled" => JobState::Cancelled,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Queued | JobState::Running)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Cancelled => "cancelled",
            JobState::Other(other) => other,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = String::deserialize(deserializer)?;
        Ok(JobState::from_wire(&state))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub outputs: u64,
    #[serde(default)]
    pub retries: u64,
    #[serde(default)]
    pub tasks: u64,
    #[serde(default)]
    pub tasks_done: u64,
}

/// Status document of a job as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub state: String,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub input_done: bool,
    #[serde(default)]
    pub stats: Option<JobStats>,
    #[serde(default)]
    pub time_created: Option<String>,
    #[serde(default)]
    pub time_done: Option<String>,
}

impl JobStatus {
    /// A set `cancelled` flag wins over the reported state.
    pub fn job_state(&self) -> JobState {
        if self.cancelled {
            JobState::Cancelled
        } else {
            JobState::from_wire(&self.state)
        }
    }
}

/// Result of a job creation
#[derive(Debug, Clone)]
pub struct CreatedJob {
    pub job_id: String,
    /// `/<account>/jobs/<job_id>`
    pub location: String,
    pub headers: HeaderMap,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultCategory {
    Inputs,
    Outputs,
    Failures,
    Errors,
}

impl ResultCategory {
    /// Segment under `/<account>/jobs/<id>/live/`
    pub fn live_segment(&self) -> &'static str {
        match self {
            ResultCategory::Inputs => "in",
            ResultCategory::Outputs => "out",
            ResultCategory::Failures => "fail",
            ResultCategory::Errors => "err",
        }
    }

    /// Object stored under `/<account>/jobs/<id>/` once the job is archived
    pub fn archived_object_name(&self) -> &'static str {
        match self {
            ResultCategory::Inputs => "in.txt",
            ResultCategory::Outputs => "out.txt",
            ResultCategory::Failures => "fail.txt",
            ResultCategory::Errors => "err.txt",
        }
    }
}

/// Where a result set is read from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultSource {
    /// Best-effort view, available while the job runs
    Live,
    /// Final view, only meaningful once the job is terminal
    Archived,
}

/// Task error reported by the service. Fields other than the well-known ones are kept in
/// `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p0input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Object,
    Directory,
}

/// One line of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub mtime: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub etag: Option<String>,
}

/// Response of a job listing. `data` is empty for an account without jobs.
#[derive(Debug, Clone)]
pub struct JobListing {
    pub headers: HeaderMap,
    pub data: Vec<DirectoryEntry>,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn job_spec_serializes_phases_in_order() {
        let spec = JobSpec::new("grep-job", vec![Phase::map("grep bb"), Phase::reduce("sort | uniq")]);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "name": "grep-job",
                "phases": [
                    { "type": "map", "exec": "grep bb" },
                    { "type": "reduce", "exec": "sort | uniq" }
                ]
            })
        );
    }

    #[test]
    fn optional_phase_fields_are_serialized_when_set() {
        let phase = Phase::reduce("wc -l").with_count(2).with_memory(1024).with_assets(vec!["/a/stor/x.sh".into()]);
        assert_eq!(
            serde_json::to_value(&phase).unwrap(),
            json!({ "type": "reduce", "exec": "wc -l", "count": 2, "memory": 1024, "assets": ["/a/stor/x.sh"] })
        );
    }

    #[rstest]
    #[case(JobSpec::new("empty", vec![]))]
    #[case(JobSpec::new("blank exec", vec![Phase::map("   ")]))]
    #[case(JobSpec::new("map count", vec![Phase::map("cat").with_count(2)]))]
    #[case(JobSpec::new("zero reducers", vec![Phase::map("cat"), Phase::reduce("cat").with_count(0)]))]
    #[case(JobSpec::new("zero memory", vec![Phase::map("cat").with_memory(0)]))]
    #[case(JobSpec::new("blank asset", vec![Phase::map("cat").with_assets(vec![String::new()])]))]
    fn invalid_specs_are_rejected(#[case] spec: JobSpec) {
        assert_matches!(spec.validate(), Err(JobClientError::Validation(_)));
    }

    #[test]
    fn valid_spec_passes() {
        let spec = JobSpec::new("ok", vec![Phase::map("grep bb"), Phase::reduce("sort | uniq").with_count(1)]);
        assert!(spec.validate().is_ok());
    }

    #[rstest]
    #[case("map:grep bb", Phase::map("grep bb"))]
    #[case("reduce: sort | uniq", Phase::reduce("sort | uniq"))]
    #[case("MAP:cat", Phase::map("cat"))]
    fn phase_parses_from_cli_form(#[case] input: &str, #[case] expected: Phase) {
        assert_eq!(input.parse::<Phase>().unwrap(), expected);
    }

    #[rstest]
    #[case("grep bb")]
    #[case("filter:grep bb")]
    #[case("map:")]
    fn malformed_phase_strings_are_rejected(#[case] input: &str) {
        assert_matches!(input.parse::<Phase>(), Err(JobClientError::Validation(_)));
    }

    #[rstest]
    #[case("queued", false)]
    #[case("running", false)]
    #[case("done", true)]
    #[case("cancelled", true)]
    #[case("archived", true)]
    fn terminal_states(#[case] state: &str, #[case] terminal: bool) {
        let parsed = JobState::from_wire(state);
        assert_eq!(parsed.is_terminal(), terminal);
        assert_eq!(parsed.to_string(), state);
    }

    #[test]
    fn cancelled_flag_overrides_reported_state() {
        let status: JobStatus =
            serde_json::from_value(json!({ "id": "j1", "state": "done", "cancelled": true, "inputDone": true }))
                .unwrap();
        assert_eq!(status.job_state(), JobState::Cancelled);
        assert!(status.input_done);
    }

    #[test]
    fn error_record_keeps_unknown_fields() {
        let record: ErrorRecord = serde_json::from_value(json!({
            "phaseNum": "0",
            "what": "phase 0: map input \"/a/stor/in\"",
            "code": "UserTaskError",
            "message": "user command exited with code 1",
            "input": "/a/stor/in"
        }))
        .unwrap();

        assert_eq!(record.code, "UserTaskError");
        assert_eq!(record.input.as_deref(), Some("/a/stor/in"));
        assert_eq!(record.extra.get("phaseNum"), Some(&json!("0")));
    }

    #[test]
    fn result_category_paths() {
        assert_eq!(ResultCategory::Failures.live_segment(), "fail");
        assert_eq!(ResultCategory::Errors.archived_object_name(), "err.txt");
        assert_eq!("outputs".parse::<ResultCategory>().unwrap(), ResultCategory::Outputs);
        assert_eq!(ResultSource::Archived.to_string(), "archived");
    }
}
