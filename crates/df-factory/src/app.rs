use chrono::{DateTime, Utc};
use df_supervisor::ProcessHandle;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Running,
    Stopped,
}

/// Registry record for one managed app.
#[derive(Debug)]
pub struct ManagedApp {
    pub handle: Uuid,
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Present only while the process is tracked as running.
    pub(crate) process: Option<ProcessHandle>,
}

impl ManagedApp {
    pub fn status(&self) -> AppStatus {
        match self.process {
            Some(_) => AppStatus::Running,
            None => AppStatus::Stopped,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(ProcessHandle::pid)
    }

    pub fn summary(&self) -> AppSummary {
        AppSummary {
            handle: self.handle,
            name: self.name.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            created_at: self.created_at,
            status: self.status(),
            pid: self.pid(),
        }
    }
}

/// Point-in-time view of a `ManagedApp`, safe to hand out of the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    #[serde(rename = "id")]
    pub handle: Uuid,
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: AppStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    Requested,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    Created { handle: Uuid },
    /// Emitted exactly once per process instance.
    Stopped { handle: Uuid, reason: StopReason },
    Removed { handle: Uuid },
}

impl AppEvent {
    pub fn handle(&self) -> Uuid {
        match self {
            AppEvent::Created { handle }
            | AppEvent::Stopped { handle, .. }
            | AppEvent::Removed { handle } => *handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped_app() -> ManagedApp {
        ManagedApp {
            handle: Uuid::nil(),
            name: "demo".to_string(),
            command: "node".to_string(),
            args: vec!["index.js".to_string()],
            working_dir: PathBuf::from("/tmp/dapps/demo"),
            created_at: Utc::now(),
            process: None,
        }
    }

    #[test]
    fn status_is_derived_from_process_presence() {
        let app = stopped_app();
        assert_eq!(app.status(), AppStatus::Stopped);
        assert_eq!(app.pid(), None);
    }

    #[test]
    fn summary_serializes_like_the_wire_format() {
        let json = serde_json::to_value(stopped_app().summary()).unwrap();
        assert_eq!(json["id"], Uuid::nil().to_string());
        assert_eq!(json["status"], "stopped");
        assert_eq!(json["args"][0], "index.js");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("pid").is_none());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = AppEvent::Stopped {
            handle: Uuid::nil(),
            reason: StopReason::Exited {
                code: Some(0),
                signal: None,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stopped");
        assert_eq!(json["reason"]["kind"], "exited");
        assert_eq!(event.handle(), Uuid::nil());
    }
}
