use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// What the display surface shows. Nothing else crosses the core boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "text", rename_all = "snake_case")]
pub enum DisplayState {
    #[default]
    Loading,
    Normal(String),
    NetworkError(String),
    NoSchedule(String),
}

impl DisplayState {
    pub fn text(&self) -> &str {
        match self {
            DisplayState::Loading => "Loading...",
            DisplayState::Normal(t)
            | DisplayState::NetworkError(t)
            | DisplayState::NoSchedule(t) => t.as_str(),
        }
    }

    /// Short label for log lines and the stdout surface.
    pub fn mode_label(&self) -> &'static str {
        match self {
            DisplayState::Loading => "loading",
            DisplayState::Normal(_) => "normal",
            DisplayState::NetworkError(_) => "error",
            DisplayState::NoSchedule(_) => "empty",
        }
    }
}

/// Latest published state.  `rev` increases on every publication so pollers
/// can tell a repeated message from a stale one.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplaySnapshot {
    pub rev: u64,
    pub state: DisplayState,
}

#[derive(Default)]
pub struct DisplayStore {
    snapshot: Arc<RwLock<DisplaySnapshot>>,
}

impl DisplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> DisplaySnapshot {
        self.snapshot.read().await.clone()
    }

    /// Store `state` and return its revision.
    pub async fn set(&self, state: DisplayState) -> u64 {
        let mut snapshot = self.snapshot.write().await;
        snapshot.rev += 1;
        snapshot.state = state;
        snapshot.rev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_shape() {
        let json =
            serde_json::to_value(DisplayState::NoSchedule("No upcoming schedule".into())).unwrap();
        assert_eq!(json["mode"], "no_schedule");
        assert_eq!(json["text"], "No upcoming schedule");
        let json = serde_json::to_value(DisplayState::Loading).unwrap();
        assert_eq!(json, serde_json::json!({ "mode": "loading" }));
        let back: DisplayState =
            serde_json::from_str(r#"{"mode":"network_error","text":"x"}"#).unwrap();
        assert_eq!(back, DisplayState::NetworkError("x".into()));
    }

    #[tokio::test]
    async fn test_store_revisions() {
        let store = DisplayStore::new();
        let initial = store.get().await;
        assert_eq!(initial.rev, 0);
        assert_eq!(initial.state, DisplayState::Loading);

        assert_eq!(store.set(DisplayState::Normal("a".into())).await, 1);
        assert_eq!(store.set(DisplayState::Normal("a".into())).await, 2);
        let snap = store.get().await;
        assert_eq!(snap.rev, 2);
        assert_eq!(snap.state.text(), "a");
    }
}
