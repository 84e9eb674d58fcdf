use crate::model::ids::TeamId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node of a ProseMirror-style document tree.
///
/// Only `type`, `text` and `content` are interpreted; everything else
/// (`attrs`, `marks`, slice `openStart`/`openEnd`, ...) rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn element(kind: impl Into<String>, content: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            content,
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_owned(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }
}

/// The shared note of one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "teamID")]
    pub team_id: TeamId,
    pub version: u64,
    pub content: Node,
}

impl Document {
    /// Version 0 with an empty `doc` root.
    pub fn empty(team_id: TeamId) -> Self {
        Self {
            team_id,
            version: 0,
            content: Node::element("doc", Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    Replace,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "stepType")]
    pub step_type: String,
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub slice: Option<Node>,
}

impl Step {
    pub fn replace(from: i64, to: i64, slice: Node) -> Self {
        Self {
            step_type: "replace".to_owned(),
            from,
            to,
            slice: Some(slice),
        }
    }

    pub fn kind(&self) -> StepType {
        match self.step_type.as_str() {
            "replace" => StepType::Replace,
            _ => StepType::Unsupported,
        }
    }
}

/// A batch of steps a client built on top of `version - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub version: u64,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NoteMessage {
    Note(Change),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NoteAck {
    AckSteps {
        version: u64,
        #[serde(rename = "clientID")]
        client_id: String,
        doc: Node,
    },
}
