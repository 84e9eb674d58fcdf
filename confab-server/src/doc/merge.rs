use crate::error::DocSyncError;
use confab_core::{Change, Document, Node, Step, StepType};
use tracing::warn;

/// Result of checking a change against the current document.
#[derive(Debug, Clone, PartialEq)]
pub enum Merge {
    /// The change was built on an old version and is ignored.
    Stale,
    Applied(Document),
}

/// Concatenate the text of every text node, depth first.
pub fn flatten(node: &Node) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Node, out: &mut String) {
    if node.is_text() {
        if let Some(text) = &node.text {
            out.push_str(text);
        }
    }
    for child in &node.content {
        collect_text(child, out);
    }
}

/// Rebuild a document tree from plain text: one paragraph, one text node.
///
/// Block structure and marks of the previous tree are not kept.
pub fn reparse(text: String) -> Node {
    if text.is_empty() {
        return Node::element("doc", vec![Node::element("paragraph", Vec::new())]);
    }
    Node::element(
        "doc",
        vec![Node::element("paragraph", vec![Node::text(text)])],
    )
}

/// Apply `change` on top of `current` without touching it.
///
/// A change whose version does not exceed the current one is stale. Steps
/// apply in order against the flattened text and any invalid step fails the
/// whole change.
pub fn merge(current: &Document, change: &Change) -> Result<Merge, DocSyncError> {
    if change.version <= current.version {
        return Ok(Merge::Stale);
    }

    let mut text = flatten(&current.content);
    for (index, step) in change.steps.iter().enumerate() {
        match step.kind() {
            StepType::Replace => text = replace(&text, index, step)?,
            StepType::Unsupported => warn!(
                "Skipping unsupported step '{}' from client {}",
                step.step_type, change.client_id
            ),
        }
    }

    Ok(Merge::Applied(Document {
        team_id: current.team_id.clone(),
        version: change.version,
        content: reparse(text),
    }))
}

fn replace(text: &str, index: usize, step: &Step) -> Result<String, DocSyncError> {
    let out_of_range = || DocSyncError::OutOfRange {
        index,
        from: step.from,
        to: step.to,
        len: text.len(),
    };
    let from = usize::try_from(step.from).map_err(|_| out_of_range())?;
    let to = usize::try_from(step.to).map_err(|_| out_of_range())?;
    if from > to {
        return Err(out_of_range());
    }
    // `get` also rejects offsets inside a multi-byte character.
    let (Some(head), Some(tail)) = (text.get(..from), text.get(to..)) else {
        return Err(out_of_range());
    };

    let insert = step.slice.as_ref().map(flatten).unwrap_or_default();
    let mut out = String::with_capacity(head.len() + insert.len() + tail.len());
    out.push_str(head);
    out.push_str(&insert);
    out.push_str(tail);
    Ok(out)
}
