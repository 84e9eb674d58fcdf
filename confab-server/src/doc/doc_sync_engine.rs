use crate::doc::{DocumentStore, Merge, merge};
use crate::error::DocSyncError;
use confab_core::{Change, Document, Node, TeamId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const ACTOR_QUEUE: usize = 100;

/// What the author of a change should be told.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub version: u64,
    pub doc: Node,
    /// `false` for a stale change; only its author hears about it.
    pub applied: bool,
}

enum DocCommand {
    Apply {
        change: Change,
        reply: oneshot::Sender<Result<ApplyOutcome, DocSyncError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<Document, DocSyncError>>,
    },
}

/// Routes note changes to one actor per team, so changes for a team are
/// applied strictly one after another.
#[derive(Clone)]
pub struct DocSyncEngine {
    actors: Arc<DashMap<TeamId, mpsc::Sender<DocCommand>>>,
    store: Arc<dyn DocumentStore>,
}

impl DocSyncEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            actors: Arc::new(DashMap::new()),
            store,
        }
    }

    fn actor(&self, team: &TeamId) -> mpsc::Sender<DocCommand> {
        if let Some(sender) = self.actors.get(team) {
            return sender.clone();
        }
        self.actors
            .entry(team.clone())
            .or_insert_with(|| {
                info!("Starting document actor for team {}", team);
                let (tx, rx) = mpsc::channel(ACTOR_QUEUE);
                let actor = DocumentActor::new(team.clone(), Arc::clone(&self.store), rx);
                tokio::spawn(actor.run());
                tx
            })
            .clone()
    }

    async fn request<R>(
        &self,
        team: &TeamId,
        command: impl FnOnce(oneshot::Sender<Result<R, DocSyncError>>) -> DocCommand,
    ) -> Result<R, DocSyncError> {
        let (reply, response) = oneshot::channel();
        if self.actor(team).send(command(reply)).await.is_err() {
            self.actors.remove(team);
            return Err(DocSyncError::ActorGone(team.clone()));
        }
        response
            .await
            .map_err(|_| DocSyncError::ActorGone(team.clone()))?
    }

    /// Apply one client change to the team's document.
    pub async fn apply_change(
        &self,
        team: &TeamId,
        change: Change,
    ) -> Result<ApplyOutcome, DocSyncError> {
        self.request(team, |reply| DocCommand::Apply { change, reply })
            .await
    }

    /// Current document, loading or creating it on first use.
    pub async fn snapshot(&self, team: &TeamId) -> Result<Document, DocSyncError> {
        self.request(team, |reply| DocCommand::Snapshot { reply })
            .await
    }

    /// Stop the team's actor if `idle` still holds once the actor table is locked.
    ///
    /// Its document is already in the store, so the next request for the team
    /// starts a fresh actor that loads it from there. The old actor finishes
    /// whatever is still queued and exits when its last sender is gone.
    pub fn release_if(&self, team: &TeamId, idle: impl FnOnce() -> bool) -> bool {
        let released = self.actors.remove_if(team, |_, _| idle()).is_some();
        if released {
            info!("Released document actor for team {}", team);
        }
        released
    }

    pub fn active_teams(&self) -> usize {
        self.actors.len()
    }
}

struct DocumentActor {
    team: TeamId,
    store: Arc<dyn DocumentStore>,
    current: Option<Document>,
    commands: mpsc::Receiver<DocCommand>,
}

impl DocumentActor {
    fn new(team: TeamId, store: Arc<dyn DocumentStore>, commands: mpsc::Receiver<DocCommand>) -> Self {
        Self {
            team,
            store,
            current: None,
            commands,
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                DocCommand::Apply { change, reply } => {
                    let _ = reply.send(self.apply(change).await);
                }
                DocCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot().await);
                }
            }
        }
        debug!("Document actor for team {} stopped", self.team);
    }

    async fn load(&mut self) -> Result<(), DocSyncError> {
        if self.current.is_some() {
            return Ok(());
        }
        let doc = match self.store.find_by_team(&self.team).await? {
            Some(doc) => {
                info!("Loaded note for team {} at version {}", self.team, doc.version);
                doc
            }
            None => {
                info!("No note stored for team {}; starting empty", self.team);
                Document::empty(self.team.clone())
            }
        };
        self.current = Some(doc);
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<Document, DocSyncError> {
        self.load().await?;
        self.current
            .clone()
            .ok_or_else(|| DocSyncError::ActorGone(self.team.clone()))
    }

    async fn apply(&mut self, change: Change) -> Result<ApplyOutcome, DocSyncError> {
        self.load().await?;
        let Some(current) = self.current.as_ref() else {
            return Err(DocSyncError::ActorGone(self.team.clone()));
        };

        match merge(current, &change)? {
            Merge::Stale => {
                debug!(
                    "Stale change v{} from {} on team {} (at v{})",
                    change.version, change.client_id, self.team, current.version
                );
                Ok(ApplyOutcome {
                    version: current.version,
                    doc: current.content.clone(),
                    applied: false,
                })
            }
            Merge::Applied(next) => {
                // Persist first; memory only moves once the store has it.
                if let Err(e) = self.store.save(&next).await {
                    warn!("Saving note for team {} failed: {}", self.team, e);
                    return Err(e.into());
                }
                let outcome = ApplyOutcome {
                    version: next.version,
                    doc: next.content.clone(),
                    applied: true,
                };
                debug!(
                    "Team {} note now at v{} after change from {}",
                    self.team, next.version, change.client_id
                );
                self.current = Some(next);
                Ok(outcome)
            }
        }
    }
}
