// Reaction toggle protocol
use crate::error::ClientResult;
use crate::gateway::DynFeedApi;
use crate::model::{Reaction, ReactionId, ReactionKind, ReactionTarget, UserId};
use crate::store::{Action, Store};

/// What pressing a reaction button should do, given the user's current reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOp {
    Create,
    Delete(ReactionId),
    Update(Reaction),
}

/// Pure decision step: none → create, same kind → delete, other kind → update.
pub fn decide(existing: Option<&Reaction>, kind: ReactionKind) -> ToggleOp {
    match existing {
        None => ToggleOp::Create,
        Some(reaction) if reaction.reaction_type == kind => ToggleOp::Delete(reaction.id),
        Some(reaction) => ToggleOp::Update(reaction.clone()),
    }
}

/// What a toggle ended up changing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionChange {
    Added(Reaction),
    Removed(ReactionTarget),
    Changed(Reaction),
}

pub struct ReactionToggler {
    api: DynFeedApi,
    store: Store,
}

impl ReactionToggler {
    pub fn new(api: DynFeedApi, store: Store) -> Self {
        Self { api, store }
    }

    /// Apply `user` pressing `kind` on `target`, then refresh the target's counts.
    pub async fn toggle(
        &self,
        user: UserId,
        target: ReactionTarget,
        kind: ReactionKind,
    ) -> ClientResult<ReactionChange> {
        let existing = self.store.read(|s| s.reaction_of(user, target).cloned());

        let change = match decide(existing.as_ref(), kind) {
            ToggleOp::Create => match self.api.create_reaction(user, target, kind).await? {
                Some(reaction) => {
                    self.store.dispatch(Action::AddReaction(reaction.clone()));
                    ReactionChange::Added(reaction)
                }
                // The backend already held this reaction and toggled it off.
                None => {
                    let local = self.store.read(|s| s.reaction_of(user, target).map(|r| r.id));
                    if let Some(id) = local {
                        self.store.dispatch(Action::DeleteReaction(id));
                    }
                    ReactionChange::Removed(target)
                }
            },
            ToggleOp::Delete(id) => {
                self.api.delete_reaction(id).await?;
                self.store.dispatch(Action::DeleteReaction(id));
                ReactionChange::Removed(target)
            }
            ToggleOp::Update(current) => {
                let reaction = self.api.update_reaction(user, &current, kind).await?;
                self.store.dispatch(Action::UpdateReaction {
                    id: current.id,
                    reaction: reaction.clone(),
                });
                ReactionChange::Changed(reaction)
            }
        };
        tracing::debug!(%target, ?change, "reaction toggled");

        // The list change already landed; stale counts heal on the next load.
        match self.api.reaction_summary(target).await {
            Ok(summary) => self.store.dispatch(Action::UpdateReactions {
                target,
                summary: Some(summary),
            }),
            Err(e) => tracing::warn!(%target, error = %e, "Failed to refresh reaction summary"),
        }

        Ok(change)
    }
}
