use std::collections::HashSet;

use proptest::prelude::*;

use campus_feed::model::{
    CommentId, PostId, Reaction, ReactionId, ReactionKind, ReactionTarget, UserId,
};
use campus_feed::reactions::{decide, ToggleOp};
use campus_feed::store::{merge_unique, reduce, Action, FeedState};

fn kind() -> impl Strategy<Value = ReactionKind> {
    prop_oneof![
        Just(ReactionKind::Like),
        Just(ReactionKind::Haha),
        Just(ReactionKind::Love),
    ]
}

fn target() -> impl Strategy<Value = ReactionTarget> {
    prop_oneof![
        (1i64..4).prop_map(|id| ReactionTarget::Post(PostId(id))),
        (1i64..4).prop_map(|id| ReactionTarget::Comment(CommentId(id))),
    ]
}

fn reaction() -> impl Strategy<Value = Reaction> {
    (1i64..8, target(), 1i64..4, kind()).prop_map(|(id, target, user, kind)| Reaction {
        id: ReactionId(id),
        target,
        user: UserId(user),
        reaction_type: kind,
    })
}

fn reaction_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        reaction().prop_map(Action::AddReaction),
        (1i64..8, reaction()).prop_map(|(id, reaction)| Action::UpdateReaction {
            id: ReactionId(id),
            reaction,
        }),
        (1i64..8).prop_map(|id| Action::DeleteReaction(ReactionId(id))),
        prop::collection::vec(reaction(), 0..6).prop_map(Action::SetReactions),
    ]
}

proptest! {
    #[test]
    fn one_reaction_per_author_and_target(actions in prop::collection::vec(reaction_action(), 0..40)) {
        let state = actions.into_iter().fold(FeedState::default(), reduce);

        let slots: HashSet<_> = state.reactions.iter().map(|r| (r.user, r.target)).collect();
        prop_assert_eq!(slots.len(), state.reactions.len());
    }

    #[test]
    fn pressing_the_same_kind_twice(
        existing in prop::collection::vec(reaction(), 0..6),
        who in 1i64..4,
        on in target(),
        pressed in kind(),
    ) {
        let start = reduce(FeedState::default(), Action::SetReactions(existing));
        let user = UserId(who);
        let fresh = ReactionId(100);

        let press = |state: FeedState| -> FeedState {
            let op = decide(state.reaction_of(user, on), pressed);
            match op {
                ToggleOp::Create => reduce(state, Action::AddReaction(Reaction {
                    id: fresh,
                    target: on,
                    user,
                    reaction_type: pressed,
                })),
                ToggleOp::Delete(id) => reduce(state, Action::DeleteReaction(id)),
                ToggleOp::Update(current) => {
                    let id = current.id;
                    reduce(state, Action::UpdateReaction {
                        id,
                        reaction: Reaction { reaction_type: pressed, ..current },
                    })
                }
            }
        };

        let had = start.reaction_of(user, on).map(|r| r.reaction_type);
        let once = press(start.clone());
        prop_assert_eq!(once.reaction_of(user, on).map(|r| r.reaction_type) == Some(pressed), had != Some(pressed));

        // Only a reaction of the pressed kind comes back; anything else ends up removed.
        let twice = press(once);
        let expected = if had == Some(pressed) { Some(pressed) } else { None };
        prop_assert_eq!(twice.reaction_of(user, on).map(|r| r.reaction_type), expected);
    }

    #[test]
    fn toggle_comments_is_self_inverse(posts in prop::collection::vec(1i64..6, 0..10), extra in 1i64..6) {
        let state = posts
            .into_iter()
            .map(|id| Action::ToggleComments(PostId(id)))
            .fold(FeedState::default(), reduce);

        let back = reduce(
            reduce(state.clone(), Action::ToggleComments(PostId(extra))),
            Action::ToggleComments(PostId(extra)),
        );
        prop_assert_eq!(back.expanded_comments, state.expanded_comments);
    }

    #[test]
    fn merging_a_page_twice_changes_nothing(existing in prop::collection::vec(0u8..20, 0..15), page in prop::collection::vec(0u8..20, 0..15)) {
        let once = merge_unique(existing, page.clone(), |x| *x);
        let twice = merge_unique(once.clone(), page, |x| *x);
        prop_assert_eq!(once, twice);
    }
}
