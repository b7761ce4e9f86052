//! Action resolver: the legal next actions for a viewer, derived from
//! the same transition table the state machine enforces.

use serde::Serialize;

use super::domain::{ActorRole, RequestStatus, SideFlags};
use super::lifecycle::{Action, TransitionTarget, TRANSITION_TABLE};

/// One offerable action for a single-action-button surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOption {
    pub action: Action,
    pub label: &'static str,
    pub requires_input: bool,
}

/// Menu for one viewer on one request. `view_details` is the
/// non-transitional affordance that remains available in every state,
/// terminal states included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionMenu {
    pub actions: Vec<ActionOption>,
    pub view_details: bool,
}

/// Resolve the actions the state machine would accept right now.
///
/// Because this reads the transition table directly, a surface built on
/// it can never offer a button whose action would later be rejected.
/// Flag actions disappear once their flag is set; terminal states
/// yield an empty list.
pub fn legal_actions(status: RequestStatus, flags: SideFlags, viewer: ActorRole) -> ActionMenu {
    let actions = TRANSITION_TABLE
        .iter()
        .filter(|rule| rule.sources.contains(&status))
        .filter(|rule| rule.actors.contains(&viewer))
        .filter(|rule| match rule.target {
            TransitionTarget::Flag(flag) => !flags.is_set(flag),
            TransitionTarget::Status(_) => true,
        })
        .map(|rule| ActionOption {
            action: rule.action,
            label: rule.label,
            requires_input: rule.requires_input,
        })
        .collect();

    ActionMenu {
        actions,
        view_details: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rental::lifecycle::Action;

    fn ids(menu: &ActionMenu) -> Vec<&'static str> {
        menu.actions.iter().map(|option| option.action.id()).collect()
    }

    #[test]
    fn owner_sees_approve_and_reject_while_pending() {
        let menu = legal_actions(RequestStatus::Pending, SideFlags::default(), ActorRole::Owner);
        assert_eq!(ids(&menu), vec!["approve", "reject"]);
        assert!(menu.view_details);
    }

    #[test]
    fn renter_sees_cancel_while_pending_and_pay_after_approval() {
        let pending = legal_actions(
            RequestStatus::Pending,
            SideFlags::default(),
            ActorRole::Renter,
        );
        assert_eq!(ids(&pending), vec!["cancel"]);

        let approved = legal_actions(
            RequestStatus::Approved,
            SideFlags::default(),
            ActorRole::Renter,
        );
        assert_eq!(ids(&approved), vec!["cancel", "pay"]);
        let pay = approved
            .actions
            .iter()
            .find(|option| option.action == Action::Pay)
            .expect("pay offered");
        assert!(pay.requires_input);
    }

    #[test]
    fn cancel_disappears_once_paid() {
        let menu = legal_actions(RequestStatus::Paid, SideFlags::default(), ActorRole::Renter);
        assert!(ids(&menu).is_empty());

        let owner = legal_actions(RequestStatus::Paid, SideFlags::default(), ActorRole::Owner);
        assert_eq!(ids(&owner), vec!["ship"]);
    }

    #[test]
    fn scheduler_can_only_flag_and_start_returns() {
        let shipped = legal_actions(
            RequestStatus::Shipped,
            SideFlags::default(),
            ActorRole::Scheduler,
        );
        assert_eq!(ids(&shipped), vec!["flag_late", "flag_dispute"]);

        let received = legal_actions(
            RequestStatus::Received,
            SideFlags::default(),
            ActorRole::Scheduler,
        );
        assert_eq!(ids(&received), vec!["initiate_return", "flag_late", "flag_dispute"]);
    }

    #[test]
    fn set_flags_are_no_longer_offered() {
        let flags = SideFlags {
            late_return: true,
            disputed: false,
        };
        let menu = legal_actions(RequestStatus::Shipped, flags, ActorRole::Owner);
        assert_eq!(ids(&menu), vec!["flag_dispute"]);
    }

    #[test]
    fn terminal_states_offer_only_view_details() {
        for status in [
            RequestStatus::ReturnedToOwner,
            RequestStatus::Cancelled,
            RequestStatus::Rejected,
        ] {
            for viewer in [ActorRole::Renter, ActorRole::Owner] {
                let menu = legal_actions(status, SideFlags::default(), viewer);
                assert!(menu.actions.is_empty(), "{status:?} must be terminal");
                assert!(menu.view_details);
            }
        }
    }
}
