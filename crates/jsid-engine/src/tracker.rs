use jsid_common::change::{ActionType, CapturedAction};
use jsid_common::protocol::RawAction;
use jsid_common::selector::generate_selector;
use tracing::debug;

/// Convert actions reported by the page script into captured actions.
pub fn convert_actions(raw: Vec<RawAction>) -> Vec<CapturedAction> {
    raw.into_iter()
        .map(|action| {
            let (selector, is_fragile) = generate_selector(&action.element);
            let value = match action.action_type {
                ActionType::Fill => Some(action.value.unwrap_or_default()),
                ActionType::Press => action.value,
                ActionType::Click => None,
            };
            CapturedAction {
                action_type: action.action_type,
                selector,
                is_fragile,
                value,
            }
        })
        .collect()
}

/// Append newly drained actions to the pending list.
///
/// The page script already folds "click to focus, then type" into a single
/// fill and keeps only the latest fill per element, but only within one
/// drain. This applies the same folding across drain boundaries: a fill
/// replaces the action immediately before it when that action was a click
/// or a fill on the same selector.
pub fn coalesce(pending: &mut Vec<CapturedAction>, incoming: Vec<CapturedAction>) {
    for action in incoming {
        if action.action_type == ActionType::Fill
            && let Some(last) = pending.last_mut()
            && last.selector == action.selector
            && matches!(last.action_type, ActionType::Click | ActionType::Fill)
        {
            debug!("Folding {} on {} into fill", last.action_type, action.selector);
            *last = action;
            continue;
        }
        pending.push(action);
    }
}
