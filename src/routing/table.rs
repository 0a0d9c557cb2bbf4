//! Static mapping between forward actions and their callback actions.
//!
//! Every protocol action is paired with the callback action the upstream
//! uses to deliver its late reply. The pairing is total and injective over
//! the action set; `search` and `discover` additionally reply on the same
//! exchange and never go through the webhook rendezvous.

/// All known `(forward, callback)` action pairs.
pub const ACTION_PAIRS: &[(&str, &str)] = &[
    ("discover", "on_discover"),
    ("search", "on_search"),
    ("select", "on_select"),
    ("init", "on_init"),
    ("confirm", "on_confirm"),
    ("update", "on_update"),
    ("track", "on_track"),
    ("rating", "on_rating"),
    ("support", "on_support"),
    ("cancel", "on_cancel"),
    ("status", "on_status"),
];

/// Callback action paired with a forward action, if the action is known.
pub fn callback_of(action: &str) -> Option<&'static str> {
    ACTION_PAIRS
        .iter()
        .find(|(forward, _)| *forward == action)
        .map(|(_, callback)| *callback)
}

/// Forward action paired with a callback action, if the callback is known.
pub fn forward_of(callback: &str) -> Option<&'static str> {
    ACTION_PAIRS
        .iter()
        .find(|(_, cb)| *cb == callback)
        .map(|(forward, _)| *forward)
}

/// Whether an action replies on the same HTTP exchange.
pub fn is_sync(action: &str) -> bool {
    matches!(action, "search" | "discover")
}
