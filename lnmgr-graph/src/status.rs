//! Status projector (spec.md §4.5). Maps `(explain, admin_up)` to the
//! user-visible `{status, code}` pair with a frozen, top-down priority —
//! this table is the only place that priority is allowed to live.

use serde::Serialize;

use crate::node::Explain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Disabled,
    AdminDown,
    Waiting,
    Up,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Code {
    None,
    Admin,
    Disabled,
    Blocked,
    Signal,
    Failed,
}

/// Projects `explain` plus the node's own `admin_up` signal (Open Question
/// (b): derived from the signal, never clamped to a placeholder) into the
/// user-visible pair.
pub fn project(explain: &Explain, admin_up: bool) -> (Status, Code) {
    if matches!(explain, Explain::Disabled) {
        return (Status::Disabled, Code::Disabled);
    }
    if !admin_up {
        return (Status::AdminDown, Code::Admin);
    }
    if matches!(explain, Explain::Failed) {
        return (Status::Failed, Code::Failed);
    }
    match explain {
        Explain::Blocked(_) => (Status::Waiting, Code::Blocked),
        Explain::Signal(_) => (Status::Waiting, Code::Signal),
        Explain::None => (Status::Up, Code::None),
        Explain::Disabled | Explain::Failed => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_wins_over_everything() {
        assert_eq!(project(&Explain::Disabled, false), (Status::Disabled, Code::Disabled));
        assert_eq!(project(&Explain::Disabled, true), (Status::Disabled, Code::Disabled));
    }

    #[test]
    fn admin_down_wins_over_failed_and_signal() {
        assert_eq!(project(&Explain::Failed, false), (Status::AdminDown, Code::Admin));
        assert_eq!(
            project(&Explain::Signal("carrier".to_string()), false),
            (Status::AdminDown, Code::Admin)
        );
    }

    #[test]
    fn failed_wins_over_blocked() {
        assert_eq!(project(&Explain::Failed, true), (Status::Failed, Code::Failed));
    }

    #[test]
    fn none_is_up() {
        assert_eq!(project(&Explain::None, true), (Status::Up, Code::None));
    }

    #[test]
    fn blocked_and_signal_map_to_waiting() {
        assert_eq!(
            project(&Explain::Blocked("eth0".to_string()), true),
            (Status::Waiting, Code::Blocked)
        );
        assert_eq!(
            project(&Explain::Signal("carrier".to_string()), true),
            (Status::Waiting, Code::Signal)
        );
    }
}
