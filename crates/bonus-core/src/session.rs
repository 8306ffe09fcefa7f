// Per-user conversation state.
//
// The stage is a single tagged union so that edit mode and confirm mode can
// never be active at the same time, and an edit target index only exists in
// the edit steps that use it.

use crate::ledger::Ledger;

/// Step inside edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStep {
    /// Waiting for the user to pick a 1-based entry number.
    SelectingIndex,
    /// Entry chosen; waiting for modify / delete.
    ChoosingAction { index: usize },
    /// Waiting for the replacement value.
    AwaitingNewValue { index: usize },
}

impl EditStep {
    pub fn target_index(&self) -> Option<usize> {
        match self {
            EditStep::SelectingIndex => None,
            EditStep::ChoosingAction { index } | EditStep::AwaitingNewValue { index } => {
                Some(*index)
            }
        }
    }
}

/// What an active (named) session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Accepting numbers and top-level commands.
    #[default]
    Normal,
    Editing(EditStep),
    /// Preview shown, waiting for confirm / cancel.
    Confirming,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    AwaitingName,
    Active { name: String, mode: Mode },
}

// ---------------------------------------------------------------------------
// Flat views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryState {
    AwaitingName,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditSubState {
    None,
    SelectingIndex,
    ChoosingAction,
    AwaitingNewValue,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user's state: where they are in the flow plus their entries.
///
/// A fresh session is in [`Stage::AwaitingName`] with an empty ledger. Both
/// the restart command and a completed confirmation replace the whole value
/// with `Session::default()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub stage: Stage,
    pub ledger: Ledger,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_state(&self) -> PrimaryState {
        match self.stage {
            Stage::AwaitingName => PrimaryState::AwaitingName,
            Stage::Active { .. } => PrimaryState::Active,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.stage {
            Stage::AwaitingName => None,
            Stage::Active { name, .. } => Some(name),
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        match &self.stage {
            Stage::AwaitingName => None,
            Stage::Active { mode, .. } => Some(*mode),
        }
    }

    pub fn edit_sub_state(&self) -> EditSubState {
        match self.mode() {
            Some(Mode::Editing(EditStep::SelectingIndex)) => EditSubState::SelectingIndex,
            Some(Mode::Editing(EditStep::ChoosingAction { .. })) => EditSubState::ChoosingAction,
            Some(Mode::Editing(EditStep::AwaitingNewValue { .. })) => {
                EditSubState::AwaitingNewValue
            }
            _ => EditSubState::None,
        }
    }

    pub fn edit_target_index(&self) -> Option<usize> {
        match self.mode() {
            Some(Mode::Editing(step)) => step.target_index(),
            _ => None,
        }
    }

    pub fn confirm_pending(&self) -> bool {
        self.mode() == Some(Mode::Confirming)
    }

    /// Switch the mode of an active session. No-op while awaiting a name.
    pub(crate) fn set_mode(&mut self, next: Mode) {
        if let Stage::Active { mode, .. } = &mut self.stage {
            *mode = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn active(mode: Mode) -> Session {
        Session {
            stage: Stage::Active {
                name: "Alice".into(),
                mode,
            },
            ledger: Ledger::new(),
        }
    }

    #[test]
    fn default_session_awaits_name() {
        let session = Session::new();
        assert_eq!(session.primary_state(), PrimaryState::AwaitingName);
        assert_eq!(session.name(), None);
        assert_eq!(session.edit_sub_state(), EditSubState::None);
        assert_eq!(session.edit_target_index(), None);
        assert!(!session.confirm_pending());
        assert!(session.ledger.is_empty());
    }

    #[test]
    fn edit_views_follow_step() {
        let s = active(Mode::Editing(EditStep::SelectingIndex));
        assert_eq!(s.edit_sub_state(), EditSubState::SelectingIndex);
        assert_eq!(s.edit_target_index(), None);

        let s = active(Mode::Editing(EditStep::ChoosingAction { index: 2 }));
        assert_eq!(s.edit_sub_state(), EditSubState::ChoosingAction);
        assert_eq!(s.edit_target_index(), Some(2));
        assert!(!s.confirm_pending());

        let s = active(Mode::Editing(EditStep::AwaitingNewValue { index: 0 }));
        assert_eq!(s.edit_sub_state(), EditSubState::AwaitingNewValue);
        assert_eq!(s.edit_target_index(), Some(0));
    }

    #[test]
    fn confirming_has_no_edit_state() {
        let s = active(Mode::Confirming);
        assert!(s.confirm_pending());
        assert_eq!(s.edit_sub_state(), EditSubState::None);
        assert_eq!(s.name(), Some("Alice"));
    }

    #[test]
    fn set_mode_ignored_while_awaiting_name() {
        let mut s = Session::new();
        s.set_mode(Mode::Confirming);
        assert_eq!(s.stage, Stage::AwaitingName);

        let mut s = active(Mode::Normal);
        s.ledger.append(Decimal::ONE).unwrap();
        s.set_mode(Mode::Confirming);
        assert!(s.confirm_pending());
    }
}
