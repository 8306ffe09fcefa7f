// Library root: the conversation core of the bonus calculator bot.
//
// Leaves first: `ledger` and `command` have no internal dependencies,
// `session` and `directive` build on them, `machine` is the transition
// function and `store` owns the per-user sessions.

pub mod command;
pub mod directive;
pub mod ledger;
pub mod machine;
pub mod session;
pub mod store;

pub use directive::{Choices, Directive, ListingPurpose, Suggestion};
pub use ledger::{Ledger, LedgerError};
pub use machine::{handle, Transition, ValidationError, BONUS_RATE};
pub use session::{EditStep, EditSubState, Mode, PrimaryState, Session, Stage};
pub use store::SessionStore;
