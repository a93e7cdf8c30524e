//! Structured kernel errors. The kernel never panics on caller input;
//! rejected operations return one of these variants instead.

use crate::model::ActionId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("action '{0}' is not present in the catalogue")]
    InvalidReference(ActionId),

    #[error("cannot perform '{action}': {predicate}")]
    PreconditionViolation {
        action: ActionId,
        predicate: ViolatedPredicate,
    },

    #[error("SAT solver returned Unknown for this query")]
    SolverUnknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ViolatedPredicate {
    #[error("action is not in the catalogue")]
    NotInCatalogue,
    #[error("action is already completed")]
    AlreadyCompleted,
    #[error("action's preconditions are not satisfied")]
    PreconditionsNotMet,
    #[error("action has not been completed")]
    NotCompleted,
    #[error("another completed action structurally depends on it")]
    CannotUndo,
}

pub type KernelResult<T> = Result<T, KernelError>;
