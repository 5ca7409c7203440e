//! Evaluator dispatch.
//!
//! Each operation kind has exactly one evaluator. The registry is a flat
//! table indexed by [`OperationKind`], so dispatch is a single lookup.
use tessera_core::operations::{Operation, OperationKind, OperationPayload};

use crate::database::Database;
use crate::error::ChainError;
use crate::evaluators;

/// Type-erased evaluator stored in the registry.
pub trait Evaluator: Send + Sync {
    fn kind(&self) -> OperationKind;

    fn apply(&self, db: &mut Database, op: &Operation) -> Result<(), ChainError>;
}

/// Stateful half of an operation's contract.
///
/// `validate()` has already passed when `evaluate_and_apply` runs.
/// Implementations check semantic preconditions against current state and
/// then mutate it; an error rolls back every mutation they made.
pub trait OperationEvaluator: Send + Sync + 'static {
    type Op: OperationPayload;

    fn evaluate_and_apply(&self, db: &mut Database, op: &Self::Op) -> Result<(), ChainError>;
}

struct Adapter<E>(E);

impl<E: OperationEvaluator> Evaluator for Adapter<E> {
    fn kind(&self) -> OperationKind {
        E::Op::KIND
    }

    fn apply(&self, db: &mut Database, op: &Operation) -> Result<(), ChainError> {
        let payload = E::Op::from_operation(op).ok_or_else(|| {
            ChainError::Internal(format!("{} evaluator received {}", E::Op::KIND.name(), op.kind().name()))
        })?;
        self.0.evaluate_and_apply(db, payload)
    }
}

pub struct EvaluatorRegistry {
    evaluators: Vec<Option<Box<dyn Evaluator>>>,
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.evaluators.iter().flatten().map(|e| e.kind())).finish()
    }
}

impl EvaluatorRegistry {
    /// An empty registry. Every dispatch fails until evaluators are registered.
    pub fn new() -> Self {
        Self { evaluators: (0..OperationKind::COUNT).map(|_| None).collect() }
    }

    /// A registry with the evaluator of every operation kind.
    pub fn with_default_evaluators() -> Self {
        let mut registry = Self::new();
        evaluators::register_all(&mut registry);
        registry
    }

    /// Install `evaluator` for its operation kind, replacing any previous one.
    pub fn register<E: OperationEvaluator>(&mut self, evaluator: E) {
        if let Some(slot) = self.evaluators.get_mut(E::Op::KIND.index()) {
            *slot = Some(Box::new(Adapter(evaluator)));
        }
    }

    pub fn get(&self, kind: OperationKind) -> Option<&dyn Evaluator> {
        self.evaluators.get(kind.index()).and_then(|slot| slot.as_deref())
    }

    /// Dispatch `op` to its evaluator.
    pub fn apply(&self, db: &mut Database, op: &Operation) -> Result<(), ChainError> {
        let evaluator = self
            .get(op.kind())
            .ok_or_else(|| ChainError::Internal(format!("no evaluator registered for {}", op.kind().name())))?;
        evaluator.apply(db, op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::config::ChainConfig;
    use tessera_core::error::EvaluationError;
    use tessera_core::operations::{DeclineVotingRightsOperation, TransferOperation};
    use tessera_core::types::{AccountName, Asset};

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    struct Reject;

    impl OperationEvaluator for Reject {
        type Op = TransferOperation;

        fn evaluate_and_apply(&self, _db: &mut Database, _op: &TransferOperation) -> Result<(), ChainError> {
            Err(EvaluationError::Precondition("rejected").into())
        }
    }

    fn transfer() -> Operation {
        TransferOperation { from: name("alice"), to: name("bob"), amount: Asset::coin(1), memo: String::new() }.into()
    }

    #[test]
    fn default_registry_covers_every_kind() {
        let registry = EvaluatorRegistry::with_default_evaluators();
        for kind in OperationKind::ALL {
            assert_eq!(registry.get(*kind).map(|e| e.kind()), Some(*kind));
        }
    }

    #[test]
    fn dispatch_without_evaluator_is_internal() {
        let mut db = Database::new(ChainConfig::default()).unwrap();
        let err = EvaluatorRegistry::new().apply(&mut db, &transfer()).unwrap_err();
        assert!(matches!(err, ChainError::Internal(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn registered_evaluator_replaces_default() {
        let mut db = Database::new(ChainConfig::default()).unwrap();
        let mut registry = EvaluatorRegistry::with_default_evaluators();
        registry.register(Reject);
        let err = registry.apply(&mut db, &transfer()).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::Precondition("rejected")));

        let other: Operation = DeclineVotingRightsOperation { account: name("alice"), declined: true }.into();
        let err = registry.apply(&mut db, &other).unwrap_err();
        assert_eq!(err, ChainError::Evaluation(EvaluationError::UnknownAccount("alice".into())));
    }
}
