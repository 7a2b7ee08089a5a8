//! Ordered execution of one mediation phase

use crate::descriptor::{NamedOperation, Phase};
use crate::session::Session;
use concord_core::{ConcordResult, EntityRef, Persistence};
use tracing::{trace, warn};

/// Stateless runner for a phase's operation list
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseRunner;

impl PhaseRunner {
    /// Run `operations` against `root` in declared order
    ///
    /// Stops at the first failure. The failing operation's error is returned
    /// unchanged; operations after it do not run.
    pub fn run<P: Persistence>(
        session: &mut Session<'_, P>,
        root: &EntityRef,
        phase: Phase,
        operations: &[NamedOperation<P>],
    ) -> ConcordResult<()> {
        for operation in operations {
            trace!(target: "concord::mediation", %root, %phase, operation = operation.name(), "Running operation");
            if let Err(e) = operation.call(session, root) {
                warn!(
                    target: "concord::mediation",
                    %root,
                    %phase,
                    operation = operation.name(),
                    error = %e,
                    "Phase operation failed"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}
