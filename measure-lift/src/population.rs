//! Population derivation (§4.F "Population derivation").

use measure_core::{SecValue, SecureBackend};
use measure_types::Result;

/// Derives `(testPop, controlPop)` from `opportunity` and `testFlag`:
/// `testPop = opp ∧ testFlag`, `controlPop = opp ∧ ¬testFlag`.
pub fn derive_population<B: SecureBackend>(
    opportunity: &SecValue<B>,
    test_flag: &SecValue<B>,
    backend: &mut B,
) -> Result<(SecValue<B>, SecValue<B>)> {
    let test_pop = opportunity.and(test_flag, backend)?;
    let not_test_flag = test_flag.not(backend);
    let control_pop = opportunity.and(&not_test_flag, backend)?;
    Ok((test_pop, control_pop))
}
