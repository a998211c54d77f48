use crate::error::CaptureError;
use crate::manager::CaptureLifecycleManager;
use crate::scenario::{Scenario, ScenarioOutcome};

/// The two lifecycle events a test runner delivers per scenario.
pub trait ScenarioHooks {
    type Error;

    fn before_scenario(&mut self, scenario: &Scenario) -> Result<(), Self::Error>;

    fn after_scenario(
        &mut self,
        scenario: &Scenario,
        outcome: ScenarioOutcome,
    ) -> Result<(), Self::Error>;
}

impl ScenarioHooks for CaptureLifecycleManager {
    type Error = CaptureError;

    fn before_scenario(&mut self, scenario: &Scenario) -> Result<(), CaptureError> {
        self.on_scenario_start(scenario)
    }

    fn after_scenario(
        &mut self,
        scenario: &Scenario,
        outcome: ScenarioOutcome,
    ) -> Result<(), CaptureError> {
        self.on_scenario_end(scenario, outcome).map(|_| ())
    }
}

/// Runs `body` between the two hooks.
///
/// `after_scenario` runs even when `body` errors, with
/// [`ScenarioOutcome::Unknown`]. The body's error takes precedence over an
/// error from `after_scenario`. A failing `before_scenario` skips the body.
pub fn run_scenario<H, F, E>(hooks: &mut H, scenario: &Scenario, body: F) -> Result<ScenarioOutcome, E>
where
    H: ScenarioHooks,
    E: From<H::Error>,
    F: FnOnce() -> Result<ScenarioOutcome, E>,
{
    hooks.before_scenario(scenario)?;

    let result = body();
    let outcome = result
        .as_ref()
        .map_or(ScenarioOutcome::Unknown, |outcome| *outcome);
    let after = hooks.after_scenario(scenario, outcome);

    let outcome = result?;
    after?;
    Ok(outcome)
}
