#![forbid(unsafe_code)]

fn main() {
    let integration = scenario_capture::util::OutputIntegration::detect();
    scenario_capture::util::init_logging(&integration);
    if let Err(error) = scenario_capture::run_from_env() {
        if integration.should_emit_json() {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                    "integration": integration,
                })
            );
        } else {
            eprintln!("{error}");
        }
        std::process::exit(error.exit_code());
    }
}
