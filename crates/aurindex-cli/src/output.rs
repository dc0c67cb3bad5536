use crate::commands::CommandOutput;
use crate::error::CliError;

/// Print a command outcome: text lines by default, the JSON payload on
/// `--json`.
pub fn render(outcome: &CommandOutput, json: bool, pretty: bool) -> Result<(), CliError> {
    if json {
        let payload = if pretty {
            serde_json::to_string_pretty(&outcome.data)?
        } else {
            serde_json::to_string(&outcome.data)?
        };
        println!("{payload}");
        return Ok(());
    }

    for line in &outcome.lines {
        println!("{line}");
    }

    Ok(())
}
