//! Line commands read from stdin during a live session.

use crate::commands;
use crate::state::AppState;

pub const HELP: &str = "commands: camera on|off, go <destination>, next, resume, stop, step, \
say <text>, listen, history, hold on|off, status, diag, help, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Camera(bool),
    Go(String),
    Next,
    Resume,
    Stop,
    Step,
    Say(String),
    Listen,
    History,
    Hold(bool),
    Status,
    Diagnostics,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Silent,
    Quit,
}

fn on_off(arg: &str) -> Result<bool, String> {
    match arg {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("expected on|off, got {other:?}")),
    }
}

pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let command = match head.to_ascii_lowercase().as_str() {
        "camera" => ConsoleCommand::Camera(on_off(rest)?),
        "go" if !rest.is_empty() => ConsoleCommand::Go(rest.to_string()),
        "next" => ConsoleCommand::Next,
        "resume" => ConsoleCommand::Resume,
        "stop" => ConsoleCommand::Stop,
        "step" => ConsoleCommand::Step,
        "say" if !rest.is_empty() => ConsoleCommand::Say(rest.to_string()),
        "listen" => ConsoleCommand::Listen,
        "history" => ConsoleCommand::History,
        "hold" => ConsoleCommand::Hold(on_off(rest)?),
        "status" => ConsoleCommand::Status,
        "diag" => ConsoleCommand::Diagnostics,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "" => return Err("empty command".into()),
        _ => return Err(format!("unknown command {line:?}; try help")),
    };
    Ok(command)
}

/// Run one console command. Session events triggered by the command reach
/// the screen through the forwarders, so most commands reply silently.
pub fn execute(state: &AppState, command: ConsoleCommand) -> Result<Reply, String> {
    let reply = match command {
        ConsoleCommand::Camera(true) => {
            commands::start_camera(state)?;
            Reply::Silent
        }
        ConsoleCommand::Camera(false) => {
            commands::stop_camera(state)?;
            Reply::Silent
        }
        ConsoleCommand::Go(destination) => {
            commands::start_navigation(state, &destination)?;
            Reply::Silent
        }
        ConsoleCommand::Next => {
            commands::advance_navigation(state);
            Reply::Silent
        }
        ConsoleCommand::Resume => {
            let snap = commands::resume_navigation(state);
            Reply::Print(format!("guidance held: {}", snap.held))
        }
        ConsoleCommand::Stop => {
            commands::stop_navigation(state);
            Reply::Silent
        }
        ConsoleCommand::Step => {
            let step = commands::current_step(state)?;
            Reply::Print(format!("{} ({})", step.instruction, step.distance))
        }
        ConsoleCommand::Say(text) => {
            commands::send_voice_command(state, &text)?;
            Reply::Silent
        }
        ConsoleCommand::Listen => {
            commands::toggle_listening(state)?;
            Reply::Silent
        }
        ConsoleCommand::History => Reply::Print(
            commands::conversation(state)
                .iter()
                .map(|turn| format!("#{} {:?}: {}", turn.seq, turn.role, turn.text))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        ConsoleCommand::Hold(hold) => {
            let mut settings = commands::get_settings(state);
            settings.hold_on_hazard = hold;
            commands::update_settings(state, settings)?;
            Reply::Print(format!("hold on hazard: {}", if hold { "on" } else { "off" }))
        }
        ConsoleCommand::Status => {
            let nav = commands::navigation_status(state);
            Reply::Print(format!(
                "camera {:?}, guidance {:?}, progress {}",
                commands::get_status(state),
                nav.status,
                nav.progress
                    .map_or_else(|| "-".to_string(), |p| format!("{:.0}%", p * 100.0)),
            ))
        }
        ConsoleCommand::Diagnostics => {
            let perf = commands::get_diagnostics(state);
            Reply::Print(serde_json::to_string_pretty(&perf).map_err(|e| e.to_string())?)
        }
        ConsoleCommand::Help => Reply::Print(HELP.to_string()),
        ConsoleCommand::Quit => Reply::Quit,
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AppSettings;
    use soundsight_core::{
        RecognizerHandle, SimulatedDetectionSource, SimulatedRecognizer, SourceHandle,
    };

    #[test]
    fn parse_recognises_arguments() {
        assert_eq!(parse("camera on"), Ok(ConsoleCommand::Camera(true)));
        assert_eq!(parse("  GO  Main Entrance "), Ok(ConsoleCommand::Go("Main Entrance".into())));
        assert_eq!(
            parse("say Where is the door?"),
            Ok(ConsoleCommand::Say("Where is the door?".into()))
        );
        assert_eq!(parse("exit"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse("").is_err());
        assert!(parse("go").is_err());
        assert!(parse("hold maybe").is_err());
        assert!(parse("dance").is_err());
    }

    #[tokio::test]
    async fn execute_walks_a_short_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::new(
            AppSettings::default(),
            dir.path().join("settings.json"),
            SourceHandle::new(SimulatedDetectionSource::with_seed(3)),
            RecognizerHandle::new(SimulatedRecognizer::with_seed(3)),
        );

        assert!(execute(&state, ConsoleCommand::Step).is_err());
        execute(&state, ConsoleCommand::Go("elevator".into())).unwrap();
        assert_eq!(
            execute(&state, ConsoleCommand::Step).unwrap(),
            Reply::Print("Walk straight for 15 meters (15m)".into())
        );

        execute(&state, ConsoleCommand::Say("What's on my left?".into())).unwrap();
        let Reply::Print(history) = execute(&state, ConsoleCommand::History).unwrap() else {
            panic!("history should print");
        };
        assert!(history.contains("A person is standing 2.5 meters to your front-left."));

        execute(&state, ConsoleCommand::Hold(true)).unwrap();
        assert!(crate::settings::load_settings(&state.settings_path).hold_on_hazard);
        assert_eq!(execute(&state, ConsoleCommand::Quit).unwrap(), Reply::Quit);
    }
}
