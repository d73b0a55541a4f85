//! Operator input
//!
//! Line-oriented commands stand in for the keyboard of a terminal UI:
//!
//! | Line | Command |
//! |------|---------|
//! | `1` | toggle run/stop |
//! | `2` | toggle direction |
//! | `w` / `s` | frequency +/- 1.00 Hz |
//! | `d` / `a` | frequency +/- 0.10 Hz |
//! | `f <hz>` | set frequency |
//! | `q` | quit |

use std::io::{BufRead, BufReader};
use std::thread;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vfd_model::{FrequencyStep, RangeRejected, Setpoint};

/// One discrete operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    ToggleRun,
    ToggleDirection,
    AdjustFrequency { step: FrequencyStep, up: bool },
    /// Absolute target in hundredths of Hz, clamped on apply
    SetFrequency(i32),
    /// Replace the whole setpoint (façade updates)
    Apply(Setpoint),
    Quit,
}

/// What a command did to the setpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetpointChange {
    pub control_changed: bool,
    pub frequency_changed: bool,
    /// Status text reported once the control write is acknowledged
    pub note: Option<String>,
    pub range: Option<RangeRejected>,
}

fn run_note(setpoint: &Setpoint) -> String {
    format!("CMD: {}", if setpoint.run_state { "START" } else { "STOP" })
}

const DIRECTION_NOTE: &str = "CMD: Direction Changed";

impl InputCommand {
    /// Apply the command to the operator setpoint
    ///
    /// Frequency commands always request a write, even when saturation left
    /// the value unchanged.
    pub fn apply(&self, setpoint: &mut Setpoint) -> SetpointChange {
        match *self {
            Self::ToggleRun => {
                setpoint.toggle_run();
                SetpointChange {
                    control_changed: true,
                    note: Some(run_note(setpoint)),
                    ..Default::default()
                }
            },
            Self::ToggleDirection => {
                setpoint.toggle_direction();
                SetpointChange {
                    control_changed: true,
                    note: Some(DIRECTION_NOTE.to_string()),
                    ..Default::default()
                }
            },
            Self::AdjustFrequency { step, up } => SetpointChange {
                frequency_changed: true,
                range: setpoint.adjust_frequency(step, up),
                ..Default::default()
            },
            Self::SetFrequency(hundredths) => SetpointChange {
                frequency_changed: true,
                range: setpoint.set_frequency(hundredths),
                ..Default::default()
            },
            Self::Apply(next) => {
                let previous = *setpoint;
                setpoint.run_state = next.run_state;
                setpoint.direction = next.direction;
                let range = setpoint.set_frequency(i32::from(next.target_frequency()));
                let control_changed = previous.control_differs(setpoint);
                let note = if previous.run_state != setpoint.run_state {
                    Some(run_note(setpoint))
                } else if control_changed {
                    Some(DIRECTION_NOTE.to_string())
                } else {
                    None
                };
                SetpointChange {
                    control_changed,
                    frequency_changed: previous.target_frequency()
                        != setpoint.target_frequency(),
                    note,
                    range,
                }
            },
            Self::Quit => SetpointChange::default(),
        }
    }
}

/// Parse one input line
pub fn parse_line(line: &str) -> Option<InputCommand> {
    let line = line.trim();
    let command = match line {
        "1" => InputCommand::ToggleRun,
        "2" => InputCommand::ToggleDirection,
        "w" | "W" => InputCommand::AdjustFrequency {
            step: FrequencyStep::Coarse,
            up: true,
        },
        "s" | "S" => InputCommand::AdjustFrequency {
            step: FrequencyStep::Coarse,
            up: false,
        },
        "d" | "D" => InputCommand::AdjustFrequency {
            step: FrequencyStep::Fine,
            up: true,
        },
        "a" | "A" => InputCommand::AdjustFrequency {
            step: FrequencyStep::Fine,
            up: false,
        },
        "q" | "Q" => InputCommand::Quit,
        _ => {
            let hz = line
                .strip_prefix("f ")
                .or_else(|| line.strip_prefix("F "))?
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|hz| hz.is_finite())?;
            InputCommand::SetFrequency((hz * 100.0).round() as i32)
        },
    };
    Some(command)
}

/// Forward parsed commands from `reader` until EOF, quit, cancellation or
/// a closed queue
///
/// Blocking; runs on its own thread. Cancellation is observed between lines.
pub fn forward_commands<R: BufRead>(
    reader: R,
    tx: &mpsc::Sender<InputCommand>,
    cancel: &CancellationToken,
) {
    for line in reader.lines() {
        if cancel.is_cancelled() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Input read failed: {}", e);
                return;
            },
        };

        match parse_line(&line) {
            Some(command) => {
                debug!("Input command: {:?}", command);
                if tx.blocking_send(command).is_err() || command == InputCommand::Quit {
                    return;
                }
            },
            None if line.trim().is_empty() => {},
            None => warn!("Unknown input '{}'", line.trim()),
        }
    }
    debug!("Input closed");
}

/// Run [`forward_commands`] on a dedicated thread
///
/// The thread is detached: a read blocked on a silent terminal never holds
/// up runtime shutdown.
pub fn spawn_line_reader<R>(
    reader: R,
    tx: mpsc::Sender<InputCommand>,
    cancel: CancellationToken,
) -> std::io::Result<thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("vfd-input".to_string())
        .spawn(move || forward_commands(reader, &tx, &cancel))
}

/// Spawn the stdin reader thread
pub fn spawn_stdin_reader(
    tx: mpsc::Sender<InputCommand>,
    cancel: CancellationToken,
) -> std::io::Result<thread::JoinHandle<()>> {
    spawn_line_reader(BufReader::new(std::io::stdin()), tx, cancel)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};
    use vfd_model::Direction;

    #[test]
    fn test_parse_keys() {
        assert_eq!(parse_line("1\n"), Some(InputCommand::ToggleRun));
        assert_eq!(parse_line(" 2 "), Some(InputCommand::ToggleDirection));
        assert_eq!(
            parse_line("a"),
            Some(InputCommand::AdjustFrequency {
                step: FrequencyStep::Fine,
                up: false
            })
        );
        assert_eq!(parse_line("Q"), Some(InputCommand::Quit));
        assert_eq!(parse_line("f 12.34"), Some(InputCommand::SetFrequency(1234)));
        assert_eq!(parse_line("f nan"), None);
        assert_eq!(parse_line("x"), None);
    }

    #[test]
    fn test_toggle_notes() {
        let mut sp = Setpoint::default();
        let change = InputCommand::ToggleRun.apply(&mut sp);
        assert!(change.control_changed && !change.frequency_changed);
        assert_eq!(change.note.as_deref(), Some("CMD: START"));

        let change = InputCommand::ToggleRun.apply(&mut sp);
        assert_eq!(change.note.as_deref(), Some("CMD: STOP"));

        let change = InputCommand::ToggleDirection.apply(&mut sp);
        assert_eq!(change.note.as_deref(), Some("CMD: Direction Changed"));
        assert_eq!(sp.direction, Direction::Reverse);
    }

    #[test]
    fn test_saturated_adjust_still_writes() {
        let mut sp = Setpoint::new(false, Direction::Forward, 6000);
        let change = InputCommand::AdjustFrequency {
            step: FrequencyStep::Coarse,
            up: true,
        }
        .apply(&mut sp);
        assert!(change.frequency_changed);
        assert_eq!(change.range.map(|r| r.applied), Some(6000));
        assert_eq!(sp.target_frequency(), 6000);
    }

    #[test]
    fn test_apply_reports_both_changes() {
        let mut sp = Setpoint::default();
        let change =
            InputCommand::Apply(Setpoint::new(true, Direction::Reverse, 2500)).apply(&mut sp);
        assert!(change.control_changed);
        assert!(change.frequency_changed);
        assert_eq!(change.note.as_deref(), Some("CMD: START"));

        let change =
            InputCommand::Apply(Setpoint::new(true, Direction::Reverse, 2500)).apply(&mut sp);
        assert_eq!(change, SetpointChange::default());
    }

    #[test]
    fn test_forward_commands_stops_after_quit() {
        let input: &[u8] = b"1\nbogus\n\nw\nq\n2\n";
        let (tx, mut rx) = mpsc::channel(8);
        forward_commands(input, &tx, &CancellationToken::new());

        let mut received = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            received.push(cmd);
        }
        assert_eq!(
            received,
            vec![
                InputCommand::ToggleRun,
                InputCommand::AdjustFrequency {
                    step: FrequencyStep::Coarse,
                    up: true
                },
                InputCommand::Quit,
            ]
        );
    }

    #[test]
    fn test_forward_commands_honours_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, mut rx) = mpsc::channel(8);
        forward_commands(&b"1\n2\n"[..], &tx, &cancel);
        assert!(rx.try_recv().is_err());
    }

    /// Reader that never yields a byte while its sender is alive
    struct SilentTerminal(std_mpsc::Receiver<()>);

    impl std::io::Read for SilentTerminal {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_runtime_shutdown_not_held_by_blocked_reader() {
        let (_keep_open, silent) = std_mpsc::channel::<()>();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(8);
        runtime.block_on(async {
            spawn_line_reader(BufReader::new(SilentTerminal(silent)), tx, cancel.clone())
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
