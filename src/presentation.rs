//! Console presentation of switcher events
//!
//! Status ticks redraw a single progress line on stderr; every other event
//! clears that line and prints a permanent one above it.

use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, IsTerminal, Write};

use crate::events::SwitchEvent;
use crate::machine::{Phase, TargetDevice};
use crate::style::IdleswStyle;

const BAR_WIDTH: usize = 20;

/// Render a fixed-width text progress bar, e.g. `[#########-----------]`
#[must_use]
pub fn render_bar(percent: u8, width: usize) -> String {
    let filled = usize::from(percent.min(100)) * width / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Plain-text form of a status tick (without styling)
#[must_use]
pub fn status_text(
    idle_ms: u64,
    percent: u8,
    phase: Phase,
    threshold_ms: u64,
    target: &str,
) -> String {
    match phase {
        Phase::Armed => format!(
            "{} {percent:>3}%  idle {}s / {}s",
            render_bar(percent, BAR_WIDTH),
            idle_ms / 1000,
            threshold_ms / 1000
        ),
        Phase::Switched => format!(
            "On {target} (idle {}s), waiting for activity",
            idle_ms / 1000
        ),
    }
}

/// Whether a progress line can be drawn: requested, and stderr is a terminal
#[must_use]
pub fn progress_enabled(requested: bool) -> bool {
    requested && io::stderr().is_terminal()
}

/// Progress line on stderr
pub struct StatusLine {
    enabled: bool,
    drawn: bool,
    target: String,
    threshold_ms: u64,
}

impl StatusLine {
    /// Progress line for a resolved target; see [`progress_enabled`]
    #[must_use]
    pub fn new(requested: bool, target: &TargetDevice, threshold_ms: u64) -> Self {
        Self {
            enabled: progress_enabled(requested),
            drawn: false,
            target: target.name.clone(),
            threshold_ms,
        }
    }

    /// Whether this line owns the terminal (log output to stderr should stay off)
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn tick_text(&self, idle_ms: u64, percent: u8, phase: Phase) -> String {
        status_text(idle_ms, percent, phase, self.threshold_ms, &self.target)
    }

    /// Present one event
    pub fn show(&mut self, event: &SwitchEvent) {
        if !self.enabled {
            return;
        }

        let mut stderr = io::stderr();
        let result = match event {
            SwitchEvent::StatusTick {
                idle_ms,
                percent,
                phase,
            } => {
                let text = self.tick_text(*idle_ms, *percent, *phase);
                let styled = match phase {
                    Phase::Armed => text.warning(),
                    Phase::Switched => text.success(),
                };
                self.drawn = true;
                execute!(
                    stderr,
                    MoveToColumn(0),
                    Clear(ClearType::CurrentLine),
                    Print(styled)
                )
            }
            SwitchEvent::SwitchSucceeded { .. } | SwitchEvent::Rearmed { .. } => {
                self.permanent(&mut stderr, format!("{}", event.to_string().success()))
            }
            SwitchEvent::SwitchFailed { .. } => {
                self.permanent(&mut stderr, format!("{}", event.to_string().error()))
            }
            SwitchEvent::AmbiguousTarget { .. } => {
                self.permanent(&mut stderr, format!("{}", event.to_string().warning()))
            }
            SwitchEvent::SwitchAttempted { .. } => self.permanent(&mut stderr, event.to_string()),
        };

        // A broken terminal must never stop the switcher
        if result.is_err() {
            self.enabled = false;
        }
    }

    /// Clear the progress line before exit
    pub fn finish(&mut self) {
        if self.enabled && self.drawn {
            let mut stderr = io::stderr();
            let _ = execute!(stderr, MoveToColumn(0), Clear(ClearType::CurrentLine));
            let _ = stderr.flush();
            self.drawn = false;
        }
    }

    fn permanent(&mut self, stderr: &mut io::Stderr, line: String) -> io::Result<()> {
        self.drawn = false;
        execute!(
            stderr,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line),
            Print("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "[----------]" ; "empty")]
    #[test_case(50, "[#####-----]" ; "half")]
    #[test_case(99, "[#########-]" ; "almost")]
    #[test_case(100, "[##########]" ; "full")]
    #[test_case(250, "[##########]" ; "clamped")]
    fn test_render_bar(percent: u8, expected: &str) {
        assert_eq!(render_bar(percent, 10), expected);
    }

    #[test]
    fn test_armed_status_shows_countdown() {
        let text = status_text(7_500, 50, Phase::Armed, 15_000, "USB Headset");
        assert!(text.ends_with(" 50%  idle 7s / 15s"), "{text}");
    }

    #[test]
    fn test_switched_status_names_target() {
        let text = status_text(20_000, 100, Phase::Switched, 15_000, "USB Headset");
        assert_eq!(text, "On USB Headset (idle 20s), waiting for activity");
    }

    fn headset() -> TargetDevice {
        TargetDevice {
            id: "alsa_output.usb-headset.analog-stereo".to_string(),
            name: "USB Headset".to_string(),
        }
    }

    #[test]
    fn test_line_names_the_resolved_device() {
        let line = StatusLine::new(false, &headset(), 15_000);
        assert_eq!(
            line.tick_text(16_000, 100, Phase::Switched),
            "On USB Headset (idle 16s), waiting for activity"
        );
    }

    #[test]
    fn test_disabled_line_ignores_events() {
        let mut line = StatusLine::new(false, &headset(), 15_000);
        assert!(!line.is_enabled());
        line.show(&SwitchEvent::Rearmed { idle_ms: 0 });
        line.finish();
    }
}
