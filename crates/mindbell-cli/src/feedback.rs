//! Terminal Display/Feedback sink.

use std::io::Write;

use mindbell_core::wakeup::{Feedback, Message};
use tracing::debug;

/// How messages reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Print each message as it arrives.
    Text,
    /// Hold messages so the command can emit one JSON document.
    Json,
}

pub struct TerminalFeedback {
    mode: OutputMode,
    vibration: bool,
    messages: Vec<Message>,
    pulses: usize,
}

impl TerminalFeedback {
    pub fn new(mode: OutputMode, vibration: bool) -> Self {
        Self {
            mode,
            vibration,
            messages: Vec::new(),
            pulses: 0,
        }
    }

    /// Buffered messages. Always empty in text mode.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pulses(&self) -> usize {
        self.pulses
    }
}

impl Feedback for TerminalFeedback {
    fn show_message(&mut self, message: Message) {
        match self.mode {
            OutputMode::Text => println!("{message}"),
            OutputMode::Json => self.messages.push(message),
        }
    }

    /// Terminal bell stands in for a vibration pulse.
    fn pulse_feedback(&mut self) {
        self.pulses += 1;
        if self.vibration && self.mode == OutputMode::Text {
            let mut out = std::io::stdout();
            if let Err(e) = out.write_all(b"\x07").and_then(|()| out.flush()) {
                debug!(error = %e, "terminal bell not written");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_buffers_messages() {
        let mut feedback = TerminalFeedback::new(OutputMode::Json, true);
        feedback.show_message(Message::Prompt);
        feedback.show_message(Message::Fired);
        feedback.pulse_feedback();
        assert_eq!(feedback.messages(), &[Message::Prompt, Message::Fired]);
        assert_eq!(feedback.pulses(), 1);
    }

    #[test]
    fn text_mode_prints_without_buffering() {
        let mut feedback = TerminalFeedback::new(OutputMode::Text, false);
        for _ in 0..3 {
            feedback.show_message(Message::Fired);
        }
        feedback.pulse_feedback();
        assert!(feedback.messages().is_empty());
        assert_eq!(feedback.pulses(), 1);
    }
}
