//! Clipboard & keyboard guard
//!
//! Blocks copy/paste and a fixed table of keyboard shortcuts. Dispositions are pure
//! functions of the event so a host can decide synchronously whether to cancel the
//! native default action, while the incident itself flows through the engine.

use crate::detectors::Outcome;
use crate::observation::{ClipboardOperation, KeyChord};
use crate::types::{Disposition, Incident, IncidentType, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a key chord is recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "match", content = "value", rename_all = "snake_case")]
pub enum Trigger {
    /// Ctrl or Cmd plus a character
    Command(char),
    /// Ctrl+Shift plus a character
    CtrlShift(char),
    /// A named key regardless of modifiers
    Key(&'static str),
}

impl Trigger {
    pub fn matches(&self, chord: &KeyChord) -> bool {
        match self {
            Trigger::Command(c) => chord.command_modifier() && chord.is_char(*c),
            Trigger::CtrlShift(c) => chord.ctrl && chord.shift && chord.is_char(*c),
            Trigger::Key(name) => chord.key.eq_ignore_ascii_case(name),
        }
    }
}

/// Which advisory callback a rule fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    Warning,
    Violation,
}

/// One row of the keyboard policy table
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShortcutRule {
    pub label: &'static str,
    pub trigger: Trigger,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub operation: &'static str,
    pub escalation: EscalationLevel,
    pub description: &'static str,
    pub message: &'static str,
}

/// Keyboard policy. Devtools rows come first so Ctrl+Shift+I is never read as a
/// plain command chord.
pub const SHORTCUT_POLICY: [ShortcutRule; 7] = [
    ShortcutRule {
        label: "F12",
        trigger: Trigger::Key("F12"),
        incident_type: IncidentType::MultipleWindows,
        severity: Severity::High,
        operation: "devtools",
        escalation: EscalationLevel::Violation,
        description: "Attempt to open developer tools blocked (F12)",
        message: "Developer tools are not allowed during the interview",
    },
    ShortcutRule {
        label: "Ctrl+Shift+I",
        trigger: Trigger::CtrlShift('i'),
        incident_type: IncidentType::MultipleWindows,
        severity: Severity::High,
        operation: "devtools",
        escalation: EscalationLevel::Violation,
        description: "Attempt to open developer tools blocked (Ctrl+Shift+I)",
        message: "Developer tools are not allowed during the interview",
    },
    ShortcutRule {
        label: "Ctrl/Cmd+C",
        trigger: Trigger::Command('c'),
        incident_type: IncidentType::CopyPaste,
        severity: Severity::High,
        operation: "copy",
        escalation: EscalationLevel::Violation,
        description: "Copy shortcut blocked (Ctrl/Cmd+C)",
        message: "Copying content is not allowed during the interview",
    },
    ShortcutRule {
        label: "Ctrl/Cmd+V",
        trigger: Trigger::Command('v'),
        incident_type: IncidentType::CopyPaste,
        severity: Severity::High,
        operation: "paste",
        escalation: EscalationLevel::Violation,
        description: "Paste shortcut blocked (Ctrl/Cmd+V)",
        message: "Pasting content is not allowed during the interview",
    },
    ShortcutRule {
        label: "Ctrl/Cmd+A",
        trigger: Trigger::Command('a'),
        incident_type: IncidentType::CopyPaste,
        severity: Severity::High,
        operation: "select_all",
        escalation: EscalationLevel::Violation,
        description: "Select-all shortcut blocked (Ctrl/Cmd+A)",
        message: "Selecting all content is not allowed during the interview",
    },
    ShortcutRule {
        label: "Ctrl/Cmd+X",
        trigger: Trigger::Command('x'),
        incident_type: IncidentType::CopyPaste,
        severity: Severity::High,
        operation: "cut",
        escalation: EscalationLevel::Violation,
        description: "Cut shortcut blocked (Ctrl/Cmd+X)",
        message: "Cutting content is not allowed during the interview",
    },
    ShortcutRule {
        label: "PrintScreen",
        trigger: Trigger::Key("PrintScreen"),
        incident_type: IncidentType::CopyPaste,
        severity: Severity::Medium,
        operation: "screenshot",
        escalation: EscalationLevel::Warning,
        description: "Screenshot attempt detected (PrintScreen)",
        message: "Screenshots are not allowed during the interview",
    },
];

/// First policy row matching the chord
pub fn match_shortcut(chord: &KeyChord) -> Option<&'static ShortcutRule> {
    SHORTCUT_POLICY.iter().find(|rule| rule.trigger.matches(chord))
}

/// Native default action for a key press
pub fn key_disposition(chord: &KeyChord) -> Disposition {
    if match_shortcut(chord).is_some() {
        Disposition::Prevent
    } else {
        Disposition::Allow
    }
}

/// Native default action for a clipboard event; copies also wipe the payload
pub fn clipboard_disposition(operation: ClipboardOperation) -> Disposition {
    match operation {
        ClipboardOperation::Copy => Disposition::PreventAndClearClipboard,
        ClipboardOperation::Paste => Disposition::Prevent,
    }
}

/// Right-click menu is always suppressed; no incident is recorded
pub fn context_menu_disposition() -> Disposition {
    Disposition::Prevent
}

#[derive(Debug, Default)]
pub struct ClipboardGuard {
    blocked: u32,
}

impl ClipboardGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clipboard events and shortcuts blocked so far
    pub fn blocked(&self) -> u32 {
        self.blocked
    }

    pub fn observe_clipboard(
        &mut self,
        at: DateTime<Utc>,
        operation: ClipboardOperation,
    ) -> Outcome {
        self.blocked += 1;
        let verb = match operation {
            ClipboardOperation::Copy => "Copy",
            ClipboardOperation::Paste => "Paste",
        };
        Outcome::incident(
            Incident::new(
                IncidentType::CopyPaste,
                Severity::High,
                at,
                format!("{} operation blocked", verb),
            )
            .with_metadata("operation", operation.as_str())
            .with_metadata("blocked_total", self.blocked),
        )
        .violate("Copy and paste are disabled during the interview")
    }

    pub fn observe_key(&mut self, at: DateTime<Utc>, chord: &KeyChord) -> Outcome {
        let Some(rule) = match_shortcut(chord) else {
            return Outcome::none();
        };
        self.blocked += 1;

        let outcome = Outcome::incident(
            Incident::new(rule.incident_type, rule.severity, at, rule.description)
                .with_metadata("operation", rule.operation)
                .with_metadata("shortcut", rule.label)
                .with_metadata("blocked_total", self.blocked),
        );
        match rule.escalation {
            EscalationLevel::Warning => outcome.warn(rule.message),
            EscalationLevel::Violation => outcome.violate(rule.message),
        }
    }
}
