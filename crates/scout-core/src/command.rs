//! Commands issued to the device
//!
//! A [`Command`] is the tagged variant recorded in every step. The decision
//! provider chooses among the kinds listed in a [`CommandVocabulary`]; the
//! maintenance commands (`LaunchApp`, `ClearAppData`, `OpenLink`) are only
//! issued by initializers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device interaction model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormFactor {
    /// Pointer based (touch screen)
    #[default]
    Mobile,
    /// Directional-pad based (remote control)
    Tv,
}

impl FormFactor {
    /// Whether navigation relies on the focused element rather than a pointer
    #[inline]
    #[must_use]
    pub fn requires_focus_tree(self) -> bool {
        matches!(self, Self::Tv)
    }
}

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollDirection {
    /// Reveal content above
    Up,
    /// Reveal content below
    Down,
}

/// A single device command
///
/// Serialized with a PascalCase `type` tag and camelCase fields, the same
/// convention as project-file initialize methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Command {
    /// Tap the element showing this text
    ClickWithText {
        /// Visible text of the element
        text: String,
    },
    /// Tap the element with this resource id
    ClickWithId {
        /// Resource id of the element
        id: String,
    },
    /// Type text into the focused element
    InputText {
        /// Text to type
        text: String,
    },
    /// Press the system back key
    BackPress,
    /// Press a named key
    KeyPress {
        /// Key name, e.g. `enter`
        key: String,
    },
    /// Scroll the main content
    Scroll {
        /// Direction to scroll
        direction: ScrollDirection,
    },
    /// Wait for the UI to settle
    Wait {
        /// Pause in milliseconds
        duration_ms: u64,
    },
    /// Move focus up
    DpadUp,
    /// Move focus down
    DpadDown,
    /// Move focus left
    DpadLeft,
    /// Move focus right
    DpadRight,
    /// Select the focused element
    DpadCenter,
    /// Launch an application
    LaunchApp {
        /// Application (package) id
        app_id: String,
    },
    /// Clear an application's stored data
    ClearAppData {
        /// Application (package) id
        app_id: String,
    },
    /// Open a deep link or URL
    OpenLink {
        /// Link or URL
        link: String,
    },
    /// The goal has been achieved; never sent to the device
    GoalAchieved,
}

impl Command {
    /// Discriminant of this command
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::ClickWithText { .. } => CommandKind::ClickWithText,
            Self::ClickWithId { .. } => CommandKind::ClickWithId,
            Self::InputText { .. } => CommandKind::InputText,
            Self::BackPress => CommandKind::BackPress,
            Self::KeyPress { .. } => CommandKind::KeyPress,
            Self::Scroll { .. } => CommandKind::Scroll,
            Self::Wait { .. } => CommandKind::Wait,
            Self::DpadUp => CommandKind::DpadUp,
            Self::DpadDown => CommandKind::DpadDown,
            Self::DpadLeft => CommandKind::DpadLeft,
            Self::DpadRight => CommandKind::DpadRight,
            Self::DpadCenter => CommandKind::DpadCenter,
            Self::LaunchApp { .. } => CommandKind::LaunchApp,
            Self::ClearAppData { .. } => CommandKind::ClearAppData,
            Self::OpenLink { .. } => CommandKind::OpenLink,
            Self::GoalAchieved => CommandKind::GoalAchieved,
        }
    }

    /// Whether this is the goal-achieved marker
    #[inline]
    #[must_use]
    pub fn is_goal_achieved(&self) -> bool {
        matches!(self, Self::GoalAchieved)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClickWithText { text } => write!(f, "ClickWithText({text})"),
            Self::ClickWithId { id } => write!(f, "ClickWithId({id})"),
            Self::InputText { text } => write!(f, "InputText({text})"),
            Self::KeyPress { key } => write!(f, "KeyPress({key})"),
            Self::Scroll { direction } => write!(f, "Scroll({direction:?})"),
            Self::Wait { duration_ms } => write!(f, "Wait({duration_ms}ms)"),
            Self::LaunchApp { app_id } => write!(f, "LaunchApp({app_id})"),
            Self::ClearAppData { app_id } => write!(f, "ClearAppData({app_id})"),
            Self::OpenLink { link } => write!(f, "OpenLink({link})"),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}

/// Discriminant of [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum CommandKind {
    ClickWithText,
    ClickWithId,
    InputText,
    BackPress,
    KeyPress,
    Scroll,
    Wait,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    DpadCenter,
    LaunchApp,
    ClearAppData,
    OpenLink,
    GoalAchieved,
}

/// Ordered set of command kinds a decision provider may choose from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandVocabulary(Vec<CommandKind>);

impl CommandVocabulary {
    /// Create a vocabulary, dropping duplicates but keeping first-seen order
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = CommandKind>) -> Self {
        let mut out = Vec::new();
        for kind in kinds {
            if !out.contains(&kind) {
                out.push(kind);
            }
        }
        Self(out)
    }

    /// Default vocabulary for a form factor
    #[must_use]
    pub fn for_form_factor(form_factor: FormFactor) -> Self {
        match form_factor {
            FormFactor::Mobile => Self::new([
                CommandKind::ClickWithText,
                CommandKind::ClickWithId,
                CommandKind::InputText,
                CommandKind::BackPress,
                CommandKind::KeyPress,
                CommandKind::Scroll,
                CommandKind::Wait,
                CommandKind::GoalAchieved,
            ]),
            FormFactor::Tv => Self::new([
                CommandKind::DpadUp,
                CommandKind::DpadDown,
                CommandKind::DpadLeft,
                CommandKind::DpadRight,
                CommandKind::DpadCenter,
                CommandKind::InputText,
                CommandKind::BackPress,
                CommandKind::KeyPress,
                CommandKind::Wait,
                CommandKind::GoalAchieved,
            ]),
        }
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn allows(&self, kind: CommandKind) -> bool {
        self.0.contains(&kind)
    }

    /// Kinds in order
    #[inline]
    #[must_use]
    pub fn kinds(&self) -> &[CommandKind] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tv_vocabulary_uses_dpad() {
        let tv = CommandVocabulary::for_form_factor(FormFactor::Tv);
        assert!(tv.allows(CommandKind::DpadCenter));
        assert!(!tv.allows(CommandKind::ClickWithText));
        assert!(tv.allows(CommandKind::GoalAchieved));
    }

    #[test]
    fn vocabulary_dedups_in_order() {
        let v = CommandVocabulary::new([
            CommandKind::Wait,
            CommandKind::BackPress,
            CommandKind::Wait,
        ]);
        assert_eq!(v.kinds(), &[CommandKind::Wait, CommandKind::BackPress]);
    }

    #[test]
    fn command_serializes_tagged() {
        let json = serde_json::to_string(&Command::ClickWithText { text: "OK".into() }).unwrap();
        assert_eq!(json, r#"{"type":"ClickWithText","text":"OK"}"#);
        let back: Command = serde_json::from_str(r#"{"type":"GoalAchieved"}"#).unwrap();
        assert!(back.is_goal_achieved());
    }

    #[test]
    fn command_fields_are_camel_case() {
        let json = serde_json::to_string(&Command::LaunchApp {
            app_id: "com.example".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"LaunchApp","appId":"com.example"}"#);
        let wait: Command = serde_json::from_str(r#"{"type":"Wait","durationMs":250}"#).unwrap();
        assert_eq!(wait, Command::Wait { duration_ms: 250 });
    }
}
