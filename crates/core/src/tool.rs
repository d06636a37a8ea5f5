//! Editing tools and the gesture each one responds to

use serde::{Deserialize, Serialize};

/// How a tool turns pointer input into model changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Select annotations or open text fragments for editing
    Select,
    /// Scroll the viewport; never touches the model
    Pan,
    /// Single pointer-down places an element immediately
    Place,
    /// Anchor on pointer-down, commit a box on pointer-up
    Drag,
    /// Collect a point list until pointer-up
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    #[default]
    Cursor,
    Hand,
    Text,
    Whiteout,
    Checkmark,
    Cross,
    Image,
    Rectangle,
    Circle,
    Line,
    Link,
    Pen,
    Highlight,
    Signature,
}

impl Tool {
    pub const ALL: [Tool; 14] = [
        Tool::Cursor,
        Tool::Hand,
        Tool::Text,
        Tool::Whiteout,
        Tool::Checkmark,
        Tool::Cross,
        Tool::Image,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Line,
        Tool::Link,
        Tool::Pen,
        Tool::Highlight,
        Tool::Signature,
    ];

    pub fn gesture(self) -> Gesture {
        match self {
            Tool::Cursor => Gesture::Select,
            Tool::Hand => Gesture::Pan,
            Tool::Text | Tool::Whiteout | Tool::Checkmark | Tool::Cross | Tool::Image => Gesture::Place,
            Tool::Rectangle | Tool::Circle | Tool::Line | Tool::Link => Gesture::Drag,
            Tool::Pen | Tool::Highlight | Tool::Signature => Gesture::Path,
        }
    }

    /// Click-to-place tools hand control back to the cursor after one use
    pub fn reverts_after_use(self) -> bool {
        self.gesture() == Gesture::Place
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_has_a_gesture() {
        let placing: Vec<Tool> = Tool::ALL.into_iter().filter(|tool| tool.reverts_after_use()).collect();
        assert_eq!(placing, vec![Tool::Text, Tool::Whiteout, Tool::Checkmark, Tool::Cross, Tool::Image]);
        assert_eq!(Tool::default().gesture(), Gesture::Select);
        assert_eq!(Tool::Signature.gesture(), Gesture::Path);
        assert_eq!(Tool::Link.gesture(), Gesture::Drag);
    }
}
