//! Ordered conversation history for one session.

use crate::core::types::{Message, Role};

/// Role-tagged messages sent to the model on every request.
///
/// Index 0 is always the system message. Messages are only ever appended;
/// the history shrinks only through [`Conversation::clear`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Reset to a single system message.
    pub fn clear(&mut self, system_prompt: impl Into<String>) {
        self.messages.clear();
        self.messages.push(Message::system(system_prompt));
    }

    /// Replace the content of the leading system message.
    pub fn set_system_prompt(&mut self, system_prompt: impl Into<String>) {
        self.messages[0].content = system_prompt.into();
    }

    pub fn push(&mut self, message: Message) {
        debug_assert!(message.role != Role::System, "only index 0 is a system message");
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    pub fn push_tool(&mut self, content: impl Into<String>) {
        self.push(Message::tool(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_system_message() {
        let conversation = Conversation::new("sys");
        assert_eq!(conversation.messages(), &[Message::system("sys")]);
    }

    #[test]
    fn clear_keeps_only_new_system_message() {
        let mut conversation = Conversation::new("old");
        conversation.push_user("hi");
        conversation.push_assistant("hello");
        conversation.clear("new");
        assert_eq!(conversation.messages(), &[Message::system("new")]);
    }

    #[test]
    fn system_prompt_rewrite_preserves_order() {
        let mut conversation = Conversation::new("en");
        conversation.push_user("hola");
        conversation.set_system_prompt("es");
        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert_eq!(conversation.messages()[0].content, "es");
    }
}
