//! Client-side conversation state with optimistic turns.
//!
//! Sending adds the user's message and an assistant placeholder, both `Pending`. The server
//! outcome then moves the pair to `Committed` (placeholder replaced by the answer) or
//! `Failed` (placeholder replaced by the failure text; the user's message is kept so it
//! can be resent). Only `Pending` messages can transition.
//!
//! Until the server has assigned a conversation id, only one turn may be in flight: a
//! second send would make the server create a second conversation.

use storage::{derive_title, CitedChunk, MessageRole, SearchMethod, PLACEHOLDER_TITLE};
use thiserror::Error;

use crate::error::{ChatError, USER_FAILURE_MESSAGE};
use crate::pipeline::{TurnRequest, TurnResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Pending,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    pub local_id: u64,
    pub role: MessageRole,
    pub content: String,
    pub state: MessageState,
    pub context: Vec<CitedChunk>,
    pub search_method: Option<SearchMethod>,
}

/// Handle for one in-flight turn, returned by [`ClientConversation::begin_send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub user_local_id: u64,
    pub placeholder_local_id: u64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClientSyncError {
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Unknown local message: {0}")]
    UnknownMessage(u64),
    #[error("Message {0} is not pending")]
    NotPending(u64),
    #[error("Message {0} has not failed")]
    NotFailed(u64),
    #[error("A turn is still in flight and the conversation has no server id yet")]
    SendInFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConversation {
    conversation_id: Option<String>,
    title: String,
    messages: Vec<ClientMessage>,
    next_local_id: u64,
}

impl Default for ClientConversation {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConversation {
    /// A fresh conversation with no server id yet.
    pub fn new() -> Self {
        Self {
            conversation_id: None,
            title: PLACEHOLDER_TITLE.to_string(),
            messages: Vec::new(),
            next_local_id: 1,
        }
    }

    /// An existing server conversation.
    pub fn existing(conversation_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            title: title.into(),
            ..Self::new()
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[ClientMessage] {
        &self.messages
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.state == MessageState::Pending)
    }

    /// Shows the user's message and a pending placeholder immediately, and returns the
    /// request to send together with the handle used to resolve it.
    pub fn begin_send(&mut self, text: &str) -> Result<(TurnRequest, PendingTurn), ClientSyncError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientSyncError::EmptyMessage);
        }
        if self.conversation_id.is_none() && self.has_pending() {
            return Err(ClientSyncError::SendInFlight);
        }

        let user_local_id = self.push(MessageRole::User, text.to_string());
        let placeholder_local_id = self.push(MessageRole::Assistant, String::new());

        let request = TurnRequest {
            message: text.to_string(),
            conversation_id: self.conversation_id.clone(),
        };
        Ok((
            request,
            PendingTurn {
                user_local_id,
                placeholder_local_id,
            },
        ))
    }

    /// Applies the server outcome of `turn`.
    pub fn resolve(
        &mut self,
        turn: &PendingTurn,
        outcome: &Result<TurnResponse, ChatError>,
    ) -> Result<(), ClientSyncError> {
        match outcome {
            Ok(response) => self.commit(turn, response),
            Err(_) => self.fail(turn),
        }
    }

    /// Replaces the placeholder with the answer and commits the pair.
    ///
    /// Adopts the server conversation id, and on the first committed turn of an untitled
    /// conversation derives the title from the user's message.
    pub fn commit(&mut self, turn: &PendingTurn, response: &TurnResponse) -> Result<(), ClientSyncError> {
        self.ensure_pending(turn)?;

        let user_text = {
            let user = self.message_mut(turn.user_local_id)?;
            user.state = MessageState::Committed;
            user.content.clone()
        };
        {
            let placeholder = self.message_mut(turn.placeholder_local_id)?;
            placeholder.state = MessageState::Committed;
            placeholder.content = response.response.clone();
            placeholder.context = response.context.clone();
            placeholder.search_method = Some(response.search_method);
        }

        if self.conversation_id.is_none() {
            self.conversation_id = response.conversation_id.clone();
        }
        if self.title == PLACEHOLDER_TITLE {
            if let Some(title) = derive_title(&user_text) {
                self.title = title;
            }
        }
        Ok(())
    }

    /// Marks the pair failed: the user's text stays, the placeholder shows the failure text.
    pub fn fail(&mut self, turn: &PendingTurn) -> Result<(), ClientSyncError> {
        self.ensure_pending(turn)?;

        self.message_mut(turn.user_local_id)?.state = MessageState::Failed;
        let placeholder = self.message_mut(turn.placeholder_local_id)?;
        placeholder.state = MessageState::Failed;
        placeholder.content = USER_FAILURE_MESSAGE.to_string();
        Ok(())
    }

    /// Removes a failed pair and returns the user's text so it can be sent again.
    pub fn take_failed(&mut self, turn: &PendingTurn) -> Result<String, ClientSyncError> {
        for id in [turn.user_local_id, turn.placeholder_local_id] {
            let message = self.message(id)?;
            if message.state != MessageState::Failed {
                return Err(ClientSyncError::NotFailed(id));
            }
        }
        let text = self.message(turn.user_local_id)?.content.clone();
        self.messages
            .retain(|m| m.local_id != turn.user_local_id && m.local_id != turn.placeholder_local_id);
        Ok(text)
    }

    fn push(&mut self, role: MessageRole, content: String) -> u64 {
        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.messages.push(ClientMessage {
            local_id,
            role,
            content,
            state: MessageState::Pending,
            context: Vec::new(),
            search_method: None,
        });
        local_id
    }

    fn ensure_pending(&self, turn: &PendingTurn) -> Result<(), ClientSyncError> {
        for id in [turn.user_local_id, turn.placeholder_local_id] {
            if self.message(id)?.state != MessageState::Pending {
                return Err(ClientSyncError::NotPending(id));
            }
        }
        Ok(())
    }

    fn message(&self, local_id: u64) -> Result<&ClientMessage, ClientSyncError> {
        self.messages
            .iter()
            .find(|m| m.local_id == local_id)
            .ok_or(ClientSyncError::UnknownMessage(local_id))
    }

    fn message_mut(&mut self, local_id: u64) -> Result<&mut ClientMessage, ClientSyncError> {
        self.messages
            .iter_mut()
            .find(|m| m.local_id == local_id)
            .ok_or(ClientSyncError::UnknownMessage(local_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::GenerationError;

    fn response(text: &str, conversation_id: &str) -> TurnResponse {
        TurnResponse {
            response: text.to_string(),
            context: Vec::new(),
            search_method: SearchMethod::None,
            results_found: 0,
            conversation_id: Some(conversation_id.to_string()),
        }
    }

    #[test]
    fn send_shows_pending_pair_immediately() {
        let mut conversation = ClientConversation::new();
        let (request, turn) = conversation.begin_send("  How fast is delivery?  ").unwrap();

        assert_eq!(request.message, "How fast is delivery?");
        assert!(request.conversation_id.is_none());
        assert!(conversation.has_pending());
        let states: Vec<MessageState> = conversation.messages().iter().map(|m| m.state).collect();
        assert_eq!(states, vec![MessageState::Pending, MessageState::Pending]);
        assert_ne!(turn.user_local_id, turn.placeholder_local_id);
    }

    #[test]
    fn commit_adopts_id_and_derives_title_once() {
        let mut conversation = ClientConversation::new();
        let (_, first) = conversation
            .begin_send("What is the refund policy for electronics?")
            .unwrap();
        conversation
            .resolve(&first, &Ok(response("30 days.", "conv-1")))
            .unwrap();

        assert_eq!(conversation.conversation_id(), Some("conv-1"));
        assert_eq!(conversation.title(), "What is the refund policy for electronics?...");
        assert_eq!(conversation.messages()[1].content, "30 days.");
        assert!(!conversation.has_pending());

        let (request, second) = conversation.begin_send("And for furniture?").unwrap();
        assert_eq!(request.conversation_id.as_deref(), Some("conv-1"));
        conversation
            .commit(&second, &response("14 days.", "conv-1"))
            .unwrap();
        assert_eq!(conversation.title(), "What is the refund policy for electronics?...");
    }

    #[test]
    fn failure_keeps_user_text_and_shows_error_bubble() {
        let mut conversation = ClientConversation::new();
        let (_, turn) = conversation.begin_send("Hello there").unwrap();
        let outcome = Err(ChatError::Generation(GenerationError::Provider("HTTP 500".into())));
        conversation.resolve(&turn, &outcome).unwrap();

        let messages = conversation.messages();
        assert_eq!(messages[0].content, "Hello there");
        assert_eq!(messages[0].state, MessageState::Failed);
        assert_eq!(messages[1].content, USER_FAILURE_MESSAGE);
        assert_eq!(messages[1].state, MessageState::Failed);
        assert_eq!(conversation.title(), PLACEHOLDER_TITLE);
        assert!(conversation.conversation_id().is_none());

        let text = conversation.take_failed(&turn).unwrap();
        assert_eq!(text, "Hello there");
        assert!(conversation.messages().is_empty());
    }

    #[test]
    fn resolved_turn_cannot_transition_again() {
        let mut conversation = ClientConversation::new();
        let (_, turn) = conversation.begin_send("Hi").unwrap();
        conversation.commit(&turn, &response("Hello", "c")).unwrap();

        assert_eq!(
            conversation.fail(&turn),
            Err(ClientSyncError::NotPending(turn.user_local_id))
        );
        assert_eq!(
            conversation.take_failed(&turn),
            Err(ClientSyncError::NotFailed(turn.user_local_id))
        );
    }

    #[test]
    fn second_send_waits_for_new_conversation_id() {
        let mut conversation = ClientConversation::new();
        let (_, first) = conversation.begin_send("First question").unwrap();

        assert_eq!(
            conversation.begin_send("Second question").unwrap_err(),
            ClientSyncError::SendInFlight
        );
        assert_eq!(conversation.messages().len(), 2);

        conversation
            .commit(&first, &response("First answer", "conv-9"))
            .unwrap();
        let (request, _) = conversation.begin_send("Second question").unwrap();
        assert_eq!(request.conversation_id.as_deref(), Some("conv-9"));
    }

    #[test]
    fn known_conversation_accepts_overlapping_sends() {
        let mut conversation = ClientConversation::existing("conv-2", "Pricing");
        let (first, _) = conversation.begin_send("One").unwrap();
        let (second, _) = conversation.begin_send("Two").unwrap();

        assert_eq!(first.conversation_id.as_deref(), Some("conv-2"));
        assert_eq!(second.conversation_id.as_deref(), Some("conv-2"));
        assert_eq!(conversation.messages().len(), 4);
    }

    #[test]
    fn failed_first_turn_allows_resend() {
        let mut conversation = ClientConversation::new();
        let (_, turn) = conversation.begin_send("Hello").unwrap();
        conversation.fail(&turn).unwrap();

        let text = conversation.take_failed(&turn).unwrap();
        assert!(conversation.begin_send(&text).is_ok());
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut conversation = ClientConversation::new();
        assert_eq!(
            conversation.begin_send("   ").unwrap_err(),
            ClientSyncError::EmptyMessage
        );
        assert!(conversation.messages().is_empty());
    }
}
