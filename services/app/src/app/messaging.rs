//! services/app/src/app/messaging.rs
//!
//! Conversations and their append-only message logs.

use scholarlink_core::domain::{ChatMessage, Conversation, UserProfile};
use scholarlink_core::ports::{
    ConversationStore, NewConversationRecord, NewMessageRecord, PortResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

pub struct MessagingHub {
    store: Arc<dyn ConversationStore>,
    conversations: RwLock<Vec<Conversation>>,
    messages: RwLock<HashMap<Uuid, Vec<ChatMessage>>>,
}

impl MessagingHub {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            conversations: RwLock::new(Vec::new()),
            messages: RwLock::new(HashMap::new()),
        }
    }

    pub async fn refresh(&self, user_id: Uuid) -> PortResult<()> {
        let fetched = self.store.list_for_user(user_id).await?;
        info!("Loaded {} conversations", fetched.len());
        *self.conversations.write().await = fetched;
        Ok(())
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().await.clone()
    }

    pub async fn load_messages(&self, conversation_id: Uuid) -> PortResult<()> {
        let fetched = self.store.list_messages(conversation_id).await?;
        self.messages.write().await.insert(conversation_id, fetched);
        Ok(())
    }

    pub async fn messages(&self, conversation_id: Uuid) -> Vec<ChatMessage> {
        self.messages
            .read()
            .await
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Appends a message and updates the conversation's last-message cache,
    /// re-sorting so the most recently active conversation is first.
    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender: &UserProfile,
        content: &str,
    ) -> PortResult<ChatMessage> {
        let created = self
            .store
            .insert_message(NewMessageRecord {
                conversation_id,
                sender_id: sender.id,
                sender_name: sender.display_name(),
                content: content.to_string(),
            })
            .await?;

        self.messages
            .write()
            .await
            .entry(conversation_id)
            .or_default()
            .push(created.clone());

        let mut conversations = self.conversations.write().await;
        if let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id) {
            conversation.last_message = Some(created.content.clone());
            conversation.last_message_time = Some(created.created_at);
        }
        conversations.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));

        Ok(created)
    }

    /// Returns the conversation between the two users, creating it when none
    /// is cached. The lookup is against the local cache only, so two devices
    /// creating the same pair's first conversation at the same time can end
    /// up with duplicates; the store does not enforce pair uniqueness.
    pub async fn get_or_create(
        &self,
        current_user: &UserProfile,
        other_user: &UserProfile,
    ) -> PortResult<Conversation> {
        if let Some(existing) = self
            .conversations
            .read()
            .await
            .iter()
            .find(|c| c.involves(current_user.id, other_user.id))
        {
            return Ok(existing.clone());
        }

        let created = self
            .store
            .create(NewConversationRecord {
                user1_id: current_user.id,
                user2_id: other_user.id,
                user1_name: current_user.display_name(),
                user2_name: other_user.display_name(),
            })
            .await?;
        info!(
            "Started conversation {} with {}",
            created.id,
            other_user.display_name()
        );

        self.conversations.write().await.insert(0, created.clone());
        Ok(created)
    }
}
