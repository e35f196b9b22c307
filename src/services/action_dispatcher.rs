//! Applies a triggered rule's actions through the mail provider.

use std::sync::Arc;

use crate::domain::{Actions, EmailId, LabelId};
use crate::providers::email::{MailProvider, ProviderError, Result};

/// What happened to the `move_to_folder` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    /// The rule names no folder.
    NotRequested,
    /// The folder's label was added.
    Applied(LabelId),
    /// No label carries the requested name; nothing was changed.
    NotFound(String),
}

/// Result of applying one rule's actions.
///
/// The read-state change and the folder move are attempted independently,
/// so each carries its own result.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Requested read state (`false` means mark unread).
    pub mark_as_read: bool,
    pub read: Result<()>,
    pub folder: Result<FolderOutcome>,
}

impl DispatchOutcome {
    /// Provider errors from either action, read-state first.
    pub fn errors(&self) -> impl Iterator<Item = &ProviderError> {
        self.read.as_ref().err().into_iter().chain(self.folder.as_ref().err())
    }

    /// Returns true if both actions went through without a provider error.
    pub fn is_success(&self) -> bool {
        self.read.is_ok() && self.folder.is_ok()
    }
}

/// Issues provider mutations for rule actions.
#[derive(Clone)]
pub struct ActionDispatcher {
    provider: Arc<dyn MailProvider>,
}

impl ActionDispatcher {
    pub fn new(provider: Arc<dyn MailProvider>) -> Self {
        Self { provider }
    }

    /// Marks the message read or unread, then applies the folder label if one
    /// is requested. A failure of one action does not prevent the other.
    pub async fn dispatch(&self, id: &EmailId, actions: &Actions) -> DispatchOutcome {
        let read = self
            .provider
            .set_unread_label(id, !actions.mark_as_read)
            .await;
        match &read {
            Ok(()) => {
                tracing::debug!(email_id = %id, mark_as_read = actions.mark_as_read, "Read state updated")
            }
            Err(e) => {
                tracing::warn!(email_id = %id, error = %e, "Failed to update read state")
            }
        }

        let folder = match &actions.move_to_folder {
            None => Ok(FolderOutcome::NotRequested),
            Some(name) => self.move_to_folder(id, name).await,
        };
        if let Err(e) = &folder {
            tracing::warn!(email_id = %id, error = %e, "Failed to move to folder");
        }

        DispatchOutcome {
            mark_as_read: actions.mark_as_read,
            read,
            folder,
        }
    }

    async fn move_to_folder(&self, id: &EmailId, name: &str) -> Result<FolderOutcome> {
        match self.get_label_id(name).await? {
            Some(label_id) => {
                self.provider.add_label(id, &label_id).await?;
                tracing::info!(email_id = %id, folder = %name, "Moved to folder");
                Ok(FolderOutcome::Applied(label_id))
            }
            None => {
                tracing::warn!(email_id = %id, folder = %name, "Folder not found, skipping move");
                Ok(FolderOutcome::NotFound(name.to_string()))
            }
        }
    }

    /// Looks up a label id by exact, case-sensitive name.
    ///
    /// Lists labels on every call; nothing is cached.
    pub async fn get_label_id(&self, name: &str) -> Result<Option<LabelId>> {
        let labels = self.provider.list_labels().await?;
        Ok(labels.into_iter().find(|l| l.name == name).map(|l| l.id))
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher").finish_non_exhaustive()
    }
}
