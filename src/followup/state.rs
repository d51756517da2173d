use anyhow::{bail, Result};
use serde::Serialize;

use crate::models::{CallOutcome, ClassifiedCall};
use crate::settings::FollowUpSettings;

use super::message::OutboundMessage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "stage", content = "message")]
pub enum FollowUpStage {
    /// Waiting for "is this caller a client?"
    ClientCheck,
    /// Caller confirmed as a client; waiting for "send a message?"
    MessagePrompt,
    Sent(OutboundMessage),
    Dismissed,
}

/// Two-stage prompt flow for one call: client check, then message prompt.
#[derive(Debug, Clone)]
pub struct FollowUp {
    call: ClassifiedCall,
    stage: FollowUpStage,
    is_client: Option<bool>,
}

impl FollowUp {
    /// Start the flow for `call`, or `None` when the call does not warrant one.
    pub fn begin(call: ClassifiedCall, settings: &FollowUpSettings) -> Option<Self> {
        if call.outcome == CallOutcome::Unknown && !settings.prompt_unknown_calls {
            return None;
        }

        Some(Self {
            call,
            stage: FollowUpStage::ClientCheck,
            is_client: None,
        })
    }

    pub fn call(&self) -> &ClassifiedCall {
        &self.call
    }

    pub fn stage(&self) -> &FollowUpStage {
        &self.stage
    }

    pub fn is_client(&self) -> Option<bool> {
        self.is_client
    }

    pub fn message_sent(&self) -> bool {
        matches!(self.stage, FollowUpStage::Sent(_))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.stage, FollowUpStage::Sent(_) | FollowUpStage::Dismissed)
    }

    pub fn answer_client_check(&mut self, is_client: bool) -> Result<&FollowUpStage> {
        if self.stage != FollowUpStage::ClientCheck {
            bail!("client check already answered (stage: {:?})", self.stage);
        }

        self.is_client = Some(is_client);
        self.stage = if is_client {
            FollowUpStage::MessagePrompt
        } else {
            FollowUpStage::Dismissed
        };
        Ok(&self.stage)
    }

    /// Answer the message prompt. Sending composes the outbound message from
    /// `template`; a number that cannot be messaged leaves the stage unchanged.
    pub fn answer_message_prompt(&mut self, send: bool, template: &str) -> Result<&FollowUpStage> {
        if self.stage != FollowUpStage::MessagePrompt {
            bail!("message prompt is not pending (stage: {:?})", self.stage);
        }

        self.stage = if send {
            FollowUpStage::Sent(OutboundMessage::compose(&self.call.phone_number, template)?)
        } else {
            FollowUpStage::Dismissed
        };
        Ok(&self.stage)
    }
}
