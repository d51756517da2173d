//! Client-check / message-prompt workflow that runs after a call is delivered.

mod message;
mod state;

pub use message::OutboundMessage;
pub use state::{FollowUp, FollowUpStage};

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::delivery::{EventChannel, Subscription};
use crate::settings::FollowUpSettings;

/// Subscribe to `channel` and queue a [`FollowUp`] for every call that warrants
/// one. The receiver side is drained by whatever presents the prompts.
pub fn attach_queue(
    channel: &EventChannel,
    settings: FollowUpSettings,
) -> (Subscription, mpsc::UnboundedReceiver<FollowUp>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = channel.subscribe(move |call| {
        let Some(flow) = FollowUp::begin(call.clone(), &settings) else {
            return Ok(());
        };
        tx.send(flow)
            .map_err(|_| anyhow!("follow-up queue closed; dropping prompt"))
    });
    (subscription, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallOutcome, ClassifiedCall};

    #[test]
    fn test_queue_receives_prompts_for_delivered_calls() {
        let channel = EventChannel::new();
        let (_sub, mut rx) = attach_queue(&channel, FollowUpSettings::default());

        let call = ClassifiedCall {
            outcome: CallOutcome::Missed,
            phone_number: "555".into(),
            duration_seconds: 0,
            occurred_at_epoch_millis: 10,
        };
        channel.publish(call.clone());
        channel.publish(call.clone());
        channel.publish(ClassifiedCall {
            outcome: CallOutcome::Unknown,
            occurred_at_epoch_millis: 11,
            ..call.clone()
        });

        let flow = rx.try_recv().unwrap();
        assert_eq!(flow.call(), &call);
        assert_eq!(flow.stage(), &FollowUpStage::ClientCheck);
        assert!(rx.try_recv().is_err());
    }
}
