use axum::{extract::State, Json};

use crate::error::Result;
use crate::metrics::TriggerMetrics;
use crate::notification::{
    FanOutDispatcher, JobPayload, MessagePayload, NotificationJob, RecipientCandidate,
    RecipientResolver,
};
use crate::server::AppState;

use super::{MessageCreatedRequest, SkipReason, TriggerReport, TriggerResponse};

const TRIGGER: &str = "message_created";

/// Turn a new conversation message into a notification for the other
/// participant.
///
/// The conversation is looked up to find who should hear about the
/// message; anything other than exactly one non-sender participant is a
/// skip, not an error.
pub async fn process_message_created(
    resolver: &RecipientResolver,
    dispatcher: &FanOutDispatcher,
    request: MessageCreatedRequest,
) -> Result<TriggerReport> {
    let conversation = match resolver.conversation(&request.conversation_id).await? {
        Some(conversation) => conversation,
        None => {
            tracing::warn!(
                conversation_id = %request.conversation_id,
                "Conversation not found, skipping message notification"
            );
            return Ok(TriggerReport::Skipped(SkipReason::ConversationNotFound));
        }
    };

    let recipient =
        match RecipientResolver::non_sender_participant(&conversation, &request.message.sender_id) {
            Some(recipient) => recipient,
            None => {
                tracing::debug!(
                    conversation_id = %request.conversation_id,
                    sender_id = %request.message.sender_id,
                    participant_count = conversation.participant_ids.len(),
                    "No unique non-sender participant, skipping"
                );
                return Ok(TriggerReport::Skipped(SkipReason::NoUniqueRecipient));
            }
        };

    let created_ms = request
        .message
        .created_at
        .map(|at| at.timestamp_millis())
        .unwrap_or(0);
    let dedupe_key = format!(
        "message:{}:{}:{}",
        request.conversation_id, request.message.sender_id, created_ms
    );

    let payload = JobPayload::Message(MessagePayload {
        conversation_id: request.conversation_id,
        sender_name: request.message.sender_name,
        listing_title: conversation.listing.and_then(|listing| listing.title),
        message_text: request.message.text,
    });

    let job = NotificationJob::new(dedupe_key, payload, vec![RecipientCandidate::by_id(recipient)]);
    let report = dispatcher.dispatch(job).await;

    Ok(TriggerReport::Completed(vec![report]))
}

/// Handle a message-created trigger from the marketplace
#[tracing::instrument(
    name = "trigger.message_created",
    skip(state, request),
    fields(
        conversation_id = %request.conversation_id,
        sender_id = %request.message.sender_id
    )
)]
pub async fn message_created(
    State(state): State<AppState>,
    Json(request): Json<MessageCreatedRequest>,
) -> Result<Json<TriggerResponse>> {
    let report = match process_message_created(&state.resolver, &state.dispatcher, request).await {
        Ok(report) => report,
        Err(e) => {
            TriggerMetrics::record_error(TRIGGER);
            return Err(e);
        }
    };

    match &report {
        TriggerReport::Skipped(_) => TriggerMetrics::record_skipped(TRIGGER),
        TriggerReport::Completed(_) => TriggerMetrics::record_completed(TRIGGER),
    }

    Ok(Json(TriggerResponse::from_report(TRIGGER, report)))
}
