//! Broker console routes: produce, peek, consume.

use std::time::Duration;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use harness_broker::BrokerMessage;

use crate::error::ApiError;
use crate::state::AppState;

use super::require_admin;

const CONSUME_MAX_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
pub(super) struct ProduceForm {
    subject: String,
    body: String,
}

/// `POST /produce`: publish one message to the configured topic.
pub(super) async fn produce(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ProduceForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &jar).await?;
    let topic = &state.config.broker.topic;
    let message = BrokerMessage::new(form.body).with_subject(&form.subject);
    let sequence = state.broker.send_to_topic(topic, message).await?;
    Ok(Json(json!({
        "topic": topic,
        "subject": form.subject,
        "sequence": sequence,
        "status": "Success",
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct PeekForm {
    peek_messages: usize,
}

/// `POST /peek`: look at pending messages without locking them.
pub(super) async fn peek(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PeekForm>,
) -> Result<Response, ApiError> {
    require_admin(&state, &jar).await?;
    let messages = state
        .broker
        .peek_subscription(
            &state.config.broker.topic,
            &state.config.broker.subscription,
            form.peek_messages,
        )
        .await?;
    if messages.is_empty() {
        return Ok("No pending messages".into_response());
    }
    Ok(Json(messages).into_response())
}

/// `POST /consume`: receive one message, relay it to the patch log, and
/// settle it. Relay failures abandon the message back to the subscription
/// so a later consume retries it.
pub(super) async fn consume(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<String, ApiError> {
    require_admin(&state, &jar).await?;
    let topic = &state.config.broker.topic;
    let subscription = &state.config.broker.subscription;

    let received = state
        .broker
        .receive_subscription(topic, subscription, 1, CONSUME_MAX_WAIT)
        .await?;
    let received = match received.into_iter().next() {
        Some(received) => received,
        None => return Ok("No messages to consume".to_string()),
    };

    match state.relay.process(&received.message).await {
        Ok(_) => {
            state
                .broker
                .complete(topic, subscription, received.lock_token)
                .await?;
            Ok(format!(
                "Processed message {}",
                received.message.sequence_number
            ))
        }
        Err(err) => {
            state
                .broker
                .abandon(topic, subscription, received.lock_token)
                .await?;
            Err(err.into())
        }
    }
}
