use axum::{extract::State, response::Json};

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::user::RequestUser,
    models::{ChatRequest, ChatResponse, TokenUsage},
    services::ai_provider::CompletionRequest,
};

/// One mentor turn: reserve a slot, call the provider, then settle or give the slot back.
#[utoipa::path(
    post,
    path = "/api/ai/chat",
    tag = "ai",
    request_body = ChatRequest,
    params(("X-User-Id" = String, Header, description = "Account id forwarded by the gateway")),
    responses(
        (status = 200, description = "Mentor reply", body = ChatResponse),
        (status = 400, description = "Invalid conversation"),
        (status = 401, description = "Missing or malformed X-User-Id"),
        (status = 402, description = "Paid tier: insufficient token balance"),
        (status = 404, description = "Account not found"),
        (status = 429, description = "Free tier: daily message limit reached"),
        (status = 500, description = "Provider or storage failure, safe to retry")
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    user: RequestUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate()?;

    let account = state
        .meter
        .ledger()
        .account(user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let reservation = state.meter.reserve_slot(user.id, account.tier).await?;
    let quota = reservation.quota();

    let completion_request = CompletionRequest {
        system: request.system,
        messages: request.messages,
    };

    let completion = match state.provider.complete(&completion_request).await {
        Ok(completion) => completion,
        Err(err) => {
            match err.billed_usage() {
                Some((model, input_tokens, output_tokens)) => {
                    tracing::warn!(
                        user_id = %user.id,
                        input_tokens,
                        output_tokens,
                        "AI provider billed a reply without text, settling usage: {}",
                        err
                    );
                    if let Err(finalize_err) = state
                        .meter
                        .finalize(reservation, input_tokens, output_tokens, model)
                        .await
                    {
                        tracing::error!(user_id = %user.id, "Failed to finalize AI usage: {}", finalize_err);
                    }
                }
                None => {
                    tracing::warn!(user_id = %user.id, "AI provider call failed, releasing reservation: {}", err);
                    state.meter.release(reservation).await;
                }
            }
            return Err(err.into());
        }
    };

    if let Err(err) = state
        .meter
        .finalize(
            reservation,
            completion.input_tokens,
            completion.output_tokens,
            &completion.model,
        )
        .await
    {
        tracing::error!(
            user_id = %user.id,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "Failed to finalize AI usage, delivering reply anyway: {}",
            err
        );
    }

    Ok(Json(ChatResponse {
        reply: completion.text,
        model: completion.model,
        usage: TokenUsage {
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
        },
        quota,
    }))
}
