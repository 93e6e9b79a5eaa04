use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::{info, warn};

use agora_crypto::AUTH_MESSAGE;
use agora_db::Database;
use agora_types::api::{VerifyWalletRequest, VerifyWalletResponse};

use crate::error::ApiResult;
use crate::feed::profile_from_row;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

/// POST /auth/verify — prove ownership of a wallet by signing `AUTH_MESSAGE`.
///
/// A bad signature is not an error: the response is `success: false`.
/// On success the wallet gets a user row if it did not have one yet.
pub async fn verify_wallet(
    State(state): State<AppState>,
    Json(req): Json<VerifyWalletRequest>,
) -> ApiResult<Json<VerifyWalletResponse>> {
    let valid = req.message == AUTH_MESSAGE
        && agora_crypto::verify_wallet(AUTH_MESSAGE, &req.signed_message, &req.wallet_address);

    if !valid {
        warn!("Wallet verification failed for {}", req.wallet_address);
        return Ok(Json(VerifyWalletResponse {
            success: false,
            user: None,
            message: Some("Invalid signature".to_string()),
        }));
    }

    let wallet = req.wallet_address.clone();
    let user = crate::blocking(&state, move |db| Ok(db.find_or_create_user(&wallet)?)).await?;

    info!("Wallet verified: {}", req.wallet_address);
    Ok(Json(VerifyWalletResponse {
        success: true,
        user: Some(profile_from_row(user)),
        message: None,
    }))
}
