use crate::models::{
    package_price, ConfirmPaymentRequest, ConfirmPaymentResponse, CreditsResponse, ErrorResponse,
    PurchaseCreditsRequest, PurchaseResponse, RegisterRequest, RegisterResponse,
};
use crate::routes::maps::AppState;
use crate::services::PostgresError;
use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Configure account and credit routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users/register", web::post().to(register))
        .route("/users/credits", web::get().to(get_credits))
        .route("/credits/purchase", web::post().to(purchase_credits))
        .route("/credits/confirm", web::post().to(confirm_payment));
}

/// Create an account with one free credit
///
/// POST /api/v1/users/register
async fn register(state: web::Data<AppState>, req: web::Json<RegisterRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match state.postgres.create_user(&req.email).await {
        Ok(user) => HttpResponse::Ok().json(RegisterResponse {
            user_id: user.id.to_string(),
            credits: user.credits,
        }),
        Err(PostgresError::SqlxError(sqlx::Error::Database(db_err)))
            if db_err.is_unique_violation() =>
        {
            HttpResponse::Conflict().json(ErrorResponse {
                error: "Email already registered".to_string(),
                message: format!("An account for {} already exists", req.email),
                status_code: 409,
            })
        }
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Get the credit balance for a user
///
/// GET /api/v1/users/credits?userId={userId}
async fn get_credits(
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let user_id = match query.get("userId").map(|s| Uuid::parse_str(s)) {
        Some(Ok(id)) => id,
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Missing userId".to_string(),
                message: "userId query parameter is required".to_string(),
                status_code: 400,
            });
        }
    };

    match state.postgres.get_user(user_id).await {
        Ok(user) => HttpResponse::Ok().json(CreditsResponse {
            user_id: user.id.to_string(),
            credits: user.credits,
        }),
        Err(PostgresError::NotFound(msg)) => HttpResponse::NotFound().json(ErrorResponse {
            error: "User not found".to_string(),
            message: msg,
            status_code: 404,
        }),
        Err(e) => {
            tracing::error!("Failed to fetch user {}: {}", user_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Start a credit purchase
///
/// POST /api/v1/credits/purchase
///
/// Creates a payment intent for one of the fixed packages and records a
/// pending transaction. The client completes payment with the returned
/// client secret, then calls confirm.
async fn purchase_credits(
    state: web::Data<AppState>,
    req: web::Json<PurchaseCreditsRequest>,
) -> impl Responder {
    let Some(payments) = state.payments.as_ref() else {
        return HttpResponse::NotImplemented().json(ErrorResponse {
            error: "Payments disabled".to_string(),
            message: "This deployment does not sell credits".to_string(),
            status_code: 501,
        });
    };

    let user_id = match Uuid::parse_str(&req.user_id) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid userId".to_string(),
                message: "userId must be a UUID".to_string(),
                status_code: 400,
            });
        }
    };

    let Some(amount_cents) = package_price(req.credits) else {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid package".to_string(),
            message: format!("No credit package of size {}", req.credits),
            status_code: 400,
        });
    };

    // The user must exist before we take their money
    if let Err(e) = state.postgres.get_user(user_id).await {
        return match e {
            PostgresError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse {
                error: "User not found".to_string(),
                message: msg,
                status_code: 404,
            }),
            other => {
                tracing::error!("User lookup failed: {}", other);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Database error".to_string(),
                    message: other.to_string(),
                    status_code: 500,
                })
            }
        };
    }

    let intent = match payments
        .create_payment_intent(amount_cents, "usd", user_id, req.credits)
        .await
    {
        Ok(intent) => intent,
        Err(e) => {
            tracing::error!("Payment intent creation failed: {}", e);
            return HttpResponse::BadGateway().json(ErrorResponse {
                error: "Payment provider unavailable".to_string(),
                message: e.to_string(),
                status_code: 502,
            });
        }
    };

    if let Err(e) = state
        .postgres
        .create_transaction(user_id, &intent.id, req.credits, amount_cents)
        .await
    {
        tracing::error!("Failed to record transaction {}: {}", intent.id, e);
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Database error".to_string(),
            message: e.to_string(),
            status_code: 500,
        });
    }

    HttpResponse::Ok().json(PurchaseResponse {
        payment_intent_id: intent.id,
        client_secret: intent.client_secret.unwrap_or_default(),
        credits: req.credits,
        amount_cents,
    })
}

/// Confirm a completed payment and grant the credits
///
/// POST /api/v1/credits/confirm
///
/// Verifies the intent status with the provider before crediting; a second
/// confirm for the same intent finds no pending transaction and fails.
async fn confirm_payment(
    state: web::Data<AppState>,
    req: web::Json<ConfirmPaymentRequest>,
) -> impl Responder {
    let Some(payments) = state.payments.as_ref() else {
        return HttpResponse::NotImplemented().json(ErrorResponse {
            error: "Payments disabled".to_string(),
            message: "This deployment does not sell credits".to_string(),
            status_code: 501,
        });
    };

    let user_id = match Uuid::parse_str(&req.user_id) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid userId".to_string(),
                message: "userId must be a UUID".to_string(),
                status_code: 400,
            });
        }
    };

    let intent = match payments
        .retrieve_payment_intent(&req.payment_intent_id)
        .await
    {
        Ok(intent) => intent,
        Err(e) => {
            tracing::error!("Payment intent lookup failed: {}", e);
            return HttpResponse::BadGateway().json(ErrorResponse {
                error: "Payment provider unavailable".to_string(),
                message: e.to_string(),
                status_code: 502,
            });
        }
    };

    if intent.status != "succeeded" {
        if let Err(e) = state.postgres.fail_transaction(&intent.id).await {
            tracing::warn!("Failed to mark transaction {} failed: {}", intent.id, e);
        }
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Payment not completed".to_string(),
            message: format!("Payment intent status is {}", intent.status),
            status_code: 400,
        });
    }

    match state
        .postgres
        .complete_transaction(&req.payment_intent_id, user_id)
        .await
    {
        Ok(credits) => HttpResponse::Ok().json(ConfirmPaymentResponse {
            success: true,
            credits,
        }),
        Err(PostgresError::NotFound(msg)) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Transaction not found".to_string(),
            message: msg,
            status_code: 404,
        }),
        Err(e) => {
            tracing::error!("Failed to complete transaction: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
