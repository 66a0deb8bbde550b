use crate::core::bbox::parse_bbox;
use crate::core::render::parse_hex_color;
use crate::models::{
    ErrorResponse, GalleryEntry, GalleryResponse, GenerateMapRequest, GenerateMapResponse,
    HealthResponse, RenderSettings,
};
use crate::services::{
    charge, ChargeError, GenerateError, MapGenerator, PaymentsClient, PostgresClient,
    PostgresError, TerrainError,
};
use actix_web::{web, HttpResponse, Responder};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<MapGenerator>,
    pub postgres: Arc<PostgresClient>,
    pub payments: Option<Arc<PaymentsClient>>,
    pub output_dir: PathBuf,
    pub accounts_enabled: bool,
}

/// Configure all map-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/maps/generate", web::post().to(generate_map))
        .route("/maps/gallery", web::get().to(gallery))
        .route("/maps/mine", web::get().to(my_maps))
        .route("/maps/download/{filename}", web::get().to(download_map));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Generate a contour map endpoint
///
/// POST /api/v1/maps/generate
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "bbox": "minLon,minLat,maxLon,maxLat",
///   "interval": 20.0,
///   "backgroundColor": "#ffffff",
///   "roads": false,
///   "width": 1600,
///   "height": 1200,
///   "zoom": 12
/// }
/// ```
async fn generate_map(
    state: web::Data<AppState>,
    req: web::Json<GenerateMapRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for generate_map request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    // Reject bad input before touching the credit balance
    let bbox = match parse_bbox(&req.bbox) {
        Ok(b) => b,
        Err(e) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid bounding box".to_string(),
                message: e.to_string(),
                status_code: 400,
            });
        }
    };

    if let Err(e) = parse_hex_color(&req.background_color) {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid background color".to_string(),
            message: e.to_string(),
            status_code: 400,
        });
    }

    if req.interval <= 0.0 {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid interval".to_string(),
            message: "Contour interval must be positive".to_string(),
            status_code: 400,
        });
    }

    // Resolve the requesting user when accounts are enabled
    let user_id = if state.accounts_enabled {
        let Some(raw) = req.user_id.as_deref() else {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Missing userId".to_string(),
                message: "userId is required".to_string(),
                status_code: 400,
            });
        };
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                return HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Invalid userId".to_string(),
                    message: "userId must be a UUID".to_string(),
                    status_code: 400,
                });
            }
        }
    } else {
        None
    };

    let settings = RenderSettings {
        background: req.background_color.clone(),
        width: req.width,
        height: req.height,
        include_roads: req.roads,
        interval: req.interval,
        zoom: req.zoom,
    };

    // The charged work: render the map and persist the artifact. Any error
    // here returns the prepared response and, for account holders, triggers
    // the refund inside the charge policy.
    let op = || async {
        let rendered = state
            .generator
            .generate(bbox, &settings)
            .await
            .map_err(generate_error_response)?;

        let filename = format!(
            "contour_{}_{}.png",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            &Uuid::new_v4().to_string()[..8]
        );
        let path = state.output_dir.join(&filename);

        tokio::fs::write(&path, &rendered.png).await.map_err(|e| {
            tracing::error!("Failed to write {}: {}", path.display(), e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to store map".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        })?;

        Ok::<_, HttpResponse>((rendered, filename))
    };

    let (rendered, filename, credits_remaining) = match user_id {
        Some(id) => match charge(state.postgres.as_ref(), id, op).await {
            Ok(((rendered, filename), remaining)) => (rendered, filename, Some(remaining)),
            Err(ChargeError::Operation(response)) => return response,
            Err(ChargeError::Ledger(e)) => return ledger_error_response(e),
        },
        None => match op().await {
            Ok((rendered, filename)) => (rendered, filename, None),
            Err(response) => return response,
        },
    };

    // Record the map for the owner; the file already exists so a DB hiccup
    // here is logged rather than failing the request
    if let Some(id) = user_id {
        let settings_json = serde_json::json!({
            "interval": settings.interval,
            "backgroundColor": settings.background,
            "roads": settings.include_roads,
            "width": settings.width,
            "height": settings.height,
            "zoom": settings.zoom,
        });
        if let Err(e) = state
            .postgres
            .record_map(id, &filename, &req.bbox, settings_json)
            .await
        {
            tracing::warn!("Failed to record map {} for {}: {}", filename, id, e);
        }
    }

    tracing::info!("Generated map {} ({} bytes)", filename, rendered.png.len());

    HttpResponse::Ok().json(GenerateMapResponse {
        download_url: format!("/api/v1/maps/download/{}", filename),
        filename,
        width: settings.width,
        height: settings.height,
        credits_remaining,
        warning: rendered.warning,
    })
}

fn ledger_error_response(e: PostgresError) -> HttpResponse {
    match e {
        PostgresError::InsufficientCredits => {
            HttpResponse::PaymentRequired().json(ErrorResponse {
                error: "Insufficient credits".to_string(),
                message: "Purchase more credits to generate maps".to_string(),
                status_code: 402,
            })
        }
        PostgresError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse {
            error: "User not found".to_string(),
            message: msg,
            status_code: 404,
        }),
        other => {
            tracing::error!("Credit deduction failed: {}", other);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
                message: other.to_string(),
                status_code: 500,
            })
        }
    }
}

fn generate_error_response(e: GenerateError) -> HttpResponse {
    match e {
        GenerateError::Validation(err) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid request".to_string(),
            message: err.to_string(),
            status_code: 400,
        }),
        GenerateError::Terrain(err) => {
            let message = match &err {
                TerrainError::TileStatus { .. } | TerrainError::RequestError(_) => {
                    "Elevation tile service unavailable".to_string()
                }
                other => other.to_string(),
            };
            tracing::error!("Terrain fetch failed: {}", err);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: "Elevation data unavailable".to_string(),
                message,
                status_code: 502,
            })
        }
        GenerateError::Mosaic(err) => {
            tracing::error!("Mosaic assembly failed: {}", err);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to assemble elevation data".to_string(),
                message: err.to_string(),
                status_code: 500,
            })
        }
        GenerateError::Render(err) => {
            tracing::error!("Rendering failed: {}", err);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Rendering failed".to_string(),
                message: err.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Download a generated map
///
/// GET /api/v1/maps/download/{filename}?userId={userId}
///
/// When accounts are enabled the file must belong to the requesting user.
async fn download_map(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let filename = path.into_inner();

    // Filenames are generated server-side; anything with a path separator
    // is an attempted traversal
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid filename".to_string(),
            message: "Filename must not contain path separators".to_string(),
            status_code: 400,
        });
    }

    if state.accounts_enabled {
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

        match state.postgres.find_map(&filename, user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return HttpResponse::NotFound().json(ErrorResponse {
                    error: "Map not found".to_string(),
                    message: format!("No map {} for this user", filename),
                    status_code: 404,
                });
            }
            Err(e) => {
                tracing::error!("Ownership lookup failed: {}", e);
                return HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Database error".to_string(),
                    message: e.to_string(),
                    status_code: 500,
                });
            }
        }
    }

    let file_path = state.output_dir.join(&filename);
    match tokio::fs::read(&file_path).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("image/png")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            ))
            .body(bytes),
        Err(_) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Map not found".to_string(),
            message: format!("File {} does not exist", filename),
            status_code: 404,
        }),
    }
}

/// List all generated maps on disk, newest first
///
/// GET /api/v1/maps/gallery
async fn gallery(state: web::Data<AppState>) -> impl Responder {
    let mut entries = Vec::new();

    let mut dir = match tokio::fs::read_dir(&state.output_dir).await {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!("Failed to read output directory: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to list maps".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    while let Ok(Some(entry)) = dir.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(".png") {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        let created = meta
            .modified()
            .map(chrono::DateTime::<chrono::Utc>::from)
            .unwrap_or_else(|_| chrono::Utc::now());
        entries.push(GalleryEntry {
            filename: name,
            created,
            size_bytes: meta.len(),
        });
    }

    entries.sort_by(|a, b| b.created.cmp(&a.created));

    HttpResponse::Ok().json(GalleryResponse {
        count: entries.len(),
        files: entries,
    })
}

/// List the requesting user's maps from the database
///
/// GET /api/v1/maps/mine?userId={userId}
async fn my_maps(
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

    match state.postgres.list_maps(user_id).await {
        Ok(maps) => {
            let count = maps.len();
            HttpResponse::Ok().json(serde_json::json!({
                "userId": user_id.to_string(),
                "maps": maps,
                "count": count,
            }))
        }
        Err(e) => {
            tracing::error!("Failed to list maps for {}: {}", user_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_traversal_names_rejected() {
        for name in ["../etc/passwd", "a/b.png", "a\\b.png"] {
            assert!(name.contains('/') || name.contains('\\') || name.contains(".."));
        }
    }
}
