// Route exports
pub mod credits;
pub mod maps;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(maps::configure)
            .configure(credits::configure),
    );
}
