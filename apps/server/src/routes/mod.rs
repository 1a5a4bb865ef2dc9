use actix_web::{HttpRequest, web};

mod health;
mod links;
mod login;
mod status;

/// Mount every route on the application.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health_route)
        .service(login::login_route)
        .service(status::status_check_route)
        .service(links::list_links_route);
}

/// Windowing key for a request: the connection's peer IP, never a forwarded header.
pub(crate) fn origin_of(req: &HttpRequest) -> String {
    req.peer_addr().map(|addr| addr.ip().to_string()).unwrap_or_else(|| "unknown".to_string())
}
