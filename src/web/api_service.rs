use actix_session::{config::CookieContentSecurity, storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, web};

use super::graphql_service::{graphiql, graphql};

pub const SESSION_COOKIE: &str = "auth-cookie";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/graphql").route(web::post().to(graphql)))
            .service(web::resource("/graphiql").route(web::get().to(graphiql)))
    );
}

/// Encrypted cookie holding the identity. `key` needs at least 64 bytes.
pub fn session_middleware(key: &[u8], domain: Option<String>) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(key))
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_domain(domain)
        .cookie_secure(false)
        .cookie_content_security(CookieContentSecurity::Private)
        .build()
}
