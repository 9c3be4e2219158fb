use actix_identity::Identity;
use actix_web::{error, http::{uri::PathAndQuery, Uri}, web, Error, HttpMessage, HttpRequest, HttpResponse};
use juniper::http::{graphiql::graphiql_source, GraphQLRequest};

use crate::AppData;

use super::graphql_schema::Context;

pub async fn graphql(
    request: HttpRequest,
    ctx: web::Data<AppData>,
    identity: Option<Identity>,
    data: web::Json<GraphQLRequest>,
) -> Result<HttpResponse, Error> {
    let original_identity = identity.as_ref().and_then(|x| x.id().ok());

    let app = ctx.into_inner();
    let cookie = original_identity.clone();

    let (body, new_identity) = web::block(move || {
        let req_ctx = Context::new(app, cookie);
        let res = data.execute_sync(&req_ctx.app.graphql_schema, &req_ctx);
        let body = serde_json::to_string(&res)?;
        Ok::<_, serde_json::Error>((body, req_ctx.into_identity()))
    }).await??;

    if new_identity != original_identity {
        match new_identity {
            None => {
                if let Some(identity) = identity {
                    identity.logout();
                }
            },
            Some(x) => {
                Identity::login(&request.extensions(), x)
                    .map_err(error::ErrorInternalServerError)?;
            },
        }
    }

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

pub async fn graphiql(request: HttpRequest) -> Result<HttpResponse, Error> {
    let mut orig = request.uri().clone().into_parts();
    orig.path_and_query = Some(PathAndQuery::from_static("/api/graphql"));
    let uri = Uri::from_parts(orig).map_err(error::ErrorInternalServerError)?;
    let html = graphiql_source(&uri.to_string(), None);
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}
