//! The Axum extractor every page handler takes.
//!
//! Extraction runs [`Bootstrap::initialize_request`] with the token from the
//! session cookie. If the store is unreachable the extractor rejects with
//! [`BootstrapError`], so the handler body never runs and the client gets
//! only the failure message.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use storefront_session::{SessionContext, SessionToken};
use storefront_store::StoreConnectionHandle;

use crate::bootstrap::{Bootstrap, BootstrapError, RequestContext};
use crate::page;
use crate::server::AppState;

/// A bootstrapped page request.
///
/// Page logic reads and writes [`session_mut`](Self::session_mut), queries
/// through [`store`](Self::store), and finishes with
/// [`respond`](Self::respond), which releases the store connection,
/// persists the session, and renders the page.
pub struct PageRequest {
    ctx: RequestContext,
    bootstrap: Arc<Bootstrap>,
    cookie_name: Arc<str>,
}

impl PageRequest {
    /// The client's session.
    pub fn session(&self) -> &SessionContext {
        &self.ctx.session
    }

    /// The client's session, for writing.
    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx.session
    }

    /// This request's open store connection.
    pub fn store(&mut self) -> &mut StoreConnectionHandle {
        &mut self.ctx.store
    }

    /// Finish the request and render `body` inside the storefront header.
    ///
    /// If the session was ended while the request ran, the cookie is
    /// cleared instead of re-sent.
    pub async fn respond(self, body: &str) -> Response {
        let jar = match self.bootstrap.finish_request(self.ctx).await {
            Some(session) => {
                CookieJar::new().add(session_cookie(&self.cookie_name, session.token()))
            }
            None => CookieJar::new().remove(cleared_cookie(&self.cookie_name)),
        };
        (jar, Html(page::render_page(body))).into_response()
    }
}

impl FromRequestParts<AppState> for PageRequest {
    type Rejection = BootstrapError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(&state.cookie_name).map(|c| c.value().to_string());
        let ctx = state.bootstrap.initialize_request(token.as_deref()).await?;
        Ok(Self {
            ctx,
            bootstrap: state.bootstrap.clone(),
            cookie_name: state.cookie_name.clone(),
        })
    }
}

/// Cookie carrying `token` for the rest of the browser session.
pub fn session_cookie(name: &str, token: &SessionToken) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// The removal counterpart of [`session_cookie`].
pub fn cleared_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), "")).path("/").build()
}
