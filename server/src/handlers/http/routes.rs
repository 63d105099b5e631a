use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, StatusCode};
use shared::types::{ErrorResponse, Identity, is_privileged};
use tracing::warn;

use crate::AppState;
use crate::auth::session::{CookieJar, HeaderSource, REQUEST_COOKIES, resolve_session};
use crate::handlers::http::{admin, auth, posts};
use crate::handlers::http::utils::{deliver_error_json, deliver_json, deliver_serialized_json};

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Three authorization tiers:
//
//   OpenHandler     — no session resolution.  Receives (req, state).
//                     Use for: /health, login, register, logout.
//
//   SessionHandler  — session resolved, anonymous allowed.
//                     Receives (req, state, Option<Identity>).
//                     Use for: reads whose result depends on who is asking.
//
//   AdminHandler    — session resolved AND role checked by the router.
//                     Receives (req, state, Identity).
//                     Use for: every privileged operation.

type OpenHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

type SessionHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
            Option<Identity>, // resolved by the router; None means anonymous
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

type AdminHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
            Identity, // guaranteed admin by the router
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

// ---------------------------------------------------------------------------
// RouteKind
// ---------------------------------------------------------------------------

enum RouteKind {
    /// No session resolution.
    Open(OpenHandler),

    /// Session resolved; anonymous callers pass through as `None`.
    /// Handler receives `Option<Identity>`.
    Session(SessionHandler),

    /// Session resolved and gated: no identity is 401, a non-admin
    /// identity is 403.  Handler receives the verified `Identity`.
    Admin(AdminHandler),
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    // ── Open (no session) ─────────────────────────────────────────────────────

    /// GET with no session resolution — use for health checks.
    pub fn get<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::GET,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    /// POST with no session resolution — login / register / logout only.
    pub fn post<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::POST,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    // ── Session (anonymous allowed) ───────────────────────────────────────────
    //
    // The router resolves the session cookie before the handler runs.
    // Handlers receive `Option<Identity>` and must NOT resolve again.

    /// GET with session resolution.
    pub fn get_session<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Option<Identity>) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::GET,
            path: path.to_string(),
            kind: RouteKind::Session(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        });
        self
    }

    // ── Admin (identity required, role checked) ───────────────────────────────
    //
    // The router resolves the session and rejects the request before the
    // handler runs: 401 with no identity, 403 with a non-admin one.
    // Handlers receive a verified admin `Identity`.

    /// GET gated on the admin role.
    pub fn get_admin<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::GET,
            path: path.to_string(),
            kind: RouteKind::Admin(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        });
        self
    }

    /// POST gated on the admin role.
    pub fn post_admin<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::POST,
            path: path.to_string(),
            kind: RouteKind::Admin(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        });
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Entry point: install the request's cookie jar for ambient resolution,
    /// then dispatch.
    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let jar = CookieJar::from_headers(req.headers());
        REQUEST_COOKIES.scope(jar, self.dispatch(req, state)).await
    }

    async fn dispatch(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        for route in &self.routes {
            if route.method != method || !Self::path_matches(&route.path, &path) {
                continue;
            }

            return match &route.kind {
                // ── Open ──────────────────────────────────────────────────────
                RouteKind::Open(h) => h(req, state).await,

                // ── Session: resolve, anonymous passes through ────────────────
                RouteKind::Session(h) => {
                    let identity =
                        resolve_session(&state.codec, &state.db, &HeaderSource(req.headers()))
                            .await
                            .context("Session resolution failed")?;
                    h(req, state, identity).await
                }

                // ── Admin: resolve and gate ───────────────────────────────────
                RouteKind::Admin(h) => {
                    let identity =
                        resolve_session(&state.codec, &state.db, &HeaderSource(req.headers()))
                            .await
                            .context("Session resolution failed")?;
                    match identity {
                        Some(id) if is_privileged(Some(&id)) => h(req, state, id).await,
                        Some(id) => {
                            warn!(
                                "Non-admin {} rejected from {} {}",
                                id.email, method, path
                            );
                            forbidden()
                        }
                        None => {
                            warn!("Anonymous caller rejected from {} {}", method, path);
                            unauthorized()
                        }
                    }
                }
            };
        }

        deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND)
            .context("Failed to deliver 404 response")
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        // Exact match.
        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/api/posts/:slug"  matches  "/api/posts/hello-world"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| r.starts_with(':') || r == p)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unauthorized() -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_serialized_json(&ErrorResponse::unauthorized(), StatusCode::UNAUTHORIZED)
        .context("Failed to deliver 401 response")
}

fn forbidden() -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_serialized_json(&ErrorResponse::forbidden(), StatusCode::FORBIDDEN)
        .context("Failed to deliver 403 response")
}

// ---------------------------------------------------------------------------
// API router
//
// Authorization tier is enforced here at the routing level — handlers MUST
// NOT repeat the resolution call.  The contract is:
//
//   .get(...)          → Open     — handler gets (req, state)
//   .post(...)         → Open     — login / register / logout only
//   .get_session(...)  → Session  — handler gets (req, state, Option<Identity>)
//   .get_admin(...)    → Admin    — handler gets (req, state, Identity)
//   .post_admin(...)   → Admin    — same
// ---------------------------------------------------------------------------

pub fn build_api_router() -> Router {
    Router::new()
        // ── Public: no session ───────────────────────────────────────────────
        .get("/health", |_req, _state| async move {
            deliver_json(r#"{"status":"success","health":"ok"}"#, StatusCode::OK)
                .context("Failed to deliver health response")
        })
        .post("/api/register", |req, state| async move {
            auth::handle_register(req, state)
                .await
                .context("Registration failed")
        })
        .post("/api/login", |req, state| async move {
            auth::handle_login(req, state).await.context("Login failed")
        })
        .post("/api/logout", |req, state| async move {
            auth::handle_logout(req, state).await.context("Logout failed")
        })
        // Session introspection resolves through the ambient jar installed
        // by `route`, so it registers as Open here.
        .get("/api/session", |req, state| async move {
            auth::handle_session(req, state)
                .await
                .context("Session introspection failed")
        })
        // ── Session: anonymous allowed, drafts visible to admins only ────────
        .get_session("/api/posts", |req, state, identity| async move {
            posts::handle_list_posts(req, state, identity)
                .await
                .context("Post listing failed")
        })
        .get_session("/api/posts/:slug", |req, state, identity| async move {
            posts::handle_get_post(req, state, identity)
                .await
                .context("Post fetch failed")
        })
        // ── Admin: gate enforced by the router ───────────────────────────────
        .post_admin("/api/posts", |req, state, identity| async move {
            posts::handle_create_post(req, state, identity)
                .await
                .context("Post creation failed")
        })
        .get_admin("/admin/api/users", |req, state, identity| async move {
            admin::handle_get_users(req, state, identity)
                .await
                .context("Get users failed")
        })
        .post_admin(
            "/admin/api/users/promote",
            |req, state, identity| async move {
                admin::handle_promote_user(req, state, identity)
                    .await
                    .context("Promote failed")
            },
        )
        .post_admin(
            "/admin/api/users/demote",
            |req, state, identity| async move {
                admin::handle_demote_user(req, state, identity)
                    .await
                    .context("Demote failed")
            },
        )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
