use std::sync::Arc;

use axum::{
    Extension, Router, middleware,
    routing::{get, post},
};

use crate::{
    auth::auth_middleware,
    config::AppConfig,
    learn::LearnService,
    routes::{self, learn},
    store::ReviewStore,
};

pub struct AppState<S> {
    pub learn: LearnService<S>,
}

pub fn init_router<S: ReviewStore>(store: S, config: AppConfig) -> Router {
    let state = Arc::new(AppState {
        learn: LearnService::new(Arc::new(store), config.read_retry),
    });
    let public_routes = Router::new().route("/health", get(routes::health_handler));
    // One `{id}` segment for both deck and flashcard routes; the handler decides.
    let auth_routes = Router::new()
        .route("/learn/{id}/init", post(learn::init_learning::<S>))
        .route("/learn/{id}/next", get(learn::next_card::<S>))
        .route("/learn/{id}/next-date", get(learn::next_date::<S>))
        .route("/learn/{id}/stats", get(learn::deck_stats::<S>))
        .route("/learn/{id}/review", post(learn::review_card::<S>))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S>,
        ))
        .with_state(state);
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .layer(Extension(config))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::{NaiveDateTime, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::tests::{SECRET, sign, token_for},
        models::{CardToLearn, DeckStats, ReviewOutcome},
        store::{MemoryReviewStore, RetryPolicy},
    };

    fn config() -> AppConfig {
        AppConfig {
            database_url: String::new(),
            bind_address: "127.0.0.1:0".to_string(),
            auth_key: SECRET.to_string().into(),
            read_retry: RetryPolicy::default(),
        }
    }

    fn app_with(store: MemoryReviewStore) -> Router {
        init_router(store, config())
    }

    fn app() -> Router {
        let store = MemoryReviewStore::new();
        store.add_deck(1, "alice", false);
        store.add_card(1, 10, "hola", "hello");
        store.add_card(1, 20, "adios", "goodbye");
        app_with(store)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let (status, _) = send(&app(), request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_unauthorized() {
        let app = app();
        for token in [None, Some("not-a-jwt")] {
            let (status, _) = send(&app, request("GET", "/learn/1/next", token, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        // the body is never looked at
        let (status, _) = send(
            &app,
            request("POST", "/learn/10/review", None, Some(json!({ "quality": 9 }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn revoked_token_is_unauthorized() {
        let store = MemoryReviewStore::new();
        store.add_deck(1, "alice", false);
        let token = token_for("alice");
        store.revoke_token(&token);
        let app = app_with(store);

        let (status, _) = send(&app, request("POST", "/learn/1/init", Some(&token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn numeric_subject_is_accepted() {
        let store = MemoryReviewStore::new();
        store.add_deck(1, "42", false);
        store.add_card(1, 10, "hola", "hello");
        let app = app_with(store);
        let exp = (Utc::now() + chrono::TimeDelta::hours(1)).timestamp();
        let token = sign(json!({ "sub": 42, "exp": exp }), SECRET);

        let (status, _) = send(&app, request("POST", "/learn/1/init", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, request("GET", "/learn/1/next", Some(&token), None)).await;
        let card: CardToLearn = serde_json::from_slice(&body).unwrap();
        assert_eq!(card.id, 10);
    }

    #[tokio::test]
    async fn next_before_init_conflicts() {
        let app = app();
        let token = token_for("alice");
        for uri in ["/learn/1/next", "/learn/1/next-date"] {
            let (status, _) = send(&app, request("GET", uri, Some(&token), None)).await;
            assert_eq!(status, StatusCode::CONFLICT);
        }
    }

    #[tokio::test]
    async fn unknown_deck_is_not_found() {
        let (status, _) = send(
            &app(),
            request("POST", "/learn/77/init", Some(&token_for("alice")), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_quality_is_rejected() {
        let app = app();
        let token = token_for("alice");
        send(&app, request("POST", "/learn/1/init", Some(&token), None)).await;

        let (status, _) = send(
            &app,
            request("POST", "/learn/10/review", Some(&token), Some(json!({ "quality": 6 }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = send(&app, request("GET", "/learn/1/next", Some(&token), None)).await;
        let card: CardToLearn = serde_json::from_slice(&body).unwrap();
        assert_eq!(card.last_review_date, None);
    }

    #[tokio::test]
    async fn learn_flow_over_http() {
        let app = app();
        let token = token_for("alice");

        let (status, _) = send(&app, request("POST", "/learn/1/init", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        // idempotent
        let (status, _) = send(&app, request("POST", "/learn/1/init", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);

        for expected in [10, 20] {
            let (status, body) =
                send(&app, request("GET", "/learn/1/next", Some(&token), None)).await;
            assert_eq!(status, StatusCode::OK);
            let card: CardToLearn = serde_json::from_slice(&body).unwrap();
            assert_eq!(card.id, expected);

            let (status, body) = send(
                &app,
                request(
                    "POST",
                    &format!("/learn/{expected}/review"),
                    Some(&token),
                    Some(json!({ "quality": 4 })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            let outcome: ReviewOutcome = serde_json::from_slice(&body).unwrap();
            assert_eq!(outcome.id, expected);
            assert_eq!(outcome.interval_days, 1);
            assert_eq!(outcome.repetition_count, 1);
            assert!(outcome.last_review_date.is_some());
        }

        let (status, body) = send(&app, request("GET", "/learn/1/next", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), Value::Null);

        let (status, body) =
            send(&app, request("GET", "/learn/1/next-date", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        let raw: String = serde_json::from_slice(&body).unwrap();
        assert!(!raw.ends_with('Z'));
        let next_date: NaiveDateTime = raw.parse().unwrap();
        assert!(next_date > Utc::now().naive_utc());

        let (_, body) = send(&app, request("GET", "/learn/1/stats", Some(&token), None)).await;
        let stats: DeckStats = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            stats,
            DeckStats {
                total: 2,
                due: 0,
                unseen: 0,
                scheduled: 2,
            }
        );
    }
}
