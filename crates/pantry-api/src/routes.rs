use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::state::AppState;
use crate::{catalog, recipes, relations, shopping};

/// Every API route behind the identity middleware. Handlers decide whether
/// they need an authenticated caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ingredients", get(catalog::search_ingredients))
        .route("/api/ingredients/{id}", get(catalog::get_ingredient))
        .route("/api/tags", get(catalog::list_tags))
        .route("/api/tags/{id}", get(catalog::get_tag))
        .route(
            "/api/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(shopping::download_shopping_cart),
        )
        .route(
            "/api/recipes/{id}",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/api/recipes/{id}/favorite",
            post(relations::add_favorite)
                .get(relations::add_favorite)
                .delete(relations::remove_favorite),
        )
        .route(
            "/api/recipes/{id}/shopping_cart",
            post(relations::add_to_cart)
                .get(relations::add_to_cart)
                .delete(relations::remove_from_cart),
        )
        .route("/api/users/subscriptions", get(relations::subscriptions))
        .route(
            "/api/users/{id}/subscribe",
            post(relations::subscribe)
                .get(relations::subscribe)
                .delete(relations::unsubscribe),
        )
        .layer(middleware::from_fn_with_state(state.clone(), crate::middleware::identify))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use pantry_db::Database;
    use pantry_types::api::Claims;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::state::AppStateInner;

    const SECRET: &str = "test-secret";

    struct TestApp {
        app: Router,
        state: AppState,
    }

    struct TestUser {
        id: Uuid,
        token: String,
    }

    impl TestApp {
        fn new() -> Self {
            let state = Arc::new(AppStateInner {
                db: Database::open_in_memory().unwrap(),
                jwt_secret: SECRET.to_string(),
            });
            Self {
                app: router(state.clone()),
                state,
            }
        }

        fn user(&self, username: &str) -> TestUser {
            let id = Uuid::new_v4();
            let claims = Claims {
                sub: id,
                username: username.to_string(),
                exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
            };
            let token = encode(
                &Header::default(),
                &claims,
                &EncodingKey::from_secret(SECRET.as_bytes()),
            )
            .unwrap();
            self.state.db.ensure_user(id, username).unwrap();
            TestUser { id, token }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            user: Option<&TestUser>,
            body: Option<Value>,
        ) -> (StatusCode, Vec<u8>) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user) = user {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, bytes.to_vec())
        }

        async fn json(
            &self,
            method: Method,
            uri: &str,
            user: Option<&TestUser>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let (status, bytes) = self.send(method, uri, user, body).await;
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn create_recipe(&self, user: &TestUser, name: &str, lines: &[(Uuid, i64)]) -> Uuid {
            let ingredients: Vec<Value> = lines
                .iter()
                .map(|(id, amount)| json!({ "id": id, "amount": amount }))
                .collect();
            let (status, body) = self
                .json(
                    Method::POST,
                    "/api/recipes",
                    Some(user),
                    Some(json!({
                        "name": name,
                        "text": "Cook it well.",
                        "cooking_time": 30,
                        "tags": ["00000000-0000-0000-0000-000000000001"],
                        "ingredients": ingredients,
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["id"].as_str().unwrap().parse().unwrap()
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn writes_require_a_valid_token() {
        let app = TestApp::new();
        let (status, body) = app
            .json(Method::POST, "/api/recipes", None, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

        let forged = TestUser {
            id: Uuid::new_v4(),
            token: "not-a-jwt".to_string(),
        };
        let (status, _) = app.json(Method::GET, "/api/recipes", Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn ingredient_search_ranks_prefix_matches_first() {
        let app = TestApp::new();
        for name in ["brown sugar", "Sugar", "Salt"] {
            app.state.db.insert_ingredient(name, "g").unwrap();
        }

        let (status, body) = app
            .json(Method::GET, "/api/ingredients?name=sug", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Sugar", "brown sugar"]);
    }

    #[tokio::test]
    async fn recipe_validation_errors_are_400_with_codes() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();

        let (status, body) = app
            .json(
                Method::POST,
                "/api/recipes",
                Some(&cook),
                Some(json!({
                    "name": "Bread",
                    "text": "Bake.",
                    "cooking_time": 40,
                    "ingredients": [
                        { "id": flour, "amount": 100 },
                        { "id": flour, "amount": 200 },
                    ],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "duplicate_ingredient_in_recipe");

        let (status, body) = app
            .json(
                Method::POST,
                "/api/recipes",
                Some(&cook),
                Some(json!({
                    "name": "Bread",
                    "text": "Bake.",
                    "cooking_time": 0,
                    "ingredients": [{ "id": flour, "amount": 100 }],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_cooking_time");
    }

    #[tokio::test]
    async fn favorite_toggle_round_trip() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let fan = app.user("fan");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();
        let recipe = app.create_recipe(&cook, "Bread", &[(flour, 500)]).await;
        let uri = format!("/api/recipes/{recipe}/favorite");

        let (status, body) = app.json(Method::POST, &uri, Some(&fan), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "favorite");

        let (status, body) = app.json(Method::POST, &uri, Some(&fan), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "already_exists");

        let (_, body) = app
            .json(Method::GET, "/api/recipes?is_favorited=1", Some(&fan), None)
            .await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["is_favorited"], true);

        let (status, _) = app.json(Method::DELETE, &uri, Some(&fan), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app.json(Method::DELETE, &uri, Some(&fan), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "not_found");

        let missing = format!("/api/recipes/{}/favorite", Uuid::new_v4());
        let (status, _) = app.json(Method::POST, &missing, Some(&fan), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn anonymous_listing_ignores_user_filters() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();
        let bread = app.create_recipe(&cook, "Bread", &[(flour, 200)]).await;
        app.create_recipe(&cook, "Cake", &[(flour, 300)]).await;
        let uri = format!("/api/recipes/{bread}/favorite");
        app.json(Method::POST, &uri, Some(&cook), None).await;

        let (_, body) = app
            .json(Method::GET, "/api/recipes?is_favorited=1", Some(&cook), None)
            .await;
        assert_eq!(body["count"], 1);

        let (status, body) = app
            .json(Method::GET, "/api/recipes?is_favorited=1", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["results"][0]["name"], "Cake");
        assert_eq!(body["results"][1]["is_favorited"], false);
    }

    #[tokio::test]
    async fn self_subscription_is_rejected() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let fan = app.user("fan");

        let uri = format!("/api/users/{}/subscribe", cook.id);
        let (status, body) = app.json(Method::POST, &uri, Some(&cook), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "self_subscription");

        let (status, _) = app.json(Method::POST, &uri, Some(&fan), None).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = app
            .json(Method::GET, "/api/users/subscriptions", Some(&fan), None)
            .await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["username"], "cook");
        assert_eq!(body["results"][0]["is_subscribed"], true);
        assert_eq!(body["results"][0]["recipes_count"], 0);
    }

    #[tokio::test]
    async fn subscriptions_are_paged() {
        let app = TestApp::new();
        let fan = app.user("fan");
        for name in ["ann", "ben", "cat"] {
            let author = app.user(name);
            let uri = format!("/api/users/{}/subscribe", author.id);
            let (status, _) = app.json(Method::POST, &uri, Some(&fan), None).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = app
            .json(
                Method::GET,
                "/api/users/subscriptions?limit=2&offset=1",
                Some(&fan),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        let names: Vec<_> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["username"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["ben", "ann"]);
    }

    #[tokio::test]
    async fn recipe_authors_show_the_callers_subscription() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let fan = app.user("fan");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();
        let recipe = app.create_recipe(&cook, "Bread", &[(flour, 200)]).await;
        let uri = format!("/api/users/{}/subscribe", cook.id);
        app.json(Method::POST, &uri, Some(&fan), None).await;

        let detail = format!("/api/recipes/{recipe}");
        let (_, body) = app.json(Method::GET, &detail, Some(&fan), None).await;
        assert_eq!(body["author"]["is_subscribed"], true);
        let (_, body) = app.json(Method::GET, &detail, None, None).await;
        assert_eq!(body["author"]["is_subscribed"], false);
        let (_, body) = app.json(Method::GET, "/api/recipes", Some(&fan), None).await;
        assert_eq!(body["results"][0]["author"]["is_subscribed"], true);
    }

    #[tokio::test]
    async fn adds_are_accepted_over_get() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let fan = app.user("fan");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();
        let recipe = app.create_recipe(&cook, "Bread", &[(flour, 200)]).await;

        for uri in [
            format!("/api/recipes/{recipe}/favorite"),
            format!("/api/recipes/{recipe}/shopping_cart"),
            format!("/api/users/{}/subscribe", cook.id),
        ] {
            let (status, _) = app.json(Method::GET, &uri, Some(&fan), None).await;
            assert_eq!(status, StatusCode::CREATED, "{uri}");
            let (status, body) = app.json(Method::GET, &uri, Some(&fan), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "already_exists");
        }

        let (status, _) = app
            .json(Method::GET, &format!("/api/recipes/{recipe}/favorite"), None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_input_is_a_json_400() {
        let app = TestApp::new();
        let cook = app.user("cook");

        let cases = [
            (Method::GET, "/api/recipes?author=not-a-uuid", None),
            (Method::GET, "/api/recipes?limit=-1", None),
            (Method::GET, "/api/recipes/not-a-uuid", None),
            (Method::GET, "/api/tags/42", None),
            (
                Method::POST,
                "/api/recipes",
                Some(json!({ "name": "Bread", "cooking_time": "soon" })),
            ),
        ];
        for (method, uri, body) in cases {
            let (status, body) = app.json(method, uri, Some(&cook), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "bad_request", "{uri}");
            assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()), "{uri}");
        }
    }

    #[tokio::test]
    async fn shopping_cart_downloads_as_text() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();
        let a = app.create_recipe(&cook, "Bread", &[(flour, 200)]).await;
        let b = app.create_recipe(&cook, "Cake", &[(flour, 300)]).await;

        let (status, body) = app
            .send(Method::GET, "/api/recipes/download_shopping_cart", Some(&cook), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        for recipe in [a, b] {
            let uri = format!("/api/recipes/{recipe}/shopping_cart");
            let (status, _) = app.json(Method::POST, &uri, Some(&cook), None).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let response = app
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/recipes/download_shopping_cart")
                    .header(header::AUTHORIZATION, format!("Bearer {}", cook.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("purchase_list.txt"));
        let text = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(std::str::from_utf8(&text).unwrap(), "Flour (g) — 500\n");
    }

    #[tokio::test]
    async fn recipes_update_over_put_and_patch() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();
        let recipe = app.create_recipe(&cook, "Bread", &[(flour, 200)]).await;
        let uri = format!("/api/recipes/{recipe}");

        for (method, name) in [(Method::PUT, "Rye bread"), (Method::PATCH, "Spelt bread")] {
            let (status, body) = app
                .json(
                    method,
                    &uri,
                    Some(&cook),
                    Some(json!({
                        "name": name,
                        "text": "Bake longer.",
                        "cooking_time": 50,
                        "tags": [],
                        "ingredients": [{ "id": flour, "amount": 250 }],
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert_eq!(body["name"], name);
            assert_eq!(body["ingredients"][0]["amount"], 250);
        }
    }

    #[tokio::test]
    async fn only_the_author_may_delete() {
        let app = TestApp::new();
        let cook = app.user("cook");
        let other = app.user("other");
        let flour = app.state.db.insert_ingredient("Flour", "g").unwrap();
        let recipe = app.create_recipe(&cook, "Bread", &[(flour, 200)]).await;
        let uri = format!("/api/recipes/{recipe}");

        let (status, _) = app.json(Method::DELETE, &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.json(Method::DELETE, &uri, Some(&cook), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.json(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
