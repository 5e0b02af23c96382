use std::sync::Arc;

use assetdesk_api::app::{router, services::AppServices};
use assetdesk_auth::Hs256Jwt;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let tokens = Arc::new(Hs256Jwt::new(SECRET).expect("secret"));
        let app = router(Arc::new(AppServices::in_memory(tokens)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, client: reqwest::Client::new(), handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn signup(&self, email: &str, role: &str) -> Value {
        let res = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "email": email, "name": "Test User", "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    async fn token_for(&self, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/jwt"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.request(method, self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        let body = res.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn user_id(&self, hr_token: &str, email: &str) -> String {
        let (status, users) = self.send(reqwest::Method::GET, "/users", hr_token, None).await;
        assert_eq!(status, StatusCode::OK);
        users
            .as_array()
            .unwrap()
            .iter()
            .find(|u| u["email"] == email)
            .and_then(|u| u["_id"].as_str())
            .unwrap()
            .to_string()
    }

    /// HR `hr`, employee `emp` in its company; returns both tokens.
    async fn company(&self, hr: &str, emp: &str) -> (String, String) {
        self.signup(hr, "hr").await;
        self.signup(emp, "employee").await;
        let hr_token = self.token_for(hr).await;
        let emp_token = self.token_for(emp).await;

        let id = self.user_id(&hr_token, emp).await;
        let (status, _) = self
            .send(
                reqwest::Method::PATCH,
                &format!("/users/{id}"),
                &hr_token,
                Some(json!({ "companyName": format!("{hr} inc"), "companyLogo": "logo.png" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (hr_token, emp_token)
    }

    async fn add_asset(&self, hr_token: &str, name: &str, quantity: i64) -> String {
        let (status, body) = self
            .send(
                reqwest::Method::POST,
                "/addAssets",
                hr_token,
                Some(json!({ "product_name": name, "product_quantity": quantity, "product_type": "Returnable" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "body={body}");
        body["insertedId"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(email: &str, expires_in: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "email": email,
        "iat": now.timestamp(),
        "exp": (now + expires_in).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn liveness_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "my assets is running");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/assets_get")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "unauthorized", "message": "unauthorized access" }));

    let res = srv.client.get(srv.url("/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/assets_get"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn().await;
    srv.signup("a@x.com", "employee").await;

    let token = mint_jwt("a@x.com", ChronoDuration::seconds(-5));
    let (status, _) = srv.send(reqwest::Method::GET, "/users/employee/a@x.com", &token, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn jwt_is_only_issued_to_registered_users() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/jwt"))
        .json(&json!({ "email": "ghost@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.client.post(srv.url("/jwt")).json(&json!({ "name": "no email" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn path_email_must_match_token_email() {
    let srv = TestServer::spawn().await;
    srv.signup("a@x.com", "employee").await;
    let token = srv.token_for("a@x.com").await;

    let (status, body) = srv.send(reqwest::Method::GET, "/users/employee/a@x.com", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "employee": true }));

    let (status, _) = srv.send(reqwest::Method::GET, "/users/employee/b@x.com", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.send(reqwest::Method::GET, "/assetByEmail/b@x.com", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_require_hr_role() {
    let srv = TestServer::spawn().await;
    srv.signup("a@x.com", "employee").await;
    let token = srv.token_for("a@x.com").await;

    let (status, _) = srv.send(reqwest::Method::GET, "/users", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv
        .send(
            reqwest::Method::POST,
            "/addAssets",
            &token,
            Some(json!({ "product_name": "Laptop", "product_quantity": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A valid token for an email with no user record is also forbidden.
    let ghost = mint_jwt("ghost@x.com", ChronoDuration::minutes(10));
    let (status, _) = srv.send(reqwest::Method::GET, "/assets", &ghost, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signup_is_idempotent_per_email() {
    let srv = TestServer::spawn().await;

    let first = srv.signup("a@x.com", "employee").await;
    assert!(first["insertedId"].is_string());

    let second = srv.signup("a@x.com", "employee").await;
    assert_eq!(second["insertedId"], Value::Null);
    assert!(second["message"].is_string());

    srv.signup("b@x.com", "hr").await;
    let hr_token = srv.token_for("b@x.com").await;
    let (_, users) = srv.send(reqwest::Method::GET, "/users", &hr_token, None).await;
    let count = users.as_array().unwrap().iter().filter(|u| u["email"] == "a@x.com").count();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn request_approve_return_restocks_one_unit() {
    let srv = TestServer::spawn().await;
    let (hr_token, emp_token) = srv.company("b@x.com", "a@x.com").await;
    let id = srv.add_asset(&hr_token, "Laptop", 5).await;

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/assets/{id}"),
            &emp_token,
            Some(json!({ "requesterEmail": "a@x.com", "requesterName": "Ann", "notes": "for travel" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, pending) = srv.send(reqwest::Method::GET, "/pending_requests/b@x.com", &hr_token, None).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/asset_status_change/{id}"),
            &hr_token,
            Some(json!({ "status": "approved", "approvedDate": Utc::now() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv
        .send(reqwest::Method::PATCH, &format!("/asset_returned/{id}"), &emp_token, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, asset) = srv.send(reqwest::Method::GET, &format!("/assetOne/{id}"), &emp_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["status"], "returned");
    assert_eq!(asset["product_quantity"], 6);
    assert_eq!(asset["requesterEmail"], "a@x.com");
    assert!(asset["approvedDate"].is_string());
}

#[tokio::test]
async fn repeated_request_leaves_asset_unchanged() {
    let srv = TestServer::spawn().await;
    let (hr_token, emp_token) = srv.company("b@x.com", "a@x.com").await;
    let id = srv.add_asset(&hr_token, "Monitor", 3).await;

    let payload = json!({
        "requesterEmail": "a@x.com",
        "requesterName": "Ann",
        "requestDate": "2026-03-01T10:00:00Z",
        "notes": "desk setup",
    });
    let path = format!("/assets/{id}");
    srv.send(reqwest::Method::PUT, &path, &emp_token, Some(payload.clone())).await;
    let (_, first) = srv.send(reqwest::Method::GET, &format!("/assetOne/{id}"), &emp_token, None).await;

    srv.send(reqwest::Method::PUT, &path, &emp_token, Some(payload)).await;
    let (_, second) = srv.send(reqwest::Method::GET, &format!("/assetOne/{id}"), &emp_token, None).await;

    assert_eq!(first, second);
    assert_eq!(second["product_quantity"], 3);
}

#[tokio::test]
async fn request_payload_must_name_the_caller() {
    let srv = TestServer::spawn().await;
    let (hr_token, emp_token) = srv.company("b@x.com", "a@x.com").await;
    let id = srv.add_asset(&hr_token, "Laptop", 5).await;

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/assets/{id}"),
            &emp_token,
            Some(json!({ "requesterEmail": "someone-else@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn tenants_cannot_see_or_touch_each_others_assets() {
    let srv = TestServer::spawn().await;
    let (hr1, _) = srv.company("hr1@acme.io", "e1@acme.io").await;
    let (hr2, emp2) = srv.company("hr2@globex.io", "e2@globex.io").await;
    let id = srv.add_asset(&hr1, "Laptop", 5).await;

    let (_, page) = srv.send(reqwest::Method::GET, "/assets_get", &hr2, None).await;
    assert_eq!(page["total"], 0);
    assert_eq!(page["hasMore"], false);

    let (status, asset) = srv.send(reqwest::Method::GET, &format!("/assetOne/{id}"), &emp2, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset, Value::Null);

    let (status, _) = srv.send(reqwest::Method::PATCH, &format!("/asset_rejected/{id}"), &hr2, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/assets/{id}"),
            &emp2,
            Some(json!({ "requesterEmail": "e2@globex.io" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, result) = srv.send(reqwest::Method::DELETE, &format!("/asset/delete/{id}"), &hr2, None).await;
    assert_eq!(result["deletedCount"], 0);
}

#[tokio::test]
async fn employee_search_sees_company_inventory_paginated() {
    let srv = TestServer::spawn().await;
    let (hr_token, emp_token) = srv.company("b@x.com", "a@x.com").await;
    for (name, qty) in [("Laptop", 5), ("Laptop stand", 2), ("Chair", 12)] {
        srv.add_asset(&hr_token, name, qty).await;
    }

    let (status, page) = srv
        .send(reqwest::Method::GET, "/assets_get?search=laptop&sort=asc&size=1", &emp_token, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["hasMore"], true);
    assert_eq!(page["items"][0]["product_name"], "Laptop stand");

    let (_, low) = srv.send(reqwest::Method::GET, "/limited_stock/b@x.com", &hr_token, None).await;
    assert_eq!(low.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn approving_an_unknown_asset_is_not_found() {
    let srv = TestServer::spawn().await;
    let (hr_token, _) = srv.company("b@x.com", "a@x.com").await;

    let missing = uuid_like();
    let (status, body) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/asset_status_change/{missing}"),
            &hr_token,
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = srv
        .send(reqwest::Method::PATCH, "/asset_returned/not-an-id", &hr_token, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_creates_intent_and_records_payment() {
    let srv = TestServer::spawn().await;
    srv.signup("b@x.com", "hr").await;
    let token = srv.token_for("b@x.com").await;

    let (status, body) = srv
        .send(reqwest::Method::POST, "/create-payment-intent", &token, Some(json!({ "price": 15.0 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["clientSecret"].as_str().unwrap().contains("1500usd"));

    let (status, _) = srv
        .send(
            reqwest::Method::POST,
            "/payments",
            &token,
            Some(json!({ "email": "b@x.com", "category_price": 15.0, "category": 10, "transactionId": "pi_1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv
        .send(
            reqwest::Method::PATCH,
            "/users/payment/b@x.com",
            &token,
            Some(json!({ "category": 10, "payment": "paid" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, history) = srv.send(reqwest::Method::GET, "/payments/b@x.com", &token, None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["transactionId"], "pi_1");

    let (_, user) = srv.send(reqwest::Method::GET, "/usersCheck/b@x.com", &token, None).await;
    assert_eq!(user["payment"], "paid");
    assert_eq!(user["category"], 10);
}

#[tokio::test]
async fn unaffiliated_user_requests_and_returns_an_asset() {
    let srv = TestServer::spawn().await;
    let res = srv.client.post(srv.url("/users")).json(&json!({ "email": "a@x.com" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    srv.signup("b@x.com", "hr").await;
    let emp_token = srv.token_for("a@x.com").await;
    let hr_token = srv.token_for("b@x.com").await;
    let id = srv.add_asset(&hr_token, "Laptop", 5).await;

    let (status, body) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/assets/{id}"),
            &emp_token,
            Some(json!({ "requesterEmail": "a@x.com", "status": "pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body={body}");

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/asset_status_change/{id}"),
            &hr_token,
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv
        .send(reqwest::Method::PATCH, &format!("/asset_returned/{id}"), &emp_token, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, assets) = srv.send(reqwest::Method::GET, "/assets", &hr_token, None).await;
    let laptop = &assets.as_array().unwrap()[0];
    assert_eq!(laptop["product_quantity"], 6);
    assert_eq!(laptop["status"], "returned");
    assert_eq!(laptop["Item_Added_By"], "b@x.com");

    // Without a company there is nothing to own a brand-new asset.
    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/assets/{}", uuid_like()),
            &emp_token,
            Some(json!({ "requesterEmail": "a@x.com", "product_name": "Desk" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn request_cannot_approve_or_restock() {
    let srv = TestServer::spawn().await;
    let (hr_token, emp_token) = srv.company("b@x.com", "a@x.com").await;
    let id = srv.add_asset(&hr_token, "Laptop", 5).await;
    let path = format!("/assets/{id}");

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &path,
            &emp_token,
            Some(json!({ "requesterEmail": "a@x.com", "status": "approved", "product_quantity": 999 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &path,
            &emp_token,
            Some(json!({ "requesterEmail": "a@x.com", "product_quantity": 999, "product_name": "Gold" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, asset) = srv.send(reqwest::Method::GET, &format!("/assetOne/{id}"), &emp_token, None).await;
    assert_eq!(asset["status"], "pending");
    assert_eq!(asset["product_quantity"], 5);
    assert_eq!(asset["product_name"], "Laptop");
}

#[tokio::test]
async fn hr_cannot_take_over_another_companys_users() {
    let srv = TestServer::spawn().await;
    let (hr1, _) = srv.company("hr1@acme.io", "e1@acme.io").await;
    let (hr2, _) = srv.company("hr2@globex.io", "e2@globex.io").await;
    let employee = srv.user_id(&hr1, "e1@acme.io").await;
    let other_hr = srv.user_id(&hr1, "hr1@acme.io").await;

    for id in [&employee, &other_hr] {
        let (status, _) = srv
            .send(
                reqwest::Method::PATCH,
                &format!("/users/{id}"),
                &hr2,
                Some(json!({ "companyName": "Globex" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = srv.send(reqwest::Method::PATCH, &format!("/usersRemove/{employee}"), &hr2, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, users) = srv.send(reqwest::Method::GET, "/users", &hr1, None).await;
    let e1 = users.as_array().unwrap().iter().find(|u| u["email"] == "e1@acme.io").unwrap();
    assert_eq!(e1["Added_By"], "hr1@acme.io");
    assert_eq!(e1["companyName"], "hr1@acme.io inc");
}

#[tokio::test]
async fn company_roster_is_limited_to_own_company() {
    let srv = TestServer::spawn().await;
    let (_, emp1) = srv.company("hr1@acme.io", "e1@acme.io").await;
    srv.company("hr2@globex.io", "e2@globex.io").await;

    let (status, roster) = srv
        .send(reqwest::Method::GET, "/users/company/hr1@acme.io%20inc", &emp1, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster.as_array().unwrap().len(), 1);

    let (status, _) = srv
        .send(reqwest::Method::GET, "/users/company/hr2@globex.io%20inc", &emp1, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn uuid_like() -> String {
    "0190a6d4-5c1e-7a2b-9c3d-4e5f60718293".to_string()
}
