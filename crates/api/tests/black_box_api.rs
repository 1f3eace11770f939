use axum::ServiceExt;
use axum::extract::Request;
use bloodbank_infra::config::AppConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig::default()).await
    }

    async fn spawn_with(config: AppConfig) -> Self {
        // Same router as prod (in-memory store, seeded inventory), bound to an ephemeral port.
        let app = bloodbank_api::app::build_app(config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
                .await
                .unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.delete(self.url(path)).send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn register(&self, name: &str, email: &str, blood_group: &str) -> i64 {
        let (status, body) = self
            .post(
                "/auth/register",
                json!({
                    "name": name,
                    "email": email,
                    "password": "s3cret-pass",
                    "blood_group": blood_group,
                    "city": "Pune",
                    "state": "Maharashtra",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["user"]["id"].as_i64().unwrap()
    }

    async fn inventory(&self, blood_group: &str) -> Value {
        let encoded = blood_group.replace('+', "%2B");
        let (status, body) = self.get(&format!("/inventory/blood-group/{encoded}")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["inventory"].clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_and_unknown_endpoints() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "BloodBank API is running");
    assert!(body["timestamp"].is_string());

    let (status, body) = srv.get("/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "API endpoint not found" }));

    let (status, body) = srv.get("").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]["inventory"].is_object());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    let res = srv
        .client
        .get(srv.url("/health"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn trailing_slashes_reach_the_same_handlers() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]["donations"].is_object());

    let (status, body) = srv.get("/health/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "BloodBank API is running");

    let (status, body) = srv.get("/inventory/all/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(srv.url("/inventory/all"))
        .header("origin", "http://dashboard.local")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let preflight = srv
        .client
        .request(reqwest::Method::OPTIONS, srv.url("/inventory/reserve"))
        .header("origin", "http://dashboard.local")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert_eq!(preflight.headers()["access-control-allow-origin"], "*");
    assert!(preflight.headers().contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn malformed_input_is_a_400_envelope() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/inventory/reserve"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let (status, body) = srv.get("/blood-requests/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = srv.post("/inventory/reserve", json!({ "blood_group": "O+" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Blood group and units are required");

    let (status, _) = srv.post("/inventory/reserve", json!({ "blood_group": "O+", "units": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = srv.post("/inventory/add", json!({ "blood_group": "Z+", "units": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inventory_reserve_release_cycle() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/inventory/all").await;
    assert_eq!(status, StatusCode::OK);
    let groups: Vec<&str> = body["inventory"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["blood_group"].as_str().unwrap())
        .collect();
    assert_eq!(groups, ["A+", "A-", "AB+", "AB-", "B+", "B-", "O+", "O-"]);

    let (status, body) = srv.post("/inventory/add", json!({ "blood_group": "O+", "units": 10 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "10 units of O+ blood added to inventory");

    let (status, body) = srv.post("/inventory/reserve", json!({ "blood_group": "o+", "units": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "4 units of O+ blood reserved successfully");

    let entry = srv.inventory("O+").await;
    assert_eq!(entry["available_units"], 6);
    assert_eq!(entry["reserved_units"], 4);

    let (status, body) = srv.post("/inventory/reserve", json!({ "blood_group": "O+", "units": 7 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient O+ blood units. Available: 6");

    let (status, body) = srv.post("/inventory/release", json!({ "blood_group": "O+", "units": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient reserved O+ blood units. Reserved: 4");

    let (status, _) = srv.post("/inventory/release", json!({ "blood_group": "O+", "units": 4 })).await;
    assert_eq!(status, StatusCode::OK);

    let entry = srv.inventory("O+").await;
    assert_eq!(entry["available_units"], 10);
    assert_eq!(entry["reserved_units"], 0);
}

#[tokio::test]
async fn inventory_administration_and_reports() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post("/inventory/initialize", json!({ "blood_group": "AB-", "available_units": 3 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "seeded groups already exist: {body}");

    let (status, body) = srv
        .put(
            "/inventory/update",
            json!({ "blood_group": "A+", "available_units": 40, "reserved_units": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blood inventory updated successfully");

    let (status, body) = srv.put("/inventory/update", json!({ "blood_group": "A+" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Blood group, available units, and reserved units are required");

    let (status, body) = srv.get("/inventory/low-stock").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"], 10);
    let low = body["lowStock"].as_array().unwrap();
    assert_eq!(low.len(), 7);
    assert!(low.iter().all(|e| e["blood_group"] != "A+"));

    let (_, body) = srv.get("/inventory/low-stock?threshold=50").await;
    assert_eq!(body["lowStock"].as_array().unwrap().len(), 8);

    let (status, body) = srv.get("/inventory/statistics").await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["statistics"];
    assert_eq!(stats["totalAvailable"], 40);
    assert_eq!(stats["totalReserved"], 2);
    assert_eq!(stats["highestAvailable"]["blood_group"], "A+");
    assert_eq!(stats["criticalStockCount"], 7);
}

#[tokio::test]
async fn unseeded_inventory_can_be_initialized_once() {
    let srv = TestServer::spawn_with(AppConfig {
        seed_inventory: false,
        ..AppConfig::default()
    })
    .await;

    let (status, body) = srv.get("/inventory/blood-group/B-").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Blood group not found in inventory");

    let (status, body) = srv
        .post("/inventory/initialize", json!({ "blood_group": "B-", "available_units": 3 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Blood group B- initialized in inventory");

    let (status, body) = srv.post("/inventory/initialize", json!({ "blood_group": "B-" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Blood group already exists in inventory");

    assert_eq!(srv.inventory("B-").await["available_units"], 3);
}

#[tokio::test]
async fn register_login_and_profile() {
    let srv = TestServer::spawn().await;
    let id = srv.register("Asha Verma", "Asha@Example.com", "B+").await;

    let (status, body) = srv
        .post("/auth/register", json!({ "name": "Dup", "email": "asha@example.com", "password": "x", "blood_group": "B+" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with this email already exists");

    let (status, body) = srv.post("/auth/register", json!({ "name": "NoGroup", "email": "n@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name, email, password, and blood group are required");

    let (status, body) = srv
        .post("/auth/login", json!({ "email": "asha@example.com", "password": "s3cret-pass" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["id"], id);
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = srv
        .post("/auth/login", json!({ "email": "asha@example.com", "password": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, unknown) = srv
        .post("/auth/login", json!({ "email": "nobody@example.com", "password": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["message"], body["message"]);

    let (status, body) = srv.put(&format!("/auth/profile/{id}"), json!({ "city": "Nagpur" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully");

    let (status, body) = srv.get(&format!("/auth/profile/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["city"], "Nagpur");
    assert_eq!(body["user"]["name"], "Asha Verma");

    let (status, body) = srv.get("/auth/profile/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (_, body) = srv.get("/auth/users").await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn completing_a_donation_credits_inventory() {
    let srv = TestServer::spawn().await;
    let donor = srv.register("Ravi Kumar", "ravi@example.com", "A-").await;

    let (status, body) = srv
        .post(
            "/donations/schedule",
            json!({ "donor_id": donor, "donation_date": "2026-03-14", "blood_group": "A-", "units_donated": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Blood donation scheduled successfully");
    let donation_id = body["donation_id"].as_i64().unwrap();

    let (_, profile) = srv.get(&format!("/auth/profile/{donor}")).await;
    assert_eq!(profile["user"]["is_donor"], true);
    assert_eq!(profile["user"]["last_donation_date"], "2026-03-14");

    let (status, body) = srv
        .put(&format!("/donations/{donation_id}/complete"), json!({ "notes": "no complications" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blood donation completed successfully");
    assert_eq!(srv.inventory("A-").await["available_units"], 2);

    let (status, _) = srv.put(&format!("/donations/{donation_id}/complete"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = srv.put(&format!("/donations/{donation_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(srv.inventory("A-").await["available_units"], 2);

    let (_, body) = srv.get("/donations/by-blood-group/A-").await;
    let donations = body["donations"].as_array().unwrap();
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0]["status"], "Completed");
    assert_eq!(donations[0]["notes"], "no complications");
    assert_eq!(donations[0]["donor_name"], "Ravi Kumar");

    let (status, body) = srv.get("/donations/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statistics"]["totalDonations"], 1);
    assert_eq!(body["statistics"]["topDonors"][0]["total_units"], 2);
}

#[tokio::test]
async fn malformed_completion_body_changes_nothing() {
    let srv = TestServer::spawn().await;
    let donor = srv.register("Tara Sen", "tara@example.com", "A+").await;

    let (_, body) = srv
        .post(
            "/donations/schedule",
            json!({ "donor_id": donor, "donation_date": "2026-06-02", "blood_group": "A+", "units_donated": 2 }),
        )
        .await;
    let donation_id = body["donation_id"].as_i64().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/donations/{donation_id}/complete")))
        .header("content-type", "application/json")
        .body(r#"{"notes": "#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let (_, body) = srv.get(&format!("/donations/donor/{donor}")).await;
    assert_eq!(body["donations"][0]["status"], "Scheduled");
    assert_eq!(srv.inventory("A+").await["available_units"], 0);

    // No body at all is still a plain completion.
    let res = srv
        .client
        .put(srv.url(&format!("/donations/{donation_id}/complete")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(srv.inventory("A+").await["available_units"], 2);
}

#[tokio::test]
async fn cancelled_donation_leaves_inventory_alone() {
    let srv = TestServer::spawn().await;
    let donor = srv.register("Meera Das", "meera@example.com", "O-").await;

    let (_, body) = srv
        .post(
            "/donations/schedule",
            json!({ "donor_id": donor, "donation_date": "2026-04-01", "blood_group": "O-" }),
        )
        .await;
    let donation_id = body["donation_id"].as_i64().unwrap();

    let (status, body) = srv.put(&format!("/donations/{donation_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blood donation cancelled successfully");
    assert_eq!(srv.inventory("O-").await["available_units"], 0);

    let (_, body) = srv.get(&format!("/donations/donor/{donor}")).await;
    assert_eq!(body["donations"][0]["status"], "Cancelled");
    assert_eq!(body["donations"][0]["units_donated"], 1);
}

#[tokio::test]
async fn scheduling_checks_the_donor() {
    let srv = TestServer::spawn().await;
    let donor = srv.register("Kiran Rao", "kiran@example.com", "B-").await;

    let (status, body) = srv
        .post(
            "/donations/schedule",
            json!({ "donor_id": 4242, "donation_date": "2026-05-01", "blood_group": "B-" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Donor not found");

    let (status, body) = srv
        .post(
            "/donations/schedule",
            json!({ "donor_id": donor, "donation_date": "2026-05-01", "blood_group": "AB+" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Blood group does not match"));

    let (status, body) = srv.post("/donations/schedule", json!({ "donor_id": donor })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Donor ID, donation date, and blood group are required");

    let (status, _) = srv.put("/donations/777/complete", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blood_request_queries() {
    let srv = TestServer::spawn().await;
    let requester = srv.register("Leela Iyer", "leela@example.com", "AB+").await;

    let mut ids = Vec::new();
    for (patient, urgency) in [("P1", "Low"), ("P2", "Emergency"), ("P3", "High")] {
        let (status, body) = srv
            .post(
                "/blood-requests/create",
                json!({
                    "requester_id": requester,
                    "patient_name": patient,
                    "blood_group": "AB+",
                    "units_required": 2,
                    "urgency_level": urgency,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["message"], "Blood request created successfully");
        ids.push(body["request_id"].as_i64().unwrap());
    }

    let (status, body) = srv.post("/blood-requests/create", json!({ "patient_name": "P4" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Patient name, blood group, and units required are mandatory");

    let (_, body) = srv.get("/blood-requests/urgent/all").await;
    let urgent: Vec<&str> = body["requests"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["patient_name"].as_str().unwrap())
        .collect();
    assert_eq!(urgent, ["P2", "P3"]);

    let (_, body) = srv.get("/blood-requests/by-blood-group/AB%2B").await;
    assert_eq!(body["requests"][0]["patient_name"], "P2");
    assert_eq!(body["requests"].as_array().unwrap().len(), 3);

    let (_, body) = srv.get("/blood-requests/by-location?city=pune").await;
    assert_eq!(body["requests"].as_array().unwrap().len(), 3);
    assert_eq!(body["requests"][0]["requester_name"], "Leela Iyer");
    let (_, body) = srv.get("/blood-requests/by-location?city=Delhi").await;
    assert!(body["requests"].as_array().unwrap().is_empty());

    let (status, body) = srv
        .put(&format!("/blood-requests/{}/status", ids[1]), json!({ "status": "Fulfilled" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blood request status updated successfully");
    let (_, body) = srv.get(&format!("/blood-requests/{}", ids[1])).await;
    assert_eq!(body["request"]["status"], "Fulfilled");

    let (status, body) = srv.put(&format!("/blood-requests/{}/status", ids[0]), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Status is required");

    let (status, body) = srv.delete(&format!("/blood-requests/{}", ids[0])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blood request deleted successfully");
    let (status, _) = srv.delete(&format!("/blood-requests/{}", ids[0])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = srv.get("/blood-requests/all").await;
    assert_eq!(body["requests"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn contact_message_lifecycle() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post("/contact/submit", json!({ "name": "Sam", "email": "not-an-email", "message": "hi" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a valid email address");

    let (status, body) = srv.post("/contact/submit", json!({ "name": "Sam" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name, email, and message are required");

    let (status, body) = srv
        .post(
            "/contact/submit",
            json!({ "name": "Sam", "email": "sam@example.org", "message": "When is the next camp?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Message sent successfully");
    let id = body["message_id"].as_i64().unwrap();

    let (_, body) = srv.get("/contact/unread").await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);

    let (status, body) = srv.put(&format!("/contact/{id}/read"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message marked as read");

    let (_, body) = srv.get(&format!("/contact/{id}")).await;
    assert_eq!(body["message"]["status"], "Read");

    let (status, body) = srv.put(&format!("/contact/{id}/replied"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message marked as replied");

    let (_, body) = srv.get("/contact/statistics/overview").await;
    let stats = &body["statistics"];
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["replied"], 1);
    assert_eq!(stats["unread"], 0);
    assert_eq!(stats["recent"], 1);

    let (status, body) = srv.delete(&format!("/contact/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message deleted successfully");

    let (status, body) = srv.get(&format!("/contact/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Message not found");
}
