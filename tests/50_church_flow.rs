mod common;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use flock_api::database::models::tenant::NewTenant;
use flock_api::database::{migrations, DatabaseManager};
use flock_api::services::TenantService;

const ADMIN: &str = "pastor.j";
const PASSWORD: &str = "shepherd-42";

struct Session<'a> {
    client: Client,
    base: &'a str,
    token: String,
}

impl Session<'_> {
    async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base, path))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(reqwest::Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(reqwest::Method::DELETE, path, None).await
    }
}

/// Provision a scratch tenant, or `None` when no database is reachable
async fn provision_tenant() -> Option<String> {
    let _ = dotenvy::dotenv();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    }
    let pool = match DatabaseManager::main_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("skipping: main database unavailable: {}", e);
            return None;
        }
    };
    if let Err(e) = migrations::apply_main_schema(&pool).await {
        eprintln!("skipping: cannot apply main schema: {}", e);
        return None;
    }

    let name = format!("itest-{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
    let service = TenantService::new().await.ok()?;
    match service
        .create_tenant(NewTenant {
            name: name.clone(),
            display_name: Some("Integration Chapel".into()),
            admin_auth: ADMIN.into(),
            admin_password: PASSWORD.into(),
        })
        .await
    {
        Ok(_) => Some(name),
        Err(e) => {
            eprintln!("skipping: cannot provision tenant: {}", e);
            None
        }
    }
}

async fn remove_tenant(name: &str) -> Result<()> {
    let tenant = TenantService::new().await?.get_tenant(name).await?;
    DatabaseManager::drop_database(&tenant.database).await?;
    let pool = DatabaseManager::main_pool().await?;
    sqlx::query("DELETE FROM tenants WHERE name = $1").bind(name).execute(&pool).await?;
    Ok(())
}

async fn login(client: &Client, base: &str, tenant: &str) -> Result<String> {
    let res = client
        .post(format!("{}/auth/login/{}/{}", base, tenant, ADMIN))
        .json(&json!({ "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["access"], "full");
    body["data"]["token"].as_str().map(str::to_string).context("token missing")
}

fn id_of(body: &Value) -> String {
    body["data"]["id"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn pastoral_workflow_end_to_end() -> Result<()> {
    let Some(tenant) = provision_tenant().await else {
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let result = run_workflow(&server.base_url, &tenant).await;
    remove_tenant(&tenant).await?;
    result
}

async fn run_workflow(base: &str, tenant: &str) -> Result<()> {
    let client = Client::new();

    // Wrong password is a 401, not a 404
    let res = client
        .post(format!("{}/auth/login/{}/{}", base, tenant, ADMIN))
        .json(&json!({ "password": "wrong-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = login(&client, base, tenant).await?;
    let s = Session { client: client.clone(), base, token };

    let (status, me) = s.get("/api/auth/whoami").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["tenant"], tenant);

    // Members
    let (status, leader) = s
        .post("/api/members", json!({ "first_name": "Ruth", "last_name": "Moabite", "status": "active" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", leader);
    let leader_id = id_of(&leader);

    let (_, boaz) = s
        .post("/api/members", json!({ "first_name": "Boaz", "last_name": "Bethlehem", "status": "active" }))
        .await?;
    let boaz_id = id_of(&boaz);

    // A cell leader needs a leadership role first
    let (status, body) = s
        .post("/api/cell-groups", json!({ "name": "Harvest", "leader_id": leader_id }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = s
        .post(&format!("/api/members/{}/roles", leader_id), json!({ "role": "cell_leader" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, cell) = s
        .post("/api/cell-groups", json!({ "name": "Harvest", "leader_id": leader_id, "meeting_day": "Friday" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", cell);
    let cell_id = id_of(&cell);

    let (status, _) = s
        .post(&format!("/api/cell-groups/{}/members", cell_id), json!({ "member_id": boaz_id }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, summary) = s.get(&format!("/api/cell-groups/{}", cell_id)).await?;
    assert_eq!(summary["data"]["member_count"], 2);
    assert_eq!(summary["data"]["leader_name"], "Ruth Moabite");

    // The leader cannot be removed from the member list or deleted
    let (status, _) = s.delete(&format!("/api/cell-groups/{}/members/{}", cell_id, leader_id)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = s.delete(&format!("/api/members/{}", leader_id)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Filtered search
    let (status, found) = s
        .post(
            "/api/members/find",
            json!({ "where": { "last_name": { "$ilike": "bethle%" } }, "order": "first_name" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", found);
    assert_eq!(found["data"]["total"], 1);
    assert_eq!(found["data"]["items"][0]["id"], boaz_id.as_str());

    // Values that cannot be cast to the column type are client errors
    let (status, body) = s.post("/api/members/find", json!({ "where": { "id": "not-a-uuid" } })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    common::assert_error_envelope(&body);
    let (status, _) = s
        .post("/api/members/find", json!({ "where": { "birth_date": { "$ilike": "19%" } } }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A cell leader stays active while leading
    let (status, _) = s
        .call(reqwest::Method::PATCH, &format!("/api/members/{}", leader_id), Some(json!({ "status": "visitor" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Exit deactivates the member and frees the cell membership
    let (status, exit) = s
        .post("/api/exits", json!({ "member_id": boaz_id, "exit_type": "moved", "reason": "Moved to Moab" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", exit);
    let exit_id = id_of(&exit);

    let (_, member) = s.get(&format!("/api/members/{}", boaz_id)).await?;
    assert_eq!(member["data"]["status"], "inactive");
    let (_, summary) = s.get(&format!("/api/cell-groups/{}", cell_id)).await?;
    assert_eq!(summary["data"]["member_count"], 1);

    let (status, _) = s
        .post("/api/exits", json!({ "member_id": boaz_id, "exit_type": "moved" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "second active exit must be refused");

    let (status, reinstated) = s
        .post(&format!("/api/exits/{}/reinstate", exit_id), json!({ "notes": "Came back" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", reinstated);
    assert_eq!(reinstated["data"]["status"], "reinstated");

    let (_, member) = s.get(&format!("/api/members/{}", boaz_id)).await?;
    assert_eq!(member["data"]["status"], "active");

    let (_, audit) = s.get(&format!("/api/members/{}/audit", boaz_id)).await?;
    let actions: Vec<&str> = audit["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["action"].as_str()).collect())
        .unwrap_or_default();
    assert!(actions.contains(&"exit_recorded") && actions.contains(&"reinstated"), "{:?}", actions);

    // Giving
    for amount in ["25.50", "10.00"] {
        let (status, gift) = s
            .post("/api/giving", json!({ "member_id": leader_id, "amount": amount, "fund": "general" }))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "{}", gift);
    }
    let (status, _) = s
        .post("/api/giving", json!({ "member_id": leader_id, "amount": "-5", "fund": "general" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, giving) = s.get(&format!("/api/members/{}/giving/summary", leader_id)).await?;
    assert_eq!(giving["data"]["gifts"], 2);
    let total: f64 = match &giving["data"]["total"] {
        Value::String(s) => s.parse()?,
        other => other.as_f64().unwrap_or_default(),
    };
    assert!((total - 35.5).abs() < 1e-9, "{}", giving);

    // Prayer
    let (status, prayer) = s
        .post("/api/prayer-requests", json!({ "member_id": leader_id, "title": "Harvest season" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", prayer);
    let (status, answered) = s
        .call(
            reqwest::Method::PATCH,
            &format!("/api/prayer-requests/{}", id_of(&prayer)),
            Some(json!({ "status": "answered" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(answered["data"]["answered_at"].is_string(), "{}", answered);

    // Root tier needs a sudo token
    let (status, _) = s.get("/api/root/tenants").await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, sudo) = s.post("/api/auth/sudo", json!({ "password": PASSWORD })).await?;
    assert_eq!(status, StatusCode::OK, "{}", sudo);
    let root = Session {
        client,
        base,
        token: sudo["data"]["token"].as_str().context("sudo token missing")?.to_string(),
    };
    let (status, tenants) = root.get(&format!("/api/root/tenants/{}", tenant)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tenants["data"]["name"], tenant);

    Ok(())
}
