//! ---
//! probe_section: "05-testing-qa"
//! probe_subsection: "integration-tests"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "In-process mock of the store API used by the integration suites."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use apiprobe_common::{keys, MapConfig};
use apiprobe_harness::Harness;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const EMAIL: &str = "admin@mail.com";
pub const PASSWORD: &str = "admin123";
pub const API_PREFIX: &str = "/api/v1";

type Shared = State<Arc<StoreState>>;
type Reply = Result<Response, Response>;

pub struct StoreState {
    logins: AtomicUsize,
    refreshes: AtomicUsize,
    token_seq: AtomicU64,
    access_ttl_secs: AtomicI64,
    list_delay_ms: AtomicU64,
    auth_delay_ms: AtomicU64,
    auth_in_flight: AtomicUsize,
    max_auth_in_flight: AtomicUsize,
    access_tokens: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashSet<String>>,
    next_id: AtomicU64,
    products: Mutex<BTreeMap<u64, Value>>,
    categories: Mutex<BTreeMap<u64, Value>>,
    users: Mutex<BTreeMap<u64, Value>>,
}

impl StoreState {
    fn seeded() -> Self {
        let clothes = json!({ "id": 1, "name": "Clothes", "slug": "clothes", "image": "https://img.test/c1.png" });
        let shoes = json!({ "id": 2, "name": "Shoes", "slug": "shoes", "image": "https://img.test/c2.png" });
        let products = [
            (1, "Classic Red Shirt", 25.0, &clothes),
            (2, "Classic Blue Shirt", 27.0, &clothes),
            (3, "Trail Runner", 89.5, &shoes),
        ]
        .into_iter()
        .map(|(id, title, price, category)| {
            let slug = title.to_lowercase().replace(' ', "-");
            (
                id,
                json!({
                    "id": id,
                    "title": title,
                    "slug": slug,
                    "price": price,
                    "description": format!("{title} for integration runs"),
                    "category": category,
                    "images": ["https://img.test/p.png"],
                }),
            )
        })
        .collect();
        let users = BTreeMap::from([(
            1,
            json!({
                "id": 1,
                "email": EMAIL,
                "password": PASSWORD,
                "name": "Admin",
                "role": "admin",
                "avatar": "https://img.test/u1.png",
            }),
        )]);
        Self {
            logins: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            token_seq: AtomicU64::new(0),
            access_ttl_secs: AtomicI64::new(3600),
            list_delay_ms: AtomicU64::new(0),
            auth_delay_ms: AtomicU64::new(0),
            auth_in_flight: AtomicUsize::new(0),
            max_auth_in_flight: AtomicUsize::new(0),
            access_tokens: Mutex::new(HashSet::new()),
            refresh_tokens: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(100),
            products: Mutex::new(products),
            categories: Mutex::new(BTreeMap::from([(1, clothes), (2, shoes)])),
            users: Mutex::new(users),
        }
    }

    fn mint_pair(&self) -> Value {
        let seq = self.token_seq.fetch_add(1, Ordering::SeqCst);
        let exp = Utc::now().timestamp() + self.access_ttl_secs.load(Ordering::SeqCst);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(json!({ "sub": 1, "exp": exp, "n": seq }).to_string());
        let access = format!("{header}.{claims}.sig");
        let refresh = format!("refresh-{seq}");
        self.access_tokens.lock().insert(access.clone());
        self.refresh_tokens.lock().insert(refresh.clone());
        json!({ "access_token": access, "refresh_token": refresh })
    }

    /// Track overlapping auth exchanges and apply the configured delay.
    async fn hold_auth(&self) {
        let now = self.auth_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_auth_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = self.auth_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.auth_in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        match token {
            Some(token) if self.access_tokens.lock().contains(token) => Ok(()),
            _ => Err(error(StatusCode::UNAUTHORIZED, "Unauthorized")),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

/// Handle to a running mock server.
pub struct MockStore {
    pub base_url: String,
    state: Arc<StoreState>,
}

impl MockStore {
    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.state.refreshes.load(Ordering::SeqCst)
    }

    /// Lifetime stamped into the `exp` claim of tokens minted from now on.
    pub fn set_access_ttl(&self, secs: i64) {
        self.state.access_ttl_secs.store(secs, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state
            .list_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_auth_delay(&self, delay: Duration) {
        self.state
            .auth_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Highest number of login/refresh requests seen at the same time.
    pub fn max_auth_in_flight(&self) -> usize {
        self.state.max_auth_in_flight.load(Ordering::SeqCst)
    }

    pub fn revoke_refresh_tokens(&self) {
        self.state.refresh_tokens.lock().clear();
    }

    pub fn revoke_access_tokens(&self) {
        self.state.access_tokens.lock().clear();
    }

    /// Complete configuration pointing at this server.
    pub fn config(&self) -> Arc<MapConfig> {
        Arc::new(settings_for(&self.base_url))
    }

    pub fn harness(&self) -> Harness {
        Harness::from_provider(self.config()).expect("harness for mock store")
    }
}

pub fn settings_for(base_url: &str) -> MapConfig {
    MapConfig::from_pairs([
        (keys::BASE_URL, base_url),
        (keys::ENVIRONMENT, "test"),
        (keys::CONNECTION_TIMEOUT_MS, "1000"),
        (keys::READ_TIMEOUT_MS, "2000"),
        (keys::MAX_RESPONSE_LATENCY_MS, "2000"),
        (keys::LOG_REQUEST, "true"),
        (keys::LOG_RESPONSE, "true"),
        (keys::CLIENT_EMAIL, EMAIL),
        (keys::CLIENT_PASSWORD, PASSWORD),
        (keys::RETRY_ENABLED, "false"),
    ])
}

/// A base URL on which nothing is listening.
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe port");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}{API_PREFIX}")
}

pub async fn spawn() -> MockStore {
    let state = Arc::new(StoreState::seeded());
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh))
        .route("/auth/profile", get(profile))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/related", get(related_products))
        .route("/products/slug/:slug", get(product_by_slug))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", get(get_category))
        .route("/categories/:id/products", get(category_products))
        .route("/users", get(list_users).post(create_user))
        .route("/users/is-available", post(is_available))
        .route("/users/:id", get(get_user))
        .with_state(state.clone());
    let router = Router::new().nest(API_PREFIX, api);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock store");
    let addr = listener.local_addr().expect("mock store addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    MockStore {
        base_url: format!("http://{addr}{API_PREFIX}"),
        state,
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "message": message, "statusCode": status.as_u16() })),
    )
        .into_response()
}

fn parse_id(raw: &str) -> Result<u64, Response> {
    raw.parse().map_err(|_| {
        error(
            StatusCode::BAD_REQUEST,
            "Validation failed (numeric string is expected)",
        )
    })
}

fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str, Response> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, &format!("{field} should not be empty")))
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Reply {
    state.logins.fetch_add(1, Ordering::SeqCst);
    state.hold_auth().await;
    let email = body.get("email").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if email != Some(EMAIL) || password != Some(PASSWORD) {
        return Err(error(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    Ok((StatusCode::CREATED, Json(state.mint_pair())).into_response())
}

async fn refresh(State(state): Shared, Json(body): Json<Value>) -> Reply {
    state.refreshes.fetch_add(1, Ordering::SeqCst);
    state.hold_auth().await;
    let token = required_str(&body, "refreshToken")?;
    if !state.refresh_tokens.lock().remove(token) {
        return Err(error(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    Ok((StatusCode::CREATED, Json(state.mint_pair())).into_response())
}

async fn profile(State(state): Shared, headers: HeaderMap) -> Reply {
    state.authorize(&headers)?;
    let user = state.users.lock().get(&1).cloned().unwrap_or(Value::Null);
    Ok(Json(user).into_response())
}

async fn list_products(State(state): Shared, Query(query): Query<HashMap<String, String>>) -> Reply {
    let delay = state.list_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let offset = match query.get("offset") {
        Some(raw) => parse_id(raw)? as usize,
        None => 0,
    };
    let limit = match query.get("limit") {
        Some(raw) => parse_id(raw)? as usize,
        None => usize::MAX,
    };
    let title = query.get("title").map(|t| t.to_lowercase());
    let products: Vec<Value> = state
        .products
        .lock()
        .values()
        .filter(|p| match &title {
            Some(needle) => p["title"]
                .as_str()
                .is_some_and(|t| t.to_lowercase().contains(needle)),
            None => true,
        })
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();
    Ok(Json(products).into_response())
}

async fn create_product(State(state): Shared, Json(body): Json<Value>) -> Reply {
    let title = required_str(&body, "title")?.to_owned();
    let category_id = body
        .get("categoryId")
        .and_then(Value::as_u64)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "categoryId must be a number"))?;
    let category = state
        .categories
        .lock()
        .get(&category_id)
        .cloned()
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "Could not find any entity of type \"Category\""))?;
    let id = state.next_id();
    let product = json!({
        "id": id,
        "title": title,
        "slug": title.to_lowercase().replace(' ', "-"),
        "price": body.get("price").cloned().unwrap_or(json!(0)),
        "description": body.get("description").cloned().unwrap_or(json!("")),
        "category": category,
        "images": body.get("images").cloned().unwrap_or(json!([])),
        "creationAt": Utc::now().to_rfc3339(),
    });
    state.products.lock().insert(id, product.clone());
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

// The live service answers 400 rather than 404 for unknown products.
fn missing_product() -> Response {
    error(
        StatusCode::BAD_REQUEST,
        "Could not find any entity of type \"Product\"",
    )
}

async fn get_product(State(state): Shared, Path(raw): Path<String>) -> Reply {
    let id = parse_id(&raw)?;
    let product = state.products.lock().get(&id).cloned();
    product.map(|p| Json(p).into_response()).ok_or_else(missing_product)
}

async fn update_product(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let id = parse_id(&raw)?;
    let mut products = state.products.lock();
    let product = products.get_mut(&id).ok_or_else(missing_product)?;
    for field in ["title", "price", "description", "images"] {
        if let Some(value) = body.get(field) {
            product[field] = value.clone();
        }
    }
    product["updatedAt"] = json!(Utc::now().to_rfc3339());
    Ok(Json(product.clone()).into_response())
}

async fn delete_product(State(state): Shared, Path(raw): Path<String>) -> Reply {
    let id = parse_id(&raw)?;
    state
        .products
        .lock()
        .remove(&id)
        .map(|_| Json(true).into_response())
        .ok_or_else(missing_product)
}

async fn related_products(State(state): Shared, Path(raw): Path<String>) -> Reply {
    let id = parse_id(&raw)?;
    let products = state.products.lock();
    let category = products
        .get(&id)
        .ok_or_else(missing_product)?
        .get("category")
        .and_then(|c| c.get("id"))
        .cloned();
    let related: Vec<Value> = products
        .values()
        .filter(|p| p["id"] != json!(id) && p["category"].get("id").cloned() == category)
        .cloned()
        .collect();
    Ok(Json(related).into_response())
}

async fn product_by_slug(State(state): Shared, Path(slug): Path<String>) -> Reply {
    let product = state
        .products
        .lock()
        .values()
        .find(|p| p["slug"] == json!(slug))
        .cloned();
    product.map(|p| Json(p).into_response()).ok_or_else(missing_product)
}

async fn list_categories(State(state): Shared) -> Reply {
    let categories: Vec<Value> = state.categories.lock().values().cloned().collect();
    Ok(Json(categories).into_response())
}

async fn create_category(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    state.authorize(&headers)?;
    let name = required_str(&body, "name")?.to_owned();
    let id = state.next_id();
    let category = json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "image": body.get("image").cloned().unwrap_or(json!("")),
    });
    state.categories.lock().insert(id, category.clone());
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

async fn get_category(State(state): Shared, Path(raw): Path<String>) -> Reply {
    let id = parse_id(&raw)?;
    let category = state.categories.lock().get(&id).cloned();
    category
        .map(|c| Json(c).into_response())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Category not found"))
}

async fn category_products(State(state): Shared, Path(raw): Path<String>) -> Reply {
    let id = parse_id(&raw)?;
    let products: Vec<Value> = state
        .products
        .lock()
        .values()
        .filter(|p| p["category"]["id"] == json!(id))
        .cloned()
        .collect();
    Ok(Json(products).into_response())
}

async fn list_users(State(state): Shared) -> Reply {
    let users: Vec<Value> = state.users.lock().values().cloned().collect();
    Ok(Json(users).into_response())
}

async fn create_user(State(state): Shared, Json(body): Json<Value>) -> Reply {
    let email = required_str(&body, "email")?.to_owned();
    let name = required_str(&body, "name")?.to_owned();
    let password = required_str(&body, "password")?.to_owned();
    let id = state.next_id();
    let user = json!({
        "id": id,
        "email": email,
        "password": password,
        "name": name,
        "role": "customer",
        "avatar": body.get("avatar").cloned().unwrap_or(json!("")),
    });
    state.users.lock().insert(id, user.clone());
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn is_available(State(state): Shared, Json(body): Json<Value>) -> Reply {
    let email = required_str(&body, "email")?;
    let taken = state.users.lock().values().any(|u| u["email"] == json!(email));
    Ok((StatusCode::CREATED, Json(json!({ "isAvailable": !taken }))).into_response())
}

async fn get_user(State(state): Shared, Path(raw): Path<String>) -> Reply {
    let id = parse_id(&raw)?;
    let user = state.users.lock().get(&id).cloned();
    user.map(|u| Json(u).into_response())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))
}
