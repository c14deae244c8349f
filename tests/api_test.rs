use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use little_lemon::api::{create_router, AppState};
use little_lemon::auth;
use little_lemon::config::ManagerSeed;
use little_lemon::role::{Role, RoleSet};
use little_lemon::store::{EntityStore, MemoryStore};
use little_lemon::user::NewUser;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

struct Caller {
    id: u64,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = create_router(AppState::new(store.clone()));
        Self { router, store }
    }

    /// Creates a user directly in the store with a known token.
    fn user(&self, name: &str, roles: &[Role]) -> Caller {
        let user = self
            .store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@littlelemon.com"),
                password_hash: String::new(),
                roles: roles.iter().copied().collect::<RoleSet>(),
            })
            .unwrap();
        let token = format!("token-{name}");
        self.store.save_token(&token, user.id).unwrap();
        Caller { id: user.id, token }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&Caller>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", caller.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, caller: &Caller) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(caller), None).await
    }

    async fn post(&self, uri: &str, caller: &Caller, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(caller), Some(body)).await
    }

    async fn patch(&self, uri: &str, caller: &Caller, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(caller), Some(body)).await
    }

    /// Creates a category and a menu item in it as `manager`, returning the
    /// menu item id.
    async fn menu_item(&self, manager: &Caller, title: &str, price: &str) -> u64 {
        let (status, category) = self
            .post(
                "/categories",
                manager,
                json!({ "slug": title.to_lowercase(), "title": title }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{category}");
        let (status, item) = self
            .post(
                "/menu-item",
                manager,
                json!({ "title": title, "price": price, "category": category["id"] }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{item}");
        item["id"].as_u64().unwrap()
    }
}

fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

fn ids(list: &Value) -> Vec<u64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/menu-item", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let stranger = Caller {
        id: 0,
        token: "made-up".into(),
    };
    let (status, _) = app.get("/orders/", &stranger).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_and_token_login() {
    let app = TestApp::new();
    let (status, user) = app
        .call(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "username": "mario",
                "email": "mario@littlelemon.com",
                "password": "lemon-tree-1"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "mario");
    assert!(user.get("password").is_none());

    let (status, body) = app
        .call(
            Method::POST,
            "/users",
            None,
            Some(json!({ "username": "mario", "password": "lemon-tree-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["username"].is_array());

    let (status, _) = app
        .call(
            Method::POST,
            "/api-token-auth",
            None,
            Some(json!({ "username": "mario", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/api-token-auth",
            None,
            Some(json!({ "username": "mario", "password": "lemon-tree-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let mario = Caller {
        id: user["id"].as_u64().unwrap(),
        token: body["token"].as_str().unwrap().to_string(),
    };

    let (status, cart) = app.get("/cart/menu-items", &mario).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart, json!([]));
    assert!(app
        .store
        .get_user(mario.id)
        .unwrap()
        .unwrap()
        .roles
        .contains(Role::Customer));
}

#[tokio::test]
async fn only_managers_create_menu_items() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);
    let customer = app.user("tito", &[Role::Customer]);
    let crew = app.user("mario", &[Role::DeliveryCrew]);
    app.menu_item(&manager, "Pizza", "10.00").await;

    for caller in [&customer, &crew] {
        let (status, body) = app
            .post(
                "/menu-item",
                caller,
                json!({ "title": "Sneaky", "price": "1.00", "category": 1 }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["detail"].is_string());
    }

    let (status, items) = app.get("/menu-item", &customer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["title"], "Pizza");
}

#[tokio::test]
async fn menu_item_validation_reports_fields() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);

    let (status, body) = app
        .post("/menu-item", &manager, json!({ "price": "-3", "category": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["price"].is_array());

    let (status, body) = app
        .post(
            "/menu-item",
            &manager,
            json!({ "title": "Soup", "price": "4.50", "category": 99 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["category"].is_array());

    let (_, items) = app.get("/menu-item", &manager).await;
    assert_eq!(items, json!([]));
}

#[tokio::test]
async fn menu_items_can_be_filtered_ordered_and_edited() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);
    let customer = app.user("tito", &[Role::Customer]);
    let pizza = app.menu_item(&manager, "Pizza", "10.00").await;
    let soup = app.menu_item(&manager, "Soup", "4.50").await;

    let (_, items) = app.get("/menu-item?ordering=price", &customer).await;
    assert_eq!(ids(&items), vec![soup, pizza]);

    let (_, items) = app.get("/menu-item?ordering=-title", &customer).await;
    assert_eq!(ids(&items), vec![soup, pizza]);

    let (_, soup_item) = app.get(&format!("/menu-item/{soup}"), &customer).await;
    let soup_category = soup_item["category"].as_u64().unwrap();
    let (_, items) = app
        .get(&format!("/menu-item?category={soup_category}"), &customer)
        .await;
    assert_eq!(ids(&items), vec![soup]);

    let (status, _) = app.get("/menu-item?ordering=calories", &customer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(&format!("/menu-item/{pizza}"), &customer, json!({ "featured": true }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .patch(&format!("/menu-item/{pizza}"), &manager, json!({ "featured": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["featured"], true);
    assert_eq!(updated["title"], "Pizza");

    let (status, _) = app
        .call(Method::DELETE, &format!("/menu-item/{pizza}"), Some(&manager), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/menu-item/{pizza}"), &customer).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn carts_are_private_to_their_owner() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);
    let anna = app.user("anna", &[Role::Customer]);
    let bruno = app.user("bruno", &[Role::Customer]);
    let pizza = app.menu_item(&manager, "Pizza", "10.00").await;
    let soup = app.menu_item(&manager, "Soup", "4.50").await;

    app.post("/cart/menu-items", &anna, json!({ "menu_item": pizza, "quantity": 2 }))
        .await;
    let (status, row) = app
        .post("/cart/menu-items", &anna, json!({ "menu_item": pizza }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(row["quantity"], 3);
    assert_eq!(dec(&row["price"]), Decimal::new(30, 0));

    app.post("/cart/menu-items", &bruno, json!({ "menu_item": soup }))
        .await;

    let (_, anna_cart) = app.get("/cart/menu-items", &anna).await;
    let rows = anna_cart.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows.iter().all(|r| r["user"].as_u64() == Some(anna.id)));

    let (_, bruno_cart) = app.get("/cart/menu-items", &bruno).await;
    let rows = bruno_cart.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user"].as_u64(), Some(bruno.id));

    let (status, body) = app
        .post("/cart/menu-items", &anna, json!({ "menu_item": 999 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["menu_item"].is_array());

    let (status, _) = app
        .call(Method::DELETE, "/cart/menu-items", Some(&anna), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, anna_cart) = app.get("/cart/menu-items", &anna).await;
    assert_eq!(anna_cart, json!([]));
    let (_, bruno_cart) = app.get("/cart/menu-items", &bruno).await;
    assert_eq!(bruno_cart.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_turns_cart_into_order() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);
    let customer = app.user("tito", &[Role::Customer]);
    let pizza = app.menu_item(&manager, "Pizza", "10").await;

    app.post("/cart/menu-items", &customer, json!({ "menu_item": pizza, "quantity": 2 }))
        .await;
    let (status, order) = app.post("/orders/", &customer, json!({})).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dec(&order["total"]), Decimal::new(20, 0));
    assert_eq!(order["status"], false);
    assert_eq!(order["delivery_crew"], Value::Null);
    assert_eq!(order["user"].as_u64(), Some(customer.id));
    let items = order["order_items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["menu_item"].as_u64(), Some(pizza));
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(dec(&items[0]["price"]), Decimal::new(20, 0));
    assert_eq!(items[0]["order"], order["id"]);

    let (_, cart) = app.get("/cart/menu-items", &customer).await;
    assert_eq!(cart, json!([]));
}

#[tokio::test]
async fn order_total_matches_consumed_rows() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);
    let customer = app.user("tito", &[Role::Customer]);
    let pizza = app.menu_item(&manager, "Pizza", "12.50").await;
    let soup = app.menu_item(&manager, "Soup", "4.75").await;
    let salad = app.menu_item(&manager, "Salad", "7.20").await;

    for (item, quantity) in [(pizza, 3), (soup, 1), (salad, 4)] {
        app.post(
            "/cart/menu-items",
            &customer,
            json!({ "menu_item": item, "quantity": quantity }),
        )
        .await;
    }
    let (_, cart) = app.get("/cart/menu-items", &customer).await;
    let expected: Decimal = cart
        .as_array()
        .unwrap()
        .iter()
        .map(|row| dec(&row["unit_price"]) * Decimal::from(row["quantity"].as_u64().unwrap()))
        .sum();

    let (_, order) = app.post("/orders/", &customer, json!({})).await;
    assert_eq!(dec(&order["total"]), expected);
    assert_eq!(order["order_items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn empty_cart_checkout_creates_empty_order() {
    let app = TestApp::new();
    let customer = app.user("tito", &[Role::Customer]);
    let (status, order) = app.post("/orders/", &customer, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dec(&order["total"]), Decimal::ZERO);
    assert_eq!(order["order_items"], json!([]));
}

/// Customer A places an order assigned to crew B; customer C places another.
async fn scoped_setup(app: &TestApp) -> (Caller, Caller, Caller, Caller, u64, u64) {
    let manager = app.user("adrian", &[Role::Manager]);
    let a = app.user("anna", &[Role::Customer]);
    let b = app.user("bruno", &[Role::DeliveryCrew]);
    let c = app.user("carla", &[Role::Customer]);
    let pizza = app.menu_item(&manager, "Pizza", "10.00").await;

    app.post("/cart/menu-items", &a, json!({ "menu_item": pizza })).await;
    let (_, order_a) = app.post("/orders/", &a, json!({})).await;
    let order_a = order_a["id"].as_u64().unwrap();
    app.post("/cart/menu-items", &c, json!({ "menu_item": pizza })).await;
    let (_, order_c) = app.post("/orders/", &c, json!({})).await;
    let order_c = order_c["id"].as_u64().unwrap();

    let (status, _) = app
        .patch(
            &format!("/orders/{order_a}"),
            &manager,
            json!({ "delivery_crew": b.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    (manager, a, b, c, order_a, order_c)
}

#[tokio::test]
async fn order_lists_are_scoped_by_role() {
    let app = TestApp::new();
    let (manager, a, b, _c, order_a, order_c) = scoped_setup(&app).await;

    let (_, list) = app.get("/orders/", &a).await;
    assert_eq!(ids(&list), vec![order_a]);

    let (_, list) = app.get("/orders/", &b).await;
    assert_eq!(ids(&list), vec![order_a]);

    let (_, list) = app.get("/orders/", &manager).await;
    assert_eq!(ids(&list), vec![order_a, order_c]);

    let (status, _) = app.get(&format!("/orders/{order_c}"), &a).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/orders/{order_c}"), &b).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delivery_crew_may_only_change_status() {
    let app = TestApp::new();
    let (manager, _a, b, _c, order_a, order_c) = scoped_setup(&app).await;
    let other_crew = app.user("dario", &[Role::DeliveryCrew]);
    let (_, before) = app.get(&format!("/orders/{order_a}"), &manager).await;

    let (status, after) = app
        .patch(&format!("/orders/{order_a}"), &b, json!({ "status": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["status"], true);
    for field in ["user", "delivery_crew", "total", "date", "order_items"] {
        assert_eq!(after[field], before[field], "{field} changed");
    }

    let (status, _) = app
        .patch(
            &format!("/orders/{order_a}"),
            &b,
            json!({ "delivery_crew": other_crew.id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(
            &format!("/orders/{order_a}"),
            &b,
            json!({ "status": false, "delivery_crew": other_crew.id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, current) = app.get(&format!("/orders/{order_a}"), &manager).await;
    assert_eq!(current["delivery_crew"].as_u64(), Some(b.id));
    assert_eq!(current["status"], true);

    let (status, _) = app
        .patch(&format!("/orders/{order_c}"), &b, json!({ "status": true }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customers_cannot_fulfil_their_own_orders() {
    let app = TestApp::new();
    let (_manager, a, _b, _c, order_a, _order_c) = scoped_setup(&app).await;

    let (status, _) = app
        .patch(&format!("/orders/{order_a}"), &a, json!({ "status": true }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, order) = app
        .call(
            Method::PUT,
            &format!("/orders/{order_a}"),
            Some(&a),
            Some(json!({ "date": "2026-12-24" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["date"], "2026-12-24");
    assert_eq!(order["status"], false);
}

#[tokio::test]
async fn managers_assign_only_delivery_crew() {
    let app = TestApp::new();
    let (manager, _a, _b, c, _order_a, order_c) = scoped_setup(&app).await;

    let (status, body) = app
        .patch(
            &format!("/orders/{order_c}"),
            &manager,
            json!({ "delivery_crew": c.id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["delivery_crew"].is_array());

    let (status, order) = app
        .patch(
            &format!("/orders/{order_c}"),
            &manager,
            json!({ "status": true, "delivery_crew": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], true);
    assert_eq!(order["delivery_crew"], Value::Null);
}

#[tokio::test]
async fn only_managers_delete_orders() {
    let app = TestApp::new();
    let (manager, a, _b, _c, order_a, _order_c) = scoped_setup(&app).await;
    let uri = format!("/orders/{order_a}");

    let (status, _) = app.call(Method::DELETE, &uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::DELETE, &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rosters_are_managed_by_managers() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);
    let crew = app.user("mario", &[Role::DeliveryCrew]);
    let customer = app.user("tito", &[Role::Customer]);

    let (status, body) = app.get("/groups/managers/users", &crew).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You do not have the necessary authorizations");

    let (status, _) = app
        .post("/groups/delivery-crew/users", &customer, json!({ "username": "tito" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, added) = app
        .post("/groups/delivery-crew/users", &manager, json!({ "username": "tito" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["id"].as_u64(), Some(customer.id));

    let (_, roster) = app.get("/groups/delivery-crew/users", &manager).await;
    assert_eq!(ids(&roster), vec![crew.id, customer.id]);

    let (status, _) = app
        .post("/groups/delivery-crew/users", &manager, json!({ "username": "ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/groups/delivery-crew/users/{}", customer.id);
    let (status, body) = app.call(Method::DELETE, &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    let (status, _) = app.call(Method::DELETE, &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/groups/managers/users", &manager, json!({ "username": "mario" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, managers) = app.get("/groups/managers/users", &crew).await;
    assert_eq!(ids(&managers), vec![manager.id, crew.id]);
}

#[tokio::test]
async fn merged_cart_rows_stay_under_the_quantity_cap() {
    let app = TestApp::new();
    let manager = app.user("adrian", &[Role::Manager]);
    let customer = app.user("tito", &[Role::Customer]);
    let pizza = app.menu_item(&manager, "Pizza", "10.00").await;

    let (status, _) = app
        .post("/cart/menu-items", &customer, json!({ "menu_item": pizza, "quantity": 1000 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/cart/menu-items", &customer, json!({ "menu_item": pizza, "quantity": 1000 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["quantity"].is_array());

    let (_, cart) = app.get("/cart/menu-items", &customer).await;
    assert_eq!(cart[0]["quantity"], 1000);

    let (status, _) = app.get("/menu-item", &customer).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn registering_the_manager_username_first_grants_nothing() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::POST,
            "/users",
            None,
            Some(json!({ "username": "admin", "password": "attacker-pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let seed = ManagerSeed {
        username: "admin".into(),
        email: "admin@littlelemon.com".into(),
        password: SecretString::from("operator-secret".to_string()),
    };
    assert!(auth::seed_manager(app.store.as_ref(), &seed).is_err());

    let (_, body) = app
        .call(
            Method::POST,
            "/api-token-auth",
            None,
            Some(json!({ "username": "admin", "password": "attacker-pw" })),
        )
        .await;
    let squatter = Caller {
        id: 0,
        token: body["token"].as_str().unwrap().to_string(),
    };
    let (status, _) = app.get("/groups/managers/users", &squatter).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post("/categories", &squatter, json!({ "slug": "mains", "title": "Mains" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
