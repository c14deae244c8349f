//! Little Lemon ordering API
//!
//! A role-based REST service for a restaurant: menu items, per-user carts and
//! orders, exposed to customers, delivery crew and managers with different
//! privileges.
//!
//! # Architecture
//!
//! * `api` - Axum router and one handler module per resource
//! * `auth` - Token authentication, password hashing, manager seeding
//! * `policy` - Pure authorization rules and order scoping
//! * `role` - Groups a user can belong to and their precedence
//! * `checkout` - Cart to order conversion
//! * `store` - Entity persistence (Redis, or in memory)
//! * `menu`, `user`, `cart`, `order` - Records and request validation
//! * `config` - Environment configuration
//! * `error` - Error handling and HTTP response mapping
//!
//! ## Roles
//!
//! A user may belong to any of the Manager, Delivery Crew and Customer
//! groups. Authorization uses the highest of them (Manager, then Delivery
//! Crew, then Customer); a user in no group is treated as a customer.
//! Registration puts new users in the Customer group.
//!
//! ## Checkout
//!
//! `POST /orders/` turns every row of the caller's cart into an order item,
//! sums the line prices into the order total and empties the cart. The
//! whole step runs in one store transaction.
//!
//! # Environment Configuration
//!
//! ```bash
//! REDIS_URL=redis://localhost:6379    # Redis connection URL
//! HOST=127.0.0.1                      # Server host
//! PORT=3000                           # Server port
//! RUST_LOG=info                       # Logging level
//! MANAGER_USERNAME=admin              # Optional first manager account
//! MANAGER_PASSWORD=change-me-please
//! MANAGER_EMAIL=admin@littlelemon.com
//! ```
//!
//! # API Endpoints
//!
//! All endpoints except `POST /users` and `POST /api-token-auth` require an
//! `Authorization: Token <key>` header.
//!
//! | Method | Path | Who |
//! |---|---|---|
//! | POST | `/users` | anyone |
//! | POST | `/api-token-auth` | anyone |
//! | GET, POST | `/categories` | read: all, write: managers |
//! | GET, POST | `/menu-item` | read: all, write: managers |
//! | GET, PUT, PATCH, DELETE | `/menu-item/:id` | read: all, write: managers |
//! | GET, POST | `/groups/managers/users` | managers |
//! | GET, DELETE | `/groups/managers/users/:id` | managers |
//! | GET, POST | `/groups/delivery-crew/users` | managers |
//! | GET, DELETE | `/groups/delivery-crew/users/:id` | managers |
//! | GET, POST, DELETE | `/cart/menu-items` | own cart |
//! | GET, POST | `/orders/` | scoped by role |
//! | GET, PUT, PATCH, DELETE | `/orders/:id` | scoped by role |
//!
//! ## POST /cart/menu-items
//!
//! ```json
//! { "menu_item": 3, "quantity": 2 }
//! ```
//!
//! ## PATCH /orders/:id
//!
//! ```json
//! { "status": true }
//! ```
//!
//! Managers may also send `delivery_crew` and `date`; delivery crew may only
//! send `status`; customers may only send `date`.

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod listing;
pub mod menu;
pub mod order;
pub mod policy;
pub mod role;
pub mod store;
pub mod user;
