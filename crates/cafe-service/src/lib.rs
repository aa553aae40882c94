//! # cafe-service: Order Lifecycle & Analytics
//!
//! The operations a transport adapter exposes, wired to SQLite through
//! `cafe-db` and to the pure rules in `cafe-core`.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  OrderLifecycle          create · get · list · serve · close · update   │
//! │       │ writes                                                          │
//! │       ▼                                                                 │
//! │  ┌──────────┐   reads   TableOrderAggregator   active_total             │
//! │  │  orders  │ ◄──────── StatisticsEngine       period · waiter · cashier│
//! │  └──────────┘                                                           │
//! │                                                                         │
//! │  NotificationHub ◄── publish(OrderEvent::Created) after every create    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No component keeps mutable state of its own apart from the hub's
//! subscriber registry; everything else lives in the database.
//!
//! ## Usage
//! ```rust,ignore
//! let config = ServiceConfig::load()?;
//! let services = Services::connect(
//!     &config,
//!     Arc::new(SnapshotValidator),
//!     Arc::new(KnownTables::new(["t1", "t2"])),
//! )
//! .await?;
//!
//! let ctx = config.request_context();
//! let order = services.lifecycle.create(&ctx, "t1", items).await?;
//! services.lifecycle.serve(&ctx, &order.id, "waiter-7").await?;
//! ```

pub mod aggregator;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod statistics;
pub mod telemetry;

use std::sync::Arc;

use cafe_core::SelfOrAdmin;
use cafe_db::Database;

pub use aggregator::TableOrderAggregator;
pub use collaborators::{CatalogValidator, KnownTables, SnapshotValidator, TableDirectory};
pub use config::{ConfigError, ServiceConfig};
pub use context::RequestContext;
pub use error::{PersistenceError, ServiceError, ServiceResult};
pub use lifecycle::{CloseOutcome, CloseScope, OrderLifecycle};
pub use notify::{NotificationHub, NotificationSink, OrderEvent, Subscription};
pub use statistics::StatisticsEngine;

/// The three components sharing one database and one notification hub.
#[derive(Debug, Clone)]
pub struct Services {
    pub lifecycle: OrderLifecycle,
    pub aggregator: TableOrderAggregator,
    pub statistics: StatisticsEngine,
    pub hub: NotificationHub,
}

impl Services {
    /// Wires the components over an open database. Statistics use the
    /// self-or-admin policy.
    pub fn new(
        db: Database,
        hub: NotificationHub,
        catalog: Arc<dyn CatalogValidator>,
        tables: Arc<dyn TableDirectory>,
    ) -> Self {
        Services {
            lifecycle: OrderLifecycle::new(db.clone(), catalog, tables, Arc::new(hub.clone())),
            aggregator: TableOrderAggregator::new(db.clone()),
            statistics: StatisticsEngine::new(db, Arc::new(SelfOrAdmin)),
            hub,
        }
    }

    /// Opens (and migrates) the configured database, then wires the
    /// components.
    pub async fn connect(
        config: &ServiceConfig,
        catalog: Arc<dyn CatalogValidator>,
        tables: Arc<dyn TableDirectory>,
    ) -> ServiceResult<Self> {
        let db = Database::new(config.db_config()).await?;
        let hub = NotificationHub::new(config.notify_buffer);
        Ok(Services::new(db, hub, catalog, tables))
    }
}
