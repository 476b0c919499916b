//! Emitter - the producer-facing facade
//!
//! Each `emit_*` call maps a typed commerce input to a [`RawEvent`] for the
//! primary store and to destination-specific payloads for the forwarders,
//! then attempts every configured destination. A failing destination never
//! prevents the others from being tried; all failures come back together in
//! one [`EmitError`].

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Url;
use serde_json::{Value, json};
use tally_config::Config;
use tally_protocol::{
    EventName, Order, PageView, Product, Properties, RawEvent, User, into_properties,
};
use tally_sinks::datastore::ensure_schema;
use tally_sinks::{
    Analytics, AnalyticsEvent, AnalyticsForwarder, Capture, ClickHouseStore, Datastore,
    DatastoreWriter, ForwarderError, Insights, InsightsForwarder, WriterConfig,
};

use crate::destinations::{analytics_config, clickhouse_config, insights_config, writer_config};
use crate::error::{Destination, EmitError, Failures, Operation};

/// Group type used for organization group analytics
const ORGANIZATION_GROUP: &str = "organization";

/// Unified event emitter
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Emitter {
    datastore_enabled: bool,
    writer_config: WriterConfig,
    /// Swapped by `set_datastore` while emits are in flight
    writer: RwLock<Option<Arc<DatastoreWriter>>>,
    insights: Option<InsightsForwarder>,
    analytics: Option<AnalyticsForwarder>,
}

impl Emitter {
    /// Create an emitter with only the HTTP forwarders
    ///
    /// A forwarder section that is disabled or lacks its endpoint or
    /// credential is skipped without error. Must be called from within a
    /// tokio runtime when a forwarder runs in async mode.
    ///
    /// # Errors
    ///
    /// Returns an error if a forwarder's HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, ForwarderError> {
        let insights = if config.insights.is_active() {
            let forwarder = InsightsForwarder::new(
                Insights::new(config.insights.api_key.as_str()),
                insights_config(&config.insights),
            )?;
            tracing::info!(url = %forwarder.url(), "insights forwarding enabled");
            Some(forwarder)
        } else {
            None
        };

        let analytics = if config.analytics.is_active() {
            let forwarder = AnalyticsForwarder::new(
                Analytics::new(config.analytics.website_id.as_str()),
                analytics_config(&config.analytics),
            )?;
            tracing::info!(url = %forwarder.url(), "analytics forwarding enabled");
            Some(forwarder)
        } else {
            None
        };

        Ok(Self {
            datastore_enabled: config.datastore.enabled,
            writer_config: writer_config(&config.datastore),
            writer: RwLock::new(None),
            insights,
            analytics,
        })
    }

    /// Create an emitter that also writes to `store`
    ///
    /// The schema is bootstrapped first, bounded by `schema_timeout`; a
    /// failure is logged and the writer starts anyway. Nothing is written
    /// when the datastore section is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if a forwarder's HTTP client cannot be built.
    pub async fn with_datastore(
        config: &Config,
        store: Arc<dyn Datastore>,
    ) -> Result<Self, ForwarderError> {
        let emitter = Self::new(config)?;
        if !emitter.datastore_enabled {
            tracing::warn!("datastore disabled, store ignored");
            return Ok(emitter);
        }

        let database = &config.datastore.database;
        match tokio::time::timeout(
            config.datastore.schema_timeout,
            ensure_schema(store.as_ref(), database, &config.datastore.table),
        )
        .await
        {
            Ok(Ok(report)) if !report.is_complete() => {
                tracing::warn!(
                    database = %database,
                    failed = report.failed.len(),
                    "schema partially applied"
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(database = %database, error = %e, "failed to ensure events schema");
            }
            Err(_) => {
                tracing::warn!(
                    database = %database,
                    timeout = ?config.datastore.schema_timeout,
                    "schema bootstrap timed out"
                );
            }
        }

        emitter.set_datastore(store);
        Ok(emitter)
    }

    /// Create an emitter from config alone, connecting to ClickHouse when the
    /// datastore section is enabled
    ///
    /// # Errors
    ///
    /// Returns an error if a forwarder's HTTP client cannot be built.
    pub async fn connect(config: &Config) -> Result<Self, ForwarderError> {
        if !config.datastore.enabled {
            return Self::new(config);
        }

        let store = ClickHouseStore::from_config(&clickhouse_config(&config.datastore));
        Self::with_datastore(config, Arc::new(store)).await
    }

    /// Replace the primary writer with a new one on `store`
    ///
    /// The previous writer stops accepting events and drains its queue in
    /// the background once in-flight emits release it. Ignored when the
    /// datastore section is disabled.
    pub fn set_datastore(&self, store: Arc<dyn Datastore>) {
        if !self.datastore_enabled {
            return;
        }

        let writer = Arc::new(DatastoreWriter::new(store, self.writer_config.clone()));
        let previous = self.writer.write().replace(writer);
        if previous.is_some() {
            tracing::info!(table = %self.writer_config.table, "datastore writer replaced");
        }
    }

    /// Current primary writer
    pub fn datastore_writer(&self) -> Option<Arc<DatastoreWriter>> {
        self.writer.read().clone()
    }

    /// Insights forwarder, if configured
    pub fn insights(&self) -> Option<&InsightsForwarder> {
        self.insights.as_ref()
    }

    /// Analytics forwarder, if configured
    pub fn analytics(&self) -> Option<&AnalyticsForwarder> {
        self.analytics.as_ref()
    }

    // =========================================================================
    // Emit operations
    // =========================================================================

    /// Order completed
    ///
    /// # Errors
    ///
    /// Returns every destination failure; the others were still attempted.
    pub async fn emit_order_completed(&self, order: &Order) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Emit);
        let items = order.item_values();

        let mut event = RawEvent::named(order.user_id.as_str(), EventName::OrderCompleted)
            .with_organization(order.org_id.as_str())
            .with_property("currency", order.currency.as_str())
            .with_property("items", Value::Array(items.clone()).to_string())
            .with_property("item_count", order.items.len())
            .with_property("status", order.status.as_str())
            .with_property("email", order.email.as_str());
        event.order_id = order.id.clone();
        event.revenue = order.total;
        event.quantity = order.total_quantity();
        self.write_primary(&mut failures, event).await;

        if let Some(insights) = &self.insights {
            let capture = Capture::order(
                order.user_id.as_str(),
                EventName::OrderCompleted,
                &order.id,
                order.total,
                items,
            );
            failures.check(Destination::Insights, None, insights.send(capture).await);
            self.identify_organization(insights, &mut failures, &order.org_id)
                .await;
        }

        if let Some(analytics) = &self.analytics {
            let extra = into_properties(json!({
                "currency": order.currency,
                "item_count": order.items.len(),
                "user_id": order.user_id,
            }));
            let event = AnalyticsEvent::commerce(
                EventName::OrderCompleted,
                &order.id,
                order.total,
                extra,
            );
            failures.check(Destination::Analytics, None, analytics.send(event).await);
        }

        failures.finish()
    }

    /// Order refunded; revenue is recorded as `-amount`
    ///
    /// # Errors
    ///
    /// Returns every destination failure; the others were still attempted.
    pub async fn emit_order_refunded(&self, order: &Order, amount: f64) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Emit);

        let mut event = RawEvent::named(order.user_id.as_str(), EventName::OrderRefunded)
            .with_organization(order.org_id.as_str())
            .with_property("refund_amount", amount)
            .with_property("original_total", order.total);
        event.order_id = order.id.clone();
        event.revenue = -amount;
        self.write_primary(&mut failures, event).await;

        if let Some(insights) = &self.insights {
            let properties = into_properties(json!({
                "order_id": order.id,
                "refund_amount": amount,
                "original_total": order.total,
            }));
            let capture = Capture::new(
                order.user_id.as_str(),
                EventName::OrderRefunded,
                properties,
            );
            failures.check(Destination::Insights, None, insights.send(capture).await);
        }

        if let Some(analytics) = &self.analytics {
            let event = AnalyticsEvent::commerce(
                EventName::OrderRefunded,
                &order.id,
                amount,
                Properties::new(),
            );
            failures.check(Destination::Analytics, None, analytics.send(event).await);
        }

        failures.finish()
    }

    /// Product detail viewed
    ///
    /// # Errors
    ///
    /// Returns every destination failure; the others were still attempted.
    pub async fn emit_product_viewed(&self, user_id: &str, product: &Product) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Emit);

        let mut event = RawEvent::named(user_id, EventName::ProductViewed)
            .with_organization(product.org_id.as_str())
            .with_property("product_name", product.name.as_str())
            .with_property("sku", product.sku.as_str())
            .with_property("category", product.category.as_str());
        event.product_id = product.id.clone();
        event.revenue = product.price;
        self.write_primary(&mut failures, event).await;

        if let Some(insights) = &self.insights {
            let properties = into_properties(json!({
                "product_id": product.id,
                "product_name": product.name,
                "sku": product.sku,
                "price": product.price,
                "category": product.category,
            }));
            let capture = Capture::new(user_id, EventName::ProductViewed, properties);
            failures.check(Destination::Insights, None, insights.send(capture).await);
        }

        if let Some(analytics) = &self.analytics {
            let data = into_properties(json!({
                "product_id": product.id,
                "product_name": product.name,
                "price": product.price,
            }));
            let event = AnalyticsEvent::custom(EventName::ProductViewed, data);
            failures.check(Destination::Analytics, None, analytics.send(event).await);
        }

        failures.finish()
    }

    /// Product added to cart; revenue is `price × quantity`
    ///
    /// # Errors
    ///
    /// Returns every destination failure; the others were still attempted.
    pub async fn emit_product_added(
        &self,
        user_id: &str,
        product: &Product,
        quantity: u32,
    ) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Emit);

        let mut event = RawEvent::named(user_id, EventName::ProductAdded)
            .with_organization(product.org_id.as_str())
            .with_property("product_name", product.name.as_str())
            .with_property("sku", product.sku.as_str())
            .with_property("unit_price", product.price);
        event.product_id = product.id.clone();
        event.revenue = product.price * f64::from(quantity);
        event.quantity = quantity;
        self.write_primary(&mut failures, event).await;

        if let Some(insights) = &self.insights {
            let properties = into_properties(json!({
                "product_id": product.id,
                "product_name": product.name,
                "sku": product.sku,
                "price": product.price,
                "quantity": quantity,
            }));
            let capture = Capture::new(user_id, EventName::ProductAdded, properties);
            failures.check(Destination::Insights, None, insights.send(capture).await);
        }

        if let Some(analytics) = &self.analytics {
            let data = into_properties(json!({
                "product_id": product.id,
                "quantity": quantity,
                "price": product.price,
            }));
            let event = AnalyticsEvent::custom(EventName::ProductAdded, data);
            failures.check(Destination::Analytics, None, analytics.send(event).await);
        }

        failures.finish()
    }

    /// User registration
    ///
    /// Insights also receives an `$identify` carrying the person properties.
    ///
    /// # Errors
    ///
    /// Returns every destination failure; the others were still attempted.
    pub async fn emit_user_signed_up(&self, user: &User) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Emit);
        let person = into_properties(json!({
            "email": user.email,
            "name": user.name,
            "created_at": user.created_at,
        }));

        let mut event =
            RawEvent::named(user.id.as_str(), EventName::SignedUp).with_organization(user.org_id.as_str());
        event.person_properties = person.clone();
        self.write_primary(&mut failures, event).await;

        if let Some(insights) = &self.insights {
            let capture = Capture::new(
                user.id.as_str(),
                EventName::SignedUp,
                into_properties(json!({ "email": user.email })),
            );
            failures.check(Destination::Insights, None, insights.send(capture).await);

            let identify = Capture::identify(user.id.as_str(), person);
            failures.check(
                Destination::Insights,
                Some("identify"),
                insights.send(identify).await,
            );

            self.identify_organization(insights, &mut failures, &user.org_id)
                .await;
        }

        if let Some(analytics) = &self.analytics {
            let event =
                AnalyticsEvent::custom("user_signed_up", into_properties(json!({ "user_id": user.id })));
            failures.check(Destination::Analytics, None, analytics.send(event).await);
        }

        failures.finish()
    }

    /// Storefront page view
    ///
    /// Anonymous views are attributed to the session. Path and host come
    /// from the URL, the referrer domain from the referrer.
    ///
    /// # Errors
    ///
    /// Returns every destination failure; the others were still attempted.
    pub async fn emit_page_view(&self, view: &PageView) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Emit);
        let distinct_id = view.distinct_id();
        let (url_path, hostname) = url_parts(&view.url);
        let (_, referrer_domain) = url_parts(&view.referrer);

        let mut event = RawEvent::named(distinct_id, EventName::PageView)
            .with_organization(view.org_id.as_str())
            .with_property("title", view.title.as_str());
        event.session_id = view.session_id.clone();
        event.url = view.url.clone();
        event.url_path = url_path;
        event.hostname = hostname.clone();
        event.referrer = view.referrer.clone();
        event.referrer_domain = referrer_domain;
        event.ip = view.ip.clone();
        event.user_agent = view.user_agent.clone();
        event.language = view.language.clone();
        event.screen = view.screen.clone();
        self.write_primary(&mut failures, event).await;

        if let Some(insights) = &self.insights {
            let capture = Capture::page_view(distinct_id, &view.url, &view.title, &view.referrer);
            failures.check(Destination::Insights, None, insights.send(capture).await);
        }

        if let Some(analytics) = &self.analytics {
            let event = AnalyticsEvent::page_view(
                &view.url,
                &view.title,
                &view.referrer,
                &hostname,
                &view.language,
                &view.screen,
            );
            failures.check(Destination::Analytics, None, analytics.send(event).await);
        }

        failures.finish()
    }

    /// Write a prebuilt event to the primary store only
    ///
    /// # Errors
    ///
    /// Fails with `datastore: not configured` when there is no primary
    /// writer, otherwise with the writer's error.
    pub async fn emit_raw(&self, event: RawEvent) -> Result<(), EmitError> {
        let Some(writer) = self.datastore_writer() else {
            return Err(EmitError::not_configured(Destination::Datastore));
        };

        let mut failures = Failures::new(Operation::Emit);
        failures.check(Destination::Datastore, None, writer.write(event).await);
        failures.finish()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush every destination
    ///
    /// # Errors
    ///
    /// Returns every destination's flush failure.
    pub async fn flush(&self) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Flush);

        if let Some(writer) = self.datastore_writer() {
            let result = writer.flush().await;
            if let Ok(outcome) = &result
                && outcome.failed > 0
            {
                tracing::warn!(
                    written = outcome.written,
                    failed = outcome.failed,
                    "datastore flush had failed inserts"
                );
            }
            failures.check(Destination::Datastore, Some("flush"), result);
        }

        if let Some(insights) = &self.insights {
            failures.check(Destination::Insights, Some("flush"), insights.flush().await);
        }

        if let Some(analytics) = &self.analytics {
            failures.check(Destination::Analytics, Some("flush"), analytics.flush().await);
        }

        failures.finish()
    }

    /// Close every destination, draining their queues
    ///
    /// Idempotent. Later emits fail for the primary store with `Closed` and
    /// for the forwarders likewise.
    ///
    /// # Errors
    ///
    /// Returns every destination's close failure.
    pub async fn close(&self) -> Result<(), EmitError> {
        let mut failures = Failures::new(Operation::Close);

        if let Some(writer) = self.datastore_writer() {
            failures.check(Destination::Datastore, Some("close"), writer.close().await);
        }

        if let Some(insights) = &self.insights {
            failures.check(Destination::Insights, Some("close"), insights.close().await);
        }

        if let Some(analytics) = &self.analytics {
            failures.check(Destination::Analytics, Some("close"), analytics.close().await);
        }

        failures.finish()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn write_primary(&self, failures: &mut Failures, event: RawEvent) {
        // Clone out so the lock is not held across the write
        let Some(writer) = self.datastore_writer() else {
            return;
        };
        failures.check(Destination::Datastore, None, writer.write(event).await);
    }

    async fn identify_organization(
        &self,
        insights: &InsightsForwarder,
        failures: &mut Failures,
        org_id: &str,
    ) {
        if org_id.is_empty() {
            return;
        }
        let capture = Capture::group_identify(
            ORGANIZATION_GROUP,
            org_id,
            into_properties(json!({ "name": org_id })),
        );
        failures.check(
            Destination::Insights,
            Some("group identify"),
            insights.send(capture).await,
        );
    }
}

/// Split a URL into (path, host)
///
/// The host keeps an explicit port. Relative URLs yield only a path and
/// anything unparseable yields nothing.
fn url_parts(raw: &str) -> (String, String) {
    if raw.is_empty() {
        return (String::new(), String::new());
    }

    match Url::parse(raw) {
        Ok(url) => {
            let host = match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            (url.path().to_string(), host)
        }
        Err(_) if raw.starts_with('/') => {
            let path = raw.split(['?', '#']).next().unwrap_or_default();
            (path.to_string(), String::new())
        }
        Err(_) => (String::new(), String::new()),
    }
}
