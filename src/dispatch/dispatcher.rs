//! Event dispatcher
//!
//! Receives inbound webhook events, deduplicates them against the
//! session ledger, serializes processing per user, invokes the
//! conversation engine, and commits the result with compare-and-swap.
//! Outbound messages are sent only after the commit succeeds, so a
//! crash after commit is recoverable (a redelivery re-renders the same
//! prompt) while a crash before commit never leaves half-applied state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future;
use tracing::{debug, error, info, warn};

use crate::config::{DispatchConfig, ShopConfig};
use crate::engine::{self, render, Action, EngineContext};
use crate::models::catalog::CatalogView;
use crate::models::event::{EventKind, HandleOutcome, InboundEvent};
use crate::models::order::{Order, PaymentStatus};
use crate::models::session::{ConversationState, Session};
use crate::services::ServiceFactory;
use crate::storage::{OrderStore, SaveOutcome, SessionStore, StatusTransition};
use crate::utils::errors::Result;
use crate::utils::logging;

use super::locks::UserLocks;

/// Coordinates dedup, per-user serialization, engine transitions, and
/// transactional session commits
pub struct EventDispatcher {
    sessions: Arc<dyn SessionStore>,
    orders: Arc<dyn OrderStore>,
    services: ServiceFactory,
    locks: UserLocks,
    shop: ShopConfig,
    config: DispatchConfig,
}

impl EventDispatcher {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        orders: Arc<dyn OrderStore>,
        services: ServiceFactory,
        shop: ShopConfig,
        config: DispatchConfig,
    ) -> Self {
        Self {
            sessions,
            orders,
            services,
            locks: UserLocks::new(),
            shop,
            config,
        }
    }

    /// Handle one inbound event.
    ///
    /// Payment confirmations are made idempotent at the Order level
    /// first: once an order is final, further confirmations are no-ops
    /// regardless of session state.
    pub async fn handle(&self, event: InboundEvent) -> Result<HandleOutcome> {
        if let Some(text) = event.message_text() {
            debug!(
                user_id = %event.user_id,
                event_id = %event.event_id,
                preview = %crate::utils::helpers::truncate_text(text, 50),
                "Processing message event"
            );
        }

        let outcome = match &event.kind {
            EventKind::PaymentConfirmation { order_ref, status } => {
                self.handle_payment_confirmation(&event, order_ref, *status).await?
            }
            EventKind::Text { .. } | EventKind::Button { .. } => {
                self.process_for_user(&event).await?
            }
        };

        logging::log_event_outcome(&event.user_id, &event.event_id, outcome.as_str());
        Ok(outcome)
    }

    /// Entry point for the payment webhook, which carries no user id:
    /// the order record supplies it.
    pub async fn handle_payment_notice(
        &self,
        order_ref: &str,
        status: PaymentStatus,
        received_at: DateTime<Utc>,
    ) -> Result<HandleOutcome> {
        let Some(order) = self.orders.find_by_ref(order_ref).await? else {
            warn!(order_ref = order_ref, "Payment notice for unknown order - ignoring");
            return Ok(HandleOutcome::DuplicateIgnored);
        };

        let event = InboundEvent::payment_confirmation(&order.user_id, order_ref, status, received_at);
        self.handle(event).await
    }

    async fn handle_payment_confirmation(
        &self,
        event: &InboundEvent,
        order_ref: &str,
        status: PaymentStatus,
    ) -> Result<HandleOutcome> {
        match self
            .orders
            .transition_status(order_ref, status, None, event.received_at)
            .await?
        {
            StatusTransition::NotFound => {
                warn!(order_ref = order_ref, "Payment confirmation for unknown order - ignoring");
                Ok(HandleOutcome::DuplicateIgnored)
            }
            StatusTransition::AlreadyFinal(order) => {
                debug!(
                    order_ref = order_ref,
                    status = %order.payment_status,
                    "Order already final - duplicate confirmation ignored"
                );
                Ok(HandleOutcome::DuplicateIgnored)
            }
            StatusTransition::Applied(order) => {
                logging::log_order_transition(&order.order_ref, &order.user_id, status.as_str());
                self.process_for_user(event).await
            }
        }
    }

    /// Serialize on the user token, then run the load -> transition ->
    /// CAS commit cycle with bounded retries.
    async fn process_for_user(&self, event: &InboundEvent) -> Result<HandleOutcome> {
        let _guard = self.locks.acquire(&event.user_id).await;

        for attempt in 1..=self.config.cas_retries {
            let mut session = self.sessions.load_or_create(&event.user_id).await?;

            if session.has_processed(&event.event_id) {
                debug!(
                    user_id = %event.user_id,
                    event_id = %event.event_id,
                    "Event already processed - ignoring duplicate"
                );
                return Ok(HandleOutcome::DuplicateIgnored);
            }

            let ctx = match self.build_engine_context(event).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    logging::log_api_error("menu", &e.to_string(), Some(&event.user_id));
                    // Session unchanged; the user can retry the same action
                    self.send_best_effort(&event.user_id, &render::try_again_later()).await;
                    return Err(e);
                }
            };

            let mut result = engine::transition(&session.state, &session.cart, &event.kind, &ctx);

            // Two-phase payment step: perform the side effect now, commit
            // the resulting order_ref together with the new state below
            let mut created_order = None;
            if let Some(intent) = take_payment_intent(&mut result.actions) {
                let (lines, address) = intent;
                match self.execute_payment_intent(event, lines, address).await {
                    Ok((order, link_message)) => {
                        result.next_state =
                            ConversationState::AwaitingPayment { order_ref: order.order_ref.clone() };
                        result.actions.push(Action::Reply(link_message));
                        created_order = Some(order);
                    }
                    Err(e) => {
                        logging::log_api_error("payment", &e.to_string(), Some(&event.user_id));
                        self.send_best_effort(&event.user_id, &render::try_again_later()).await;
                        return Err(e);
                    }
                }
            }

            let prev_state = session.state.clone();
            self.apply_transition(&mut session, &result, created_order.as_ref(), event);

            match self.sessions.save(&session).await? {
                SaveOutcome::Committed { new_version } => {
                    debug!(
                        user_id = %event.user_id,
                        state = session.state.name(),
                        version = new_version,
                        "Session committed"
                    );

                    // A cancel while awaiting payment abandons the
                    // pending order so the sweep does not resurrect it
                    if let ConversationState::AwaitingPayment { order_ref } = &prev_state {
                        if result.next_state == ConversationState::Idle {
                            self.abandon_order(order_ref, event.received_at).await;
                        }
                    }

                    self.execute_replies(&event.user_id, result.actions).await;
                    return Ok(HandleOutcome::Applied);
                }
                SaveOutcome::VersionConflict => {
                    warn!(
                        user_id = %event.user_id,
                        attempt = attempt,
                        "Version conflict on session commit - retrying cycle"
                    );
                    // The order created by this failed attempt must not
                    // linger as payable
                    if let Some(order) = created_order {
                        self.abandon_order(&order.order_ref, event.received_at).await;
                    }
                }
            }
        }

        warn!(
            user_id = %event.user_id,
            event_id = %event.event_id,
            retries = self.config.cas_retries,
            "CAS retries exhausted - rejecting event as stale"
        );
        Ok(HandleOutcome::StaleRejected)
    }

    /// Build the catalog snapshot the engine needs. Payment
    /// confirmations never consult the catalog, so they skip the lookup
    /// entirely.
    async fn build_engine_context(&self, event: &InboundEvent) -> Result<EngineContext> {
        let catalog = match &event.kind {
            EventKind::PaymentConfirmation { .. } => CatalogView::default(),
            _ => self.load_catalog_view().await?,
        };

        Ok(EngineContext {
            catalog,
            shop_name: self.shop.name.clone(),
            currency_symbol: self.shop.currency_symbol.clone(),
        })
    }

    async fn load_catalog_view(&self) -> Result<CatalogView> {
        let categories = self.services.menu.get_categories().await?;

        let item_lists = future::try_join_all(
            categories.iter().map(|c| self.services.menu.get_items(c.id)),
        )
        .await?;

        let items_by_category: HashMap<i64, _> = categories
            .iter()
            .map(|c| c.id)
            .zip(item_lists)
            .collect();

        Ok(CatalogView::new(categories, items_by_category))
    }

    /// Create the order, request the payment link, and render the link
    /// message. The order is inserted before the session commit; if the
    /// commit loses the CAS race the order is abandoned.
    async fn execute_payment_intent(
        &self,
        event: &InboundEvent,
        lines: Vec<crate::models::session::CartLine>,
        address: String,
    ) -> Result<(Order, String)> {
        let mut order = Order::new(&event.user_id, lines, &address, event.received_at);

        let link = self
            .services
            .payments
            .create_payment_link(&order.order_ref, order.amount_minor, &event.user_id)
            .await?;

        order.payment_ref = Some(link.gateway_ref.clone());
        self.orders.insert(&order).await?;

        info!(
            user_id = %event.user_id,
            order_ref = %order.order_ref,
            amount_minor = order.amount_minor,
            "Order created and payment link requested"
        );

        let message = render::payment_link(
            &order.order_ref,
            order.amount_minor,
            &link.url,
            &self.shop.currency_symbol,
        );
        Ok((order, message))
    }

    /// Fold the engine result into the session record. COMPLETED is
    /// reset to IDLE inside the same commit; the dedup ledger is updated
    /// last so it always rides along with the state change.
    fn apply_transition(
        &self,
        session: &mut Session,
        result: &engine::Transition,
        created_order: Option<&Order>,
        event: &InboundEvent,
    ) {
        session.state = result.next_state.clone();
        session.cart = result.cart.clone();

        if let Some(order) = created_order {
            session.delivery_address = Some(order.address.clone());
        }

        session.pending_order_ref = match &session.state {
            ConversationState::AwaitingPayment { order_ref } => Some(order_ref.clone()),
            _ => None,
        };

        if session.state == ConversationState::Completed {
            info!(user_id = %session.user_id, "Order cycle completed - resetting session");
            session.reset();
        }

        session.record_event(
            &event.event_id,
            event.received_at,
            Duration::minutes(self.config.dedup_window_minutes),
        );
    }

    /// Mark an order the user walked away from (or that lost a commit
    /// race) as expired
    async fn abandon_order(&self, order_ref: &str, now: DateTime<Utc>) {
        match self
            .orders
            .transition_status(order_ref, PaymentStatus::Expired, None, now)
            .await
        {
            Ok(StatusTransition::Applied(order)) => {
                logging::log_order_transition(&order.order_ref, &order.user_id, "expired");
            }
            Ok(_) => {}
            Err(e) => {
                error!(order_ref = order_ref, error = %e, "Failed to abandon order");
            }
        }
    }

    /// Execute reply actions after the commit; failures are logged and
    /// never propagate
    async fn execute_replies(&self, user_id: &str, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Reply(message) => {
                    if let Err(e) = self.services.sender.send_text(user_id, &message).await {
                        logging::log_send_failure(user_id, &e.to_string());
                    }
                }
                Action::RequestPayment { .. } => {
                    // Consumed before the commit; reaching here is a bug
                    error!(user_id = user_id, "Unexecuted payment intent in reply phase");
                }
            }
        }
    }

    async fn send_best_effort(&self, user_id: &str, message: &str) {
        if let Err(e) = self.services.sender.send_text(user_id, message).await {
            logging::log_send_failure(user_id, &e.to_string());
        }
    }
}

/// Pull the payment intent out of the action list, if present
fn take_payment_intent(
    actions: &mut Vec<Action>,
) -> Option<(Vec<crate::models::session::CartLine>, String)> {
    let index = actions
        .iter()
        .position(|a| matches!(a, Action::RequestPayment { .. }))?;
    match actions.remove(index) {
        Action::RequestPayment { lines, address } => Some((lines, address)),
        _ => None,
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("shop", &self.shop)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
