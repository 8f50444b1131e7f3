//! Tab lifecycle, billing and order operations
//!
//! Each operation validates its input, asks the authorizer, and only then
//! hands a single atomic unit of work to the store.

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::{BillOrderCreate, Tab, TabCreate, TabOverview, TabSummary, TabUpdate};

use super::validation;
use crate::auth::{Action, Authorizer, RequestContext, Resource};
use crate::clock::Clock;
use crate::db::{NewTab, OrderApplication, TabStore};
use crate::error::ServiceResult;
use crate::reconcile::{OrderDeltas, OrderDirection, RemovalPolicy};

pub struct TabService {
    store: Arc<dyn TabStore>,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    removal_policy: RemovalPolicy,
}

impl TabService {
    pub fn new(
        store: Arc<dyn TabStore>,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            authorizer,
            clock,
            removal_policy: RemovalPolicy::default(),
        }
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal_policy
    }

    // ── Authorization ───────────────────────────────────────────────

    fn authorize(
        &self,
        ctx: &RequestContext,
        resource: &Resource,
        action: Action,
    ) -> ServiceResult<()> {
        if self.authorizer.authorize(&ctx.actor, resource, action) {
            return Ok(());
        }
        tracing::warn!(
            user_id = %ctx.actor.user_id,
            shop_id = resource.shop_id(),
            action = action.as_str(),
            request_id = ctx.request_id.as_deref(),
            "Permission denied"
        );
        Err(AppError::permission_denied(format!("Not allowed to {}", action.as_str())).into())
    }

    /// Load the tab and authorize `action` on it
    ///
    /// A missing tab is reported as NotFound only to actors allowed to perform
    /// the action shop-wide; everyone else gets PermissionDenied.
    async fn authorize_tab(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
        action: Action,
    ) -> ServiceResult<Tab> {
        match self.store.get_tab(shop_id, tab_id).await? {
            Some(tab) => {
                let resource = Resource::Tab {
                    shop_id,
                    tab_id,
                    owner_id: tab.owner_id,
                };
                self.authorize(ctx, &resource, action)?;
                Ok(tab)
            }
            None => {
                self.authorize(ctx, &Resource::Shop { shop_id }, action)?;
                Err(AppError::tab_not_found(shop_id, tab_id).into())
            }
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    pub async fn create_tab(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        data: TabCreate,
    ) -> ServiceResult<i64> {
        validation::validate_settings(&data.settings)?;
        let verification_list = validation::normalize_verification_list(&data.verification_list)?;
        let location_ids = validation::normalize_location_ids(&data.location_ids)?;
        self.authorize(ctx, &Resource::Shop { shop_id }, Action::CreateTab)?;

        let new = NewTab {
            shop_id,
            owner_id: ctx.actor.user_id,
            settings: data.settings,
            verification_list,
            location_ids,
        };
        let tab_id = self.store.create_tab(&new).await?;

        tracing::info!(
            shop_id,
            tab_id,
            owner_id = %new.owner_id,
            emails = new.verification_list.len(),
            locations = new.location_ids.len(),
            "Tab created"
        );
        Ok(tab_id)
    }

    /// Stage a full replacement of the tab's settings for approval
    pub async fn submit_update(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
        update: TabUpdate,
    ) -> ServiceResult<()> {
        validation::validate_settings(&update.settings)?;
        let update = TabUpdate {
            verification_list: update
                .verification_list
                .as_deref()
                .map(validation::normalize_verification_list)
                .transpose()?,
            location_ids: update
                .location_ids
                .as_deref()
                .map(validation::normalize_location_ids)
                .transpose()?,
            settings: update.settings,
        };
        self.authorize_tab(ctx, shop_id, tab_id, Action::SubmitUpdate)
            .await?;

        self.store.stage_update(shop_id, tab_id, &update).await?;
        tracing::info!(
            shop_id,
            tab_id,
            syncs_emails = update.verification_list.is_some(),
            syncs_locations = update.location_ids.is_some(),
            "Tab update staged"
        );
        Ok(())
    }

    pub async fn approve_tab(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
    ) -> ServiceResult<()> {
        self.authorize_tab(ctx, shop_id, tab_id, Action::ApproveTab)
            .await?;
        self.store.approve_tab(shop_id, tab_id).await?;
        tracing::info!(shop_id, tab_id, approved_by = %ctx.actor.user_id, "Tab confirmed");
        Ok(())
    }

    pub async fn close_tab(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
    ) -> ServiceResult<()> {
        self.authorize_tab(ctx, shop_id, tab_id, Action::CloseTab)
            .await?;
        self.store.close_tab(shop_id, tab_id).await?;
        tracing::info!(shop_id, tab_id, closed_by = %ctx.actor.user_id, "Tab closed");
        Ok(())
    }

    pub async fn set_verification_list(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
        emails: &[String],
    ) -> ServiceResult<()> {
        let emails = validation::normalize_verification_list(emails)?;
        self.authorize_tab(ctx, shop_id, tab_id, Action::SetVerificationList)
            .await?;
        self.store
            .set_verification_list(shop_id, tab_id, &emails)
            .await?;
        tracing::info!(shop_id, tab_id, emails = emails.len(), "Verification list synced");
        Ok(())
    }

    // ── Bills and orders ────────────────────────────────────────────

    pub async fn mark_bill_paid(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
        bill_id: i64,
    ) -> ServiceResult<()> {
        self.authorize_tab(ctx, shop_id, tab_id, Action::MarkBillPaid)
            .await?;
        let today = self.clock.today();
        self.store
            .mark_bill_paid(shop_id, tab_id, bill_id, today)
            .await?;
        tracing::info!(shop_id, tab_id, bill_id, %today, "Bill marked paid");
        Ok(())
    }

    /// Add the order to the tab's current bill; returns that bill's id
    pub async fn add_order(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
        order: &BillOrderCreate,
    ) -> ServiceResult<i64> {
        self.apply_order(ctx, shop_id, tab_id, order, OrderDirection::Add)
            .await
    }

    /// Remove the order from the tab's current bill; returns that bill's id
    pub async fn remove_order(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
        order: &BillOrderCreate,
    ) -> ServiceResult<i64> {
        self.apply_order(ctx, shop_id, tab_id, order, OrderDirection::Remove)
            .await
    }

    async fn apply_order(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
        order: &BillOrderCreate,
        direction: OrderDirection,
    ) -> ServiceResult<i64> {
        validation::validate_order(order)?;
        let action = match direction {
            OrderDirection::Add => Action::AddOrder,
            OrderDirection::Remove => Action::RemoveOrder,
        };
        self.authorize_tab(ctx, shop_id, tab_id, action).await?;

        let deltas = OrderDeltas::from_order(order)
            .ok_or_else(|| AppError::new(ErrorCode::OrderQuantityOverflow))?;
        let today = self.clock.today();
        tracing::debug!(
            shop_id,
            tab_id,
            direction = direction.as_str(),
            items = deltas.items.len(),
            variants = deltas.variants.len(),
            %today,
            "Applying order"
        );

        let application = OrderApplication {
            deltas: &deltas,
            direction,
            policy: self.removal_policy,
            today,
        };
        let bill_id = match self.store.apply_order(shop_id, tab_id, application).await {
            Ok(bill_id) => bill_id,
            Err(e) => {
                tracing::warn!(
                    shop_id,
                    tab_id,
                    direction = direction.as_str(),
                    error = %e,
                    "Order rejected"
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            shop_id,
            tab_id,
            bill_id,
            direction = direction.as_str(),
            "Order applied"
        );
        Ok(bill_id)
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub async fn get_tab_overview(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
        tab_id: i64,
    ) -> ServiceResult<TabOverview> {
        self.authorize_tab(ctx, shop_id, tab_id, Action::ReadTab)
            .await?;
        self.store
            .get_tab_overview(shop_id, tab_id)
            .await?
            .ok_or_else(|| AppError::tab_not_found(shop_id, tab_id).into())
    }

    pub async fn list_tabs(
        &self,
        ctx: &RequestContext,
        shop_id: i64,
    ) -> ServiceResult<Vec<TabSummary>> {
        self.authorize(ctx, &Resource::Shop { shop_id }, Action::ListTabs)?;
        Ok(self.store.list_tabs(shop_id).await?)
    }
}
