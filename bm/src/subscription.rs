//! Subscription purchase and status tracking
//!
//! Payment processing is an external collaborator behind
//! [`PaymentProvider`]; a failed or cancelled purchase and a provider
//! error are both a plain `false` - no partial-success states. The
//! persisted status record lazily expires on read.

use std::sync::Arc;

use async_trait::async_trait;
use bitestore::{Store, load_json, save_json};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entitlement::Clock;
use crate::keys;

/// Store product IDs (must match the storefront catalog exactly)
pub const MONTHLY_PRODUCT: &str = "bitematch.subscription.monthly";
pub const YEARLY_PRODUCT: &str = "bitematch.subscription.yearly";

/// Billing period of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanPeriod {
    Monthly,
    Yearly,
}

impl PlanPeriod {
    pub fn product_id(&self) -> &'static str {
        match self {
            PlanPeriod::Monthly => MONTHLY_PRODUCT,
            PlanPeriod::Yearly => YEARLY_PRODUCT,
        }
    }
}

impl std::str::FromStr for PlanPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(PlanPeriod::Monthly),
            "yearly" | "annual" => Ok(PlanPeriod::Yearly),
            other => Err(format!("unknown plan '{other}' (expected: monthly, yearly)")),
        }
    }
}

/// One purchasable plan as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionProduct {
    pub product_id: &'static str,
    pub localized_price: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub period: PlanPeriod,
}

/// The plan catalog
pub fn products() -> Vec<SubscriptionProduct> {
    vec![
        SubscriptionProduct {
            product_id: MONTHLY_PRODUCT,
            localized_price: "$1.99",
            title: "BiteMatch Premium Monthly",
            description: "Unlimited AI recommendations and premium features",
            period: PlanPeriod::Monthly,
        },
        SubscriptionProduct {
            product_id: YEARLY_PRODUCT,
            localized_price: "$19.99",
            title: "BiteMatch Premium Yearly",
            description: "Unlimited AI recommendations and premium features - Save 58%!",
            period: PlanPeriod::Yearly,
        },
    ]
}

/// Persisted subscription status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_active: bool,
    pub product_id: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self {
            is_active: false,
            product_id: None,
            expiration_date: None,
        }
    }
}

/// External payment collaborator
///
/// `purchase` returns whether the purchase went through; `restore`
/// returns whether a prior purchase was found and restored. Failures,
/// cancellations, and provider errors all collapse to `false`.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn purchase(&self, product_id: &str, reference: Uuid) -> bool;
    async fn restore(&self) -> bool;
}

/// Simulated storefront for environments without a native one
///
/// Mirrors a sandbox storefront: purchases almost always succeed, with
/// an occasional failure so the retry path gets exercised.
#[derive(Debug, Default)]
pub struct SimulatedPaymentProvider;

#[async_trait]
impl PaymentProvider for SimulatedPaymentProvider {
    async fn purchase(&self, product_id: &str, reference: Uuid) -> bool {
        debug!(%product_id, %reference, "purchase: simulating");
        rand::random::<f64>() > 0.05
    }

    async fn restore(&self) -> bool {
        debug!("restore: simulating, nothing to restore");
        false
    }
}

/// Purchase orchestration and status persistence
pub struct SubscriptionService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    provider: Arc<dyn PaymentProvider>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { store, clock, provider }
    }

    /// Run a purchase for the chosen plan
    ///
    /// On success the subscription is activated and persisted; on any
    /// failure nothing changes and the caller shows a generic retryable
    /// message.
    pub async fn select_plan(&self, period: PlanPeriod) -> bool {
        let product_id = period.product_id();
        let reference = Uuid::new_v4();
        info!(%product_id, %reference, "select_plan: called");

        if self.provider.purchase(product_id, reference).await {
            self.activate(product_id, period);
            true
        } else {
            warn!(%product_id, "select_plan: purchase did not complete");
            false
        }
    }

    /// Ask the storefront for a prior purchase and reactivate it
    pub async fn restore_purchases(&self) -> bool {
        info!("restore_purchases: called");
        if self.provider.restore().await {
            // The storefront does not tell us which plan; assume monthly
            // until the next receipt refresh corrects it.
            self.activate(MONTHLY_PRODUCT, PlanPeriod::Monthly);
            true
        } else {
            false
        }
    }

    /// Current status, lazily expiring a lapsed subscription
    pub fn status(&self) -> SubscriptionStatus {
        let mut status: SubscriptionStatus = load_json(self.store.as_ref(), keys::SUBSCRIPTION).unwrap_or_default();

        if let Some(expiration) = status.expiration_date
            && status.is_active
            && self.clock.now() > expiration
        {
            debug!(%expiration, "status: subscription lapsed");
            status.is_active = false;
            status.product_id = None;
            save_json(self.store.as_ref(), keys::SUBSCRIPTION, &status);
        }

        status
    }

    fn activate(&self, product_id: &str, period: PlanPeriod) {
        let now = self.clock.now();
        let months = match period {
            PlanPeriod::Monthly => 1,
            PlanPeriod::Yearly => 12,
        };
        let expiration = now
            .checked_add_months(Months::new(months))
            .unwrap_or(now + chrono::Duration::days(30 * i64::from(months)));

        let status = SubscriptionStatus {
            is_active: true,
            product_id: Some(product_id.to_string()),
            expiration_date: Some(expiration),
        };
        info!(%product_id, %expiration, "activate: subscription active");
        save_json(self.store.as_ref(), keys::SUBSCRIPTION, &status);
    }
}
