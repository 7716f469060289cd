//! Two-level payer selection on the eligibility page

use crate::browser::BrowserPage;
use crate::config::{PortalConfig, TimingConfig};
use crate::constants::{payer_sublist, PAYER_CATEGORY_LIST};
use crate::error::PayerSelectionError;
use crate::planner::{PlanGenerator, SelectionPlan};
use crate::session::Session;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::info;

/// Opens the eligibility page and picks the payer the plan names
pub struct PayerSelector {
    page: Arc<dyn BrowserPage>,
    planner: PlanGenerator,
    portal: PortalConfig,
    timing: TimingConfig,
}

impl PayerSelector {
    /// Selector driving `page`
    pub fn new(
        page: Arc<dyn BrowserPage>,
        planner: PlanGenerator,
        portal: &PortalConfig,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            page,
            planner,
            portal: portal.clone(),
            timing: timing.clone(),
        }
    }

    /// Select the category, then the payer within it
    ///
    /// The category is matched only inside the category list and the payer
    /// only inside that category's own sub-list, so an identically named
    /// entry elsewhere on the page is never clicked.
    pub async fn select(
        &self,
        _session: &Session,
        payer_name: &str,
    ) -> Result<SelectionPlan, PayerSelectionError> {
        self.page
            .goto(&self.portal.eligibility_url(), self.timing.navigation_timeout)
            .await?;
        self.page
            .wait_visible(PAYER_CATEGORY_LIST, self.timing.payer_list_timeout)
            .await?;

        let list_html = self.page.inner_html(PAYER_CATEGORY_LIST).await?;
        let plan = self.planner.selection_plan(payer_name, &list_html).await?;

        self.page
            .click_text(PAYER_CATEGORY_LIST, &plan.category_text)
            .await?;
        sleep(self.timing.category_settle).await;

        self.page
            .click_text(&payer_sublist(&plan.category_text), &plan.payer_text)
            .await?;
        sleep(self.timing.payer_settle).await;

        info!(
            category = %plan.category_text,
            payer = %plan.payer_text,
            "Payer selected"
        );
        Ok(plan)
    }
}
