//! Admin console: featured queries, the category tree and LLM proposals.
//!
//! The console never merges backend changes into its local copies: after any
//! mutation it reloads the affected lists in full.

pub mod categories;
pub mod proposal;
pub mod queries;

use crate::api::{ApiClient, ApplyResult};
use crate::error::AppError;

pub use categories::{CategoryForm, CategoryOption, CategoryPanel};
pub use proposal::{
    confirmation_message, select, ItemClass, ItemRef, Prerequisites, ProposalReview,
    ProposalSummary, Selection,
};
pub use queries::{CategoryBadge, QueryBoard, QueryRow};

/// Yes/no question put to the operator before destructive actions
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(ApplyResultSummary),
    Cancelled,
}

/// Backend counts after applying a proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResultSummary {
    pub created_categories: u64,
    pub applied_assignments: u64,
    pub applied_reparents: u64,
}

impl From<ApplyResult> for ApplyResultSummary {
    fn from(r: ApplyResult) -> Self {
        Self {
            created_categories: r.created_categories,
            applied_assignments: r.applied_assignments,
            applied_reparents: r.applied_reparents,
        }
    }
}

impl std::fmt::Display for ApplyResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Categories: {}, assignments: {}",
            self.created_categories, self.applied_assignments
        )?;
        if self.applied_reparents > 0 {
            write!(f, ", reparents: {}", self.applied_reparents)?;
        }
        Ok(())
    }
}

pub struct AdminConsole {
    api: ApiClient,
    queries: QueryBoard,
    categories: CategoryPanel,
    review: ProposalReview,
}

impl AdminConsole {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            queries: QueryBoard::default(),
            categories: CategoryPanel::default(),
            review: ProposalReview::default(),
        }
    }

    pub fn queries(&self) -> &QueryBoard {
        &self.queries
    }

    pub fn categories(&self) -> &CategoryPanel {
        &self.categories
    }

    pub fn review(&self) -> &ProposalReview {
        &self.review
    }

    pub fn review_mut(&mut self) -> &mut ProposalReview {
        &mut self.review
    }

    /// Mount point used for links to saved queries
    pub fn base_path(&self) -> String {
        self.api.api_path("")
    }

    pub async fn load_queries(&mut self) -> Result<(), AppError> {
        self.queries.load(&self.api).await
    }

    pub async fn load_categories(&mut self) -> Result<(), AppError> {
        self.categories.load(&self.api).await
    }

    pub async fn reload(&mut self) -> Result<(), AppError> {
        self.load_categories().await?;
        self.load_queries().await
    }

    pub async fn toggle_featured(&mut self, uuid: &str) -> Result<bool, AppError> {
        self.queries.toggle_featured(&self.api, uuid).await
    }

    pub async fn save_category(&mut self, form: &CategoryForm) -> Result<(), AppError> {
        self.categories.save(&self.api, form).await?;
        self.load_categories().await
    }

    /// Returns `false` when the operator declined
    pub async fn delete_category(
        &mut self,
        id: i64,
        confirm: &mut dyn Confirm,
    ) -> Result<bool, AppError> {
        if !confirm.confirm(&self.categories.delete_prompt(id)) {
            return Ok(false);
        }
        self.api.delete_category(id).await?;
        self.load_categories().await?;
        Ok(true)
    }

    pub async fn assign(&mut self, query_id: i64, category_id: i64) -> Result<(), AppError> {
        self.api.assign_category(query_id, category_id).await?;
        self.load_queries().await?;
        self.load_categories().await
    }

    /// Returns `false` when the operator declined
    pub async fn remove_assignment(
        &mut self,
        query_id: i64,
        category_id: i64,
        confirm: &mut dyn Confirm,
    ) -> Result<bool, AppError> {
        if !confirm.confirm("Remove this category from the query?") {
            return Ok(false);
        }
        self.api
            .remove_category_assignment(query_id, category_id)
            .await?;
        self.load_queries().await?;
        self.load_categories().await?;
        Ok(true)
    }

    pub fn prerequisites(&self) -> Prerequisites {
        Prerequisites::check(self.queries.queries())
    }

    pub async fn request_proposal(&mut self, model: &str) -> Result<ProposalSummary, AppError> {
        self.review
            .request(&self.api, self.queries.queries(), model)
            .await?;
        self.review
            .summary(self.queries.queries())
            .ok_or_else(|| AppError::Other("Proposal missing after request".into()))
    }

    /// Send the checked part of the proposal after confirmation, then reload
    /// categories and queries
    pub async fn apply_proposal(
        &mut self,
        confirm: &mut dyn Confirm,
    ) -> Result<ApplyOutcome, AppError> {
        let request = self.review.prepare()?;
        if !confirm.confirm(&confirmation_message(&request)) {
            log::info!("Proposal application cancelled");
            return Ok(ApplyOutcome::Cancelled);
        }

        let result = self.api.apply_categories(&request).await?;
        self.review.discard();
        self.reload().await?;
        Ok(ApplyOutcome::Applied(result.into()))
    }

    pub fn discard_proposal(&mut self) {
        self.review.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_confirm() {
        let mut asked = Vec::new();
        let mut yes = |m: &str| {
            asked.push(m.to_string());
            true
        };
        assert!(Confirm::confirm(&mut yes, "sure?"));
        assert_eq!(asked, vec!["sure?"]);
    }

    #[test]
    fn test_apply_summary_hides_zero_reparents() {
        let summary = ApplyResultSummary {
            created_categories: 2,
            applied_assignments: 5,
            applied_reparents: 0,
        };
        assert_eq!(summary.to_string(), "Categories: 2, assignments: 5");
        let summary = ApplyResultSummary {
            applied_reparents: 1,
            ..summary
        };
        assert_eq!(summary.to_string(), "Categories: 2, assignments: 5, reparents: 1");
    }
}
