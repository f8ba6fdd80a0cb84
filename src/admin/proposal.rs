//! Review of an LLM categorisation proposal before it is persisted.
//!
//! Every proposed category, child category, assignment and reparent carries
//! its own checkbox, all checked when the proposal arrives. [`select`] turns
//! the proposal and the checkboxes into the request sent to the backend:
//!
//! 1. a checked top-level category is sent with its checked children only;
//! 2. a checked child under an unchecked parent is promoted to a root-level,
//!    non-primary category without children;
//! 3. checked assignments keep only slugs of categories being sent, and are
//!    dropped when none remain;
//! 4. checked reparents are sent as proposed.

use crate::api::{
    ApiClient, ApplyRequest, LlmProposal, LlmUsage, ProposedCategory, Query,
};
use crate::error::AppError;
use crate::text::truncate_chars;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Checkbox groups with their own "all" / "none" toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    Categories,
    Assignments,
    Reparents,
}

/// One checkbox of the proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Category(usize),
    Child(usize, usize),
    Assignment(usize),
    Reparent(usize),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category(i) => write!(f, "cat:{}", i),
            Self::Child(i, j) => write!(f, "cat:{}.{}", i, j),
            Self::Assignment(i) => write!(f, "assign:{}", i),
            Self::Reparent(i) => write!(f, "reparent:{}", i),
        }
    }
}

impl FromStr for ItemRef {
    type Err = AppError;

    /// `cat:0`, `cat:0.2`, `assign:3`, `reparent:1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("Invalid proposal item: {}", s));
        let (kind, index) = s.split_once(':').ok_or_else(invalid)?;
        let parse = |v: &str| v.trim().parse::<usize>().map_err(|_| invalid());
        match kind.trim() {
            "cat" => match index.split_once('.') {
                Some((i, j)) => Ok(Self::Child(parse(i)?, parse(j)?)),
                None => Ok(Self::Category(parse(index)?)),
            },
            "assign" => Ok(Self::Assignment(parse(index)?)),
            "reparent" => Ok(Self::Reparent(parse(index)?)),
            _ => Err(invalid()),
        }
    }
}

/// Checkbox state, shaped like the proposal it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    categories: Vec<bool>,
    children: Vec<Vec<bool>>,
    assignments: Vec<bool>,
    reparents: Vec<bool>,
}

impl Selection {
    /// Everything checked
    pub fn all(proposal: &LlmProposal) -> Self {
        Self {
            categories: vec![true; proposal.categories.len()],
            children: proposal
                .categories
                .iter()
                .map(|c| vec![true; c.children.len()])
                .collect(),
            assignments: vec![true; proposal.assignments.len()],
            reparents: vec![true; proposal.reparents.len()],
        }
    }

    pub fn is_checked(&self, item: ItemRef) -> bool {
        let slot = match item {
            ItemRef::Category(i) => self.categories.get(i),
            ItemRef::Child(i, j) => self.children.get(i).and_then(|c| c.get(j)),
            ItemRef::Assignment(i) => self.assignments.get(i),
            ItemRef::Reparent(i) => self.reparents.get(i),
        };
        slot.copied().unwrap_or(false)
    }

    pub fn set(&mut self, item: ItemRef, checked: bool) -> Result<(), AppError> {
        let slot = match item {
            ItemRef::Category(i) => self.categories.get_mut(i),
            ItemRef::Child(i, j) => self.children.get_mut(i).and_then(|c| c.get_mut(j)),
            ItemRef::Assignment(i) => self.assignments.get_mut(i),
            ItemRef::Reparent(i) => self.reparents.get_mut(i),
        };
        match slot {
            Some(slot) => {
                *slot = checked;
                Ok(())
            }
            None => Err(AppError::Validation(format!(
                "Proposal has no item {}",
                item
            ))),
        }
    }

    /// Check or uncheck a whole group; children count as categories
    pub fn toggle_all(&mut self, class: ItemClass, checked: bool) {
        match class {
            ItemClass::Categories => {
                self.categories.iter_mut().for_each(|c| *c = checked);
                self.children
                    .iter_mut()
                    .flatten()
                    .for_each(|c| *c = checked);
            }
            ItemClass::Assignments => self.assignments.iter_mut().for_each(|c| *c = checked),
            ItemClass::Reparents => self.reparents.iter_mut().for_each(|c| *c = checked),
        }
    }
}

/// The part of `proposal` selected for persistence
pub fn select(proposal: &LlmProposal, selection: &Selection) -> ApplyRequest {
    let mut categories = Vec::new();
    let mut selected_slugs: HashSet<&str> = HashSet::new();

    for (ci, cat) in proposal.categories.iter().enumerate() {
        let checked_children: Vec<&ProposedCategory> = cat
            .children
            .iter()
            .enumerate()
            .filter(|(chi, _)| selection.is_checked(ItemRef::Child(ci, *chi)))
            .map(|(_, child)| child)
            .collect();

        if selection.is_checked(ItemRef::Category(ci)) {
            selected_slugs.insert(cat.slug.as_str());
            selected_slugs.extend(checked_children.iter().map(|c| c.slug.as_str()));
            categories.push(ProposedCategory {
                children: checked_children.into_iter().cloned().collect(),
                ..cat.clone()
            });
        } else {
            for child in checked_children {
                selected_slugs.insert(child.slug.as_str());
                categories.push(ProposedCategory {
                    is_primary: false,
                    children: Vec::new(),
                    ..child.clone()
                });
            }
        }
    }

    let assignments = proposal
        .assignments
        .iter()
        .enumerate()
        .filter(|(ai, _)| selection.is_checked(ItemRef::Assignment(*ai)))
        .filter_map(|(_, a)| {
            let slugs: Vec<String> = a
                .category_slugs
                .iter()
                .filter(|s| selected_slugs.contains(s.as_str()))
                .cloned()
                .collect();
            if slugs.is_empty() {
                return None;
            }
            let mut kept = a.clone();
            kept.category_slugs = slugs;
            Some(kept)
        })
        .collect();

    let reparents = proposal
        .reparents
        .iter()
        .enumerate()
        .filter(|(ri, _)| selection.is_checked(ItemRef::Reparent(*ri)))
        .map(|(_, r)| r.clone())
        .collect();

    ApplyRequest {
        categories,
        assignments,
        reparents,
    }
}

/// Text of the confirmation asked before applying
pub fn confirmation_message(request: &ApplyRequest) -> String {
    format!(
        "Apply {} categories, {} assignments and {} reparents?",
        request.categories.len(),
        request.assignments.len(),
        request.reparents.len()
    )
}

/// Whether a proposal can be requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisites {
    pub featured: usize,
}

impl Prerequisites {
    pub fn check(queries: &[Query]) -> Self {
        Self {
            featured: queries.iter().filter(|q| q.featured).count(),
        }
    }

    pub fn ready(&self) -> bool {
        self.featured > 0
    }

    pub fn message(&self) -> String {
        if self.ready() {
            format!("{} featured queries ready to categorise.", self.featured)
        } else {
            "Mark at least one query as featured before asking for categories.".to_string()
        }
    }
}

#[derive(Debug, Default)]
pub struct ProposalReview {
    proposal: Option<(LlmProposal, Selection)>,
    pending: bool,
}

impl ProposalReview {
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn proposal(&self) -> Option<&LlmProposal> {
        self.proposal.as_ref().map(|(p, _)| p)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.proposal.as_ref().map(|(_, s)| s)
    }

    /// Ask the backend for a proposal. At most one request is outstanding.
    pub async fn request(
        &mut self,
        api: &ApiClient,
        queries: &[Query],
        model: &str,
    ) -> Result<&LlmProposal, AppError> {
        if self.pending {
            return Err(AppError::Validation(
                "A proposal request is already in progress.".into(),
            ));
        }
        let prerequisites = Prerequisites::check(queries);
        if !prerequisites.ready() {
            return Err(AppError::Validation(prerequisites.message()));
        }

        self.pending = true;
        let result = api.suggest_categories(model).await;
        self.pending = false;

        let proposal = result?;
        log::info!(
            "Proposal received: {} categories, {} assignments, {} reparents",
            proposal.categories.len(),
            proposal.assignments.len(),
            proposal.reparents.len()
        );
        let selection = Selection::all(&proposal);
        let (proposal, _) = self.proposal.insert((proposal, selection));
        Ok(proposal)
    }

    /// Install a proposal obtained elsewhere
    pub fn load(&mut self, proposal: LlmProposal) {
        let selection = Selection::all(&proposal);
        self.proposal = Some((proposal, selection));
    }

    pub fn set(&mut self, item: ItemRef, checked: bool) -> Result<(), AppError> {
        self.selection_mut()?.set(item, checked)
    }

    pub fn toggle_all(&mut self, class: ItemClass, checked: bool) -> Result<(), AppError> {
        self.selection_mut()?.toggle_all(class, checked);
        Ok(())
    }

    fn selection_mut(&mut self) -> Result<&mut Selection, AppError> {
        self.proposal
            .as_mut()
            .map(|(_, s)| s)
            .ok_or_else(|| AppError::Validation("No proposal to review.".into()))
    }

    /// Request for the checked items; an empty selection is rejected here
    pub fn prepare(&self) -> Result<ApplyRequest, AppError> {
        let (proposal, selection) = self
            .proposal
            .as_ref()
            .ok_or_else(|| AppError::Validation("No proposal to apply.".into()))?;
        let request = select(proposal, selection);
        if request.total() == 0 {
            return Err(AppError::Validation(
                "No items selected to apply.".into(),
            ));
        }
        Ok(request)
    }

    pub fn discard(&mut self) {
        self.proposal = None;
    }

    pub fn summary(&self, queries: &[Query]) -> Option<ProposalSummary> {
        self.proposal
            .as_ref()
            .map(|(p, s)| ProposalSummary::build(p, s, queries))
    }
}

// ── Summary view ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CategoryLine {
    pub item: ItemRef,
    pub checked: bool,
    pub name: String,
    pub slug: String,
    pub is_primary: bool,
    pub description: Option<String>,
    pub children: Vec<CategoryLine>,
}

#[derive(Debug, Clone)]
pub struct AssignmentLine {
    pub item: ItemRef,
    pub checked: bool,
    pub query: String,
    pub slugs: String,
    /// Rounded, e.g. "85%"
    pub confidence: String,
}

#[derive(Debug, Clone)]
pub struct ReparentLine {
    pub item: ItemRef,
    pub checked: bool,
    pub slug: String,
    pub parent: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProposalSummary {
    pub usage: Option<String>,
    pub categories: Vec<CategoryLine>,
    pub assignments: Vec<AssignmentLine>,
    pub reparents: Vec<ReparentLine>,
}

/// `Tokens: 1200 in + 300 out | Cost: $0.0021 | Model: gpt-4o-mini`
pub fn usage_line(usage: &LlmUsage) -> String {
    let model = usage
        .model_used
        .as_deref()
        .map(|m| format!(" | Model: {}", m))
        .unwrap_or_default();
    format!(
        "Tokens: {} in + {} out | Cost: ${}{}",
        usage.prompt_tokens, usage.completion_tokens, usage.cost_usd, model
    )
}

fn query_label(queries: &[Query], id: i64) -> String {
    queries
        .iter()
        .find(|q| q.id == id)
        .map(|q| truncate_chars(&q.query_text, 60))
        .unwrap_or_else(|| format!("Query #{}", id))
}

impl ProposalSummary {
    fn build(proposal: &LlmProposal, selection: &Selection, queries: &[Query]) -> Self {
        let categories = proposal
            .categories
            .iter()
            .enumerate()
            .map(|(ci, cat)| CategoryLine {
                item: ItemRef::Category(ci),
                checked: selection.is_checked(ItemRef::Category(ci)),
                name: cat.name.clone(),
                slug: cat.slug.clone(),
                is_primary: cat.is_primary,
                description: cat.description.clone(),
                children: cat
                    .children
                    .iter()
                    .enumerate()
                    .map(|(chi, child)| CategoryLine {
                        item: ItemRef::Child(ci, chi),
                        checked: selection.is_checked(ItemRef::Child(ci, chi)),
                        name: child.name.clone(),
                        slug: child.slug.clone(),
                        is_primary: child.is_primary,
                        description: child.description.clone(),
                        children: Vec::new(),
                    })
                    .collect(),
            })
            .collect();

        let assignments = proposal
            .assignments
            .iter()
            .enumerate()
            .map(|(ai, a)| AssignmentLine {
                item: ItemRef::Assignment(ai),
                checked: selection.is_checked(ItemRef::Assignment(ai)),
                query: query_label(queries, a.query_id),
                slugs: a.category_slugs.join(", "),
                confidence: format!("{}%", (a.confidence.unwrap_or(0.0) * 100.0).round() as i64),
            })
            .collect();

        let reparents = proposal
            .reparents
            .iter()
            .enumerate()
            .map(|(ri, r)| ReparentLine {
                item: ItemRef::Reparent(ri),
                checked: selection.is_checked(ItemRef::Reparent(ri)),
                slug: r.category_slug.clone(),
                parent: r.new_parent_slug.clone().unwrap_or_else(|| "(root)".into()),
                reason: r.reason.clone(),
            })
            .collect();

        Self {
            usage: proposal.usage.as_ref().map(usage_line),
            categories,
            assignments,
            reparents,
        }
    }
}

fn mark(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

impl fmt::Display for ProposalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Proposed categories:")?;
        for cat in &self.categories {
            write!(f, "  {} {:<10} {} ({})", mark(cat.checked), cat.item, cat.name, cat.slug)?;
            if cat.is_primary {
                write!(f, " [primary]")?;
            }
            writeln!(f)?;
            if let Some(desc) = &cat.description {
                writeln!(f, "                   {}", desc)?;
            }
            for child in &cat.children {
                writeln!(
                    f,
                    "    {} {:<10} └ {} ({})",
                    mark(child.checked),
                    child.item,
                    child.name,
                    child.slug
                )?;
            }
        }
        if !self.assignments.is_empty() {
            writeln!(f, "Proposed assignments:")?;
            for a in &self.assignments {
                writeln!(
                    f,
                    "  {} {:<10} {} -> {} ({})",
                    mark(a.checked),
                    a.item,
                    a.query,
                    a.slugs,
                    a.confidence
                )?;
            }
        }
        if !self.reparents.is_empty() {
            writeln!(f, "Proposed reparents:")?;
            for r in &self.reparents {
                write!(
                    f,
                    "  {} {:<10} {} -> parent: {}",
                    mark(r.checked),
                    r.item,
                    r.slug,
                    r.parent
                )?;
                if let Some(reason) = &r.reason {
                    write!(f, " ({})", reason)?;
                }
                writeln!(f)?;
            }
        }
        if let Some(usage) = &self.usage {
            writeln!(f, "{}", usage)?;
        }
        Ok(())
    }
}
