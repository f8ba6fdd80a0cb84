//! Category tree, the create/edit form and the option lists built from it

use crate::api::{ApiClient, CategoriesResponse, Category, CategoryInput, Origin};
use crate::error::AppError;
use crate::text::generate_slug;
use std::fmt::Write as _;

/// Contents of the category form. `id` is set when editing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryForm {
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<i64>,
    pub is_primary: bool,
    pub display_order: i32,
}

impl CategoryForm {
    /// Form pre-filled with an existing category
    pub fn edit(category: &Category) -> Self {
        Self {
            id: Some(category.id),
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone().unwrap_or_default(),
            parent_id: category.parent_id,
            is_primary: category.is_primary,
            display_order: category.display_order,
        }
    }

    /// Trimmed request body. A new category with a blank slug gets one
    /// derived from its name.
    pub fn to_input(&self) -> Result<CategoryInput, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("The category name is required.".into()));
        }
        let mut slug = self.slug.trim().to_string();
        if slug.is_empty() && self.id.is_none() {
            slug = generate_slug(name);
        }
        Ok(CategoryInput {
            name: name.to_string(),
            slug,
            description: self.description.trim().to_string(),
            parent_id: self.parent_id,
            is_primary: self.is_primary,
            display_order: self.display_order,
        })
    }
}

/// Choice in a category selector; `None` stands for "no parent"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOption {
    pub id: Option<i64>,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct CategoryPanel {
    tree: Vec<Category>,
    flat: Vec<Category>,
}

impl CategoryPanel {
    pub fn tree(&self) -> &[Category] {
        &self.tree
    }

    pub fn flat(&self) -> &[Category] {
        &self.flat
    }

    pub fn find(&self, id: i64) -> Option<&Category> {
        self.flat.iter().find(|c| c.id == id)
    }

    pub fn replace(&mut self, data: CategoriesResponse) {
        self.tree = data.tree;
        self.flat = data.flat;
    }

    pub async fn load(&mut self, api: &ApiClient) -> Result<(), AppError> {
        let data = api.categories().await?;
        log::info!(
            "Loaded {} categories ({} roots)",
            data.flat.len(),
            data.tree.len()
        );
        self.replace(data);
        Ok(())
    }

    /// Create (no id) or update (id) a category
    pub async fn save(&self, api: &ApiClient, form: &CategoryForm) -> Result<(), AppError> {
        let input = form.to_input()?;
        match form.id {
            Some(id) => api.update_category(id, &input).await,
            None => api.create_category(&input).await,
        }
    }

    pub fn delete_prompt(&self, id: i64) -> String {
        let name = self
            .find(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", id));
        format!(
            "Delete the category \"{}\"?\n\nSubcategories will be moved to its parent.",
            name
        )
    }

    /// Parent selector: "no parent" followed by every category
    pub fn parent_options(&self) -> Vec<CategoryOption> {
        std::iter::once(CategoryOption {
            id: None,
            label: "None (root category)".into(),
        })
        .chain(self.flat.iter().map(|c| CategoryOption {
            id: Some(c.id),
            label: c.name.clone(),
        }))
        .collect()
    }

    /// Assignment selector; children are indented under their parents
    pub fn assign_options(&self) -> Vec<CategoryOption> {
        self.flat
            .iter()
            .map(|c| CategoryOption {
                id: Some(c.id),
                label: if c.parent_id.is_some() {
                    format!("  └ {}", c.name)
                } else {
                    c.name.clone()
                },
            })
            .collect()
    }

    /// Indented text rendering of the tree
    pub fn render_tree(&self) -> String {
        if self.tree.is_empty() {
            return "No categories yet.\n".to_string();
        }
        let mut out = String::new();
        render_level(&mut out, &self.tree, 0);
        out
    }
}

fn render_level(out: &mut String, categories: &[Category], depth: usize) {
    for cat in categories {
        let indent = "  ".repeat(depth);
        let origin = match cat.created_by {
            Origin::Llm => "LLM",
            Origin::Admin => "manual",
        };
        let _ = write!(out, "{}[{}] {} ({})", indent, cat.id, cat.name, cat.slug);
        if cat.is_primary {
            out.push_str(" [primary]");
        }
        let _ = writeln!(out, " [{}] ({} queries)", origin, cat.query_count);
        if let Some(desc) = cat.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "{}    {}", indent, desc);
        }
        render_level(out, &cat.children, depth + 1);
    }
}
