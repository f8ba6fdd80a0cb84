use super::{confirm_on_terminal, AdminCommand, CategoryArgs};
use crate::admin::{AdminConsole, ApplyOutcome, CategoryForm, ItemRef, QueryRow};
use crate::api::{ApiClient, Origin};
use crate::config::ClientConfig;
use crate::error::AppError;

pub async fn admin(config: &ClientConfig, command: AdminCommand) -> Result<(), AppError> {
    let mut console = AdminConsole::new(ApiClient::new(config)?);

    match command {
        AdminCommand::Queries { search, featured } => {
            console.load_queries().await?;
            let rows = console
                .queries()
                .filter(&search, featured, &console.base_path());
            for row in &rows {
                print_query(row);
            }
            println!("{}", console.queries().count_line(rows.len()));
        }
        AdminCommand::ToggleFeatured { uuid } => {
            let featured = console.toggle_featured(&uuid).await?;
            if featured {
                println!("★ Query marked as featured");
            } else {
                println!("Query no longer featured");
            }
        }
        AdminCommand::Categories => {
            console.load_categories().await?;
            print!("{}", console.categories().render_tree());
        }
        AdminCommand::CreateCategory(args) => {
            let mut form = CategoryForm::default();
            apply_args(&mut form, args);
            console.save_category(&form).await?;
            println!("Category created");
            print!("{}", console.categories().render_tree());
        }
        AdminCommand::UpdateCategory { id, fields } => {
            console.load_categories().await?;
            let mut form = console
                .categories()
                .find(id)
                .map(CategoryForm::edit)
                .ok_or_else(|| AppError::Validation(format!("No category with id {}", id)))?;
            apply_args(&mut form, fields);
            console.save_category(&form).await?;
            println!("Category updated");
        }
        AdminCommand::DeleteCategory { id, yes } => {
            console.load_categories().await?;
            let mut confirm = |m: &str| yes || confirm_on_terminal(m);
            if console.delete_category(id, &mut confirm).await? {
                println!("Category deleted");
            }
        }
        AdminCommand::Assign {
            query_id,
            category_id,
        } => {
            console.assign(query_id, category_id).await?;
            println!("Category assigned");
        }
        AdminCommand::Unassign {
            query_id,
            category_id,
            yes,
        } => {
            let mut confirm = |m: &str| yes || confirm_on_terminal(m);
            if console
                .remove_assignment(query_id, category_id, &mut confirm)
                .await?
            {
                println!("Category removed from the query");
            }
        }
        AdminCommand::Suggest {
            model,
            exclude,
            apply,
            yes,
        } => {
            console.load_queries().await?;
            let prerequisites = console.prerequisites();
            println!("{}", prerequisites.message());
            if !prerequisites.ready() {
                return Ok(());
            }

            let model = model.unwrap_or_else(|| config.llm_model.clone());
            console.request_proposal(&model).await?;
            for item in &exclude {
                let item: ItemRef = item.parse()?;
                console.review_mut().set(item, false)?;
            }
            if let Some(summary) = console.review().summary(console.queries().queries()) {
                print!("{}", summary);
            }
            if !apply {
                return Ok(());
            }

            let mut confirm = |m: &str| yes || confirm_on_terminal(m);
            match console.apply_proposal(&mut confirm).await? {
                ApplyOutcome::Applied(result) => println!("{}", result),
                ApplyOutcome::Cancelled => println!("Nothing applied"),
            }
        }
    }
    Ok(())
}

fn apply_args(form: &mut CategoryForm, args: CategoryArgs) {
    if let Some(name) = args.name {
        form.name = name;
    }
    if let Some(slug) = args.slug {
        form.slug = slug;
    }
    if let Some(description) = args.description {
        form.description = description;
    }
    if args.root {
        form.parent_id = None;
    } else if let Some(parent) = args.parent {
        form.parent_id = Some(parent);
    }
    if let Some(primary) = args.primary {
        form.is_primary = primary;
    }
    if let Some(order) = args.order {
        form.display_order = order;
    }
}

fn print_query(row: &QueryRow) {
    let star = if row.featured { "★" } else { "☆" };
    let badges: Vec<String> = row
        .categories
        .iter()
        .map(|c| match c.assigned_by {
            Origin::Llm => format!("[LLM {} #{}]", c.name, c.id),
            Origin::Admin => format!("[{} #{}]", c.name, c.id),
        })
        .collect();
    println!(
        "{} #{:<5} {:<16} {:>3} likes  {}  {}",
        star,
        row.id,
        row.date,
        row.likes,
        row.text,
        badges.join(" ")
    );
    println!("        {}  {}", row.uuid, row.link);
}
