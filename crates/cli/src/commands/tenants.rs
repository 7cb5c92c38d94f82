//! Restaurant commands.

use backoffice_console::guard::Route;
use backoffice_console::{FormLifecycle, Tenants};
use backoffice_core::TenantId;
use clap::Args;

use super::{CliError, Console, find_record};

/// Restaurant form fields. On update, omitted fields keep their value.
#[derive(Args)]
pub struct TenantFields {
    /// Restaurant name
    #[arg(short, long)]
    name: Option<String>,

    /// Street address
    #[arg(short, long)]
    address: Option<String>,
}

/// Print one page of restaurants.
///
/// # Errors
///
/// Returns an error if the page is not available to the session or the
/// fetch fails.
#[allow(clippy::print_stdout)]
pub async fn list(console: &Console, page: u32, search: Option<String>) -> Result<(), CliError> {
    console.enter(Route::Tenants)?;
    let list = console.mount::<Tenants>();
    if let Some(search) = search {
        list.apply_search(search);
    }
    list.set_page(page);

    let state = list.settled().await;
    list.unmount();
    if let Some(error) = state.error {
        return Err(CliError::ListFailed(error));
    }

    if let Some(result) = &state.result {
        println!("{:>5}  {:<30}  ADDRESS", "ID", "NAME");
        for tenant in &result.items {
            println!(
                "{:>5}  {:<30}  {}",
                tenant.id.as_i32(),
                tenant.name,
                tenant.address
            );
        }
    }
    if let Some(range) = state.showing_range() {
        println!("{range}");
    }
    Ok(())
}

/// Create a restaurant.
///
/// # Errors
///
/// Returns an error if a field is invalid or the API rejects the record.
pub async fn create(console: &Console, fields: TenantFields) -> Result<(), CliError> {
    console.enter(Route::Tenants)?;
    let mut form = FormLifecycle::<Tenants>::new();
    form.open_create();
    fill(&mut form, fields);

    let record = form.submit(&console.mutations::<Tenants>()).await?;
    tracing::info!(id = %record.id, name = %record.name, "Restaurant created");
    Ok(())
}

/// Update restaurant `id`, prefilled from its current values.
///
/// # Errors
///
/// Returns an error if the restaurant cannot be found, a field is invalid,
/// or the API rejects the change.
pub async fn update(console: &Console, id: i32, fields: TenantFields) -> Result<(), CliError> {
    console.enter(Route::Tenants)?;
    let id = TenantId::new(id);
    let list = console.mount::<Tenants>();
    let record = find_record(&list, &format!("restaurant #{id}"), |t| t.id == id).await;
    list.unmount();
    let record = record?;

    let mut form = FormLifecycle::<Tenants>::new();
    form.open_edit(&record);
    fill(&mut form, fields);

    let record = form.submit(&console.mutations::<Tenants>()).await?;
    tracing::info!(id = %record.id, name = %record.name, "Restaurant updated");
    Ok(())
}

fn fill(form: &mut FormLifecycle<Tenants>, fields: TenantFields) {
    let Some(values) = form.values_mut() else {
        return;
    };
    if let Some(name) = fields.name {
        values.name = name;
    }
    if let Some(address) = fields.address {
        values.address = address;
    }
}
