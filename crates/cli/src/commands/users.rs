//! Account commands.

use backoffice_console::guard::Route;
use backoffice_console::{FormLifecycle, Users};
use backoffice_core::{Role, TenantId, UserId};
use clap::Args;
use secrecy::SecretString;

use super::{CliError, Console, find_record};

/// Account form fields. On update, omitted fields keep their value.
#[derive(Args)]
pub struct UserFields {
    #[arg(long)]
    first_name: Option<String>,

    #[arg(long)]
    last_name: Option<String>,

    #[arg(short, long)]
    email: Option<String>,

    /// Role (`admin`, `manager`, `customer`)
    #[arg(short, long)]
    role: Option<String>,

    /// Restaurant id, required for managers
    #[arg(short, long)]
    tenant_id: Option<i32>,
}

/// Print one page of accounts.
///
/// # Errors
///
/// Returns an error if the page is not available to the session, a filter
/// value is not accepted, or the fetch fails.
#[allow(clippy::print_stdout)]
pub async fn list(
    console: &Console,
    page: u32,
    search: Option<String>,
    role: Option<&str>,
    status: Option<&str>,
) -> Result<(), CliError> {
    console.enter(Route::Users)?;
    let list = console.mount::<Users>();
    let applied = list
        .set_filter("role", role)
        .and_then(|()| list.set_filter("status", status));
    if let Err(err) = applied {
        list.unmount();
        return Err(err.into());
    }
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
        println!(
            "{:>5}  {:<24}  {:<32}  {:<8}  RESTAURANT",
            "ID", "NAME", "EMAIL", "ROLE"
        );
        for user in &result.items {
            println!(
                "{:>5}  {:<24}  {:<32}  {:<8}  {}",
                user.id.as_i32(),
                user.full_name(),
                user.email.as_str(),
                user.role.as_str(),
                user.tenant.as_ref().map_or("-", |t| t.name.as_str())
            );
        }
    }
    if let Some(range) = state.showing_range() {
        println!("{range}");
    }
    Ok(())
}

/// Create an account. The password is read from `CONSOLE_NEW_USER_PASSWORD`.
///
/// # Errors
///
/// Returns an error if a field is invalid or the API rejects the account.
pub async fn create(console: &Console, fields: UserFields) -> Result<(), CliError> {
    console.enter(Route::Users)?;
    let password = std::env::var("CONSOLE_NEW_USER_PASSWORD")
        .map_err(|_| CliError::MissingEnvVar("CONSOLE_NEW_USER_PASSWORD"))?;

    let mut form = FormLifecycle::<Users>::new();
    form.open_create();
    fill(&mut form, fields)?;
    if let Some(values) = form.values_mut() {
        values.password = SecretString::from(password);
    }

    let record = form.submit(&console.mutations::<Users>()).await?;
    tracing::info!(id = %record.id, email = %record.email, "Account created");
    Ok(())
}

/// Update account `id`, prefilled from its current values.
///
/// # Errors
///
/// Returns an error if the account cannot be found, a field is invalid, or
/// the API rejects the change.
pub async fn update(console: &Console, id: i32, fields: UserFields) -> Result<(), CliError> {
    console.enter(Route::Users)?;
    let id = UserId::new(id);
    let list = console.mount::<Users>();
    let record = find_record(&list, &format!("account #{id}"), |u| u.id == id).await;
    list.unmount();
    let record = record?;

    let mut form = FormLifecycle::<Users>::new();
    form.open_edit(&record);
    fill(&mut form, fields)?;

    let record = form.submit(&console.mutations::<Users>()).await?;
    tracing::info!(id = %record.id, email = %record.email, "Account updated");
    Ok(())
}

fn fill(form: &mut FormLifecycle<Users>, fields: UserFields) -> Result<(), CliError> {
    let Some(values) = form.values_mut() else {
        return Ok(());
    };
    if let Some(first_name) = fields.first_name {
        values.first_name = first_name;
    }
    if let Some(last_name) = fields.last_name {
        values.last_name = last_name;
    }
    if let Some(email) = fields.email {
        values.email = email;
    }
    if let Some(role) = fields.role {
        let parsed = role
            .parse::<Role>()
            .map_err(|_| CliError::InvalidArgument {
                name: "role",
                value: role,
            })?;
        values.role = Some(parsed);
    }
    if let Some(tenant_id) = fields.tenant_id {
        values.tenant_id = Some(TenantId::new(tenant_id));
    }
    Ok(())
}
