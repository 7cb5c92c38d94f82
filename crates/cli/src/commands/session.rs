//! Session commands.

use backoffice_console::SessionStatus;

use super::Console;

/// Print the signed-in principal.
#[allow(clippy::print_stdout)]
pub fn whoami(console: &Console) {
    match console.session.status() {
        SessionStatus::Authenticated(principal) => {
            println!("{} (#{})", principal.display_name(), principal.id);
            println!("role: {}", principal.role);
            if let Some(tenant_id) = principal.tenant_id {
                println!("restaurant: #{tenant_id}");
            }
        }
        status => {
            tracing::info!(?status, "Not signed in");
            println!("anonymous");
        }
    }
}

/// End the session.
pub async fn logout(console: &Console) {
    backoffice_console::session::logout(console.api.as_ref(), &console.session).await;
}
