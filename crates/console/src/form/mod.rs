//! Side-panel create/edit form lifecycle.

mod tenant;
mod user;

pub use tenant::TenantForm;
pub use user::UserForm;

use std::fmt;

use tracing::{debug, warn};

use crate::api::{ApiError, ConsoleApi};
use crate::error::{ConsoleError, FieldErrors};
use crate::family::Family;
use crate::mutation::MutationCoordinator;

/// Whether the panel creates a record or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// Field values of a family's form.
pub trait FormValues: Default + Clone + fmt::Debug + Send + Sync + 'static {
    type Record;
    type Payload;

    /// Prefill from an existing record, flattening nested references.
    fn from_record(record: &Self::Record) -> Self;

    /// Check every field and build the request body.
    ///
    /// # Errors
    ///
    /// Returns the messages of every invalid field.
    fn validate(&self, mode: FormMode) -> Result<Self::Payload, FieldErrors>;
}

/// Open panel state: the edit target, if any, and the entered values.
#[derive(Debug, Clone)]
pub struct EditSession<F: Family> {
    target_id: Option<F::Id>,
    values: F::Form,
}

impl<F: Family> EditSession<F> {
    #[must_use]
    pub const fn mode(&self) -> FormMode {
        if self.target_id.is_some() {
            FormMode::Edit
        } else {
            FormMode::Create
        }
    }

    #[must_use]
    pub const fn target_id(&self) -> Option<F::Id> {
        self.target_id
    }

    #[must_use]
    pub const fn values(&self) -> &F::Form {
        &self.values
    }
}

/// Create-vs-edit form state for one family's side panel.
///
/// At most one [`EditSession`] exists at a time. It is created by
/// [`open_create`](Self::open_create) or [`open_edit`](Self::open_edit) and
/// destroyed by a successful [`submit`](Self::submit) or by
/// [`cancel`](Self::cancel). A failed submit leaves it untouched so the
/// operator can correct and resubmit.
#[derive(Debug)]
pub struct FormLifecycle<F: Family> {
    session: Option<EditSession<F>>,
    field_errors: FieldErrors,
    submit_error: Option<String>,
}

impl<F: Family> Default for FormLifecycle<F> {
    fn default() -> Self {
        Self {
            session: None,
            field_errors: FieldErrors::new(),
            submit_error: None,
        }
    }
}

impl<F: Family> FormLifecycle<F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the panel in create mode with empty fields.
    pub fn open_create(&mut self) {
        self.open(None, F::Form::default());
    }

    /// Open the panel in edit mode, prefilled from `record`.
    pub fn open_edit(&mut self, record: &F::Record) {
        self.open(Some(F::record_id(record)), F::Form::from_record(record));
    }

    fn open(&mut self, target_id: Option<F::Id>, values: F::Form) {
        self.session = Some(EditSession { target_id, values });
        self.field_errors.clear();
        self.submit_error = None;
    }

    /// Close the panel and discard the entered values.
    pub fn cancel(&mut self) {
        self.session = None;
        self.field_errors.clear();
        self.submit_error = None;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub const fn session(&self) -> Option<&EditSession<F>> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn mode(&self) -> Option<FormMode> {
        self.session.as_ref().map(EditSession::mode)
    }

    /// Panel title for the current mode.
    #[must_use]
    pub fn title(&self) -> Option<&'static str> {
        let (create, edit) = F::table().panel_titles;
        self.mode().map(|mode| match mode {
            FormMode::Create => create,
            FormMode::Edit => edit,
        })
    }

    #[must_use]
    pub fn values(&self) -> Option<&F::Form> {
        self.session.as_ref().map(|s| &s.values)
    }

    /// Entered values, for editing fields while the panel is open.
    pub fn values_mut(&mut self) -> Option<&mut F::Form> {
        self.session.as_mut().map(|s| &mut s.values)
    }

    /// Per-field messages from the last submit.
    #[must_use]
    pub const fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Message of the last failed mutation.
    #[must_use]
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Validate, then dispatch `update` when editing or `create` otherwise.
    ///
    /// Validation failures never reach the network. On success the panel
    /// closes and its values are discarded.
    ///
    /// # Errors
    ///
    /// - `PanelClosed` when no panel is open
    /// - `Validation` when a field is invalid
    /// - `Api` when the mutation fails; a server validation response also
    ///   fills [`field_errors`](Self::field_errors)
    pub async fn submit<A: ConsoleApi>(
        &mut self,
        coordinator: &MutationCoordinator<F, A>,
    ) -> Result<F::Record, ConsoleError> {
        let Some(session) = self.session.as_ref() else {
            return Err(ConsoleError::PanelClosed);
        };
        let target_id = session.target_id;
        let payload = match session.values.validate(session.mode()) {
            Ok(payload) => payload,
            Err(errors) => {
                debug!(fields = %errors, "Form rejected before submit");
                self.field_errors = errors.clone();
                return Err(ConsoleError::Validation(errors));
            }
        };
        self.field_errors.clear();
        self.submit_error = None;

        let outcome = match target_id {
            Some(id) => coordinator.update(id, &payload).await,
            None => coordinator.create(&payload).await,
        };

        match outcome {
            Ok(record) => {
                self.session = None;
                Ok(record)
            }
            Err(err) => {
                warn!(family = %F::FAMILY, error = %err, "Form submit failed");
                if let ApiError::Validation(fields) = &err {
                    self.field_errors = fields.clone();
                }
                self.submit_error = Some(err.to_string());
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use backoffice_core::{TenantId, TenantRecord};

    use super::*;
    use crate::api::{ApiCall, MemoryApi, TenantPayload};
    use crate::family::Tenants;
    use crate::mutation::InvalidationBus;

    fn pizza_hut() -> TenantRecord {
        TenantRecord {
            id: TenantId::new(5),
            name: "Pizza Hut".to_string(),
            address: "X".to_string(),
            created_at: None,
        }
    }

    fn setup() -> (Arc<MemoryApi>, MutationCoordinator<Tenants, MemoryApi>) {
        let api = Arc::new(MemoryApi::new().with_tenants(vec![pizza_hut()]));
        let coordinator = MutationCoordinator::new(api.clone(), InvalidationBus::new());
        (api, coordinator)
    }

    #[tokio::test]
    async fn test_edit_prefills_and_submits_update() {
        let (api, coordinator) = setup();
        let mut form = FormLifecycle::<Tenants>::new();

        form.open_edit(&pizza_hut());
        assert_eq!(form.mode(), Some(FormMode::Edit));
        assert_eq!(form.title(), Some("Edit restaurant"));
        let values = form.values().unwrap();
        assert_eq!(values.name, "Pizza Hut");
        assert_eq!(values.address, "X");

        form.submit(&coordinator).await.unwrap();

        let calls = api.calls();
        assert_eq!(
            calls,
            vec![ApiCall::UpdateTenant(
                TenantId::new(5),
                TenantPayload {
                    name: "Pizza Hut".to_string(),
                    address: "X".to_string(),
                }
            )]
        );
        assert!(!form.is_open());
    }

    #[tokio::test]
    async fn test_create_starts_empty_and_submits_create() {
        let (api, coordinator) = setup();
        let mut form = FormLifecycle::<Tenants>::new();

        form.open_edit(&pizza_hut());
        form.cancel();
        form.open_create();
        assert_eq!(form.title(), Some("Create restaurant"));
        assert_eq!(form.values().unwrap().name, "");

        let values = form.values_mut().unwrap();
        values.name = "Domino's".to_string();
        values.address = "Y".to_string();
        let created = form.submit(&coordinator).await.unwrap();

        assert_eq!(created.name, "Domino's");
        assert_eq!(api.count(|c| matches!(c, ApiCall::CreateTenant(_))), 1);
        assert_eq!(api.count(|c| matches!(c, ApiCall::UpdateTenant(..))), 0);
        assert!(form.session().is_none());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_network() {
        let (api, coordinator) = setup();
        let mut form = FormLifecycle::<Tenants>::new();
        form.open_create();
        form.values_mut().unwrap().name = "Only a name".to_string();

        let err = form.submit(&coordinator).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert!(!form.field_errors().get("address").is_empty());
        assert!(form.is_open());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_panel_and_values() {
        let (api, coordinator) = setup();
        let mut form = FormLifecycle::<Tenants>::new();
        form.open_edit(&pizza_hut());
        form.values_mut().unwrap().address = "New address".to_string();

        let mut server_errors = FieldErrors::new();
        server_errors.add("name", "name already taken");
        api.fail_next_mutation(ApiError::Validation(server_errors));

        let err = form.submit(&coordinator).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Api(ApiError::Validation(_))));
        assert_eq!(form.mode(), Some(FormMode::Edit));
        assert_eq!(form.values().unwrap().address, "New address");
        assert_eq!(form.field_errors().get("name"), ["name already taken"]);
        assert!(form.submit_error().is_some());

        // Resubmit without retyping.
        form.submit(&coordinator).await.unwrap();
        assert!(!form.is_open());
        assert!(form.field_errors().is_empty());
    }

    #[tokio::test]
    async fn test_submit_without_panel() {
        let (_, coordinator) = setup();
        let mut form = FormLifecycle::<Tenants>::new();
        assert!(matches!(
            form.submit(&coordinator).await,
            Err(ConsoleError::PanelClosed)
        ));
    }
}
