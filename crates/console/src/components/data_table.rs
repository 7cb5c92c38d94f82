//! Data table definitions for the resource list pages.
//!
//! A table definition names the columns a list shows and, more importantly
//! for the controller, the discrete filters it accepts and their option sets.

use backoffice_core::{ResourceFamily, Role, UserStatus};

/// Column definition for a data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    /// Record field the column renders.
    pub key: &'static str,
    /// Header label.
    pub label: &'static str,
}

impl TableColumn {
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Option for a select filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    /// Wire value.
    pub value: &'static str,
    /// Display label.
    pub label: &'static str,
}

impl FilterOption {
    #[must_use]
    pub const fn new(value: &'static str, label: &'static str) -> Self {
        Self { value, label }
    }
}

/// Clearable single-select filter, applied as soon as a value is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    /// Query parameter key.
    pub key: &'static str,
    /// Placeholder shown while nothing is selected.
    pub placeholder: &'static str,
    /// Accepted values.
    pub options: Vec<FilterOption>,
}

impl TableFilter {
    #[must_use]
    pub const fn select(
        key: &'static str,
        placeholder: &'static str,
        options: Vec<FilterOption>,
    ) -> Self {
        Self {
            key,
            placeholder,
            options,
        }
    }

    /// Whether `value` is one of the filter's options.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Configuration for one resource list page.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    /// Family whose records the table lists.
    pub family: ResourceFamily,
    /// Breadcrumb title.
    pub title: &'static str,
    /// Column definitions.
    pub columns: Vec<TableColumn>,
    /// Discrete filters.
    pub filters: Vec<TableFilter>,
    /// Search box placeholder.
    pub search_placeholder: &'static str,
    /// Label of the button that opens the create panel.
    pub create_label: &'static str,
    /// Panel titles in create and edit mode.
    pub panel_titles: (&'static str, &'static str),
}

impl DataTableConfig {
    /// Create an empty table definition for `family`.
    #[must_use]
    pub const fn new(family: ResourceFamily, title: &'static str) -> Self {
        Self {
            family,
            title,
            columns: vec![],
            filters: vec![],
            search_placeholder: "Search",
            create_label: "Add",
            panel_titles: ("Create", "Edit"),
        }
    }

    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub const fn create_label(mut self, label: &'static str) -> Self {
        self.create_label = label;
        self
    }

    #[must_use]
    pub const fn panel_titles(mut self, create: &'static str, edit: &'static str) -> Self {
        self.panel_titles = (create, edit);
        self
    }

    /// Look up a declared filter by query key.
    #[must_use]
    pub fn find_filter(&self, key: &str) -> Option<&TableFilter> {
        self.filters.iter().find(|f| f.key == key)
    }
}

/// Build the accounts table configuration.
#[must_use]
pub fn users_table_config() -> DataTableConfig {
    let roles = Role::ALL
        .iter()
        .map(|role| {
            let label = match role {
                Role::Admin => "Admin",
                Role::Manager => "Manager",
                Role::Customer => "Customer",
            };
            FilterOption::new(role.as_str(), label)
        })
        .collect();
    let statuses = UserStatus::ALL
        .iter()
        .map(|status| {
            let label = match status {
                UserStatus::Ban => "Ban",
                UserStatus::Active => "Active",
            };
            FilterOption::new(status.as_str(), label)
        })
        .collect();

    DataTableConfig::new(ResourceFamily::Users, "Users")
        .column(TableColumn::new("id", "ID"))
        .column(TableColumn::new("firstName", "Name"))
        .column(TableColumn::new("email", "Email"))
        .column(TableColumn::new("role", "Role"))
        .column(TableColumn::new("tenant", "Restaurant"))
        .filter(TableFilter::select("role", "Select role", roles))
        .filter(TableFilter::select("status", "Status", statuses))
        .create_label("Add User")
        .panel_titles("Create user", "Edit user")
}

/// Build the tenants (restaurants) table configuration.
#[must_use]
pub fn tenants_table_config() -> DataTableConfig {
    DataTableConfig::new(ResourceFamily::Tenants, "Restaurants")
        .column(TableColumn::new("id", "ID"))
        .column(TableColumn::new("name", "Name"))
        .column(TableColumn::new("address", "Address"))
        .create_label("Add Restaurant")
        .panel_titles("Create restaurant", "Edit restaurant")
}
