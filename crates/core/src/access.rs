//! Access gate: which role may perform which action on which collection.
//!
//! The engine consults an [`AccessGate`] before it reads any collection. The gate itself is an
//! external concern; [`RoleTable`] is the standard implementation for the five hospital roles.
//!
//! Role definitions are resolved once, when the table is built, into an explicit
//! [`ActionSet`] per collection (with an "all actions" sentinel). Lookups never interpret
//! wildcards at call time.

use crate::constants::{HOSPITALS, MAINTENANCE_TASKS, MEDICATIONS, PATIENTS, STAFF, TREATMENTS, VISITS};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// The subject roles known to the hospital system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    GeneralDirector,
    SpecialistPhysician,
    Nurse,
    AdministrativeStaff,
    MaintenanceStaff,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::GeneralDirector,
        Role::SpecialistPhysician,
        Role::Nurse,
        Role::AdministrativeStaff,
        Role::MaintenanceStaff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::GeneralDirector => "general_director",
            Role::SpecialistPhysician => "specialist_physician",
            Role::Nurse => "nurse",
            Role::AdministrativeStaff => "administrative_staff",
            Role::MaintenanceStaff => "maintenance_staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| crate::ReportError::Validation(format!("unknown role '{s}'")))
    }
}

/// Operations a role can be granted on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Find,
    Insert,
    Update,
    Remove,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Find => "find",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions granted on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSet {
    /// Every action, including ones added later.
    All,
    Only(Vec<Action>),
}

impl ActionSet {
    pub fn allows(&self, action: Action) -> bool {
        match self {
            ActionSet::All => true,
            ActionSet::Only(actions) => actions.contains(&action),
        }
    }

    fn merge(&mut self, other: &ActionSet) {
        match (&mut *self, other) {
            (ActionSet::All, _) => {}
            (_, ActionSet::All) => *self = ActionSet::All,
            (ActionSet::Only(mine), ActionSet::Only(theirs)) => {
                for action in theirs {
                    if !mine.contains(action) {
                        mine.push(*action);
                    }
                }
            }
        }
    }
}

/// What a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    AnyCollection,
    Collection(String),
}

/// One privilege in a role definition.
#[derive(Debug, Clone)]
pub struct Grant {
    pub resource: Resource,
    pub actions: ActionSet,
}

impl Grant {
    pub fn on(collection: &str, actions: &[Action]) -> Self {
        Self {
            resource: Resource::Collection(collection.to_string()),
            actions: ActionSet::Only(actions.to_vec()),
        }
    }

    pub fn everything() -> Self {
        Self {
            resource: Resource::AnyCollection,
            actions: ActionSet::All,
        }
    }
}

/// Authorization check consulted before the engine touches the store.
pub trait AccessGate: Send + Sync {
    fn can(&self, role: Role, action: Action, collection: &str) -> bool;
}

// ═══════════════════════════════════════════════════════════
// Role table
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default, Clone)]
struct ResolvedGrants {
    any_collection: Option<ActionSet>,
    by_collection: HashMap<String, ActionSet>,
}

/// Role definitions resolved into per-collection action sets.
///
/// Default-deny: a role with no grant for a collection may do nothing on it.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    roles: HashMap<Role, ResolvedGrants>,
}

impl RoleTable {
    /// Build a table from explicit role definitions.
    ///
    /// Grants for the same role and collection are merged.
    pub fn from_definitions(definitions: impl IntoIterator<Item = (Role, Vec<Grant>)>) -> Self {
        let mut roles: HashMap<Role, ResolvedGrants> = HashMap::new();

        for (role, grants) in definitions {
            let resolved = roles.entry(role).or_default();
            for grant in grants {
                match grant.resource {
                    Resource::AnyCollection => match &mut resolved.any_collection {
                        Some(existing) => existing.merge(&grant.actions),
                        slot @ None => *slot = Some(grant.actions),
                    },
                    Resource::Collection(name) => {
                        resolved
                            .by_collection
                            .entry(name)
                            .and_modify(|existing| existing.merge(&grant.actions))
                            .or_insert(grant.actions);
                    }
                }
            }
        }

        Self { roles }
    }

    /// The five standard hospital roles.
    pub fn standard() -> Self {
        use Action::*;

        Self::from_definitions([
            (Role::GeneralDirector, vec![Grant::everything()]),
            (
                Role::SpecialistPhysician,
                vec![
                    Grant::on(PATIENTS, &[Find, Update, Insert]),
                    Grant::on(VISITS, &[Find, Update, Insert]),
                    Grant::on(TREATMENTS, &[Find]),
                    Grant::on(MEDICATIONS, &[Find]),
                ],
            ),
            (
                Role::Nurse,
                vec![
                    Grant::on(PATIENTS, &[Find, Update]),
                    Grant::on(VISITS, &[Find, Insert]),
                ],
            ),
            (
                Role::AdministrativeStaff,
                vec![
                    Grant::on(STAFF, &[Find, Update, Insert, Remove]),
                    Grant::on(MEDICATIONS, &[Find, Update, Insert, Remove]),
                    Grant::on(HOSPITALS, &[Find]),
                ],
            ),
            (
                Role::MaintenanceStaff,
                vec![Grant::on(MAINTENANCE_TASKS, &[Find, Update, Insert])],
            ),
        ])
    }
}

impl AccessGate for RoleTable {
    fn can(&self, role: Role, action: Action, collection: &str) -> bool {
        let Some(grants) = self.roles.get(&role) else {
            return false;
        };

        if grants
            .any_collection
            .as_ref()
            .is_some_and(|set| set.allows(action))
        {
            return true;
        }

        grants
            .by_collection
            .get(collection)
            .is_some_and(|set| set.allows(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn director_can_do_anything_anywhere() {
        let table = RoleTable::standard();
        for action in [Action::Find, Action::Insert, Action::Update, Action::Remove] {
            assert!(table.can(Role::GeneralDirector, action, VISITS));
            assert!(table.can(Role::GeneralDirector, action, "archive"));
        }
    }

    #[test]
    fn physician_reads_catalogs_but_cannot_change_them() {
        let table = RoleTable::standard();
        assert!(table.can(Role::SpecialistPhysician, Action::Insert, PATIENTS));
        assert!(table.can(Role::SpecialistPhysician, Action::Find, TREATMENTS));
        assert!(!table.can(Role::SpecialistPhysician, Action::Update, MEDICATIONS));
        assert!(!table.can(Role::SpecialistPhysician, Action::Remove, VISITS));
        assert!(!table.can(Role::SpecialistPhysician, Action::Find, HOSPITALS));
    }

    #[test]
    fn nurse_can_insert_visits_but_not_patients() {
        let table = RoleTable::standard();
        assert!(table.can(Role::Nurse, Action::Insert, VISITS));
        assert!(table.can(Role::Nurse, Action::Update, PATIENTS));
        assert!(!table.can(Role::Nurse, Action::Insert, PATIENTS));
        assert!(!table.can(Role::Nurse, Action::Update, VISITS));
    }

    #[test]
    fn administrative_and_maintenance_scopes() {
        let table = RoleTable::standard();
        assert!(table.can(Role::AdministrativeStaff, Action::Remove, STAFF));
        assert!(table.can(Role::AdministrativeStaff, Action::Find, HOSPITALS));
        assert!(!table.can(Role::AdministrativeStaff, Action::Update, HOSPITALS));
        assert!(!table.can(Role::AdministrativeStaff, Action::Find, PATIENTS));

        assert!(table.can(Role::MaintenanceStaff, Action::Insert, MAINTENANCE_TASKS));
        assert!(!table.can(Role::MaintenanceStaff, Action::Remove, MAINTENANCE_TASKS));
        assert!(!table.can(Role::MaintenanceStaff, Action::Find, VISITS));
    }

    #[test]
    fn grants_for_the_same_collection_are_merged() {
        let table = RoleTable::from_definitions([(
            Role::Nurse,
            vec![
                Grant::on(VISITS, &[Action::Find]),
                Grant::on(VISITS, &[Action::Remove]),
            ],
        )]);
        assert!(table.can(Role::Nurse, Action::Find, VISITS));
        assert!(table.can(Role::Nurse, Action::Remove, VISITS));
        assert!(!table.can(Role::Nurse, Action::Insert, VISITS));
    }

    #[test]
    fn roles_parse_from_their_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().expect("known role"), role);
        }
        assert!("janitor".parse::<Role>().is_err());
    }
}
