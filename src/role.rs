use serde::{Deserialize, Serialize};

/// A group a user can belong to. The serialized form is the group name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Manager")]
    Manager,
    #[serde(rename = "Delivery Crew")]
    DeliveryCrew,
    #[serde(rename = "Customer")]
    Customer,
}

serde_plain::derive_display_from_serialize!(Role);
serde_plain::derive_fromstr_from_deserialize!(Role);

impl Role {
    /// Highest precedence first.
    pub const ALL: [Role; 3] = [Role::Manager, Role::DeliveryCrew, Role::Customer];

    /// Short identifier used in store keys.
    pub fn key(self) -> &'static str {
        match self {
            Role::Manager => "managers",
            Role::DeliveryCrew => "delivery-crew",
            Role::Customer => "customers",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Role::Manager => 0b001,
            Role::DeliveryCrew => 0b010,
            Role::Customer => 0b100,
        }
    }
}

/// Group membership of a single user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(u8);

impl RoleSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(role: Role) -> Self {
        Self(role.bit())
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn insert(&mut self, role: Role) -> bool {
        let added = !self.contains(role);
        self.0 |= role.bit();
        added
    }

    pub fn remove(&mut self, role: Role) -> bool {
        let removed = self.contains(role);
        self.0 &= !role.bit();
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.contains(*role))
    }

    /// The role that decides authorization: Manager, then Delivery Crew,
    /// then Customer. Users without any group act as customers.
    pub fn primary(&self) -> Role {
        self.iter().next().unwrap_or(Role::Customer)
    }

    pub fn is_manager(&self) -> bool {
        self.contains(Role::Manager)
    }
}

impl From<Vec<Role>> for RoleSet {
    fn from(roles: Vec<Role>) -> Self {
        roles.into_iter().collect()
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_role_prefers_manager() {
        let set: RoleSet = [Role::Customer, Role::Manager].into_iter().collect();
        assert_eq!(set.primary(), Role::Manager);

        let set: RoleSet = [Role::Customer, Role::DeliveryCrew].into_iter().collect();
        assert_eq!(set.primary(), Role::DeliveryCrew);

        assert_eq!(RoleSet::empty().primary(), Role::Customer);
    }

    #[test]
    fn insert_and_remove_report_changes() {
        let mut set = RoleSet::of(Role::Customer);
        assert!(!set.insert(Role::Customer));
        assert!(set.insert(Role::DeliveryCrew));
        assert!(set.remove(Role::Customer));
        assert!(!set.remove(Role::Customer));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Role::DeliveryCrew]);
    }

    #[test]
    fn role_names_match_group_names() {
        assert_eq!(Role::DeliveryCrew.to_string(), "Delivery Crew");
        assert_eq!("Manager".parse::<Role>().ok(), Some(Role::Manager));

        let json = serde_json::to_string(&RoleSet::of(Role::Manager)).unwrap();
        assert_eq!(json, r#"["Manager"]"#);
    }
}
