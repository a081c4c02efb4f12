use crate::user::user_models::normalize_username;
use crate::user::User;
use std::collections::HashMap;

/// Ordered user records with a case-insensitive username index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSet {
    users: Vec<User>,
    index: HashMap<String, usize>,
}

impl UserSet {
    /// Later records with an already indexed username replace the earlier
    /// ones, so a hand-edited store with duplicates collapses to one record.
    pub fn from_users(users: Vec<User>) -> Self {
        let mut set = UserSet::default();
        for user in users {
            set.upsert(user);
        }
        set
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.index.contains_key(&normalize_username(username))
    }

    pub fn get(&self, username: &str) -> Option<&User> {
        self.index
            .get(&normalize_username(username))
            .map(|i| &self.users[*i])
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut User> {
        match self.index.get(&normalize_username(username)) {
            Some(i) => Some(&mut self.users[*i]),
            None => None,
        }
    }

    /// Inserts a new record, or replaces the record with the same
    /// (case-insensitive) username in place. Returns true if it was new.
    pub fn upsert(&mut self, user: User) -> bool {
        let key = normalize_username(&user.username);
        match self.index.get(&key) {
            Some(i) => {
                self.users[*i] = user;
                false
            }
            None => {
                self.index.insert(key, self.users.len());
                self.users.push(user);
                true
            }
        }
    }
}
