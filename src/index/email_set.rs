use dashmap::DashSet;

/// Email existence set. Case-sensitive.
pub struct EmailSet {
    pub emails: DashSet<String>,
}

impl EmailSet {
    pub fn new() -> Self {
        EmailSet {
            emails: DashSet::new(),
        }
    }

    /// Returns false if the email was already present.
    pub fn put(&self, email: &str) -> bool {
        self.emails.insert(email.to_string())
    }

    pub fn exists(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub fn remove(&self, email: &str) {
        self.emails.remove(email);
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl Default for EmailSet {
    fn default() -> Self {
        Self::new()
    }
}
