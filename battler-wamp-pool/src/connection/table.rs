use indexmap::{
    IndexMap,
    map::Entry,
};

/// A request made by a consumer, plus the handle of its currently active resource.
pub(crate) struct RegistrationEntry<R, H> {
    pub request: R,
    pub active: Option<H>,
}

/// Requests for resources that must exist on every session, keyed by consumer ID.
///
/// Entries are iterated in the order their IDs were first inserted. Overwriting an entry keeps its
/// position but forgets its active handle.
pub(crate) struct RegistrationTable<R, H> {
    entries: IndexMap<String, RegistrationEntry<R, H>>,
}

impl<R, H> Default for RegistrationTable<R, H> {
    fn default() -> Self {
        Self {
            entries: IndexMap::default(),
        }
    }
}

impl<R, H> RegistrationTable<R, H>
where
    H: Copy,
{
    /// Inserts or overwrites the request for a consumer.
    pub fn insert(&mut self, id: String, request: R) -> &mut RegistrationEntry<R, H> {
        let entry = RegistrationEntry {
            request,
            active: None,
        };
        match self.entries.entry(id) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(entry),
        }
    }

    /// The active handle for a consumer's request.
    pub fn active(&self, id: &str) -> Option<H> {
        self.entries.get(id).and_then(|entry| entry.active)
    }

    /// Sets the active handle for a consumer's request, if the request is still recorded.
    pub fn set_active(&mut self, id: &str, active: Option<H>) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.active = active;
        }
    }

    /// Forgets every active handle, keeping the requests.
    pub fn clear_active(&mut self) {
        for entry in self.entries.values_mut() {
            entry.active = None;
        }
    }

    /// Consumer IDs, in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// A copy of every request, in insertion order.
    pub fn requests(&self) -> Vec<(String, R)>
    where
        R: Clone,
    {
        self.entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.request.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod table_test {
    use pretty_assertions::assert_eq;

    use crate::connection::table::RegistrationTable;

    #[test]
    fn keeps_insertion_order_on_overwrite() {
        let mut table = RegistrationTable::<&str, u64>::default();
        table.insert("b".to_owned(), "first");
        table.insert("a".to_owned(), "second");
        table.insert("b".to_owned(), "third");
        assert_eq!(table.ids(), vec!["b".to_owned(), "a".to_owned()]);
        assert_eq!(
            table.requests(),
            vec![("b".to_owned(), "third"), ("a".to_owned(), "second")]
        );
    }

    #[test]
    fn overwrite_forgets_active_handle() {
        let mut table = RegistrationTable::<&str, u64>::default();
        table.insert("a".to_owned(), "request").active = Some(1);
        assert_eq!(table.active("a"), Some(1));
        table.insert("a".to_owned(), "request");
        assert_eq!(table.active("a"), None);
    }

    #[test]
    fn sets_active_handle_of_recorded_request_only() {
        let mut table = RegistrationTable::<&str, u64>::default();
        table.insert("a".to_owned(), "request");
        table.set_active("a", Some(3));
        table.set_active("b", Some(4));
        assert_eq!(table.active("a"), Some(3));
        assert_eq!(table.active("b"), None);
        assert_eq!(table.ids(), vec!["a".to_owned()]);
    }

    #[test]
    fn clears_all_active_handles_together() {
        let mut table = RegistrationTable::<&str, u64>::default();
        table.insert("a".to_owned(), "a").active = Some(1);
        table.insert("b".to_owned(), "b").active = Some(2);
        table.insert("c".to_owned(), "c");
        table.clear_active();
        assert_eq!(table.len(), 3);
        assert_eq!(table.active("a"), None);
        assert_eq!(table.active("b"), None);
        assert_eq!(table.active("c"), None);
    }
}
