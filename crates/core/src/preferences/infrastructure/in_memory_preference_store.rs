use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::compositing::domain::mask_style::MaskStyle;
use crate::preferences::domain::preference_store::PreferenceStore;
use crate::preferences::domain::user_id::UserId;

/// Process-local preference map behind a mutex.
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    styles: Mutex<HashMap<UserId, MaskStyle>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (UserId, MaskStyle)>) -> Self {
        Self {
            styles: Mutex::new(entries.into_iter().collect()),
        }
    }

    /// Every stored choice, sorted by user.
    pub fn entries(&self) -> Vec<(UserId, MaskStyle)> {
        let mut all: Vec<_> = self.lock().iter().map(|(u, s)| (*u, *s)).collect();
        all.sort_by_key(|(u, _)| *u);
        all
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-written, so
    // a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, MaskStyle>> {
        self.styles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn style_for(&self, user: UserId) -> Option<MaskStyle> {
        self.lock().get(&user).copied()
    }

    fn set_style(&self, user: UserId, style: MaskStyle) {
        self.lock().insert(user, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_unknown_user_has_no_style() {
        assert_eq!(InMemoryPreferenceStore::new().style_for(UserId(1)), None);
    }

    #[test]
    fn test_last_choice_wins() {
        let store = InMemoryPreferenceStore::new();
        store.set_style(UserId(7), MaskStyle::EyeMask);
        store.set_style(UserId(7), MaskStyle::FaceMask);
        assert_eq!(store.style_for(UserId(7)), Some(MaskStyle::FaceMask));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_users_are_independent() {
        let store = InMemoryPreferenceStore::new();
        store.set_style(UserId(1), MaskStyle::EyeMask);
        assert_eq!(store.style_for(UserId(2)), None);
    }

    #[test]
    fn test_entries_sorted_by_user() {
        let store = InMemoryPreferenceStore::from_entries([
            (UserId(9), MaskStyle::FaceMask),
            (UserId(-3), MaskStyle::EyeMask),
        ]);
        assert_eq!(
            store.entries(),
            vec![(UserId(-3), MaskStyle::EyeMask), (UserId(9), MaskStyle::FaceMask)]
        );
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(InMemoryPreferenceStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..100 {
                        let style = if j % 2 == 0 {
                            MaskStyle::EyeMask
                        } else {
                            MaskStyle::FaceMask
                        };
                        store.set_style(UserId(i), style);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 8);
        for i in 0..8 {
            assert_eq!(store.style_for(UserId(i)), Some(MaskStyle::FaceMask));
        }
    }
}
