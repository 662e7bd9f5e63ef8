//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Identifier type (asset codes, part names, generated order ids).
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Find an entity by identifier in a slice.
pub fn find_by_id<'a, E: Entity>(items: &'a [E], id: &E::Id) -> Option<&'a E> {
    items.iter().find(|item| item.id() == id)
}

/// Mutable variant of [`find_by_id`].
pub fn find_by_id_mut<'a, E: Entity>(items: &'a mut [E], id: &E::Id) -> Option<&'a mut E> {
    items.iter_mut().find(|item| item.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Truck {
        code: String,
    }

    impl Entity for Truck {
        type Id = String;

        fn id(&self) -> &Self::Id {
            &self.code
        }
    }

    #[test]
    fn find_by_id_matches_on_identity() {
        let mut trucks = vec![
            Truck { code: "TR-001".into() },
            Truck { code: "TR-002".into() },
        ];

        assert_eq!(
            find_by_id(&trucks, &"TR-002".to_string()),
            Some(&Truck { code: "TR-002".into() })
        );
        assert!(find_by_id(&trucks, &"TR-404".to_string()).is_none());

        let found = find_by_id_mut(&mut trucks, &"TR-001".to_string()).unwrap();
        found.code.push('A');
        assert_eq!(trucks[0].code, "TR-001A");
    }
}
