use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fleetmx_core::{DomainError, DomainResult, Entity};

/// A spare part with its stock level and the policies it fits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartStock {
    name: String,
    quantity: u32,
    min_quantity: u32,
    compatible_policies: Vec<String>,
}

impl PartStock {
    /// Build a part. Compatible policy names are deduplicated, keeping the
    /// first occurrence order.
    pub fn new<I, S>(
        name: impl Into<String>,
        quantity: u32,
        min_quantity: u32,
        compatible_policies: I,
    ) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid("part name cannot be empty"));
        }

        let mut fits: Vec<String> = Vec::new();
        for policy in compatible_policies {
            let policy = policy.into();
            if !fits.contains(&policy) {
                fits.push(policy);
            }
        }

        Ok(Self {
            name,
            quantity,
            min_quantity,
            compatible_policies: fits,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn min_quantity(&self) -> u32 {
        self.min_quantity
    }

    pub fn compatible_policies(&self) -> &[String] {
        &self.compatible_policies
    }

    pub fn fits(&self, policy_name: &str) -> bool {
        self.compatible_policies.iter().any(|p| p == policy_name)
    }

    /// Strictly below the minimum.
    pub fn is_low(&self) -> bool {
        self.quantity < self.min_quantity
    }
}

impl Entity for PartStock {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

/// Spare-part stock keyed by part name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    parts: BTreeMap<String, PartStock>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_part<I, S>(
        &mut self,
        name: impl Into<String>,
        initial_stock: u32,
        min_stock: u32,
        compatible_policies: I,
    ) -> DomainResult<&PartStock>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let part = PartStock::new(name, initial_stock, min_stock, compatible_policies)?;
        self.insert(part)
    }

    /// Insert an already built part (snapshot load).
    pub fn insert(&mut self, part: PartStock) -> DomainResult<&PartStock> {
        if self.parts.contains_key(part.name()) {
            return Err(DomainError::duplicate(format!("part {}", part.name())));
        }
        tracing::debug!(part = part.name(), quantity = part.quantity(), "part added");
        let key = part.name().to_string();
        Ok(self.parts.entry(key).or_insert(part))
    }

    pub fn get(&self, name: &str) -> DomainResult<&PartStock> {
        self.parts
            .get(name)
            .ok_or_else(|| DomainError::not_found(format!("part {name}")))
    }

    pub fn get_stock(&self, name: &str) -> DomainResult<u32> {
        self.get(name).map(PartStock::quantity)
    }

    /// Restock (positive delta) or write off (negative delta).
    ///
    /// The resulting quantity may not go negative. Returns the new quantity.
    pub fn adjust_stock(&mut self, name: &str, delta: i64) -> DomainResult<u32> {
        let part = self
            .parts
            .get_mut(name)
            .ok_or_else(|| DomainError::not_found(format!("part {name}")))?;

        if delta == 0 {
            return Err(DomainError::invalid("delta cannot be zero"));
        }

        let new_stock = i64::from(part.quantity) + delta;
        if new_stock < 0 {
            return Err(DomainError::invalid(format!(
                "stock of {name} cannot go negative ({} {delta:+})",
                part.quantity
            )));
        }
        let new_stock = u32::try_from(new_stock)
            .map_err(|_| DomainError::invalid(format!("stock of {name} overflows")))?;

        part.quantity = new_stock;
        Ok(new_stock)
    }

    /// Names of parts whose quantity is strictly below their minimum, in name order.
    pub fn low_stock_alerts(&self) -> Vec<String> {
        self.parts
            .values()
            .filter(|p| p.is_low())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Names of parts compatible with the given policy.
    pub fn parts_for_policy(&self, policy_name: &str) -> Vec<String> {
        self.parts
            .values()
            .filter(|p| p.fits(policy_name))
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartStock> {
        self.parts.values()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stocked() -> Inventory {
        let mut inv = Inventory::new();
        inv.add_part("Amortiguador delantero", 10, 2, ["Amortiguadores"])
            .unwrap();
        inv.add_part("Plumillas limpiaparabrisas", 20, 5, ["Limpiaparabrisas"])
            .unwrap();
        inv.add_part("Foco delantero", 30, 5, ["Luces", "Luces"]).unwrap();
        inv
    }

    #[test]
    fn duplicate_part_name_is_rejected() {
        let mut inv = stocked();
        let err = inv
            .add_part("Foco delantero", 1, 1, Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateName(_)));
        assert_eq!(inv.get_stock("Foco delantero").unwrap(), 30);
    }

    #[test]
    fn unknown_part_is_not_found() {
        let inv = stocked();
        assert!(matches!(
            inv.get_stock("Filtro de aire"),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn low_stock_uses_strict_inequality() {
        let mut inv = Inventory::new();
        inv.add_part("below", 1, 2, ["P"]).unwrap();
        inv.add_part("at", 2, 2, ["P"]).unwrap();
        inv.add_part("above", 3, 2, ["P"]).unwrap();
        assert_eq!(inv.low_stock_alerts(), vec!["below".to_string()]);
    }

    #[test]
    fn compatibility_is_deduplicated_and_queryable() {
        let inv = stocked();
        assert_eq!(
            inv.get("Foco delantero").unwrap().compatible_policies(),
            ["Luces"]
        );
        assert_eq!(inv.parts_for_policy("Luces"), vec!["Foco delantero".to_string()]);
        assert!(inv.parts_for_policy("Frenos").is_empty());
    }

    #[test]
    fn adjust_stock_cannot_go_negative() {
        let mut inv = stocked();
        assert_eq!(inv.adjust_stock("Amortiguador delantero", -9).unwrap(), 1);
        assert_eq!(
            inv.low_stock_alerts(),
            vec!["Amortiguador delantero".to_string()]
        );

        let err = inv.adjust_stock("Amortiguador delantero", -2).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(inv.get_stock("Amortiguador delantero").unwrap(), 1);

        assert!(inv.adjust_stock("Amortiguador delantero", 0).is_err());
        assert!(matches!(
            inv.adjust_stock("missing", 1),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn blank_part_name_is_invalid() {
        let mut inv = Inventory::new();
        assert!(matches!(
            inv.add_part("   ", 1, 0, ["Luces"]),
            Err(DomainError::InvalidInput(_))
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: a part is flagged iff quantity < minimum.
            #[test]
            fn alert_iff_strictly_below_minimum(qty in 0u32..50, min in 0u32..50) {
                let mut inv = Inventory::new();
                inv.add_part("p", qty, min, ["P"]).unwrap();
                prop_assert_eq!(!inv.low_stock_alerts().is_empty(), qty < min);
            }

            /// Property: accepted adjustments never leave the quantity negative.
            #[test]
            fn adjustments_keep_stock_non_negative(
                deltas in prop::collection::vec(-20i64..20, 0..30)
            ) {
                let mut inv = Inventory::new();
                inv.add_part("p", 5, 1, ["P"]).unwrap();
                let mut expected: i64 = 5;
                for d in deltas {
                    if inv.adjust_stock("p", d).is_ok() {
                        expected += d;
                    }
                    prop_assert!(expected >= 0);
                    prop_assert_eq!(i64::from(inv.get_stock("p").unwrap()), expected);
                }
            }
        }
    }
}
