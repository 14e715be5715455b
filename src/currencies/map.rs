use std::collections::HashMap;

use crate::errors::{FxError, Result};

use super::code::CurrencyCode;

/// # CurrencyMap
/// Assigns each currency a stable index in first-appearance order while
/// walking an ordered pair list, inserting the domestic code before the
/// foreign code within each pair. The resulting order is a public contract:
/// `fx_array`, `rates_table`, and position vectors are all indexed by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyMap {
    order: Vec<CurrencyCode>,
    index: HashMap<CurrencyCode, usize>,
}

impl CurrencyMap {
    /// Build the map by walking `pairs` in order, inserting domestic then
    /// foreign for each pair that is not already present.
    pub fn from_pairs(pairs: &[(CurrencyCode, CurrencyCode)]) -> Self {
        let mut order = Vec::new();
        let mut index = HashMap::new();
        for &(dom, for_) in pairs {
            for ccy in [dom, for_] {
                if let std::collections::hash_map::Entry::Vacant(e) = index.entry(ccy) {
                    e.insert(order.len());
                    order.push(ccy);
                }
            }
        }
        CurrencyMap { order, index }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The index assigned to `ccy`, if known.
    pub fn index_of(&self, ccy: CurrencyCode) -> Option<usize> {
        self.index.get(&ccy).copied()
    }

    /// The currency at a given index, if in range.
    pub fn currency_at(&self, idx: usize) -> Option<CurrencyCode> {
        self.order.get(idx).copied()
    }

    /// Currencies in index order.
    pub fn currencies(&self) -> &[CurrencyCode] {
        &self.order
    }

    /// As [`CurrencyMap::index_of`], but raising [`FxError::UnknownCurrency`]
    /// when the currency is absent. The common case on a lookup path.
    pub fn require_index(&self, ccy: CurrencyCode) -> Result<usize> {
        self.index_of(ccy)
            .ok_or_else(|| FxError::UnknownCurrency(ccy.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currencies::code::split_pair;

    #[test]
    fn indexes_in_first_appearance_order() {
        let pairs = vec![split_pair("eurusd").unwrap(), split_pair("gbpusd").unwrap()];
        let map = CurrencyMap::from_pairs(&pairs);
        assert_eq!(map.len(), 3);
        assert_eq!(map.currency_at(0).unwrap().as_str(), "eur");
        assert_eq!(map.currency_at(1).unwrap().as_str(), "usd");
        assert_eq!(map.currency_at(2).unwrap().as_str(), "gbp");
    }

    #[test]
    fn repeated_currency_keeps_first_index() {
        let pairs = vec![
            split_pair("eurusd").unwrap(),
            split_pair("usdjpy").unwrap(),
        ];
        let map = CurrencyMap::from_pairs(&pairs);
        assert_eq!(map.index_of(split_pair("usdjpy").unwrap().0), Some(1));
    }

    #[test]
    fn unknown_currency_errors() {
        let pairs = vec![split_pair("eurusd").unwrap()];
        let map = CurrencyMap::from_pairs(&pairs);
        assert!(map.require_index(split_pair("gbpusd").unwrap().0).is_err());
    }
}
