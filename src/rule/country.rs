//! Country code matching.

use ahash::AHashSet;

use crate::error::RuleError;
use crate::lookup::PRIVATE_ADDRESS;

/// CountrySet matches resolved country codes.
///
/// Codes are stored lowercase and compared case-insensitively. The
/// private-address sentinel `-` is accepted so private ranges can be
/// targeted through their lookup result.
///
/// # Examples
/// ```
/// use geoblock::rule::CountrySet;
///
/// let mut set = CountrySet::new();
/// set.add_pattern("FR").unwrap();
/// assert!(set.contains("fr"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CountrySet {
    /// Set of 2-letter ISO country codes (lowercase)
    countries: AHashSet<String>,
}

impl CountrySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of country codes.
    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// Check if the set has no codes.
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Check if a country code is in this set.
    pub fn contains(&self, country: &str) -> bool {
        self.countries.contains(&country.to_ascii_lowercase())
    }

    /// Add a country code such as `fr` or `US`.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<(), RuleError> {
        let code = pattern.trim().to_ascii_lowercase();

        if code != PRIVATE_ADDRESS
            && (code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(RuleError::InvalidCountryCode(pattern.to_string()));
        }

        self.countries.insert(code);
        Ok(())
    }
}
